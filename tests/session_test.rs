//! Integration tests against a live PostgreSQL database.
//!
//! These read the same five environment variables as the gateway
//! (`user`, `password`, `host`, `port`, `dbname`) and skip when any of
//! them is unset.

use memebase::DbConfig;
use memebase::db::{BulkInsert, Session, SqlParam};
use serde_json::Value as JsonValue;

fn test_session() -> Option<Session> {
    match DbConfig::from_env() {
        Ok(config) => Some(Session::new(config)),
        Err(_) => {
            eprintln!("Skipping test: database environment variables not set");
            None
        }
    }
}

async fn recreate_table(session: &Session, table: &str, columns: &str) {
    session
        .update(&format!("DROP TABLE IF EXISTS {table}"), &[])
        .await
        .unwrap();
    session
        .update(&format!("CREATE TABLE {table} ({columns})"), &[])
        .await
        .unwrap();
}

async fn drop_table(session: &Session, table: &str) {
    session
        .update(&format!("DROP TABLE IF EXISTS {table}"), &[])
        .await
        .unwrap();
}

async fn count_rows(session: &Session, table: &str) -> i64 {
    let row = session
        .select_one(&format!("SELECT count(*) AS n FROM {table}"), &[])
        .await
        .unwrap()
        .unwrap();
    row["n"].as_i64().unwrap()
}

#[tokio::test]
async fn test_connect_twice_is_idempotent() {
    let Some(session) = test_session() else { return };

    session.connect().await.unwrap();
    session.connect().await.unwrap();

    let row = session
        .select_one("SELECT 1 AS one", &[])
        .await
        .unwrap()
        .unwrap();
    assert_eq!(row["one"], JsonValue::from(1));

    session.close().await;
    session.close().await;
}

#[tokio::test]
async fn test_select_many_zero_rows_is_empty() {
    let Some(session) = test_session() else { return };

    let rows = session
        .select_many("SELECT 1 AS one WHERE false", &[])
        .await
        .unwrap();
    assert!(rows.is_empty());
}

#[tokio::test]
async fn test_select_one_zero_rows_is_none() {
    let Some(session) = test_session() else { return };

    let row = session
        .select_one("SELECT 1 AS one WHERE false", &[])
        .await
        .unwrap();
    assert!(row.is_none());
}

#[tokio::test]
async fn test_select_as_text_renders_dates_and_decimals() {
    let Some(session) = test_session() else { return };

    let text = session
        .select_as_text(
            "SELECT date '2024-05-01' AS created, 12.50::numeric AS price",
            &[],
        )
        .await
        .unwrap();

    assert!(text.contains("\"2024-05-01\""));
    assert!(text.contains("12.5"));
}

#[tokio::test]
async fn test_insert_returns_first_returned_column() {
    let Some(session) = test_session() else { return };
    let table = "memebase_it_insert";
    recreate_table(
        &session,
        table,
        "id bigserial PRIMARY KEY, name text NOT NULL",
    )
    .await;

    let id = session
        .insert(
            &format!("INSERT INTO {table} (name) VALUES ($1) RETURNING id"),
            &[SqlParam::from("sarcasm")],
        )
        .await
        .unwrap();
    assert!(matches!(id, Some(JsonValue::Number(_))));

    // Without a RETURNING clause the statement yields no row.
    let none = session
        .insert(
            &format!("INSERT INTO {table} (name) VALUES ($1)"),
            &[SqlParam::from("irony")],
        )
        .await
        .unwrap();
    assert!(none.is_none());

    drop_table(&session, table).await;
}

#[tokio::test]
async fn test_update_and_delete_report_affected_rows() {
    let Some(session) = test_session() else { return };
    let table = "memebase_it_update";
    recreate_table(&session, table, "name text NOT NULL, score bigint NOT NULL").await;

    session
        .batch_execute(
            &format!("INSERT INTO {table} (name, score) VALUES ($1, $2)"),
            &[
                vec![SqlParam::from("a"), SqlParam::from(1i64)],
                vec![SqlParam::from("b"), SqlParam::from(1i64)],
                vec![SqlParam::from("c"), SqlParam::from(2i64)],
            ],
        )
        .await
        .unwrap();

    let updated = session
        .update(
            &format!("UPDATE {table} SET score = score + 1 WHERE score = $1"),
            &[SqlParam::from(1i64)],
        )
        .await
        .unwrap();
    assert_eq!(updated, 2);

    let deleted = session
        .delete(&format!("DELETE FROM {table}"), &[])
        .await
        .unwrap();
    assert_eq!(deleted, 3);

    drop_table(&session, table).await;
}

#[tokio::test]
async fn test_failing_statement_rolls_back_its_scope_only() {
    let Some(session) = test_session() else { return };
    let table = "memebase_it_rollback";
    recreate_table(&session, table, "name text PRIMARY KEY").await;

    // Seed in its own scope; this commit must survive the failure below.
    session
        .bulk_insert(
            BulkInsert::new(&format!("INSERT INTO {table} (name)")),
            &[
                vec![SqlParam::from("a")],
                vec![SqlParam::from("b")],
                vec![SqlParam::from("c")],
            ],
        )
        .await
        .unwrap();

    // One scope: the first tuple would insert, the second violates the
    // primary key. The whole scope rolls back.
    let result = session
        .batch_execute(
            &format!("INSERT INTO {table} (name) VALUES ($1)"),
            &[vec![SqlParam::from("d")], vec![SqlParam::from("a")]],
        )
        .await;
    assert!(result.is_err());

    assert_eq!(count_rows(&session, table).await, 3);

    drop_table(&session, table).await;
}

#[tokio::test]
async fn test_bulk_insert_pages_and_returns_ids_in_order() {
    let Some(session) = test_session() else { return };
    let table = "memebase_it_bulk";
    recreate_table(
        &session,
        table,
        "id bigserial PRIMARY KEY, name text NOT NULL",
    )
    .await;

    let values: Vec<Vec<SqlParam>> = (0..5)
        .map(|i| vec![SqlParam::from(format!("meme-{i}"))])
        .collect();
    let ids = session
        .bulk_insert(
            BulkInsert::new(&format!("INSERT INTO {table} (name)"))
                .returning("id")
                .page_size(2),
            &values,
        )
        .await
        .unwrap();

    assert_eq!(ids.len(), 5);
    let numeric: Vec<i64> = ids.iter().map(|id| id.as_i64().unwrap()).collect();
    let mut sorted = numeric.clone();
    sorted.sort_unstable();
    assert_eq!(numeric, sorted);

    let rows = session
        .select_many(&format!("SELECT name FROM {table} ORDER BY id"), &[])
        .await
        .unwrap();
    let names: Vec<&str> = rows.iter().map(|r| r["name"].as_str().unwrap()).collect();
    assert_eq!(names, ["meme-0", "meme-1", "meme-2", "meme-3", "meme-4"]);

    drop_table(&session, table).await;
}

#[tokio::test]
async fn test_bulk_insert_without_returning_is_silent() {
    let Some(session) = test_session() else { return };
    let table = "memebase_it_bulk_plain";
    recreate_table(&session, table, "name text NOT NULL").await;

    let values: Vec<Vec<SqlParam>> = (0..5)
        .map(|i| vec![SqlParam::from(format!("meme-{i}"))])
        .collect();
    let ids = session
        .bulk_insert(
            BulkInsert::new(&format!("INSERT INTO {table} (name)")).page_size(2),
            &values,
        )
        .await
        .unwrap();

    assert!(ids.is_empty());
    assert_eq!(count_rows(&session, table).await, 5);

    drop_table(&session, table).await;
}
