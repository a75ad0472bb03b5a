//! Storage bucket helpers over the hosted platform's HTTP API.
//!
//! Independent of the database core: thin wrappers matching the
//! platform's REST surface for bucket creation, uploads, and public
//! URLs.

use reqwest::StatusCode;
use reqwest::header::CACHE_CONTROL;
use serde_json::Value as JsonValue;
use thiserror::Error;
use url::Url;

/// Bucket that holds meme images.
pub const DEFAULT_BUCKET: &str = "meme_basket";
/// Folder inside the bucket where images are published.
pub const DEFAULT_FOLDER: &str = "basket_images_meme";

const BUCKET_MIME_TYPES: [&str; 1] = ["image/png"];
const BUCKET_SIZE_LIMIT: u64 = 1024;
const UPLOAD_PREFIX: &str = "public";
const UPLOAD_CACHE_CONTROL: &str = "3600";

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("missing storage configuration for: {}", missing.join(", "))]
    Configuration { missing: Vec<String> },

    #[error("invalid storage URL: {0}")]
    Url(#[from] url::ParseError),

    #[error("storage request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("storage API returned {status}: {body}")]
    Api { status: StatusCode, body: String },

    #[error("cannot read local file: {0}")]
    Io(#[from] std::io::Error),
}

/// Settings for reaching the storage API.
#[derive(Clone)]
pub struct StorageConfig {
    pub url: String,
    pub key: String,
}

impl StorageConfig {
    /// Read `SUPABASE_URL` and `SUPABASE_KEY` from the environment,
    /// listing every missing key on failure.
    pub fn from_env() -> Result<Self, StorageError> {
        let url = read_env("SUPABASE_URL");
        let key = read_env("SUPABASE_KEY");

        let missing: Vec<String> = [("SUPABASE_URL", &url), ("SUPABASE_KEY", &key)]
            .iter()
            .filter(|(_, value)| value.is_none())
            .map(|(name, _)| name.to_string())
            .collect();
        if !missing.is_empty() {
            return Err(StorageError::Configuration { missing });
        }

        Ok(Self {
            url: url.unwrap_or_default(),
            key: key.unwrap_or_default(),
        })
    }
}

impl std::fmt::Debug for StorageConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StorageConfig")
            .field("url", &self.url)
            .field("key", &"***")
            .finish()
    }
}

fn read_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|value| !value.is_empty())
}

/// Client for the bucket-storage API.
pub struct StorageClient {
    http: reqwest::Client,
    base: Url,
    key: String,
}

impl StorageClient {
    pub fn new(config: &StorageConfig) -> Result<Self, StorageError> {
        Ok(Self {
            http: reqwest::Client::new(),
            base: Url::parse(&config.url)?,
            key: config.key.clone(),
        })
    }

    /// Create a private bucket restricted to PNG uploads of at most
    /// [`BUCKET_SIZE_LIMIT`] bytes.
    pub async fn create_bucket(&self, name: &str) -> Result<JsonValue, StorageError> {
        let endpoint = self.endpoint("storage/v1/bucket")?;
        let payload = serde_json::json!({
            "name": name,
            "public": false,
            "allowed_mime_types": BUCKET_MIME_TYPES,
            "file_size_limit": BUCKET_SIZE_LIMIT,
        });
        let response = self
            .http
            .post(endpoint)
            .bearer_auth(&self.key)
            .header("apikey", &self.key)
            .json(&payload)
            .send()
            .await?;
        into_json(response).await
    }

    /// Upload a local file under the bucket's `public/` prefix. Existing
    /// objects are not overwritten.
    pub async fn upload_file(
        &self,
        bucket: &str,
        file_path: &str,
    ) -> Result<JsonValue, StorageError> {
        let object = object_path(file_path);
        let endpoint = self.endpoint(&format!("storage/v1/object/{bucket}/{object}"))?;
        let bytes = tokio::fs::read(file_path).await?;
        let response = self
            .http
            .post(endpoint)
            .bearer_auth(&self.key)
            .header("apikey", &self.key)
            .header(CACHE_CONTROL, UPLOAD_CACHE_CONTROL)
            .header("x-upsert", "false")
            .body(bytes)
            .send()
            .await?;
        into_json(response).await
    }

    /// Compute the public URL for an object inside a bucket folder.
    pub fn public_url(&self, bucket: &str, folder: &str, object: &str) -> String {
        let base = self.base.as_str().trim_end_matches('/');
        format!("{base}/storage/v1/object/public/{bucket}/{folder}/{object}")
    }

    fn endpoint(&self, path: &str) -> Result<Url, StorageError> {
        Ok(self.base.join(path)?)
    }
}

/// Object key for an uploaded file: the `public/` prefix plus the file
/// name, directories stripped.
fn object_path(file_path: &str) -> String {
    let name = std::path::Path::new(file_path)
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| file_path.to_string());
    format!("{UPLOAD_PREFIX}/{name}")
}

async fn into_json(response: reqwest::Response) -> Result<JsonValue, StorageError> {
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(StorageError::Api { status, body });
    }
    Ok(response.json().await?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    static ENV_LOCK: Mutex<()> = Mutex::new(());

    fn client() -> StorageClient {
        StorageClient::new(&StorageConfig {
            url: "https://project.supabase.co".to_string(),
            key: "service-key".to_string(),
        })
        .unwrap()
    }

    #[test]
    fn test_object_path_strips_directories() {
        assert_eq!(object_path("/tmp/images/cat.png"), "public/cat.png");
        assert_eq!(object_path("cat.png"), "public/cat.png");
    }

    #[test]
    fn test_public_url_layout() {
        let url = client().public_url(DEFAULT_BUCKET, DEFAULT_FOLDER, "cat.png");
        assert_eq!(
            url,
            "https://project.supabase.co/storage/v1/object/public/meme_basket/basket_images_meme/cat.png"
        );
    }

    #[test]
    fn test_config_from_env_lists_missing_keys() {
        let _guard = ENV_LOCK.lock().unwrap();
        unsafe {
            std::env::remove_var("SUPABASE_URL");
            std::env::set_var("SUPABASE_KEY", "key");
        }

        let err = StorageConfig::from_env().unwrap_err();
        assert!(err.to_string().contains("SUPABASE_URL"));
        assert!(!err.to_string().contains("SUPABASE_KEY"));
    }

    #[test]
    fn test_config_debug_redacts_key() {
        let config = StorageConfig {
            url: "https://project.supabase.co".to_string(),
            key: "service-key".to_string(),
        };
        let rendered = format!("{config:?}");
        assert!(!rendered.contains("service-key"));
    }
}
