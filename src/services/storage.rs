//! S3 storage service for uploaded photographs.
//!
//! Every stored image gets a key with a random suffix so identical filenames
//! never overwrite each other. Supports both AWS S3 and MinIO for development.

use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_sdk_s3::Client;
use aws_sdk_s3::config::{Credentials, Region};
use secrecy::ExposeSecret;
use tracing::info;

use crate::config::StorageSettings;
use crate::error::{AppError, AppResult};

/// Key prefix for all gallery images.
const IMAGE_PREFIX: &str = "animals";

/// Longest filename stem kept in object keys.
const MAX_STEM_LEN: usize = 64;

/// Durable storage for raw image bytes.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Store `data` and return a public URL for it.
    ///
    /// The URL is unique per call even when `filename_hint` repeats.
    /// Exactly one attempt is made.
    async fn store(&self, data: Vec<u8>, filename_hint: &str) -> AppResult<String>;
}

/// S3 storage client wrapper.
#[derive(Clone)]
pub struct Storage {
    client: Client,
    bucket: String,
    public_base_url: String,
}

impl Storage {
    /// Create a new S3 storage client from configuration.
    pub async fn new(config: &StorageSettings) -> AppResult<Self> {
        let credentials = Credentials::new(
            &config.access_key,
            config.secret_key.expose_secret(),
            None,
            None,
            "wildlife-gallery",
        );

        let region = Region::new(config.region.clone());

        let mut s3_config_builder = aws_sdk_s3::Config::builder()
            .behavior_version(BehaviorVersion::latest())
            .region(region)
            .credentials_provider(credentials)
            .force_path_style(true); // Required for MinIO

        if let Some(ref endpoint) = config.endpoint {
            s3_config_builder = s3_config_builder.endpoint_url(endpoint);
        }

        let client = Client::from_conf(s3_config_builder.build());

        let storage = Self {
            client,
            bucket: config.bucket.clone(),
            public_base_url: config.public_base_url(),
        };

        storage.ensure_bucket_exists().await?;

        info!(
            "S3 storage initialized: bucket={}, public_url={}",
            storage.bucket, storage.public_base_url
        );

        Ok(storage)
    }

    /// Ensure the bucket exists, creating it if necessary.
    async fn ensure_bucket_exists(&self) -> AppResult<()> {
        match self.client.head_bucket().bucket(&self.bucket).send().await {
            Ok(_) => Ok(()),
            Err(e) => {
                let service_error = e.into_service_error();
                if service_error.is_not_found() {
                    info!("Creating S3 bucket '{}'", self.bucket);
                    self.client
                        .create_bucket()
                        .bucket(&self.bucket)
                        .send()
                        .await
                        .map_err(|e| {
                            AppError::Storage(format!("Failed to create bucket: {}", e))
                        })?;
                    Ok(())
                } else {
                    Err(AppError::Storage(format!(
                        "Failed to access bucket '{}': {}",
                        self.bucket, service_error
                    )))
                }
            }
        }
    }

    /// Get the content type for an image based on its extension.
    pub fn content_type_for_extension(ext: &str) -> &'static str {
        match ext.to_lowercase().as_str() {
            "png" => "image/png",
            "jpg" | "jpeg" => "image/jpeg",
            "gif" => "image/gif",
            "webp" => "image/webp",
            "avif" => "image/avif",
            "heic" => "image/heic",
            "tif" | "tiff" => "image/tiff",
            "bmp" => "image/bmp",
            _ => "application/octet-stream",
        }
    }

    /// Build a collision-free object key from an uploaded filename.
    ///
    /// Format: `animals/{stem}-{16 hex chars}.{ext}`. The stem keeps only
    /// ASCII alphanumerics, `-` and `_`; path components in the hint are dropped.
    pub fn object_key(filename_hint: &str) -> String {
        let base = filename_hint
            .rsplit(['/', '\\'])
            .next()
            .unwrap_or(filename_hint);

        let (stem, ext) = match base.rsplit_once('.') {
            Some((stem, ext)) if !stem.is_empty() && !ext.is_empty() => (stem, Some(ext)),
            _ => (base, None),
        };

        let mut clean_stem: String = stem
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                    c.to_ascii_lowercase()
                } else {
                    '-'
                }
            })
            .take(MAX_STEM_LEN)
            .collect();
        clean_stem = clean_stem.trim_matches('-').to_string();
        if clean_stem.is_empty() {
            clean_stem = "image".to_string();
        }

        let suffix = hex::encode(rand::random::<[u8; 8]>());

        match ext.map(|e| e.to_ascii_lowercase()) {
            Some(ext) if ext.chars().all(|c| c.is_ascii_alphanumeric()) => {
                format!("{}/{}-{}.{}", IMAGE_PREFIX, clean_stem, suffix, ext)
            }
            _ => format!("{}/{}-{}", IMAGE_PREFIX, clean_stem, suffix),
        }
    }

    /// Public URL for an object key.
    pub fn public_url(&self, key: &str) -> String {
        let encoded: Vec<String> = key
            .split('/')
            .map(|segment| urlencoding::encode(segment).into_owned())
            .collect();
        format!("{}/{}", self.public_base_url, encoded.join("/"))
    }

    /// Upload bytes to S3 under `key`.
    pub async fn put(&self, key: &str, data: Vec<u8>, content_type: Option<&str>) -> AppResult<()> {
        let body = aws_sdk_s3::primitives::ByteStream::from(data);
        let mut request = self
            .client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .body(body);

        if let Some(ct) = content_type {
            request = request.content_type(ct);
        }

        request
            .send()
            .await
            .map_err(|e| AppError::Storage(format!("Failed to upload file to S3: {}", e)))?;

        Ok(())
    }
}

#[async_trait]
impl ObjectStore for Storage {
    async fn store(&self, data: Vec<u8>, filename_hint: &str) -> AppResult<String> {
        let key = Self::object_key(filename_hint);
        let content_type = key
            .rsplit_once('.')
            .map(|(_, ext)| Self::content_type_for_extension(ext));
        let size = data.len();

        self.put(&key, data, content_type).await?;
        info!("Stored {} ({} bytes) as {}", filename_hint, size, key);

        Ok(self.public_url(&key))
    }
}
