//! Abstractions over S3-compatible storage backends used to publish the dated title artifact.

use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_credential_types::provider::SharedCredentialsProvider;
use aws_credential_types::Credentials;
use aws_sdk_s3::config::Region;
use aws_sdk_s3::error::SdkError;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client;
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Clone)]
pub struct S3Config {
    pub bucket: String,
    pub region: String,
    pub endpoint: Option<String>,
    pub access_key_id: Option<String>,
    pub secret_access_key: Option<String>,
    pub force_path_style: bool,
}

impl Default for S3Config {
    fn default() -> Self {
        Self {
            bucket: "imdb-sql".to_string(),
            region: "us-east-1".to_string(),
            endpoint: None,
            access_key_id: None,
            secret_access_key: None,
            force_path_style: false,
        }
    }
}

#[derive(Debug, Error)]
pub enum BucketError {
    #[error("configuration error: {0}")]
    Configuration(String),
    #[error("sdk error: {0}")]
    Sdk(String),
    #[error("failed to read {path}: {message}")]
    Io { path: PathBuf, message: String },
}

impl BucketError {
    fn from_sdk(err: impl fmt::Display) -> Self {
        Self::Sdk(err.to_string())
    }
}

/// The two operations the publisher needs: a presence probe and a file upload.
#[async_trait]
pub trait BucketStore: Send + Sync {
    fn bucket(&self) -> &str;

    /// `Ok(false)` only when the backend reports the key as not found; any other
    /// failure is returned as an error.
    async fn object_exists(&self, key: &str) -> Result<bool, BucketError>;

    async fn upload_file(&self, key: &str, path: &Path) -> Result<(), BucketError>;
}

#[derive(Clone)]
pub struct S3BucketStore {
    client: Client,
    bucket: String,
}

impl S3BucketStore {
    pub async fn new(config: S3Config) -> Result<Self, BucketError> {
        if config.bucket.is_empty() {
            return Err(BucketError::Configuration(
                "bucket name cannot be empty".into(),
            ));
        }

        let mut loader = aws_config::defaults(BehaviorVersion::latest())
            .region(Region::new(config.region.clone()));

        if let (Some(access_key), Some(secret_key)) =
            (&config.access_key_id, &config.secret_access_key)
        {
            let credentials = Credentials::new(access_key, secret_key, None, None, "static");
            loader = loader.credentials_provider(SharedCredentialsProvider::new(credentials));
        }

        let shared_config = loader.load().await;
        let mut builder = aws_sdk_s3::config::Builder::from(&shared_config);

        if let Some(endpoint) = &config.endpoint {
            builder = builder.endpoint_url(endpoint);
        }

        if config.force_path_style {
            builder = builder.force_path_style(true);
        }

        let client = Client::from_conf(builder.build());
        Ok(Self {
            client,
            bucket: config.bucket,
        })
    }
}

#[async_trait]
impl BucketStore for S3BucketStore {
    fn bucket(&self) -> &str {
        &self.bucket
    }

    async fn object_exists(&self, key: &str) -> Result<bool, BucketError> {
        let outcome = self
            .client
            .head_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await;

        match outcome {
            Ok(_) => Ok(true),
            Err(SdkError::ServiceError(service_err))
                if service_err.err().is_not_found()
                    || service_err.raw().status().as_u16() == 404 =>
            {
                debug!(bucket = %self.bucket, key, "head_object reported not found");
                Ok(false)
            }
            Err(other) => Err(BucketError::from_sdk(other)),
        }
    }

    async fn upload_file(&self, key: &str, path: &Path) -> Result<(), BucketError> {
        let body = ByteStream::from_path(path)
            .await
            .map_err(|err| BucketError::Io {
                path: path.to_path_buf(),
                message: err.to_string(),
            })?;

        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .body(body)
            .content_type("application/vnd.apache.parquet")
            .send()
            .await
            .map_err(BucketError::from_sdk)?;
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadRecord {
    pub bucket: String,
    pub key: String,
    pub path: PathBuf,
}

/// Bucket held in process memory. Records every call so callers can assert on
/// what the publisher did.
#[derive(Debug, Default)]
pub struct InMemoryBucketStore {
    bucket: String,
    objects: Mutex<HashMap<String, Vec<u8>>>,
    uploads: Mutex<Vec<UploadRecord>>,
    probes: Mutex<Vec<String>>,
    probe_error: Option<String>,
}

impl InMemoryBucketStore {
    pub fn new(bucket: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            ..Self::default()
        }
    }

    pub fn with_object(self, key: impl Into<String>, contents: impl Into<Vec<u8>>) -> Self {
        self.lock_objects().insert(key.into(), contents.into());
        self
    }

    /// Every subsequent probe fails with an sdk error carrying `message`.
    pub fn with_probe_error(mut self, message: impl Into<String>) -> Self {
        self.probe_error = Some(message.into());
        self
    }

    pub fn uploads(&self) -> Vec<UploadRecord> {
        self.uploads
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    pub fn probes(&self) -> Vec<String> {
        self.probes
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    pub fn object(&self, key: &str) -> Option<Vec<u8>> {
        self.lock_objects().get(key).cloned()
    }

    fn lock_objects(&self) -> std::sync::MutexGuard<'_, HashMap<String, Vec<u8>>> {
        self.objects
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl BucketStore for InMemoryBucketStore {
    fn bucket(&self) -> &str {
        &self.bucket
    }

    async fn object_exists(&self, key: &str) -> Result<bool, BucketError> {
        self.probes
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(key.to_string());

        if let Some(message) = &self.probe_error {
            return Err(BucketError::Sdk(message.clone()));
        }
        Ok(self.lock_objects().contains_key(key))
    }

    async fn upload_file(&self, key: &str, path: &Path) -> Result<(), BucketError> {
        let contents = std::fs::read(path).map_err(|err| BucketError::Io {
            path: path.to_path_buf(),
            message: err.to_string(),
        })?;

        self.lock_objects().insert(key.to_string(), contents);
        self.uploads
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(UploadRecord {
                bucket: self.bucket.clone(),
                key: key.to_string(),
                path: path.to_path_buf(),
            });
        Ok(())
    }
}
