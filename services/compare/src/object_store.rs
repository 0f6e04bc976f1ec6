use crate::config::S3Config;
use anyhow::Result;
use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_sdk_s3::config::Builder as S3ConfigBuilder;
use aws_sdk_s3::error::DisplayErrorContext;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client as S3Client;
use chrono::{DateTime, Utc};
use thiserror::Error;
use tracing::{debug, error, info, instrument};

/// Suffix appended to every generated template object key
pub const TEMPLATE_KEY_SUFFIX: &str = ".jpg";

/// Errors returned by the object store
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Failed to write object {bucket}/{key}: {message}")]
    Put {
        bucket: String,
        key: String,
        message: String,
    },

    #[error("Failed to list objects in {bucket}: {message}")]
    List { bucket: String, message: String },
}

/// Put/list access to a bucketed object store
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Write `body` as a new object, replacing any object with the same key
    async fn put_object(&self, bucket: &str, key: &str, body: Vec<u8>) -> Result<(), StoreError>;

    /// List every object key in `bucket`, in store order
    async fn list_objects(&self, bucket: &str) -> Result<Vec<String>, StoreError>;
}

/// Generate a template object key from a timestamp.
/// Format: {unix_millis}.jpg
///
/// Keys are only unique to the millisecond; two uploads within the same
/// millisecond share a key and the later write wins.
pub fn generate_object_key(now: DateTime<Utc>) -> String {
    format!("{}{}", now.timestamp_millis(), TEMPLATE_KEY_SUFFIX)
}

/// S3-backed object store
pub struct S3ObjectStore {
    client: S3Client,
}

impl S3ObjectStore {
    /// Create a new S3 object store client
    pub async fn new(config: &S3Config) -> Result<Self> {
        let aws_config = aws_config::defaults(BehaviorVersion::latest())
            .region(aws_config::Region::new(config.region.clone()))
            .load()
            .await;

        let mut s3_config_builder = S3ConfigBuilder::from(&aws_config);

        // Configure custom endpoint for MinIO/LocalStack
        if let Some(ref endpoint_url) = config.endpoint_url {
            s3_config_builder = s3_config_builder.endpoint_url(endpoint_url);
        }

        // Force path-style access for MinIO compatibility
        if config.force_path_style {
            s3_config_builder = s3_config_builder.force_path_style(true);
        }

        let client = S3Client::from_conf(s3_config_builder.build());

        info!(
            bucket = %config.bucket,
            region = %config.region,
            "S3 object store initialized"
        );

        Ok(Self::from_client(client))
    }

    /// Wrap an already configured S3 client
    pub fn from_client(client: S3Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ObjectStore for S3ObjectStore {
    #[instrument(skip(self, body), fields(size_bytes = body.len()))]
    async fn put_object(&self, bucket: &str, key: &str, body: Vec<u8>) -> Result<(), StoreError> {
        let content_type = get_content_type(key);

        self.client
            .put_object()
            .bucket(bucket)
            .key(key)
            .body(ByteStream::from(body))
            .content_type(content_type)
            .send()
            .await
            .map_err(|e| {
                let message = DisplayErrorContext(&e).to_string();
                error!(error = %message, "S3 put_object failed");
                StoreError::Put {
                    bucket: bucket.to_string(),
                    key: key.to_string(),
                    message,
                }
            })?;

        debug!("Object written to S3");
        Ok(())
    }

    #[instrument(skip(self))]
    async fn list_objects(&self, bucket: &str) -> Result<Vec<String>, StoreError> {
        let mut keys = Vec::new();
        let mut continuation_token: Option<String> = None;

        loop {
            let response = self
                .client
                .list_objects_v2()
                .bucket(bucket)
                .set_continuation_token(continuation_token.take())
                .send()
                .await
                .map_err(|e| {
                    let message = DisplayErrorContext(&e).to_string();
                    error!(error = %message, "S3 list_objects_v2 failed");
                    StoreError::List {
                        bucket: bucket.to_string(),
                        message,
                    }
                })?;

            keys.extend(
                response
                    .contents()
                    .iter()
                    .filter_map(|obj| obj.key().map(String::from)),
            );

            match response.next_continuation_token() {
                Some(token) => continuation_token = Some(token.to_string()),
                None => break,
            }
        }

        debug!(count = keys.len(), "Listed objects");
        Ok(keys)
    }
}

/// Get content type from an object key's extension
fn get_content_type(key: &str) -> &'static str {
    let extension = key.rsplit_once('.').map(|(_, ext)| ext.to_lowercase());
    match extension.as_deref() {
        Some("jpeg" | "jpg") => "image/jpeg",
        Some("png") => "image/png",
        Some("webp") => "image/webp",
        Some("bmp") => "image/bmp",
        Some("gif") => "image/gif",
        _ => "application/octet-stream",
    }
}
