//! Object store backed by AWS S3 or an S3-compatible service.

use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_sdk_s3::config::StalledStreamProtectionConfig;
use aws_sdk_s3::operation::get_object::GetObjectError;
use aws_sdk_s3::primitives::ByteStream;

use crate::{ObjectStore, StorageError};

/// Client for one S3 bucket.
pub struct S3Store {
    client: aws_sdk_s3::Client,
    bucket: String,
}

impl S3Store {
    /// Wraps an existing SDK client.
    #[must_use]
    pub fn new(client: aws_sdk_s3::Client, bucket: impl Into<String>) -> Self {
        Self {
            client,
            bucket: bucket.into(),
        }
    }

    /// Creates a client for `bucket` from the standard AWS environment.
    ///
    /// If `S3_ENDPOINT_URL` is set, requests go to that endpoint with
    /// path-style addressing (MinIO, R2, localstack, ...).
    pub async fn from_env(bucket: impl Into<String>) -> Self {
        let shared = aws_config::defaults(BehaviorVersion::latest()).load().await;

        let mut builder = aws_sdk_s3::config::Builder::from(&shared)
            .stalled_stream_protection(StalledStreamProtectionConfig::disabled());

        if let Ok(endpoint) = std::env::var("S3_ENDPOINT_URL")
            && !endpoint.is_empty()
        {
            log::info!("Using S3 endpoint {endpoint}");
            builder = builder.endpoint_url(endpoint).force_path_style(true);
        }

        Self::new(aws_sdk_s3::Client::from_conf(builder.build()), bucket)
    }
}

#[async_trait]
impl ObjectStore for S3Store {
    fn location(&self, key: &str) -> String {
        format!("s3://{}/{key}", self.bucket)
    }

    async fn put(&self, key: &str, body: Vec<u8>, content_type: &str) -> Result<(), StorageError> {
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .body(ByteStream::from(body))
            .content_type(content_type)
            .send()
            .await
            .map_err(|e| StorageError::Put {
                location: self.location(key),
                source: Box::new(e),
            })?;

        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StorageError> {
        let result = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await;

        let output = match result {
            Ok(output) => output,
            Err(err) => {
                // NoSuchKey is not an error, the object just doesn't exist
                if err
                    .as_service_error()
                    .is_some_and(GetObjectError::is_no_such_key)
                {
                    return Ok(None);
                }
                return Err(StorageError::Get {
                    location: self.location(key),
                    source: Box::new(err),
                });
            }
        };

        let bytes = output.body.collect().await.map_err(|e| StorageError::Get {
            location: self.location(key),
            source: Box::new(e),
        })?;

        Ok(Some(bytes.into_bytes().to_vec()))
    }
}
