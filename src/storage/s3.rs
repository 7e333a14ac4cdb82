//! S3-backed object store
//!
//! Transfers are fully in-memory; no temp files are written at any point
//! of a transfer.

use crate::error::{Result, WorkerError};
use crate::storage::ObjectStore;
use async_trait::async_trait;
use aws_sdk_s3::error::SdkError;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client;
use bytes::Bytes;
use tracing::debug;

pub struct S3ObjectStore {
    client: Client,
}

impl S3ObjectStore {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ObjectStore for S3ObjectStore {
    async fn download(&self, bucket: &str, key: &str) -> Result<Bytes> {
        debug!(bucket, key, "downloading object");

        let output = self
            .client
            .get_object()
            .bucket(bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| match e {
                SdkError::ServiceError(se) if se.err().is_no_such_key() => {
                    WorkerError::ObjectNotFound(format!("{bucket}/{key}"))
                }
                SdkError::ServiceError(se) => WorkerError::StoreUnavailable(se.err().to_string()),
                other => WorkerError::StoreUnavailable(other.to_string()),
            })?;

        let bytes = output
            .body
            .collect()
            .await
            .map_err(|e| WorkerError::StoreUnavailable(format!("failed to read object body: {e}")))?
            .into_bytes();

        debug!(bucket, key, size = bytes.len(), "downloaded object");
        Ok(bytes)
    }

    async fn upload(
        &self,
        bucket: &str,
        key: &str,
        data: Bytes,
        content_type: &str,
    ) -> Result<()> {
        debug!(bucket, key, size = data.len(), "uploading object");

        self.client
            .put_object()
            .bucket(bucket)
            .key(key)
            .content_type(content_type)
            .body(ByteStream::from(data))
            .send()
            .await
            .map_err(|e| match e {
                SdkError::ServiceError(se) => WorkerError::UploadRejected(se.err().to_string()),
                other => WorkerError::StoreUnavailable(other.to_string()),
            })?;

        debug!(bucket, key, "uploaded object");
        Ok(())
    }
}
