//! Object storage seam
//!
//! The pipeline depends only on this trait; S3 is one implementation
//! behind it, and tests substitute an in-memory store.

use crate::error::Result;
use async_trait::async_trait;
use bytes::Bytes;

pub mod s3;

pub use s3::S3ObjectStore;

/// Download/upload access to an object store, addressed by opaque
/// bucket/key strings.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Fetch the full contents of an object.
    async fn download(&self, bucket: &str, key: &str) -> Result<Bytes>;

    /// Write an object, overwriting any previous version under the same key.
    async fn upload(&self, bucket: &str, key: &str, data: Bytes, content_type: &str)
        -> Result<()>;
}
