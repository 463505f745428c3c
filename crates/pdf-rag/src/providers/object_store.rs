//! Object store provider trait for retrieving source documents

use async_trait::async_trait;
use bytes::Bytes;
use crate::error::Result;

/// Trait for remote object storage holding source documents
///
/// Error contract:
/// - `Error::NotFound` when the object (or bucket) does not exist
/// - `Error::PermissionDenied` on authorization failure
/// - `Error::Transient` for network and service faults
///
/// Implementations:
/// - `HttpObjectStore`: S3-compatible REST endpoint
/// - `GcsObjectStore`: Google Cloud Storage (feature `gcp`)
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Download an object's content
    async fn get_object(&self, key: &str) -> Result<Bytes>;

    /// List every object key in the bucket
    async fn list_objects(&self) -> Result<Vec<String>>;

    /// Bucket the store points at
    fn bucket(&self) -> &str;

    /// Get provider name for logging
    fn name(&self) -> &str;
}
