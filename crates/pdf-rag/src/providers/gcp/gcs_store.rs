//! Google Cloud Storage object store
//!
//! Reads source documents from a GCS bucket using application default credentials.

use async_trait::async_trait;
use bytes::Bytes;

use google_cloud_storage::client::{Client as GcsClient, ClientConfig};
use google_cloud_storage::http::objects::download::Range;
use google_cloud_storage::http::objects::get::GetObjectRequest;
use google_cloud_storage::http::objects::list::ListObjectsRequest;
use google_cloud_storage::http::Error as GcsError;

use crate::error::{Error, Result};
use crate::providers::object_store::ObjectStore;

/// Google Cloud Storage object store
pub struct GcsObjectStore {
    client: GcsClient,
    bucket: String,
}

impl GcsObjectStore {
    /// Create a new GCS object store for `bucket`
    pub async fn new(bucket: impl Into<String>) -> Result<Self> {
        let config = ClientConfig::default()
            .with_auth()
            .await
            .map_err(|e| Error::Config(format!("Failed to create GCS client: {}", e)))?;

        Ok(Self {
            client: GcsClient::new(config),
            bucket: bucket.into(),
        })
    }
}

fn classify(err: GcsError, what: &str) -> Error {
    match err {
        GcsError::Response(resp) => match resp.code {
            404 => Error::NotFound(what.to_string()),
            401 | 403 => Error::PermissionDenied(format!("Access denied to {}", what)),
            408 | 429 | 500..=599 => {
                Error::Transient(format!("{} returned HTTP {}: {}", what, resp.code, resp.message))
            }
            code => Error::Internal(format!("Unexpected HTTP {} for {}: {}", code, what, resp.message)),
        },
        other => Error::Transient(format!("Request for {} failed: {}", what, other)),
    }
}

#[async_trait]
impl ObjectStore for GcsObjectStore {
    async fn get_object(&self, key: &str) -> Result<Bytes> {
        let what = format!("gs://{}/{}", self.bucket, key);
        self.client
            .download_object(
                &GetObjectRequest {
                    bucket: self.bucket.clone(),
                    object: key.to_string(),
                    ..Default::default()
                },
                &Range::default(),
            )
            .await
            .map(Bytes::from)
            .map_err(|e| classify(e, &what))
    }

    async fn list_objects(&self) -> Result<Vec<String>> {
        let what = format!("bucket {}", self.bucket);
        let mut keys = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let response = self
                .client
                .list_objects(&ListObjectsRequest {
                    bucket: self.bucket.clone(),
                    page_token: page_token.clone(),
                    ..Default::default()
                })
                .await
                .map_err(|e| classify(e, &what))?;

            keys.extend(response.items.unwrap_or_default().into_iter().map(|o| o.name));

            match response.next_page_token {
                Some(token) => page_token = Some(token),
                None => break,
            }
        }

        Ok(keys)
    }

    fn bucket(&self) -> &str {
        &self.bucket
    }

    fn name(&self) -> &str {
        "gcs"
    }
}
