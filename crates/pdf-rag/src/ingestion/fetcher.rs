//! Remote fetcher: copies source documents from object storage into the
//! local document directory

use std::path::PathBuf;
use std::sync::Arc;

use crate::error::Result;
use crate::policy::{with_retry, RetryPolicy};
use crate::providers::local::validate_filename;
use crate::providers::{LocalDocumentStore, ObjectStore};
use crate::types::is_pdf_filename;

/// Downloads documents with bounded retries on transient faults
pub struct RemoteFetcher {
    store: Arc<dyn ObjectStore>,
    documents: LocalDocumentStore,
    retry: RetryPolicy,
}

impl RemoteFetcher {
    /// Create a new fetcher writing into `documents`
    pub fn new(store: Arc<dyn ObjectStore>, documents: LocalDocumentStore, retry: RetryPolicy) -> Self {
        Self {
            store,
            documents,
            retry,
        }
    }

    /// Download one object and return its local path
    ///
    /// Nested keys are flattened to their final segment. An existing local
    /// file with the same name is overwritten.
    pub async fn fetch_one(&self, name: &str) -> Result<PathBuf> {
        let local_name = validate_filename(name.rsplit('/').next().unwrap_or(name))?;
        let local_path = self.documents.path_for(local_name)?;

        tracing::info!(
            "Downloading {} from {} bucket {}",
            name,
            self.store.name(),
            self.store.bucket()
        );

        let label = format!("download of {}", name);
        let data = with_retry(&self.retry, &label, || self.store.get_object(name)).await?;

        tokio::fs::write(&local_path, &data).await?;
        tracing::info!("Downloaded {} to {} ({} bytes)", name, local_path.display(), data.len());
        Ok(local_path)
    }

    /// List the PDF objects available remotely
    pub async fn list_available(&self) -> Result<Vec<String>> {
        let label = format!("listing of bucket {}", self.store.bucket());
        let keys = with_retry(&self.retry, &label, || self.store.list_objects()).await?;

        let pdfs: Vec<String> = keys.into_iter().filter(|k| is_pdf_filename(k)).collect();
        tracing::info!("Found {} PDF file(s) in bucket {}", pdfs.len(), self.store.bucket());
        Ok(pdfs)
    }

    /// Download every available PDF, skipping items that fail
    ///
    /// Returns the local paths of the documents that were fetched.
    pub async fn fetch_all(&self) -> Result<Vec<PathBuf>> {
        let names = self.list_available().await?;
        let mut fetched = Vec::with_capacity(names.len());

        for name in &names {
            match self.fetch_one(name).await {
                Ok(path) => fetched.push(path),
                Err(e) => tracing::warn!("Failed to download {}: {}", name, e),
            }
        }

        tracing::info!("Downloaded {}/{} PDF file(s)", fetched.len(), names.len());
        Ok(fetched)
    }
}
