//! Local document store using the filesystem
//!
//! A flat directory of PDF files. Uploads and remote fetches land here and
//! the document processor reads from here.

use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::types::is_pdf_filename;

/// Local document store using filesystem
#[derive(Debug, Clone)]
pub struct LocalDocumentStore {
    /// Directory holding the documents
    storage_dir: PathBuf,
}

impl LocalDocumentStore {
    /// Create a new local document store, creating the directory if needed
    pub fn new(storage_dir: impl Into<PathBuf>) -> Result<Self> {
        let storage_dir = storage_dir.into();
        std::fs::create_dir_all(&storage_dir)?;
        Ok(Self { storage_dir })
    }

    /// Directory the store reads and writes
    pub fn dir(&self) -> &Path {
        &self.storage_dir
    }

    /// Path a document with this name is stored at
    pub fn path_for(&self, filename: &str) -> Result<PathBuf> {
        Ok(self.storage_dir.join(validate_filename(filename)?))
    }

    /// List PDF filenames, sorted
    pub async fn list_pdfs(&self) -> Result<Vec<String>> {
        let dir = self.storage_dir.clone();
        tokio::task::spawn_blocking(move || list_pdfs_in(&dir))
            .await
            .map_err(|e| Error::internal(format!("Listing task failed: {}", e)))?
    }

    /// Store a PDF, overwriting any existing file with the same name
    pub async fn store(&self, filename: &str, data: &[u8]) -> Result<PathBuf> {
        if !is_pdf_filename(filename) {
            return Err(Error::InvalidInput(format!(
                "Only .pdf files are accepted, got '{}'",
                filename
            )));
        }
        if data.is_empty() {
            return Err(Error::InvalidInput(format!("'{}' is empty", filename)));
        }

        let path = self.path_for(filename)?;
        if path.exists() {
            tracing::info!("Overwriting existing document {}", path.display());
        }
        tokio::fs::write(&path, data).await?;
        tracing::info!("Stored {} ({} bytes)", path.display(), data.len());
        Ok(path)
    }
}

/// List the PDF files (regular files only) directly inside `dir`, sorted
///
/// A missing directory yields an empty list.
pub fn list_pdfs_in(dir: &Path) -> Result<Vec<String>> {
    let mut names = Vec::new();
    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(names),
        Err(e) => return Err(e.into()),
    };

    for entry in entries {
        let entry = entry?;
        if !entry.file_type()?.is_file() {
            continue;
        }
        if let Some(name) = entry.file_name().to_str() {
            if is_pdf_filename(name) {
                names.push(name.to_string());
            }
        }
    }

    names.sort();
    Ok(names)
}

/// Reject names that are empty or carry directory components
pub fn validate_filename(filename: &str) -> Result<&str> {
    let trimmed = filename.trim();
    let is_plain = Path::new(trimmed)
        .file_name()
        .and_then(|n| n.to_str())
        .is_some_and(|n| n == trimmed);

    if trimmed.is_empty() || !is_plain || trimmed.contains(['/', '\\']) {
        return Err(Error::InvalidInput(format!("Invalid document name '{}'", filename)));
    }
    Ok(trimmed)
}
