//! Persisted vector index over document chunks
//!
//! On disk an index is a directory with two files:
//! - `index.bin`: bincode-encoded `(chunk, embedding)` records
//! - `manifest.json`: format version, embedding model, dimensions, chunk
//!   count and the SHA-256 of `index.bin`
//!
//! The manifest is written last and removed first, so an interrupted build
//! or clear never leaves something `load` accepts.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::HashSet;
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::providers::EmbeddingProvider;
use crate::types::Chunk;

const DATA_FILE: &str = "index.bin";
const MANIFEST_FILE: &str = "manifest.json";
const FORMAT_VERSION: u32 = 1;
const EMBED_BATCH_SIZE: usize = 32;

/// A chunk with its embedding
#[derive(Debug, Clone, Serialize, Deserialize)]
struct IndexRecord {
    chunk: Chunk,
    embedding: Vec<f32>,
}

/// Metadata describing a persisted index
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexManifest {
    pub format_version: u32,
    pub embedding_model: String,
    pub dimensions: usize,
    pub chunk_count: usize,
    /// Hex SHA-256 of the data file
    pub checksum: String,
    pub created_at: DateTime<Utc>,
}

/// Search result with chunk and similarity
#[derive(Debug, Clone)]
pub struct SearchResult {
    /// The retrieved chunk
    pub chunk: Chunk,
    /// Cosine similarity (higher is more similar)
    pub similarity: f32,
}

/// In-memory vector index, immutable once built or loaded
#[derive(Debug, Clone)]
pub struct VectorIndex {
    records: Vec<IndexRecord>,
    dimensions: usize,
    embedding_model: String,
}

impl VectorIndex {
    fn new(records: Vec<IndexRecord>, dimensions: usize, embedding_model: String) -> Self {
        Self {
            records,
            dimensions,
            embedding_model,
        }
    }

    /// Return the `k` chunks most similar to `embedding`
    ///
    /// Results are ranked by descending cosine similarity; equal scores keep
    /// insertion order.
    pub fn query(&self, embedding: &[f32], k: usize) -> Result<Vec<SearchResult>> {
        if embedding.len() != self.dimensions {
            return Err(Error::InvalidInput(format!(
                "Query embedding has {} dimensions, index expects {}",
                embedding.len(),
                self.dimensions
            )));
        }

        let mut scored: Vec<(usize, f32)> = self
            .records
            .iter()
            .enumerate()
            .map(|(i, r)| (i, cosine_similarity(embedding, &r.embedding)))
            .collect();

        // stable sort keeps ties in insertion order
        scored.sort_by(|a, b| b.1.total_cmp(&a.1));
        scored.truncate(k);

        Ok(scored
            .into_iter()
            .map(|(i, similarity)| SearchResult {
                chunk: self.records[i].chunk.clone(),
                similarity,
            })
            .collect())
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn dimensions(&self) -> usize {
        self.dimensions
    }

    pub fn embedding_model(&self) -> &str {
        &self.embedding_model
    }

    /// Number of distinct source documents
    pub fn document_count(&self) -> usize {
        self.records
            .iter()
            .map(|r| r.chunk.source.as_str())
            .collect::<HashSet<_>>()
            .len()
    }
}

fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let (mut dot, mut norm_a, mut norm_b) = (0.0f32, 0.0f32, 0.0f32);
    for (x, y) in a.iter().zip(b) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a.sqrt() * norm_b.sqrt())
}

/// Owns the persisted index directory
///
/// The only component that creates or deletes persisted index data.
#[derive(Debug, Clone)]
pub struct IndexManager {
    index_dir: PathBuf,
}

impl IndexManager {
    /// Create a manager for the given directory
    pub fn new(index_dir: impl Into<PathBuf>) -> Self {
        Self {
            index_dir: index_dir.into(),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.index_dir
    }

    fn data_path(&self) -> PathBuf {
        self.index_dir.join(DATA_FILE)
    }

    fn manifest_path(&self) -> PathBuf {
        self.index_dir.join(MANIFEST_FILE)
    }

    /// Whether a complete persisted index is present
    pub async fn exists(&self) -> bool {
        tokio::fs::metadata(self.manifest_path())
            .await
            .map(|m| m.is_file())
            .unwrap_or(false)
    }

    /// Embed every chunk and persist the resulting index
    pub async fn build(&self, chunks: Vec<Chunk>, embedder: &dyn EmbeddingProvider) -> Result<VectorIndex> {
        if chunks.is_empty() {
            return Err(Error::EmptyInput);
        }

        tracing::info!(
            "Embedding {} chunk(s) with {}",
            chunks.len(),
            embedder.model()
        );

        let mut embeddings = Vec::with_capacity(chunks.len());
        for batch in chunks.chunks(EMBED_BATCH_SIZE) {
            let texts: Vec<String> = batch.iter().map(|c| c.text.clone()).collect();
            embeddings.extend(embedder.embed_batch(&texts).await?);
            tracing::debug!("Embedded {}/{} chunk(s)", embeddings.len(), chunks.len());
        }

        if embeddings.len() != chunks.len() {
            return Err(Error::embedding(format!(
                "Expected {} embeddings, got {}",
                chunks.len(),
                embeddings.len()
            )));
        }

        let dimensions = embeddings.first().map(Vec::len).unwrap_or(0);
        if dimensions == 0 || embeddings.iter().any(|e| e.len() != dimensions) {
            return Err(Error::embedding("Embeddings have inconsistent dimensions"));
        }

        let records: Vec<IndexRecord> = chunks
            .into_iter()
            .zip(embeddings)
            .map(|(chunk, embedding)| IndexRecord { chunk, embedding })
            .collect();

        let data = bincode::serde::encode_to_vec(&records, bincode::config::standard())
            .map_err(|e| Error::storage(format!("Failed to encode index: {}", e)))?;

        let manifest = IndexManifest {
            format_version: FORMAT_VERSION,
            embedding_model: embedder.model().to_string(),
            dimensions,
            chunk_count: records.len(),
            checksum: hex::encode(Sha256::digest(&data)),
            created_at: Utc::now(),
        };

        let manager = self.clone();
        let written = manifest.clone();
        tokio::task::spawn_blocking(move || manager.persist(&data, &written))
            .await
            .map_err(|e| Error::internal(format!("Index write task failed: {}", e)))??;

        tracing::info!(
            "Persisted index with {} chunk(s), {} dimensions to {}",
            manifest.chunk_count,
            dimensions,
            self.index_dir.display()
        );

        Ok(VectorIndex::new(records, dimensions, manifest.embedding_model))
    }

    fn persist(&self, data: &[u8], manifest: &IndexManifest) -> Result<()> {
        let storage = |e: std::io::Error| Error::storage(format!("{}: {}", self.index_dir.display(), e));

        std::fs::create_dir_all(&self.index_dir).map_err(storage)?;
        match std::fs::remove_file(self.manifest_path()) {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(storage(e)),
        }

        write_atomic(&self.index_dir, &self.data_path(), data).map_err(storage)?;

        let manifest_json = serde_json::to_vec_pretty(manifest)?;
        write_atomic(&self.index_dir, &self.manifest_path(), &manifest_json).map_err(storage)?;
        Ok(())
    }

    /// Read the persisted index back into memory
    ///
    /// Fails with `Error::NotFound` when there is no complete index and with
    /// `Error::Storage` when the data does not match its manifest or was
    /// built with a different embedding model.
    pub async fn load(&self, embedder: &dyn EmbeddingProvider) -> Result<VectorIndex> {
        let manager = self.clone();
        let (manifest, records) = tokio::task::spawn_blocking(move || manager.read())
            .await
            .map_err(|e| Error::internal(format!("Index read task failed: {}", e)))??;

        if manifest.embedding_model != embedder.model() {
            return Err(Error::storage(format!(
                "Index was built with {}, configured embedding model is {}",
                manifest.embedding_model,
                embedder.model()
            )));
        }

        tracing::info!(
            "Loaded index with {} chunk(s) from {}",
            records.len(),
            self.index_dir.display()
        );
        Ok(VectorIndex::new(records, manifest.dimensions, manifest.embedding_model))
    }

    fn read(&self) -> Result<(IndexManifest, Vec<IndexRecord>)> {
        let manifest_raw = match std::fs::read(self.manifest_path()) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(Error::NotFound(format!(
                    "No persisted index in {}",
                    self.index_dir.display()
                )));
            }
            Err(e) => return Err(Error::storage(e.to_string())),
        };

        let manifest: IndexManifest = serde_json::from_slice(&manifest_raw)
            .map_err(|e| Error::storage(format!("Unreadable index manifest: {}", e)))?;
        if manifest.format_version != FORMAT_VERSION {
            return Err(Error::storage(format!(
                "Unsupported index format version {}",
                manifest.format_version
            )));
        }

        let data = std::fs::read(self.data_path())
            .map_err(|e| Error::storage(format!("Index data unreadable: {}", e)))?;
        if hex::encode(Sha256::digest(&data)) != manifest.checksum {
            return Err(Error::storage("Index data does not match its manifest checksum"));
        }

        let (records, _): (Vec<IndexRecord>, usize) =
            bincode::serde::decode_from_slice(&data, bincode::config::standard())
                .map_err(|e| Error::storage(format!("Failed to decode index: {}", e)))?;

        if records.len() != manifest.chunk_count {
            return Err(Error::storage(format!(
                "Index holds {} chunk(s), manifest expects {}",
                records.len(),
                manifest.chunk_count
            )));
        }
        if records.iter().any(|r| r.embedding.len() != manifest.dimensions) {
            return Err(Error::storage("Index embeddings do not match manifest dimensions"));
        }

        Ok((manifest, records))
    }

    /// Delete the persisted index; a no-op when nothing exists
    pub async fn clear(&self) -> Result<()> {
        let manager = self.clone();
        tokio::task::spawn_blocking(move || manager.remove_all())
            .await
            .map_err(|e| Error::internal(format!("Index clear task failed: {}", e)))?
    }

    fn remove_all(&self) -> Result<()> {
        match std::fs::remove_file(self.manifest_path()) {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(Error::storage(e.to_string())),
        }
        match std::fs::remove_dir_all(&self.index_dir) {
            Ok(()) => {
                tracing::info!("Cleared persisted index at {}", self.index_dir.display());
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(Error::storage(e.to_string())),
        }
    }
}

/// Write through a temp file in the same directory, then rename into place
fn write_atomic(dir: &Path, target: &Path, data: &[u8]) -> std::io::Result<()> {
    let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
    tmp.write_all(data)?;
    tmp.as_file().sync_all()?;
    tmp.persist(target).map_err(|e| e.error)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::HashEmbedder;
    use tempfile::TempDir;

    fn sample_chunks() -> Vec<Chunk> {
        vec![
            Chunk::new("the cat sat on the mat", "pets.pdf", 1, 0, 0),
            Chunk::new("quarterly revenue grew by ten percent", "report.pdf", 1, 0, 0),
            Chunk::new("install the package with cargo", "manual.pdf", 2, 1, 120),
            Chunk::new("the dog chased the ball", "pets.pdf", 2, 1, 0),
        ]
    }

    #[tokio::test]
    async fn test_build_then_load_self_match() {
        let dir = TempDir::new().unwrap();
        let manager = IndexManager::new(dir.path().join("index"));
        let embedder = HashEmbedder::new(64);

        let built = manager.build(sample_chunks(), &embedder).await.unwrap();
        assert_eq!(built.len(), 4);
        assert!(manager.exists().await);

        let loaded = manager.load(&embedder).await.unwrap();
        assert_eq!(loaded.len(), 4);
        assert!(!loaded.is_empty());
        assert_eq!(loaded.dimensions(), 64);
        assert_eq!(loaded.embedding_model(), "hash-embedder");
        assert_eq!(loaded.document_count(), 3);

        for chunk in sample_chunks() {
            let query = embedder.embed(&chunk.text).await.unwrap();
            let results = loaded.query(&query, 3).unwrap();
            assert_eq!(results[0].chunk, chunk);
            assert!((results[0].similarity - 1.0).abs() < 1e-5);
        }
    }

    #[tokio::test]
    async fn test_empty_input_rejected() {
        let dir = TempDir::new().unwrap();
        let manager = IndexManager::new(dir.path().join("index"));
        let result = manager.build(Vec::new(), &HashEmbedder::new(8)).await;
        assert!(matches!(result, Err(Error::EmptyInput)));
        assert!(!manager.exists().await);
    }

    #[tokio::test]
    async fn test_load_without_index_is_not_found() {
        let dir = TempDir::new().unwrap();
        let manager = IndexManager::new(dir.path().join("index"));
        let result = manager.load(&HashEmbedder::new(8)).await;
        assert!(matches!(result, Err(Error::NotFound(_))));
    }

    #[tokio::test]
    async fn test_partial_write_is_not_loadable() {
        let dir = TempDir::new().unwrap();
        let manager = IndexManager::new(dir.path().join("index"));
        let embedder = HashEmbedder::new(16);
        manager.build(sample_chunks(), &embedder).await.unwrap();

        // data file present, manifest never written
        std::fs::remove_file(dir.path().join("index").join(MANIFEST_FILE)).unwrap();
        assert!(matches!(manager.load(&embedder).await, Err(Error::NotFound(_))));
    }

    #[tokio::test]
    async fn test_corrupted_data_is_storage_error() {
        let dir = TempDir::new().unwrap();
        let manager = IndexManager::new(dir.path().join("index"));
        let embedder = HashEmbedder::new(16);
        manager.build(sample_chunks(), &embedder).await.unwrap();

        std::fs::write(dir.path().join("index").join(DATA_FILE), b"truncated").unwrap();
        assert!(matches!(manager.load(&embedder).await, Err(Error::Storage(_))));
    }

    #[tokio::test]
    async fn test_different_embedding_model_is_rejected() {
        let dir = TempDir::new().unwrap();
        let manager = IndexManager::new(dir.path().join("index"));
        manager.build(sample_chunks(), &HashEmbedder::new(16)).await.unwrap();

        let other = HashEmbedder::new(16).with_model("other-model");
        assert!(matches!(manager.load(&other).await, Err(Error::Storage(_))));
    }

    #[tokio::test]
    async fn test_clear_is_idempotent() {
        let dir = TempDir::new().unwrap();
        let manager = IndexManager::new(dir.path().join("index"));
        manager.build(sample_chunks(), &HashEmbedder::new(8)).await.unwrap();

        manager.clear().await.unwrap();
        assert!(!manager.exists().await);
        manager.clear().await.unwrap();
        assert!(!manager.dir().exists());
    }

    #[test]
    fn test_nan_embeddings_do_not_break_ranking() {
        let records = vec![
            IndexRecord {
                chunk: Chunk::new("broken", "a.pdf", 1, 0, 0),
                embedding: vec![f32::NAN, 1.0],
            },
            IndexRecord {
                chunk: Chunk::new("aligned", "a.pdf", 1, 1, 0),
                embedding: vec![1.0, 0.0],
            },
            IndexRecord {
                chunk: Chunk::new("orthogonal", "a.pdf", 1, 2, 0),
                embedding: vec![0.0, 1.0],
            },
        ];
        let index = VectorIndex::new(records, 2, "m".into());

        let results = index.query(&[1.0, 0.0], 3).unwrap();
        assert_eq!(results.len(), 3);
        let finite: Vec<&str> = results
            .iter()
            .filter(|r| !r.similarity.is_nan())
            .map(|r| r.chunk.text.as_str())
            .collect();
        assert_eq!(finite, vec!["aligned", "orthogonal"]);
    }

    #[test]
    fn test_ties_keep_insertion_order() {
        let records = (0..4)
            .map(|i| IndexRecord {
                chunk: Chunk::new(format!("chunk {}", i), "same.pdf", 1, i, 0),
                embedding: vec![1.0, 0.0],
            })
            .collect();
        let index = VectorIndex::new(records, 2, "m".into());

        let results = index.query(&[1.0, 0.0], 3).unwrap();
        let order: Vec<u32> = results.iter().map(|r| r.chunk.chunk_index).collect();
        assert_eq!(order, vec![0, 1, 2]);
    }

    #[test]
    fn test_query_dimension_mismatch() {
        let index = VectorIndex::new(Vec::new(), 4, "m".into());
        assert!(matches!(index.query(&[1.0], 3), Err(Error::InvalidInput(_))));
    }

    #[test]
    fn test_cosine_similarity() {
        assert!((cosine_similarity(&[1.0, 0.0], &[2.0, 0.0]) - 1.0).abs() < 1e-6);
        assert!(cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]).abs() < 1e-6);
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 1.0]), 0.0);
    }
}
