//! Document processor: PDF files in, chunks with source metadata out

use std::path::Path;

use crate::config::ChunkingConfig;
use crate::error::{Error, Result};
use crate::providers::local::list_pdfs_in;
use crate::types::Chunk;

use super::parser::PdfParser;
use super::splitter::TextSplitter;

/// Loads PDF files and splits them into overlapping chunks
#[derive(Debug, Clone)]
pub struct DocumentProcessor {
    splitter: TextSplitter,
}

impl DocumentProcessor {
    /// Create a processor around an existing splitter
    pub fn new(splitter: TextSplitter) -> Self {
        Self { splitter }
    }

    /// Create from chunking configuration
    pub fn from_config(config: &ChunkingConfig) -> Result<Self> {
        Ok(Self::new(TextSplitter::from_config(config)?))
    }

    /// Split a single PDF
    ///
    /// Chunks keep document order; `chunk_index` runs across all pages.
    pub fn split_one(&self, path: &Path) -> Result<Vec<Chunk>> {
        let filename = path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| Error::processing(path.display().to_string(), "Invalid file name"))?;

        let pages = PdfParser::parse_file(path)?;
        let mut chunks = Vec::new();

        for page in &pages {
            for span in self.splitter.split(&page.text) {
                let index = chunks.len() as u32;
                chunks.push(Chunk::new(span.text, filename, page.number, index, span.offset));
            }
        }

        tracing::debug!(
            "Split {} into {} chunk(s) across {} page(s)",
            filename,
            chunks.len(),
            pages.len()
        );
        Ok(chunks)
    }

    /// Split every PDF in `dir`
    ///
    /// A file that fails to process is logged and skipped. An empty or
    /// missing directory yields no chunks.
    pub fn split_all(&self, dir: &Path) -> Result<Vec<Chunk>> {
        let names = list_pdfs_in(dir)?;
        let mut chunks = Vec::new();
        let mut processed = 0usize;

        for name in &names {
            match self.split_one(&dir.join(name)) {
                Ok(doc_chunks) => {
                    processed += 1;
                    chunks.extend(doc_chunks);
                }
                Err(e) => tracing::warn!("Skipping {}: {}", name, e),
            }
        }

        tracing::info!(
            "Processed {}/{} document(s) into {} chunk(s)",
            processed,
            names.len(),
            chunks.len()
        );
        Ok(chunks)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{long_page_lines, pdf_with_pages};
    use tempfile::TempDir;

    fn processor(size: usize, overlap: usize) -> DocumentProcessor {
        DocumentProcessor::new(TextSplitter::new(size, overlap).unwrap())
    }

    #[test]
    fn test_split_one_tags_source_and_page() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("guide.pdf");
        std::fs::write(&path, pdf_with_pages(&[&["Intro to the guide"], &["Second page body"]])).unwrap();

        let chunks = processor(1000, 200).split_one(&path).unwrap();
        assert_eq!(chunks.len(), 2);
        assert!(chunks.iter().all(|c| c.source == "guide.pdf"));
        assert_eq!((chunks[0].page, chunks[0].chunk_index), (1, 0));
        assert_eq!((chunks[1].page, chunks[1].chunk_index), (2, 1));
    }

    #[test]
    fn test_long_page_is_split_with_running_index() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("long.pdf");
        let lines = long_page_lines(40);
        let refs: Vec<&str> = lines.iter().map(String::as_str).collect();
        std::fs::write(&path, pdf_with_pages(&[refs.as_slice()])).unwrap();

        let chunks = processor(200, 40).split_one(&path).unwrap();
        assert!(chunks.len() > 1);
        for (i, chunk) in chunks.iter().enumerate() {
            assert_eq!(chunk.chunk_index as usize, i);
            assert_eq!(chunk.page, 1);
        }
    }

    #[test]
    fn test_split_one_rejects_corrupt_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("corrupt.pdf");
        std::fs::write(&path, b"not really a pdf").unwrap();

        let result = processor(1000, 200).split_one(&path);
        assert!(matches!(result, Err(Error::Processing { .. })));
    }

    #[test]
    fn test_split_all_skips_failures() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("a.pdf"), pdf_with_pages(&[&["Document A text"]])).unwrap();
        std::fs::write(dir.path().join("b.pdf"), b"garbage").unwrap();
        std::fs::write(dir.path().join("c.pdf"), pdf_with_pages(&[&["Document C text"]])).unwrap();
        std::fs::write(dir.path().join("notes.txt"), b"ignored").unwrap();

        let chunks = processor(1000, 200).split_all(dir.path()).unwrap();
        let sources: Vec<&str> = chunks.iter().map(|c| c.source.as_str()).collect();
        assert_eq!(sources, vec!["a.pdf", "c.pdf"]);
    }

    #[test]
    fn test_split_all_empty_directory() {
        let dir = TempDir::new().unwrap();
        assert!(processor(1000, 200).split_all(dir.path()).unwrap().is_empty());
    }
}
