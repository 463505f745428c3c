//! Document chunk types with source tracking

use serde::{Deserialize, Serialize};
use std::path::Path;

/// A bounded span of document text, the unit of indexing
///
/// Immutable once created by the document processor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chunk {
    /// Chunk text
    pub text: String,
    /// Originating filename (no directory components)
    pub source: String,
    /// Originating page (1-indexed)
    pub page: u32,
    /// Position of the chunk within its document
    pub chunk_index: u32,
    /// Byte offset of the chunk within its page text
    pub offset: usize,
}

impl Chunk {
    /// Create a new chunk
    pub fn new(
        text: impl Into<String>,
        source: impl Into<String>,
        page: u32,
        chunk_index: u32,
        offset: usize,
    ) -> Self {
        Self {
            text: text.into(),
            source: source.into(),
            page,
            chunk_index,
            offset,
        }
    }
}

/// Source reference returned alongside an answer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceRef {
    /// Originating filename
    pub filename: String,
    /// Originating page (1-indexed)
    pub page: u32,
    /// Similarity to the question (higher is closer)
    pub score: f32,
}

impl SourceRef {
    /// Build a reference from a retrieved chunk
    pub fn from_chunk(chunk: &Chunk, score: f32) -> Self {
        Self {
            filename: chunk.source.clone(),
            page: chunk.page,
            score,
        }
    }
}

/// Answer text with the passages it was grounded on
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Answer {
    /// Raw model output
    pub text: String,
    /// Retrieved sources in rank order
    pub sources: Vec<SourceRef>,
}

/// Whether a filename carries the `.pdf` extension (case-insensitive)
pub fn is_pdf_filename(name: &str) -> bool {
    Path::new(name)
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("pdf"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pdf_extension_check() {
        assert!(is_pdf_filename("report.pdf"));
        assert!(is_pdf_filename("REPORT.PDF"));
        assert!(!is_pdf_filename("x.txt"));
        assert!(!is_pdf_filename("pdf"));
        assert!(!is_pdf_filename("archive.pdf.zip"));
    }
}
