//! Core types for the RAG system

pub mod document;

pub use document::{is_pdf_filename, Answer, Chunk, SourceRef};
