//! Vector index management and similarity search

pub mod index;

pub use index::{IndexManager, IndexManifest, SearchResult, VectorIndex};
