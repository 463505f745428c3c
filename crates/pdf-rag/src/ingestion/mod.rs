//! Document ingestion: remote fetch, PDF parsing and chunking

pub mod fetcher;
pub mod parser;
pub mod processor;
pub mod splitter;

pub use fetcher::RemoteFetcher;
pub use parser::{PageText, PdfParser};
pub use processor::DocumentProcessor;
pub use splitter::{TextSpan, TextSplitter};
