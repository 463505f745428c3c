//! Google Cloud Platform provider implementations
//!
//! - Google Cloud Storage as the remote source of documents

mod gcs_store;

pub use gcs_store::GcsObjectStore;
