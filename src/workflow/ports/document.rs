//! Port for reading and writing tracked documents.

use crate::workflow::domain::DocumentRef;
use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

/// Result type for document store operations.
pub type DocumentStoreResult<T> = Result<T, DocumentStoreError>;

/// Storage for the human-edited documents backing units of work.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Reads a document.
    ///
    /// # Errors
    ///
    /// Returns [`DocumentStoreError::NotFound`] when the document does not
    /// exist.
    async fn read(&self, document: &DocumentRef) -> DocumentStoreResult<String>;

    /// Replaces a document's contents, creating it when absent.
    async fn write(&self, document: &DocumentRef, contents: &str) -> DocumentStoreResult<()>;
}

/// Errors returned by document store implementations.
#[derive(Debug, Clone, Error)]
pub enum DocumentStoreError {
    /// The document does not exist.
    #[error("document not found: {0}")]
    NotFound(DocumentRef),

    /// Underlying I/O failure.
    #[error("document I/O error: {0}")]
    Io(Arc<dyn std::error::Error + Send + Sync>),
}

impl DocumentStoreError {
    /// Wraps an I/O error.
    pub fn io(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Io(Arc::new(err))
    }
}
