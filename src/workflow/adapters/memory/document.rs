//! In-memory document store.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use crate::workflow::{
    domain::DocumentRef,
    ports::{DocumentStore, DocumentStoreError, DocumentStoreResult},
};

/// Thread-safe map of document contents keyed by reference.
#[derive(Debug, Clone, Default)]
pub struct InMemoryDocumentStore {
    documents: Arc<RwLock<HashMap<DocumentRef, String>>>,
}

impl InMemoryDocumentStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

fn poisoned(err: impl std::fmt::Display) -> DocumentStoreError {
    DocumentStoreError::io(std::io::Error::other(err.to_string()))
}

#[async_trait]
impl DocumentStore for InMemoryDocumentStore {
    async fn read(&self, document: &DocumentRef) -> DocumentStoreResult<String> {
        self.documents
            .read()
            .map_err(poisoned)?
            .get(document)
            .cloned()
            .ok_or_else(|| DocumentStoreError::NotFound(document.clone()))
    }

    async fn write(&self, document: &DocumentRef, contents: &str) -> DocumentStoreResult<()> {
        self.documents
            .write()
            .map_err(poisoned)?
            .insert(document.clone(), contents.to_owned());
        Ok(())
    }
}
