//! Capability-scoped filesystem document store.

use async_trait::async_trait;
use camino::{Utf8Path, Utf8PathBuf};
use cap_std::ambient_authority;
use cap_std::fs_utf8::Dir;
use std::io::ErrorKind;

use crate::workflow::{
    domain::DocumentRef,
    ports::{DocumentStore, DocumentStoreError, DocumentStoreResult},
};

/// Reads and writes documents beneath a workspace root.
///
/// Every access goes through a directory handle opened on the root, so
/// document references cannot reach outside it.
#[derive(Debug, Clone)]
pub struct FsDocumentStore {
    root: Utf8PathBuf,
}

impl FsDocumentStore {
    /// Creates a store rooted at `root`.
    #[must_use]
    pub fn new(root: impl Into<Utf8PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Returns the workspace root.
    #[must_use]
    pub fn root(&self) -> &Utf8Path {
        &self.root
    }

    fn open_root(&self) -> DocumentStoreResult<Dir> {
        Dir::open_ambient_dir(&self.root, ambient_authority()).map_err(DocumentStoreError::io)
    }
}

async fn run_blocking<F, T>(f: F) -> DocumentStoreResult<T>
where
    F: FnOnce() -> DocumentStoreResult<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|err| DocumentStoreError::io(std::io::Error::other(err.to_string())))?
}

#[async_trait]
impl DocumentStore for FsDocumentStore {
    async fn read(&self, document: &DocumentRef) -> DocumentStoreResult<String> {
        let dir = self.open_root()?;
        let target = document.clone();
        run_blocking(move || match dir.read_to_string(target.as_path()) {
            Ok(contents) => Ok(contents),
            Err(err) if err.kind() == ErrorKind::NotFound => {
                Err(DocumentStoreError::NotFound(target))
            }
            Err(err) => Err(DocumentStoreError::io(err)),
        })
        .await
    }

    async fn write(&self, document: &DocumentRef, contents: &str) -> DocumentStoreResult<()> {
        let dir = self.open_root()?;
        let target = document.clone();
        let body = contents.to_owned();
        run_blocking(move || {
            if let Some(parent) = target.as_path().parent().filter(|p| !p.as_str().is_empty()) {
                dir.create_dir_all(parent).map_err(DocumentStoreError::io)?;
            }
            dir.write(target.as_path(), body).map_err(DocumentStoreError::io)
        })
        .await
    }
}
