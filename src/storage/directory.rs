//! Append store backed by a local directory tree.
//!
//! Containers map to directories under the root and objects to files inside
//! them. Useful on machines without cloud storage access and for inspecting
//! output during development.

use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;
use tokio::fs::{self, OpenOptions};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

use crate::storage::store::{AppendStore, StoreError};
use crate::storage::target::RemoteAppendTarget;

#[derive(Debug)]
pub struct DirectoryStore {
    root: PathBuf,
    /// Serializes appends so one block is written by a single `write_all`
    /// before the next one starts.
    append_lock: Mutex<()>,
}

impl DirectoryStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            append_lock: Mutex::new(()),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn container_path(&self, container: &str) -> Result<PathBuf, StoreError> {
        Ok(self.root.join(single_component(container)?))
    }

    fn object_path(&self, target: &RemoteAppendTarget) -> Result<PathBuf, StoreError> {
        Ok(self
            .container_path(&target.container_id)?
            .join(single_component(&target.object_id)?))
    }
}

/// Reject names that would escape the root.
fn single_component(name: &str) -> Result<&str, StoreError> {
    let mut components = Path::new(name).components();
    match (components.next(), components.next()) {
        (Some(Component::Normal(_)), None) => Ok(name),
        _ => Err(StoreError::InvalidConnection(format!(
            "'{}' is not a plain file name",
            name
        ))),
    }
}

#[async_trait]
impl AppendStore for DirectoryStore {
    async fn create_container_if_not_exists(&self, container: &str) -> Result<(), StoreError> {
        fs::create_dir_all(self.container_path(container)?).await?;
        Ok(())
    }

    async fn create_append_object_if_not_exists(
        &self,
        target: &RemoteAppendTarget,
    ) -> Result<(), StoreError> {
        let path = self.object_path(target)?;
        match OpenOptions::new().write(true).create_new(true).open(&path).await {
            Ok(_) => Ok(()),
            Err(e) if e.kind() == ErrorKind::AlreadyExists => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                Err(StoreError::NotFound(format!("container '{}'", target.container_id)))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn append_block(&self, target: &RemoteAppendTarget, block: Vec<u8>) -> Result<(), StoreError> {
        let path = self.object_path(target)?;
        let _guard = self.append_lock.lock().await;

        let mut file = match OpenOptions::new().append(true).open(&path).await {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(StoreError::NotFound(format!("object '{}'", target)));
            }
            Err(e) => return Err(e.into()),
        };
        file.write_all(&block).await?;
        file.flush().await?;
        Ok(())
    }

    fn kind(&self) -> &'static str {
        "directory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn creates_and_appends() {
        let dir = tempfile::tempdir().unwrap();
        let store = DirectoryStore::new(dir.path());
        let target = RemoteAppendTarget::new("graph-logs", "2024-01-01-log.txt");

        store.create_container_if_not_exists("graph-logs").await.unwrap();
        store.create_append_object_if_not_exists(&target).await.unwrap();
        store.append_block(&target, b"hello\n".to_vec()).await.unwrap();
        // Second ensure must not truncate.
        store.create_append_object_if_not_exists(&target).await.unwrap();
        store.append_block(&target, b"world\n".to_vec()).await.unwrap();

        let content = std::fs::read_to_string(dir.path().join("graph-logs/2024-01-01-log.txt")).unwrap();
        assert_eq!(content, "hello\nworld\n");
    }

    #[tokio::test]
    async fn missing_object_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let store = DirectoryStore::new(dir.path());
        let target = RemoteAppendTarget::new("graph-logs", "log.txt");
        store.create_container_if_not_exists("graph-logs").await.unwrap();

        let err = store.append_block(&target, b"x".to_vec()).await.unwrap_err();
        assert!(matches!(err, StoreError::NotFound(_)));
    }

    #[tokio::test]
    async fn rejects_path_traversal() {
        let dir = tempfile::tempdir().unwrap();
        let store = DirectoryStore::new(dir.path());
        assert!(store.create_container_if_not_exists("../escape").await.is_err());
        assert!(store.create_container_if_not_exists("a/b").await.is_err());
    }
}
