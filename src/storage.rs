use std::path::{Component, Path, PathBuf};

use anyhow::Context;
use axum::async_trait;
use bytes::Bytes;

/// Opaque blob store for uploaded images. Keys are relative, `/`-separated.
#[async_trait]
pub trait StorageClient: Send + Sync {
    async fn put_object(&self, key: &str, body: Bytes, content_type: &str) -> anyhow::Result<()>;
    async fn delete_object(&self, key: &str) -> anyhow::Result<()>;
}

/// Stores objects as files below `root`, which is also served statically.
#[derive(Clone)]
pub struct LocalStorage {
    root: PathBuf,
}

impl LocalStorage {
    pub async fn new(root: impl Into<PathBuf>) -> anyhow::Result<Self> {
        let root = root.into();
        tokio::fs::create_dir_all(&root)
            .await
            .with_context(|| format!("create upload dir {}", root.display()))?;
        Ok(Self { root })
    }

    fn path_for(&self, key: &str) -> anyhow::Result<PathBuf> {
        let rel = Path::new(key);
        let clean = rel
            .components()
            .all(|c| matches!(c, Component::Normal(_)));
        anyhow::ensure!(clean && !key.is_empty(), "invalid object key {key:?}");
        Ok(self.root.join(rel))
    }
}

#[async_trait]
impl StorageClient for LocalStorage {
    async fn put_object(&self, key: &str, body: Bytes, _content_type: &str) -> anyhow::Result<()> {
        let path = self.path_for(key)?;
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .with_context(|| format!("create dir for {}", key))?;
        }
        tokio::fs::write(&path, &body)
            .await
            .with_context(|| format!("write object {}", key))?;
        Ok(())
    }

    async fn delete_object(&self, key: &str) -> anyhow::Result<()> {
        let path = self.path_for(key)?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            // already gone
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(anyhow::Error::new(e).context(format!("delete object {}", key))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn put_then_delete_on_disk() {
        let dir = tempfile::tempdir().unwrap();
        let storage = LocalStorage::new(dir.path()).await.unwrap();

        storage
            .put_object("properties/1-2.png", Bytes::from_static(b"png"), "image/png")
            .await
            .unwrap();
        let path = dir.path().join("properties/1-2.png");
        assert_eq!(tokio::fs::read(&path).await.unwrap(), b"png");

        storage.delete_object("properties/1-2.png").await.unwrap();
        assert!(!path.exists());
        // deleting twice is not an error
        storage.delete_object("properties/1-2.png").await.unwrap();
    }

    #[tokio::test]
    async fn rejects_keys_escaping_root() {
        let dir = tempfile::tempdir().unwrap();
        let storage = LocalStorage::new(dir.path()).await.unwrap();
        let err = storage
            .put_object("../evil.png", Bytes::from_static(b"x"), "image/png")
            .await
            .unwrap_err();
        assert!(err.to_string().contains("invalid object key"));
        assert!(storage.delete_object("/etc/passwd").await.is_err());
    }
}
