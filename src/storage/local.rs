use async_trait::async_trait;
use std::{
    io,
    path::{Component, Path, PathBuf},
};
use uuid::Uuid;

use super::BlobStore;

/// Stores blobs as plain files beneath a root directory.
#[derive(Debug, Clone)]
pub struct LocalBlobStore {
    root: PathBuf,
}

impl LocalBlobStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn resolve(&self, relative: &str) -> io::Result<PathBuf> {
        let relative = Path::new(relative);
        let is_contained = relative
            .components()
            .all(|c| matches!(c, Component::Normal(_)));

        if relative.as_os_str().is_empty() || !is_contained {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("path escapes storage root: {}", relative.display()),
            ));
        }

        Ok(self.root.join(relative))
    }
}

#[async_trait]
impl BlobStore for LocalBlobStore {
    async fn put(&self, dir: &str, extension: &str, bytes: &[u8]) -> io::Result<String> {
        let dir_path = self.resolve(dir)?;
        tokio::fs::create_dir_all(&dir_path).await?;

        let relative = format!("{}/{}.{}", dir.trim_end_matches('/'), Uuid::new_v4(), extension);
        tokio::fs::write(self.resolve(&relative)?, bytes).await?;

        Ok(relative)
    }

    async fn read(&self, path: &str) -> io::Result<Option<Vec<u8>>> {
        match tokio::fs::read(self.resolve(path)?).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e),
        }
    }

    async fn exists(&self, path: &str) -> io::Result<bool> {
        tokio::fs::try_exists(self.resolve(path)?).await
    }

    async fn delete(&self, path: &str) -> io::Result<()> {
        match tokio::fs::remove_file(self.resolve(path)?).await {
            Err(e) if e.kind() != io::ErrorKind::NotFound => Err(e),
            _ => Ok(()),
        }
    }

    async fn delete_dir(&self, dir: &str) -> io::Result<()> {
        match tokio::fs::remove_dir_all(self.resolve(dir)?).await {
            Err(e) if e.kind() != io::ErrorKind::NotFound => Err(e),
            _ => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{ad_dir, remove_quietly};

    fn temp_store() -> (LocalBlobStore, PathBuf) {
        let root = std::env::temp_dir().join(format!("marketplace-blobs-{}", Uuid::new_v4()));
        (LocalBlobStore::new(root.clone()), root)
    }

    #[tokio::test]
    async fn test_put_read_delete() {
        let (store, root) = temp_store();

        let path = store.put(&ad_dir(7), "png", b"png-bytes").await.unwrap();
        assert!(path.starts_with("ads/7/"));
        assert!(path.ends_with(".png"));
        assert!(store.exists(&path).await.unwrap());
        assert_eq!(store.read(&path).await.unwrap().as_deref(), Some(&b"png-bytes"[..]));

        store.delete(&path).await.unwrap();
        assert!(!store.exists(&path).await.unwrap());
        assert_eq!(store.read(&path).await.unwrap(), None);

        // Deleting twice is not an error.
        store.delete(&path).await.unwrap();

        tokio::fs::remove_dir_all(root).await.ok();
    }

    #[tokio::test]
    async fn test_delete_dir_removes_all_ad_files() {
        let (store, root) = temp_store();

        let first = store.put(&ad_dir(3), "jpg", b"a").await.unwrap();
        let second = store.put(&ad_dir(3), "webp", b"b").await.unwrap();
        let other = store.put(&ad_dir(4), "jpg", b"c").await.unwrap();

        store.delete_dir(&ad_dir(3)).await.unwrap();

        assert!(!store.exists(&first).await.unwrap());
        assert!(!store.exists(&second).await.unwrap());
        assert!(store.exists(&other).await.unwrap());

        // Missing directories are tolerated.
        store.delete_dir(&ad_dir(3)).await.unwrap();
        remove_quietly(&store, &first).await;

        tokio::fs::remove_dir_all(root).await.ok();
    }

    #[tokio::test]
    async fn test_rejects_paths_outside_root() {
        let (store, _root) = temp_store();

        assert!(store.read("../etc/passwd").await.is_err());
        assert!(store.delete("/etc/passwd").await.is_err());
        assert!(store.put("ads/../../x", "png", b"x").await.is_err());
    }
}
