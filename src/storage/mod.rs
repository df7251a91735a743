pub mod local;

use async_trait::async_trait;
use std::io;

pub use local::LocalBlobStore;

/// Path-addressed file storage. Paths are relative, `/`-separated and
/// scoped per ad (`ads/{ad_id}/...`).
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Writes `bytes` under `dir` with a generated file name and returns the stored path.
    async fn put(&self, dir: &str, extension: &str, bytes: &[u8]) -> io::Result<String>;

    /// Returns `None` when nothing is stored at `path`.
    async fn read(&self, path: &str) -> io::Result<Option<Vec<u8>>>;

    async fn exists(&self, path: &str) -> io::Result<bool>;

    async fn delete(&self, path: &str) -> io::Result<()>;

    async fn delete_dir(&self, dir: &str) -> io::Result<()>;
}

pub fn ad_dir(ad_id: i64) -> String {
    format!("ads/{ad_id}")
}

/// MIME type served for a stored file, by extension.
pub fn content_type_for(path: &str) -> &'static str {
    match path.rsplit_once('.').map(|(_, ext)| ext.to_ascii_lowercase()).as_deref() {
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("png") => "image/png",
        Some("webp") => "image/webp",
        _ => "application/octet-stream",
    }
}

/// Deletes `path` if it exists. Failures are logged, never returned.
pub async fn remove_quietly(store: &dyn BlobStore, path: &str) {
    match store.exists(path).await {
        Ok(true) => {
            if let Err(e) = store.delete(path).await {
                tracing::warn!("Failed to delete stored file {}: {:?}", path, e);
            }
        }
        Ok(false) => {}
        Err(e) => tracing::warn!("Failed to check stored file {}: {:?}", path, e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_content_type_for() {
        assert_eq!(content_type_for("ads/1/a.JPG"), "image/jpeg");
        assert_eq!(content_type_for("ads/1/a.webp"), "image/webp");
        assert_eq!(content_type_for("ads/1/a.png"), "image/png");
        assert_eq!(content_type_for("ads/1/noext"), "application/octet-stream");
    }
}
