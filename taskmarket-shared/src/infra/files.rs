/// Local-disk File Store
///
/// Files are written under a root directory as
/// `<root>/<path_prefix>/<uuid>.<ext>`; the returned reference is the path
/// relative to the root (`document/<account>/id/<uuid>.pdf`).

use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;
use uuid::Uuid;

use crate::services::ports::{FileStore, FileStoreError, Upload};

/// File Store writing below a root directory
#[derive(Debug, Clone)]
pub struct LocalFileStore {
    root: PathBuf,
}

impl LocalFileStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolves a relative reference, refusing anything that escapes the root
    fn resolve(&self, relative: &str) -> Result<PathBuf, FileStoreError> {
        let path = Path::new(relative);

        if relative.is_empty() || !path.components().all(|c| matches!(c, Component::Normal(_))) {
            return Err(FileStoreError::InvalidPath(relative.to_string()));
        }

        Ok(self.root.join(path))
    }
}

/// Stored file name: random stem, original extension if it is alphanumeric
fn stored_name(upload: &Upload) -> String {
    match upload.extension() {
        Some(ext) if !ext.is_empty() && ext.chars().all(|c| c.is_ascii_alphanumeric()) => {
            format!("{}.{}", Uuid::new_v4(), ext)
        }
        _ => Uuid::new_v4().to_string(),
    }
}

#[async_trait]
impl FileStore for LocalFileStore {
    async fn store(&self, upload: &Upload, path_prefix: &str) -> Result<String, FileStoreError> {
        if upload.is_empty() {
            return Err(FileStoreError::Empty);
        }

        let prefix = path_prefix.trim_matches('/');
        let directory = self.resolve(prefix)?;
        tokio::fs::create_dir_all(&directory).await?;

        let reference = format!("{}/{}", prefix, stored_name(upload));
        tokio::fs::write(self.resolve(&reference)?, &upload.bytes).await?;

        tracing::debug!(reference = %reference, bytes = upload.len(), "Stored upload");
        Ok(reference)
    }

    async fn remove(&self, reference: &str) -> Result<(), FileStoreError> {
        match tokio::fs::remove_file(self.resolve(reference)?).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_store() -> LocalFileStore {
        LocalFileStore::new(std::env::temp_dir().join(format!("taskmarket-files-{}", Uuid::new_v4())))
    }

    #[tokio::test]
    async fn test_store_and_remove() {
        let store = temp_store();
        let upload = Upload::new("passport.PDF", b"%PDF-1.7".to_vec());

        let reference = store.store(&upload, "document/abc/id").await.unwrap();
        assert!(reference.starts_with("document/abc/id/"));
        assert!(reference.ends_with(".pdf"));

        let on_disk = tokio::fs::read(store.root().join(&reference)).await.unwrap();
        assert_eq!(on_disk, b"%PDF-1.7");

        store.remove(&reference).await.unwrap();
        assert!(!store.root().join(&reference).exists());

        // Removing twice is fine
        store.remove(&reference).await.unwrap();

        let _ = tokio::fs::remove_dir_all(store.root()).await;
    }

    #[tokio::test]
    async fn test_rejects_empty_and_escaping_paths() {
        let store = temp_store();
        let upload = Upload::new("a.png", vec![1u8, 2, 3]);

        assert!(matches!(
            store.store(&Upload::new("a.png", Vec::new()), "document").await,
            Err(FileStoreError::Empty)
        ));
        assert!(matches!(
            store.store(&upload, "../outside").await,
            Err(FileStoreError::InvalidPath(_))
        ));
        assert!(matches!(
            store.remove("/etc/passwd").await,
            Err(FileStoreError::InvalidPath(_))
        ));
    }

    #[test]
    fn test_stored_name_drops_odd_extensions() {
        assert!(stored_name(&Upload::new("scan.jpeg", vec![1u8])).ends_with(".jpeg"));
        assert!(!stored_name(&Upload::new("scan.tar gz", vec![1u8])).contains('.'));
    }
}
