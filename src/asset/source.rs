//! Asset Document Sources
//!
//! Where interchange documents come from. The parser only sees the
//! [`AssetSource`] trait, so tests can swap the filesystem for an in-memory
//! store and count reads.

use std::io;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::debug;

/// Source of raw interchange documents, keyed by relative asset path.
#[async_trait]
pub trait AssetSource: Send + Sync {
    /// Read a document. `Ok(None)` when it does not exist.
    async fn read(&self, relative_path: &str) -> io::Result<Option<String>>;

    /// Human-readable location of a document, for logs and errors.
    fn locate(&self, relative_path: &str) -> String;
}

/// Filesystem layout `<base>/<domain>/<relative>.json`.
#[derive(Debug, Clone)]
pub struct FsSource {
    root: PathBuf,
}

impl FsSource {
    /// Default content domain.
    pub const DEFAULT_DOMAIN: &'static str = "Prospect/Content";

    /// Document extension.
    pub const EXTENSION: &'static str = "json";

    /// Create a source rooted at `<base>/<domain>`.
    pub fn new(base: impl AsRef<Path>, domain: impl AsRef<Path>) -> Self {
        Self {
            root: base.as_ref().join(domain),
        }
    }

    /// Content root.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Full path of a relative asset path.
    pub fn document_path(&self, relative_path: &str) -> PathBuf {
        let relative = relative_path.trim_start_matches('/');
        // dots inside asset names are not extensions
        self.root.join(format!("{}.{}", relative, Self::EXTENSION))
    }
}

#[async_trait]
impl AssetSource for FsSource {
    async fn read(&self, relative_path: &str) -> io::Result<Option<String>> {
        let path = self.document_path(relative_path);
        match tokio::fs::read_to_string(&path).await {
            Ok(text) => {
                debug!("Read {} bytes from {}", text.len(), path.display());
                Ok(Some(text))
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e),
        }
    }

    fn locate(&self, relative_path: &str) -> String {
        self.document_path(relative_path).display().to_string()
    }
}

/// In-memory source for tests. Counts reads and can delay them.
#[cfg(test)]
#[derive(Default)]
pub(crate) struct MemorySource {
    docs: std::sync::Mutex<std::collections::HashMap<String, String>>,
    reads: std::sync::atomic::AtomicUsize,
    delay: Option<std::time::Duration>,
}

#[cfg(test)]
impl MemorySource {
    pub(crate) fn with(docs: &[(&str, &str)]) -> Self {
        let source = Self::default();
        for (path, text) in docs {
            source.insert(path, text);
        }
        source
    }

    pub(crate) fn delayed(mut self, delay: std::time::Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub(crate) fn insert(&self, path: &str, text: &str) {
        if let Ok(mut docs) = self.docs.lock() {
            docs.insert(path.to_string(), text.to_string());
        }
    }

    pub(crate) fn reads(&self) -> usize {
        self.reads.load(std::sync::atomic::Ordering::SeqCst)
    }
}

#[cfg(test)]
#[async_trait]
impl AssetSource for MemorySource {
    async fn read(&self, relative_path: &str) -> io::Result<Option<String>> {
        self.reads.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        let docs = self
            .docs
            .lock()
            .map_err(|_| io::Error::new(io::ErrorKind::Other, "poisoned"))?;
        Ok(docs.get(relative_path).cloned())
    }

    fn locate(&self, relative_path: &str) -> String {
        format!("mem://{}", relative_path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_document_path_layout() {
        let source = FsSource::new("Exports", FsSource::DEFAULT_DOMAIN);
        assert_eq!(
            source.document_path("Maps/MP/MAP01/MP_Map01_P"),
            PathBuf::from("Exports/Prospect/Content/Maps/MP/MAP01/MP_Map01_P.json")
        );
        assert_eq!(
            source.document_path("/DataTables/MapsInfos_DT"),
            PathBuf::from("Exports/Prospect/Content/DataTables/MapsInfos_DT.json")
        );
    }

    #[tokio::test]
    async fn test_fs_read_and_missing() {
        let dir = tempfile::tempdir().unwrap();
        let source = FsSource::new(dir.path(), "Content");
        let file = source.document_path("Maps/Test");
        std::fs::create_dir_all(file.parent().unwrap()).unwrap();
        std::fs::write(&file, r#"{"Type": "Level"}"#).unwrap();

        let text = source.read("Maps/Test").await.unwrap();
        assert_eq!(text.as_deref(), Some(r#"{"Type": "Level"}"#));
        assert!(source.read("Maps/Missing").await.unwrap().is_none());
    }
}
