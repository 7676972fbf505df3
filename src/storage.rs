use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;

use crate::errors::{AssetError, ServiceError};

/// Persists uploaded and generated documents under relative paths such as
/// `certificates/templates/<name>.pdf`.
#[async_trait]
pub trait AssetStore: Send + Sync {
    async fn save(&self, path: &str, bytes: &[u8]) -> Result<(), AssetError>;
    async fn read(&self, path: &str) -> Result<Vec<u8>, AssetError>;
    async fn remove(&self, path: &str) -> Result<(), AssetError>;
    async fn exists(&self, path: &str) -> Result<bool, AssetError>;
}

pub struct LocalAssetStore {
    root: PathBuf,
}

impl LocalAssetStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        LocalAssetStore { root: root.into() }
    }

    fn resolve(&self, path: &str) -> Result<PathBuf, AssetError> {
        let relative = Path::new(path);
        let escapes = relative
            .components()
            .any(|c| !matches!(c, Component::Normal(_)));
        if path.is_empty() || escapes {
            return Err(AssetError::Io(format!("invalid asset path `{path}`")));
        }
        Ok(self.root.join(relative))
    }
}

fn io_error(path: &str, err: std::io::Error) -> AssetError {
    if err.kind() == std::io::ErrorKind::NotFound {
        AssetError::NotFound(path.to_string())
    } else {
        AssetError::Io(format!("{path}: {err}"))
    }
}

#[async_trait]
impl AssetStore for LocalAssetStore {
    async fn save(&self, path: &str, bytes: &[u8]) -> Result<(), AssetError> {
        let full = self.resolve(path)?;
        if let Some(parent) = full.parent() {
            tokio::fs::create_dir_all(parent).await.map_err(|e| io_error(path, e))?;
        }
        tokio::fs::write(&full, bytes).await.map_err(|e| io_error(path, e))?;
        tracing::debug!(%path, size = bytes.len(), "asset saved");
        Ok(())
    }

    async fn read(&self, path: &str) -> Result<Vec<u8>, AssetError> {
        let full = self.resolve(path)?;
        tokio::fs::read(&full).await.map_err(|e| io_error(path, e))
    }

    async fn remove(&self, path: &str) -> Result<(), AssetError> {
        let full = self.resolve(path)?;
        tokio::fs::remove_file(&full).await.map_err(|e| io_error(path, e))?;
        tracing::debug!(%path, "asset removed");
        Ok(())
    }

    async fn exists(&self, path: &str) -> Result<bool, AssetError> {
        let full = self.resolve(path)?;
        tokio::fs::try_exists(&full).await.map_err(|e| io_error(path, e))
    }
}

#[derive(Debug, Clone)]
pub struct UploadPolicy {
    pub max_file_size_bytes: usize,
    pub allowed_mime_types: &'static [&'static str],
}

impl UploadPolicy {
    pub const PDF_ONLY: UploadPolicy = UploadPolicy {
        max_file_size_bytes: 5 * 1024 * 1024, // 5 MiB
        allowed_mime_types: &["application/pdf"],
    };

    pub fn check(&self, content_type: Option<&str>, bytes: &[u8]) -> Result<(), ServiceError> {
        if bytes.is_empty() {
            return Err(ServiceError::Validation("A document file is required.".to_string()));
        }

        let mime = content_type
            .and_then(|ct| ct.split(';').next())
            .map(|ct| ct.trim().to_ascii_lowercase());
        let allowed = mime
            .as_deref()
            .is_some_and(|m| self.allowed_mime_types.contains(&m));
        if !allowed || !bytes.starts_with(b"%PDF-") {
            return Err(ServiceError::Validation("The file must be a PDF document.".to_string()));
        }

        if bytes.len() > self.max_file_size_bytes {
            return Err(ServiceError::Validation("The file must not exceed 5 MB.".to_string()));
        }

        Ok(())
    }
}
