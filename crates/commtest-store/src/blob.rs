// SPDX-License-Identifier: Apache-2.0

use async_trait::async_trait;
use std::fs;
use std::path::{Component, Path, PathBuf};
use tracing::info;

use crate::error::{StoreError, StoreErrorCode};

/// Object storage for captured images and documents, addressed by
/// slash-separated relative paths.
#[async_trait]
pub trait BlobStore: Send + Sync {
    async fn upload(&self, path: &str, bytes: &[u8]) -> Result<(), StoreError>;
    async fn download(&self, path: &str) -> Result<Vec<u8>, StoreError>;
    async fn delete(&self, path: &str) -> Result<(), StoreError>;
    fn public_url(&self, path: &str) -> Result<String, StoreError>;
}

/// Validates a blob path and returns its normalized segments.
pub fn blob_segments(path: &str) -> Result<Vec<&str>, StoreError> {
    let blocked = |why: &str| {
        StoreError::new(
            StoreErrorCode::Validation,
            format!("path traversal blocked: {why}: {path:?}"),
        )
    };
    if path.is_empty() {
        return Err(blocked("empty path"));
    }
    if path.starts_with('/') || path.contains('\\') {
        return Err(blocked("absolute or non-portable path"));
    }
    let segments: Vec<&str> = path.split('/').collect();
    for seg in &segments {
        if seg.is_empty() || *seg == "." || *seg == ".." {
            return Err(blocked("invalid segment"));
        }
        if !Path::new(seg)
            .components()
            .all(|c| matches!(c, Component::Normal(_)))
        {
            return Err(blocked("invalid segment"));
        }
    }
    Ok(segments)
}

pub struct LocalBlobStore {
    root: PathBuf,
    public_url_base: Option<String>,
}

impl LocalBlobStore {
    #[must_use]
    pub fn new(root: PathBuf, public_url_base: Option<String>) -> Self {
        Self {
            root,
            public_url_base,
        }
    }

    fn resolve(&self, path: &str) -> Result<PathBuf, StoreError> {
        let mut out = self.root.clone();
        for seg in blob_segments(path)? {
            out.push(seg);
        }
        Ok(out)
    }
}

#[async_trait]
impl BlobStore for LocalBlobStore {
    async fn upload(&self, path: &str, bytes: &[u8]) -> Result<(), StoreError> {
        let target = self.resolve(path)?;
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent).map_err(|e| StoreError::io("create blob dir", &e))?;
        }
        let tmp = target.with_extension("upload.tmp");
        fs::write(&tmp, bytes).map_err(|e| StoreError::io("write blob", &e))?;
        fs::rename(&tmp, &target).map_err(|e| StoreError::io("rename blob", &e))?;
        info!(path, bytes = bytes.len(), "blob uploaded");
        Ok(())
    }

    async fn download(&self, path: &str) -> Result<Vec<u8>, StoreError> {
        let target = self.resolve(path)?;
        fs::read(&target).map_err(|e| StoreError::io(&format!("read blob {path}"), &e))
    }

    async fn delete(&self, path: &str) -> Result<(), StoreError> {
        let target = self.resolve(path)?;
        fs::remove_file(&target).map_err(|e| StoreError::io(&format!("delete blob {path}"), &e))?;
        info!(path, "blob deleted");
        Ok(())
    }

    fn public_url(&self, path: &str) -> Result<String, StoreError> {
        let segments = blob_segments(path)?;
        let base = self.public_url_base.as_deref().ok_or_else(|| {
            StoreError::new(
                StoreErrorCode::Unavailable,
                "public_url_base is not configured",
            )
        })?;
        Ok(format!(
            "{}/{}",
            base.trim_end_matches('/'),
            segments.join("/")
        ))
    }
}
