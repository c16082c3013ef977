//! Filesystem blob store, served back by the relay server under `/uploads`.

use super::BlobStore;
use crate::error::{GenRelayError, Result};
use async_trait::async_trait;
use std::path::{Component, Path, PathBuf};

/// Writes uploads below a root directory and addresses them via a public base URL.
#[derive(Debug, Clone)]
pub struct LocalBlobStore {
    root: PathBuf,
    public_base: String,
}

impl LocalBlobStore {
    /// Creates a store rooted at `root`, publishing URLs under `public_base`.
    pub fn new(root: impl Into<PathBuf>, public_base: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            public_base: public_base.into().trim_end_matches('/').to_string(),
        }
    }

    /// Root directory objects are written below.
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn resolve(&self, name: &str) -> Result<PathBuf> {
        let relative = Path::new(name);
        if !relative
            .components()
            .all(|c| matches!(c, Component::Normal(_)))
        {
            return Err(GenRelayError::InvalidRequest(format!(
                "invalid object name '{name}'"
            )));
        }
        Ok(self.root.join(relative))
    }
}

#[async_trait]
impl BlobStore for LocalBlobStore {
    async fn put(&self, name: &str, data: Vec<u8>, _content_type: &str) -> Result<String> {
        let path = self.resolve(name)?;
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&path, &data).await?;
        tracing::debug!(path = %path.display(), bytes = data.len(), "stored upload");
        Ok(format!("{}/{}", self.public_base, name))
    }

    fn kind(&self) -> &'static str {
        "local"
    }
}
