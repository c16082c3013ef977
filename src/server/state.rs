//! Shared application state injected into every Axum handler.

use std::sync::Arc;

use crate::error::Result;
use crate::image::providers::ArkProvider;
use crate::image::ImageProvider;
use crate::server::config::Config;
use crate::storage::{BlobStore, LocalBlobStore, VercelBlobStore};

/// State shared across all HTTP handlers.
#[derive(Clone)]
pub struct AppState {
    /// Server configuration (env-derived).
    pub config: Arc<Config>,
    /// Provider that performs the actual generation.
    pub provider: Arc<dyn ImageProvider>,
    /// Store for uploaded files; `None` when uploads are unsupported.
    pub blob_store: Option<Arc<dyn BlobStore>>,
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("config", &self.config)
            .field("provider", &self.provider.name())
            .field("blob_store", &self.blob_store.as_ref().map(|s| s.kind()))
            .finish()
    }
}

impl AppState {
    /// Assembles state from explicit parts.
    pub fn new(
        config: Config,
        provider: Arc<dyn ImageProvider>,
        blob_store: Option<Arc<dyn BlobStore>>,
    ) -> Self {
        Self {
            config: Arc::new(config),
            provider,
            blob_store,
        }
    }

    /// Builds the Ark provider and the configured blob store from `config`.
    pub fn from_config(config: Config) -> Result<Self> {
        let mut builder = ArkProvider::builder();
        if let Some(url) = &config.ark_url {
            builder = builder.endpoint(url.clone());
        }
        let provider: Arc<dyn ImageProvider> = Arc::new(builder.build()?);

        let blob_store: Option<Arc<dyn BlobStore>> = match (&config.blob_token, &config.upload_dir) {
            (Some(token), _) => Some(Arc::new(VercelBlobStore::new(token.clone()))),
            (None, Some(dir)) => Some(Arc::new(LocalBlobStore::new(
                dir.clone(),
                config.public_url.clone(),
            ))),
            (None, None) => None,
        };

        Ok(Self::new(config, provider, blob_store))
    }
}
