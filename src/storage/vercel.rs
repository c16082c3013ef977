//! Vercel Blob compatible store.

use super::BlobStore;
use crate::error::{GenRelayError, Result};
use async_trait::async_trait;
use serde::Deserialize;

/// Default Vercel Blob API base URL.
pub const VERCEL_BLOB_API_URL: &str = "https://blob.vercel-storage.com";

const API_VERSION: &str = "7";

/// Uploads must be readable by the provider, so every object is public.
const ACCESS: &str = "public";

/// Uploads objects with public access through the Vercel Blob HTTP API.
pub struct VercelBlobStore {
    client: reqwest::Client,
    token: String,
    api_url: String,
}

impl VercelBlobStore {
    /// Creates a store using `token` against the default API URL.
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            token: token.into(),
            api_url: VERCEL_BLOB_API_URL.to_string(),
        }
    }

    /// Overrides the API base URL.
    pub fn with_api_url(mut self, url: impl Into<String>) -> Self {
        self.api_url = url.into().trim_end_matches('/').to_string();
        self
    }

    /// Builds a store from `BLOB_READ_WRITE_TOKEN`, if set.
    pub fn from_env() -> Option<Self> {
        std::env::var("BLOB_READ_WRITE_TOKEN")
            .ok()
            .filter(|t| !t.trim().is_empty())
            .map(Self::new)
    }
}

#[derive(Debug, Deserialize)]
struct PutBlobResponse {
    url: String,
}

#[async_trait]
impl BlobStore for VercelBlobStore {
    async fn put(&self, name: &str, data: Vec<u8>, content_type: &str) -> Result<String> {
        let response = self
            .client
            .put(format!("{}/{}", self.api_url, name))
            .bearer_auth(&self.token)
            .header("x-api-version", API_VERSION)
            .header("x-vercel-blob-access", ACCESS)
            .header("x-content-type", content_type)
            .body(data)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(GenRelayError::Api {
                status: status.as_u16(),
                message: text,
            });
        }

        let blob: PutBlobResponse = response.json().await?;
        tracing::debug!(url = %blob.url, "stored upload in blob storage");
        Ok(blob.url)
    }

    fn kind(&self) -> &'static str {
        "vercel-blob"
    }
}
