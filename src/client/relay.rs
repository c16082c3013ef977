//! HTTP client for the relay server's generation endpoint.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use tracing::{debug, warn};

use super::composer::LocalFile;
use crate::error::{error_message, GenRelayError, Result};
use crate::image::{GenerationResult, Mode, Resolution};

/// Default relay server address.
pub const DEFAULT_SERVER_URL: &str = "http://127.0.0.1:3000";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

/// One image source of a submission, owned so it can outlive the composer borrow.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmissionSource {
    /// Sent as a `files` part.
    File(LocalFile),
    /// Sent as an `imageUrls` part.
    Url(String),
}

/// Everything sent to `/api/generate` in one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Submission {
    /// Generation mode.
    pub mode: Mode,
    /// Prompt text.
    pub prompt: String,
    /// Output resolution.
    pub size: Resolution,
    /// Left to the server default when `None`.
    pub model: Option<String>,
    /// Whether results carry the provider watermark.
    pub watermark: bool,
    /// Sources in the order the user arranged them.
    pub sources: Vec<SubmissionSource>,
}

impl Submission {
    /// Multipart form: scalar fields first, then one `files` or `imageUrls`
    /// part per source in order.
    pub fn to_form(&self) -> Result<Form> {
        let mut form = Form::new()
            .text("mode", self.mode.as_str())
            .text("prompt", self.prompt.clone())
            .text("size", self.size.as_str())
            .text("watermark", if self.watermark { "true" } else { "false" });
        if let Some(model) = self.model.as_deref().filter(|m| !m.trim().is_empty()) {
            form = form.text("model", model.to_string());
        }

        for source in &self.sources {
            form = match source {
                SubmissionSource::File(file) => {
                    let part = Part::bytes(file.data.clone())
                        .file_name(file.name.clone())
                        .mime_str(&file.content_type)?;
                    form.part("files", part)
                }
                SubmissionSource::Url(url) => form.text("imageUrls", url.clone()),
            };
        }
        Ok(form)
    }
}

/// Sends submissions somewhere that can generate images.
#[async_trait]
pub trait Relay: Send + Sync {
    /// Submits one request and returns the generated image URLs.
    async fn generate(&self, submission: &Submission) -> Result<GenerationResult>;
}

#[derive(Deserialize)]
struct ErrorBody {
    #[serde(default)]
    error: serde_json::Value,
}

/// [`Relay`] over HTTP to a running relay server.
#[derive(Debug, Clone)]
pub struct RelayClient {
    client: reqwest::Client,
    base_url: String,
}

impl RelayClient {
    /// Client for the server at `base_url` with the default request timeout.
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        Ok(Self::with_client(client, base_url))
    }

    /// Client reusing an existing [`reqwest::Client`].
    pub fn with_client(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    /// Full URL of the generation endpoint.
    pub fn endpoint(&self) -> String {
        format!("{}/api/generate", self.base_url)
    }

    /// Underlying HTTP client, shared with downloads.
    pub fn http(&self) -> &reqwest::Client {
        &self.client
    }
}

#[async_trait]
impl Relay for RelayClient {
    async fn generate(&self, submission: &Submission) -> Result<GenerationResult> {
        let endpoint = self.endpoint();
        debug!(
            endpoint = %endpoint,
            mode = %submission.mode,
            sources = submission.sources.len(),
            "sending generation request"
        );

        let response = self
            .client
            .post(&endpoint)
            .multipart(submission.to_form()?)
            .send()
            .await?;
        let status = response.status();
        let text = response.text().await?;

        if !status.is_success() {
            let message = serde_json::from_str::<ErrorBody>(&text)
                .ok()
                .map(|b| b.error)
                .filter(|e| !e.is_null())
                .map(|e| error_message(&e))
                .unwrap_or_else(|| "request failed".to_string());
            warn!(status = status.as_u16(), message = %message, "relay rejected request");
            return Err(GenRelayError::Api {
                status: status.as_u16(),
                message,
            });
        }

        serde_json::from_str(&text).map_err(|e| {
            GenRelayError::UnexpectedResponse(format!("invalid relay response: {e}"))
        })
    }
}
