//! Seedream image generation through Volcengine Ark.

use crate::error::{GenRelayError, Result};
use crate::image::provider::ImageProvider;
use crate::image::types::{
    GenerationRequest, GenerationResult, ImageProviderKind, ImageSource, Resolution,
};
use async_trait::async_trait;
use serde::Serialize;
use std::time::{Duration, Instant};

/// Default Ark image generation endpoint.
pub const GENERATIONS_URL: &str = "https://ark.cn-beijing.volces.com/api/v3/images/generations";

/// Upper bound for a single synchronous generation call.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// Builder for ArkProvider.
#[derive(Debug, Clone, Default)]
pub struct ArkProviderBuilder {
    api_key: Option<String>,
    endpoint: Option<String>,
    timeout: Option<Duration>,
}

impl ArkProviderBuilder {
    /// Creates a new builder with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the API key. Falls back to `VOLC_API_KEY` env var.
    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    /// Overrides the generation endpoint. Falls back to `ARK_URL` env var.
    pub fn endpoint(mut self, url: impl Into<String>) -> Self {
        self.endpoint = Some(url.into());
        self
    }

    /// Sets the request timeout (default 60s).
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Builds the provider, resolving the API key.
    pub fn build(self) -> Result<ArkProvider> {
        let api_key = self
            .api_key
            .or_else(|| std::env::var("VOLC_API_KEY").ok())
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| {
                GenRelayError::Auth("VOLC_API_KEY not set and no API key provided".into())
            })?;

        let endpoint = self
            .endpoint
            .or_else(|| std::env::var("ARK_URL").ok())
            .unwrap_or_else(|| GENERATIONS_URL.to_string());

        let client = reqwest::Client::builder()
            .timeout(self.timeout.unwrap_or(REQUEST_TIMEOUT))
            .build()?;

        Ok(ArkProvider {
            client,
            api_key,
            endpoint,
        })
    }
}

/// Seedream provider talking to the Ark generations endpoint.
pub struct ArkProvider {
    client: reqwest::Client,
    api_key: String,
    endpoint: String,
}

impl ArkProvider {
    /// Creates a new `ArkProviderBuilder`.
    pub fn builder() -> ArkProviderBuilder {
        ArkProviderBuilder::new()
    }

    /// Returns the endpoint requests are sent to.
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Keeps the provider's error payload intact so callers can relay it.
    fn parse_error(status: u16, text: &str) -> GenRelayError {
        let body = match serde_json::from_str::<serde_json::Value>(text) {
            Ok(value) => match value.get("error") {
                Some(err) if is_present(err) => err.clone(),
                _ => value,
            },
            Err(_) => serde_json::Value::String(text.to_string()),
        };
        GenRelayError::Provider { status, body }
    }
}

fn is_present(value: &serde_json::Value) -> bool {
    match value {
        serde_json::Value::Null => false,
        serde_json::Value::Bool(b) => *b,
        serde_json::Value::String(s) => !s.is_empty(),
        _ => true,
    }
}

/// Pulls `data[].url` out of a provider response, skipping blanks.
fn extract_urls(raw: &serde_json::Value) -> Vec<String> {
    raw.get("data")
        .and_then(|d| d.as_array())
        .map(|items| {
            items
                .iter()
                .filter_map(|item| item.get("url").and_then(|u| u.as_str()))
                .filter(|u| !u.is_empty())
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

#[async_trait]
impl ImageProvider for ArkProvider {
    async fn generate(&self, request: &GenerationRequest) -> Result<GenerationResult> {
        request.validate()?;
        let start = Instant::now();

        let body = ArkRequest::from_generation_request(request);
        tracing::debug!(
            model = %body.model,
            size = %body.size,
            images = body.image.len(),
            "sending Ark generation request"
        );

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;
        if !status.is_success() {
            tracing::warn!(status = status.as_u16(), "Ark rejected generation request");
            return Err(Self::parse_error(status.as_u16(), &text));
        }

        let raw: serde_json::Value = serde_json::from_str(&text).map_err(|e| {
            GenRelayError::UnexpectedResponse(format!("Ark returned invalid JSON: {e}"))
        })?;
        let images = extract_urls(&raw);

        tracing::info!(
            count = images.len(),
            duration_ms = start.elapsed().as_millis() as u64,
            "Ark generation finished"
        );

        Ok(GenerationResult { images, raw })
    }

    fn kind(&self) -> ImageProviderKind {
        ImageProviderKind::Ark
    }

    async fn health_check(&self) -> Result<()> {
        // Ark exposes no cheap authenticated probe; only the key shape is checked.
        if self.api_key.chars().any(char::is_whitespace) {
            Err(GenRelayError::Auth("Invalid API key format".into()))
        } else {
            Ok(())
        }
    }
}

#[derive(Debug, Serialize)]
struct ArkRequest {
    model: String,
    prompt: String,
    sequential_image_generation: &'static str,
    response_format: &'static str,
    size: Resolution,
    stream: bool,
    watermark: bool,
    #[serde(skip_serializing_if = "ImageSource::is_none")]
    image: ImageSource,
}

impl ArkRequest {
    fn from_generation_request(req: &GenerationRequest) -> Self {
        Self {
            model: req.model.clone(),
            prompt: req.prompt.clone(),
            sequential_image_generation: "disabled",
            response_format: "url",
            size: req.size,
            stream: false,
            watermark: req.watermark,
            image: req.image_source(),
        }
    }
}
