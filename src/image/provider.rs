//! Image provider trait.

use crate::error::Result;
use crate::image::types::{GenerationRequest, GenerationResult, ImageProviderKind};
use async_trait::async_trait;

/// Trait for image generation providers.
#[async_trait]
pub trait ImageProvider: Send + Sync {
    /// Generates images for the given request.
    async fn generate(&self, request: &GenerationRequest) -> Result<GenerationResult>;

    /// Returns the kind of this provider.
    fn kind(&self) -> ImageProviderKind;

    /// Returns the name of this provider for display.
    fn name(&self) -> &str {
        match self.kind() {
            ImageProviderKind::Ark => "Seedream (Volcengine Ark)",
        }
    }

    /// Checks if the provider is usable with its current credentials.
    async fn health_check(&self) -> Result<()>;
}
