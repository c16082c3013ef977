//! Image generation module.

mod provider;
pub mod providers;
mod types;

pub use provider::ImageProvider;
pub use types::{
    is_image_content_type, GenerationRequest, GenerationResult, ImageFormat, ImageProviderKind,
    ImageSource, Mode, Resolution, DEFAULT_MODEL,
};
