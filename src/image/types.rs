//! Core types for image generation requests and results.

use crate::error::{GenRelayError, Result};
use serde::{Deserialize, Serialize};

/// Model used when the caller does not name one.
pub const DEFAULT_MODEL: &str = "doubao-seedream-4-0-250828";

/// Generation flow selected by the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Mode {
    /// Text-to-image, no reference images.
    #[default]
    #[serde(rename = "text")]
    Text,
    /// Exactly one reference image.
    #[serde(rename = "img")]
    Single,
    /// Two or more reference images.
    #[serde(rename = "imgs")]
    Multi,
}

impl Mode {
    /// Returns the wire name of this mode.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Single => "img",
            Self::Multi => "imgs",
        }
    }

    /// Parses a wire name, falling back to [`Mode::Text`] for anything unknown.
    pub fn parse_lenient(s: &str) -> Self {
        match s.trim() {
            "img" => Self::Single,
            "imgs" => Self::Multi,
            "text" | "" => Self::Text,
            other => {
                tracing::debug!(mode = other, "unknown mode, falling back to text");
                Self::Text
            }
        }
    }

    /// Returns true if this mode needs at least one image source.
    pub fn requires_images(&self) -> bool {
        !matches!(self, Self::Text)
    }

    /// Minimum number of image sources a submission in this mode must carry.
    pub fn min_sources(&self) -> usize {
        match self {
            Self::Text => 0,
            Self::Single => 1,
            Self::Multi => 2,
        }
    }
}

impl std::fmt::Display for Mode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Output resolution accepted by the provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Resolution {
    /// Roughly 1024px on the long edge.
    #[serde(rename = "1K")]
    OneK,
    /// Roughly 2048px on the long edge.
    #[default]
    #[serde(rename = "2K")]
    TwoK,
    /// Roughly 4096px on the long edge.
    #[serde(rename = "4K")]
    FourK,
}

impl Resolution {
    /// Returns the resolution as sent on the wire (e.g., "2K").
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::OneK => "1K",
            Self::TwoK => "2K",
            Self::FourK => "4K",
        }
    }

    /// Parses a value from the allow-list, normalizing anything else to 2K.
    pub fn parse_lenient(s: &str) -> Self {
        s.parse().unwrap_or_else(|_| {
            tracing::debug!(size = s, "resolution outside allow-list, using 2K");
            Self::default()
        })
    }
}

impl std::str::FromStr for Resolution {
    type Err = GenRelayError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "1K" => Ok(Self::OneK),
            "2K" => Ok(Self::TwoK),
            "4K" => Ok(Self::FourK),
            other => Err(GenRelayError::InvalidRequest(format!(
                "unsupported resolution '{other}', expected 1K, 2K or 4K"
            ))),
        }
    }
}

impl std::fmt::Display for Resolution {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Supported upload image formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageFormat {
    /// PNG format (lossless).
    Png,
    /// JPEG format (lossy).
    Jpeg,
    /// WebP format (modern, efficient).
    WebP,
    /// GIF format.
    Gif,
}

impl ImageFormat {
    /// Returns the file extension for this format.
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Png => "png",
            Self::Jpeg => "jpg",
            Self::WebP => "webp",
            Self::Gif => "gif",
        }
    }

    /// Returns the MIME type for this format.
    pub fn mime_type(&self) -> &'static str {
        match self {
            Self::Png => "image/png",
            Self::Jpeg => "image/jpeg",
            Self::WebP => "image/webp",
            Self::Gif => "image/gif",
        }
    }

    /// Attempts to detect format from file extension.
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "png" => Some(Self::Png),
            "jpg" | "jpeg" => Some(Self::Jpeg),
            "webp" => Some(Self::WebP),
            "gif" => Some(Self::Gif),
            _ => None,
        }
    }

    /// Detects image format from magic bytes.
    pub fn from_magic_bytes(data: &[u8]) -> Option<Self> {
        if data.len() < 12 {
            return None;
        }

        // PNG: 89 50 4E 47 0D 0A 1A 0A
        if data.starts_with(&[0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A]) {
            return Some(Self::Png);
        }

        // JPEG: FF D8 FF
        if data.starts_with(&[0xFF, 0xD8, 0xFF]) {
            return Some(Self::Jpeg);
        }

        // WebP: RIFF....WEBP
        if data.starts_with(b"RIFF") && &data[8..12] == b"WEBP" {
            return Some(Self::WebP);
        }

        if data.starts_with(b"GIF87a") || data.starts_with(b"GIF89a") {
            return Some(Self::Gif);
        }

        None
    }
}

/// Returns true if a declared content type names an image.
pub fn is_image_content_type(content_type: &str) -> bool {
    content_type
        .trim()
        .to_ascii_lowercase()
        .starts_with("image/")
}

/// Provider kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageProviderKind {
    /// Volcengine Ark (Seedream models).
    Ark,
}

impl std::fmt::Display for ImageProviderKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Ark => write!(f, "ark"),
        }
    }
}

/// Reference images forwarded to the provider.
///
/// One source travels as a scalar string, several as an ordered list.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
#[serde(untagged)]
pub enum ImageSource {
    /// No reference image.
    #[default]
    None,
    /// A single reference image URL.
    Single(String),
    /// Several reference image URLs, in order.
    Multiple(Vec<String>),
}

impl ImageSource {
    /// Builds a source from URLs, dropping blank entries.
    pub fn from_urls<I, S>(urls: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut urls: Vec<String> = urls
            .into_iter()
            .map(|u| u.as_ref().trim().to_string())
            .filter(|u| !u.is_empty())
            .collect();
        match urls.len() {
            0 => Self::None,
            1 => Self::Single(urls.remove(0)),
            _ => Self::Multiple(urls),
        }
    }

    /// Returns true if there is no reference image.
    pub fn is_none(&self) -> bool {
        matches!(self, Self::None)
    }

    /// Number of reference images.
    pub fn len(&self) -> usize {
        match self {
            Self::None => 0,
            Self::Single(_) => 1,
            Self::Multiple(urls) => urls.len(),
        }
    }

    /// Returns true if there is no reference image.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A normalized request to generate images.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationRequest {
    /// Generation flow.
    pub mode: Mode,
    /// The text prompt describing the desired image.
    pub prompt: String,
    /// Provider model identifier.
    pub model: String,
    /// Output resolution.
    pub size: Resolution,
    /// Whether the provider should watermark results.
    pub watermark: bool,
    /// Reference image URLs, in the order the user arranged them.
    pub image_urls: Vec<String>,
}

impl GenerationRequest {
    /// Creates a text-mode request with the given prompt and default settings.
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            mode: Mode::Text,
            prompt: prompt.into(),
            model: DEFAULT_MODEL.to_string(),
            size: Resolution::default(),
            watermark: false,
            image_urls: Vec::new(),
        }
    }

    /// Sets the generation mode.
    pub fn with_mode(mut self, mode: Mode) -> Self {
        self.mode = mode;
        self
    }

    /// Sets the model, keeping the default when `model` is blank.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        let model = model.into();
        if !model.trim().is_empty() {
            self.model = model.trim().to_string();
        }
        self
    }

    /// Sets the output resolution.
    pub fn with_size(mut self, size: Resolution) -> Self {
        self.size = size;
        self
    }

    /// Sets the watermark flag.
    pub fn with_watermark(mut self, watermark: bool) -> Self {
        self.watermark = watermark;
        self
    }

    /// Appends one reference image URL.
    pub fn with_image_url(mut self, url: impl Into<String>) -> Self {
        self.image_urls.push(url.into());
        self
    }

    /// Appends several reference image URLs.
    pub fn with_image_urls<I, S>(mut self, urls: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.image_urls.extend(urls.into_iter().map(Into::into));
        self
    }

    /// Returns the reference images in provider shape.
    pub fn image_source(&self) -> ImageSource {
        ImageSource::from_urls(&self.image_urls)
    }

    /// Checks the fields that have no safe default.
    pub fn validate(&self) -> Result<()> {
        if self.prompt.trim().is_empty() {
            return Err(GenRelayError::InvalidRequest("missing prompt".into()));
        }
        if self.mode.requires_images() && self.image_source().is_none() {
            return Err(GenRelayError::InvalidRequest(format!(
                "mode '{}' requires at least one image",
                self.mode
            )));
        }
        Ok(())
    }
}

/// Result URLs plus the provider's untouched response.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GenerationResult {
    /// Generated image URLs, in provider order.
    #[serde(default)]
    pub images: Vec<String>,
    /// Raw provider response.
    #[serde(default)]
    pub raw: serde_json::Value,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const PNG_MAGIC: [u8; 12] = [0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A, 0, 0, 0, 0];
    const JPEG_MAGIC: [u8; 12] = [0xFF, 0xD8, 0xFF, 0xE0, 0, 0, 0, 0, 0, 0, 0, 0];

    #[test]
    fn test_mode_wire_names() {
        assert_eq!(Mode::parse_lenient("img"), Mode::Single);
        assert_eq!(Mode::parse_lenient("imgs"), Mode::Multi);
        assert_eq!(Mode::parse_lenient("text"), Mode::Text);
        assert_eq!(Mode::parse_lenient("bogus"), Mode::Text);
        assert_eq!(serde_json::to_value(Mode::Multi).unwrap(), json!("imgs"));
    }

    #[test]
    fn test_resolution_normalization() {
        assert_eq!(Resolution::parse_lenient("1K"), Resolution::OneK);
        assert_eq!(Resolution::parse_lenient("4K"), Resolution::FourK);
        assert_eq!(Resolution::parse_lenient("8K"), Resolution::TwoK);
        assert_eq!(Resolution::parse_lenient("1k"), Resolution::TwoK);
        assert_eq!(Resolution::parse_lenient(""), Resolution::TwoK);
        assert!("3K".parse::<Resolution>().is_err());
    }

    #[test]
    fn test_format_detection() {
        assert_eq!(
            ImageFormat::from_magic_bytes(&PNG_MAGIC),
            Some(ImageFormat::Png)
        );
        assert_eq!(
            ImageFormat::from_magic_bytes(&JPEG_MAGIC),
            Some(ImageFormat::Jpeg)
        );
        assert_eq!(ImageFormat::from_magic_bytes(b"hello world!"), None);
        assert_eq!(ImageFormat::from_extension("JPEG"), Some(ImageFormat::Jpeg));
        assert!(is_image_content_type("image/webp"));
        assert!(!is_image_content_type("text/plain"));
    }

    #[test]
    fn test_image_source_shape() {
        let none: [&str; 0] = [];
        assert_eq!(ImageSource::from_urls(none), ImageSource::None);
        assert_eq!(
            serde_json::to_value(ImageSource::from_urls(["https://a/1.png", " "])).unwrap(),
            json!("https://a/1.png")
        );
        assert_eq!(
            serde_json::to_value(ImageSource::from_urls(["https://a/1.png", "https://a/2.png"]))
                .unwrap(),
            json!(["https://a/1.png", "https://a/2.png"])
        );
    }

    #[test]
    fn test_validate_text_mode() {
        assert!(GenerationRequest::new("a red cup").validate().is_ok());
        assert!(GenerationRequest::new("   ").validate().is_err());
    }

    #[test]
    fn test_validate_image_modes_need_sources() {
        let req = GenerationRequest::new("cat").with_mode(Mode::Single);
        assert!(req.validate().unwrap_err().is_validation());

        let req = req.with_image_url("https://example.com/cat.png");
        assert!(req.validate().is_ok());
    }

    #[test]
    fn test_blank_model_keeps_default() {
        let req = GenerationRequest::new("x").with_model("  ");
        assert_eq!(req.model, DEFAULT_MODEL);
        let req = GenerationRequest::new("x").with_model("seedream-custom");
        assert_eq!(req.model, "seedream-custom");
    }
}
