//! Blob storage for uploaded reference images.
//!
//! The provider only accepts image URLs, so uploaded files are persisted to a
//! blob store first and replaced by the public URL the store hands back.

mod local;
mod vercel;

pub use local::LocalBlobStore;
pub use vercel::{VercelBlobStore, VERCEL_BLOB_API_URL};

use crate::error::Result;
use async_trait::async_trait;

/// Directory prefix every uploaded object lives under.
pub const UPLOAD_PREFIX: &str = "uploads";

/// Trait for stores that turn uploaded bytes into public URLs.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Stores `data` under `name` and returns its public URL.
    async fn put(&self, name: &str, data: Vec<u8>, content_type: &str) -> Result<String>;

    /// Short name of the backend for logs.
    fn kind(&self) -> &'static str;
}

/// Builds the object name for an upload: `uploads/<unix-millis>-<file name>`.
pub fn object_name(file_name: &str, timestamp_millis: i64) -> String {
    format!(
        "{UPLOAD_PREFIX}/{timestamp_millis}-{}",
        sanitize_file_name(file_name)
    )
}

/// Keeps a file name safe to use as a URL path segment and a file name.
pub(crate) fn sanitize_file_name(name: &str) -> String {
    // Browsers may send full client paths; keep only the last component.
    let base = name.rsplit(|c: char| c == '/' || c == '\\').next().unwrap_or_default();
    let cleaned: String = base
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '-'
            }
        })
        .collect();
    let cleaned = cleaned.trim_matches('.');
    if cleaned.is_empty() {
        "image".to_string()
    } else {
        cleaned.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_object_name_format() {
        assert_eq!(
            object_name("cat.png", 1_700_000_000_000),
            "uploads/1700000000000-cat.png"
        );
    }

    #[test]
    fn test_sanitize_strips_paths_and_odd_chars() {
        assert_eq!(sanitize_file_name("../../etc/passwd"), "passwd");
        assert_eq!(sanitize_file_name("C:\\Users\\me\\my cat.jpg"), "my-cat.jpg");
        assert_eq!(sanitize_file_name("猫.png"), "-.png");
        assert_eq!(sanitize_file_name(".."), "image");
        assert_eq!(sanitize_file_name(""), "image");
    }
}
