//! Saving generated images to disk.

use std::path::{Path, PathBuf};

use percent_encoding::percent_decode_str;
use tracing::info;

use crate::error::{GenRelayError, Result};
use crate::image::ImageFormat;
use crate::storage::sanitize_file_name;

/// Last path segment of `url`, percent-decoded, or `None` if there is none.
///
/// Strings that do not parse as absolute URLs are treated as bare paths.
pub fn name_from_url(url: &str) -> Option<String> {
    let url = url.trim();
    let last = match reqwest::Url::parse(url) {
        Ok(parsed) => parsed
            .path_segments()
            .and_then(|mut segments| segments.next_back())
            .unwrap_or_default()
            .to_string(),
        Err(_) => {
            let path = url.split(['?', '#']).next().unwrap_or_default();
            path.rsplit('/').next().unwrap_or_default().to_string()
        }
    };
    let name = percent_decode_str(&last).decode_utf8_lossy();
    let name = name.trim();
    (!name.is_empty()).then(|| name.to_string())
}

/// File name to save `url` under; `image` when the URL has no usable name.
pub fn file_name_from_url(url: &str) -> String {
    name_from_url(url)
        .map(|name| sanitize_file_name(&name))
        .unwrap_or_else(|| "image".to_string())
}

/// Fetches `url` and writes it into `dir`, returning the saved path.
///
/// A missing extension is filled in from the image's magic bytes.
pub async fn download(client: &reqwest::Client, url: &str, dir: &Path) -> Result<PathBuf> {
    let response = client.get(url).send().await?;
    let status = response.status();
    if !status.is_success() {
        return Err(GenRelayError::Api {
            status: status.as_u16(),
            message: format!("download failed for {url}"),
        });
    }
    let data = response.bytes().await?;

    let mut name = file_name_from_url(url);
    if Path::new(&name).extension().is_none() {
        if let Some(format) = ImageFormat::from_magic_bytes(&data) {
            name = format!("{name}.{}", format.extension());
        }
    }

    tokio::fs::create_dir_all(dir).await?;
    let path = dir.join(&name);
    tokio::fs::write(&path, &data).await?;
    info!(path = %path.display(), bytes = data.len(), "image downloaded");
    Ok(path)
}
