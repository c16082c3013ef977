//! Server configuration, loaded from environment variables at startup.

use std::path::PathBuf;

/// Runtime configuration for the relay server.
///
/// Every field has a default so the server starts without any environment
/// variables set, apart from the provider credential.
#[derive(Debug, Clone)]
pub struct Config {
    /// TCP address to bind (default: `"0.0.0.0:3000"`).
    pub bind_address: String,

    /// `tracing` filter string, e.g. `"info"` or `"debug,tower_http=warn"`.
    pub log_level: String,

    /// When `true`, emit log records as newline-delimited JSON.
    pub log_json: bool,

    /// Comma-separated list of allowed CORS origins; wildcard when unset.
    pub cors_allowed_origins: Option<String>,

    /// Maximum accepted request body in bytes (multipart uploads included).
    pub body_limit: usize,

    /// Directory for the local blob store. Ignored when a blob token is set.
    pub upload_dir: Option<PathBuf>,

    /// Public base URL used to address locally stored uploads.
    pub public_url: String,

    /// Vercel Blob read/write token.
    pub blob_token: Option<String>,

    /// Override for the provider endpoint.
    pub ark_url: Option<String>,
}

impl Config {
    /// Build [`Config`] from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        Self {
            bind_address: env_or("GENRELAY_BIND", "0.0.0.0:3000"),
            log_level: env_or("GENRELAY_LOG", "info"),
            log_json: std::env::var("GENRELAY_LOG_JSON")
                .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
                .unwrap_or(false),
            cors_allowed_origins: env_opt("GENRELAY_CORS_ORIGINS"),
            body_limit: parse_env("GENRELAY_BODY_LIMIT", 32 * 1024 * 1024),
            upload_dir: env_opt("GENRELAY_UPLOAD_DIR").map(PathBuf::from),
            public_url: env_or("GENRELAY_PUBLIC_URL", "http://localhost:3000"),
            blob_token: env_opt("BLOB_READ_WRITE_TOKEN"),
            ark_url: env_opt("ARK_URL"),
        }
    }

    /// Directory to serve under `/uploads` when the local blob store is active.
    pub fn local_upload_root(&self) -> Option<&PathBuf> {
        if self.blob_token.is_some() {
            None
        } else {
            self.upload_dir.as_ref()
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:3000".to_owned(),
            log_level: "info".to_owned(),
            log_json: false,
            cors_allowed_origins: None,
            body_limit: 32 * 1024 * 1024,
            upload_dir: None,
            public_url: "http://localhost:3000".to_owned(),
            blob_token: None,
            ark_url: None,
        }
    }
}

// ── private helpers ──────────────────────────────────────────────────────────

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_owned())
}

fn env_opt(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn parse_env<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
