#![warn(missing_docs)]
//! GenRelay - prompt composer and request relay for Seedream image generation.
//!
//! The crate has two halves that meet at `POST /api/generate`:
//!
//! - [`server`]: an Axum service that accepts a prompt with optional reference
//!   images (uploaded files or URLs), stores uploads in blob storage and relays
//!   the normalized request to the Volcengine Ark image API.
//! - [`client`]: the state controller a front end drives: mode switching,
//!   mixed file/URL sources with drag reordering, readiness checks, submission
//!   and a locally persisted history of results.
//!
//! # Quick Start - Provider
//!
//! ```no_run
//! use genrelay::{ArkProvider, GenerationRequest, ImageProvider, Mode};
//!
//! #[tokio::main]
//! async fn main() -> genrelay::Result<()> {
//!     let provider = ArkProvider::builder().build()?;
//!     let request = GenerationRequest::new("A lighthouse at dusk, oil painting")
//!         .with_mode(Mode::Single)
//!         .with_image_url("https://example.com/sketch.png");
//!     let result = provider.generate(&request).await?;
//!     for url in result.images {
//!         println!("{url}");
//!     }
//!     Ok(())
//! }
//! ```
//!
//! # Quick Start - Server
//!
//! ```no_run
//! use std::sync::Arc;
//! use genrelay::server::{self, AppState, Config};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let state = AppState::from_config(Config::from_env())?;
//!     server::serve(Arc::new(state)).await?;
//!     Ok(())
//! }
//! ```
//!
//! # Features
//!
//! - `server`: the relay HTTP service (axum, tower-http)
//! - `client`: the client state controller and relay client
//! - `cli`: the `genrelay` binary

mod error;

pub mod image;
pub mod storage;

#[cfg(feature = "server")]
pub mod server;

#[cfg(feature = "client")]
pub mod client;

// Re-export error types at crate root
pub use error::{error_message, GenRelayError, Result};

pub use image::providers::{ArkProvider, ArkProviderBuilder};
pub use image::{
    GenerationRequest, GenerationResult, ImageFormat, ImageProvider, ImageProviderKind, Mode,
    Resolution, DEFAULT_MODEL,
};

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::error::{GenRelayError, Result};
    pub use crate::image::providers::ArkProvider;
    pub use crate::image::{GenerationRequest, GenerationResult, ImageProvider, Mode, Resolution};

    #[cfg(feature = "client")]
    pub use crate::client::{Composer, EditAs, Relay, RelayClient, Studio};
}
