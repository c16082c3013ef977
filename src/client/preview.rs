//! Ephemeral preview references for locally selected files.
//!
//! Every [`PreviewHandle`] is registered while alive and unregisters itself on
//! drop, so removing or superseding a local image always releases its preview.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

/// Tracks the preview references currently handed out.
#[derive(Debug, Clone, Default)]
pub struct PreviewRegistry {
    live: Arc<Mutex<HashSet<String>>>,
}

impl PreviewRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocates a new preview reference.
    pub fn create(&self) -> PreviewHandle {
        let url = format!("blob:genrelay/{}", uuid::Uuid::new_v4());
        if let Ok(mut live) = self.live.lock() {
            live.insert(url.clone());
        }
        PreviewHandle {
            url,
            live: Arc::clone(&self.live),
        }
    }

    /// Number of preview references not yet released.
    pub fn live(&self) -> usize {
        self.live.lock().map(|l| l.len()).unwrap_or(0)
    }

    /// Returns true if `url` is still registered.
    pub fn is_live(&self, url: &str) -> bool {
        self.live.lock().map(|l| l.contains(url)).unwrap_or(false)
    }
}

/// Owning reference to a preview; released when dropped.
#[derive(Debug)]
pub struct PreviewHandle {
    url: String,
    live: Arc<Mutex<HashSet<String>>>,
}

impl PreviewHandle {
    /// The preview URL.
    pub fn url(&self) -> &str {
        &self.url
    }
}

impl Drop for PreviewHandle {
    fn drop(&mut self) {
        if let Ok(mut live) = self.live.lock() {
            live.remove(&self.url);
        }
    }
}
