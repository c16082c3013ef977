//! Client state controller.
//!
//! [`Studio`] owns everything the user edits between submissions: the
//! [`Composer`] with its mode and sources, the prompt and output settings,
//! the latest results, and the persisted [`History`]. Submissions go through
//! a [`Relay`], normally a [`RelayClient`] talking to the relay server.
//!
//! ```no_run
//! use genrelay::client::{JsonFileStore, RelayClient, Studio};
//!
//! # async fn run() -> genrelay::Result<()> {
//! let relay = RelayClient::new("http://127.0.0.1:3000")?;
//! let mut studio = Studio::new(relay, JsonFileStore::new("storage.json"));
//! studio.prompt = "a red cup on a wooden table".into();
//! for url in studio.submit().await? {
//!     println!("{url}");
//! }
//! # Ok(())
//! # }
//! ```

mod composer;
mod download;
mod history;
mod preview;
mod relay;

pub use composer::{
    Composer, EditAs, LocalFile, LocalImage, OutgoingSource, PreviewItem, PreviewKind,
    SingleSource, SourceItem, Sources, Unready, UrlItem,
};
pub use download::{download, file_name_from_url, name_from_url};
pub use history::{History, HistoryEntry, HistoryStore, JsonFileStore, HISTORY_KEY, HISTORY_MAX};
pub use preview::{PreviewHandle, PreviewRegistry};
pub use relay::{Relay, RelayClient, Submission, SubmissionSource, DEFAULT_SERVER_URL};

use tracing::{info, warn};

use crate::error::{GenRelayError, Result};
use crate::image::Resolution;

/// The client session: composer, settings, results and history.
pub struct Studio<R: Relay> {
    composer: Composer,
    /// Prompt text as typed.
    pub prompt: String,
    /// Requested output resolution.
    pub size: Resolution,
    /// Model override; the server default applies when `None`.
    pub model: Option<String>,
    /// Whether results should carry the provider watermark.
    pub watermark: bool,
    results: Vec<String>,
    history: History,
    store: Box<dyn HistoryStore>,
    relay: R,
    error: Option<String>,
    loading: bool,
}

impl<R: Relay> Studio<R> {
    /// Creates a session, loading history once from `store`.
    ///
    /// A history that cannot be read is logged and treated as empty.
    pub fn new(relay: R, store: impl HistoryStore + 'static) -> Self {
        let history = match store.load() {
            Ok(history) => history,
            Err(e) => {
                warn!(error = %e, "could not load history, starting empty");
                History::new()
            }
        };
        Self {
            composer: Composer::default(),
            prompt: String::new(),
            size: Resolution::default(),
            model: None,
            watermark: false,
            results: Vec::new(),
            history,
            store: Box::new(store),
            relay,
            error: None,
            loading: false,
        }
    }

    /// Current sources and mode.
    pub fn composer(&self) -> &Composer {
        &self.composer
    }

    /// Mutable access for editing sources.
    pub fn composer_mut(&mut self) -> &mut Composer {
        &mut self.composer
    }

    /// URLs returned by the last successful submission.
    pub fn results(&self) -> &[String] {
        &self.results
    }

    /// Persisted results, newest first.
    pub fn history(&self) -> &History {
        &self.history
    }

    /// Message of the last failure, until dismissed.
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Clears the current error.
    pub fn dismiss_error(&mut self) {
        self.error = None;
    }

    /// True while a submission is in flight.
    pub fn is_loading(&self) -> bool {
        self.loading
    }

    /// Returns true if the current state may be submitted.
    pub fn can_submit(&self) -> bool {
        !self.loading && self.composer.can_submit(&self.prompt)
    }

    /// Snapshot of what [`submit`](Self::submit) would send.
    pub fn submission(&self) -> Submission {
        let sources = self
            .composer
            .outgoing()
            .into_iter()
            .map(|source| match source {
                OutgoingSource::File(file) => SubmissionSource::File(file.clone()),
                OutgoingSource::Url(url) => SubmissionSource::Url(url),
            })
            .collect();
        Submission {
            mode: self.composer.mode(),
            prompt: self.prompt.clone(),
            size: self.size,
            model: self.model.clone(),
            watermark: self.watermark,
            sources,
        }
    }

    /// Sends the current state and records the returned images in history.
    ///
    /// Nothing is sent when the state is not ready; the reason becomes the
    /// current error. Failures are not retried. The `&mut self` receiver keeps
    /// a second submission from starting while one is in flight.
    pub async fn submit(&mut self) -> Result<&[String]> {
        if let Err(reason) = self.composer.readiness(&self.prompt) {
            self.error = Some(reason.to_string());
            return Err(GenRelayError::InvalidRequest(reason.to_string()));
        }

        let submission = self.submission();
        self.error = None;
        self.results.clear();
        let outcome = {
            let _loading = Loading::start(&mut self.loading);
            self.relay.generate(&submission).await
        };

        match outcome {
            Ok(result) => {
                self.results = result.images;
                let added = self.history.record(&self.results);
                if added > 0 {
                    self.persist_history();
                }
                info!(images = self.results.len(), added, "generation finished");
                Ok(self.results.as_slice())
            }
            Err(e) => {
                self.error = Some(user_message(&e));
                Err(e)
            }
        }
    }

    /// Feeds a result back into the composer.
    pub fn continue_editing(&mut self, url: &str, target: EditAs) -> bool {
        self.composer.continue_editing(url, target)
    }

    /// Removes one history entry and saves the rest.
    pub fn remove_history(&mut self, id: &str) -> bool {
        let removed = self.history.remove(id);
        if removed {
            self.persist_history();
        }
        removed
    }

    /// Empties the history and saves it.
    pub fn clear_history(&mut self) {
        self.history.clear();
        self.persist_history();
    }

    fn persist_history(&self) {
        if let Err(e) = self.store.save(&self.history) {
            warn!(error = %e, "could not save history");
        }
    }
}

/// Holds the loading flag for one request; clears it even if the request
/// future is dropped.
struct Loading<'a>(&'a mut bool);

impl<'a> Loading<'a> {
    fn start(flag: &'a mut bool) -> Self {
        *flag = true;
        Self(flag)
    }
}

impl Drop for Loading<'_> {
    fn drop(&mut self) {
        *self.0 = false;
    }
}

fn user_message(err: &GenRelayError) -> String {
    match err {
        GenRelayError::Api { message, .. } => message.clone(),
        other => other.to_string(),
    }
}
