//! Push-notification hand-off contract.
//!
//! The display collaborator lives outside the engine; this module only
//! parses incoming payloads (malformed input falls back to a default body
//! rather than failing the pipeline) and resolves notification clicks
//! against currently open instances.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use url::Url;

use sevacache_core::Error;

/// Title/body/URL payload handed to the display collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationPayload {
    #[serde(default = "default_title")]
    pub title: String,
    #[serde(default = "default_body")]
    pub body: String,
    #[serde(default = "default_url")]
    pub url: String,
}

fn default_title() -> String {
    "Seva".to_string()
}

fn default_body() -> String {
    "You have a new update.".to_string()
}

fn default_url() -> String {
    "/".to_string()
}

impl Default for NotificationPayload {
    fn default() -> Self {
        Self { title: default_title(), body: default_body(), url: default_url() }
    }
}

impl NotificationPayload {
    /// Parse a raw push payload.
    ///
    /// A malformed payload yields the default notification body; the
    /// notification pipeline never fails on bad input.
    pub fn parse(raw: &[u8]) -> Self {
        match serde_json::from_slice(raw) {
            Ok(payload) => payload,
            Err(e) => {
                tracing::warn!(error = %e, "malformed push payload, using default notification");
                Self::default()
            }
        }
    }
}

/// Where a notification click should land.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClickAction {
    /// Focus the already-open instance at this index.
    FocusExisting(usize),
    /// No open instance matches; request a new one.
    OpenNew,
}

/// Resolve a click target against the currently open instance locations.
///
/// Fragments are ignored when matching; the first match is focused.
pub fn resolve_click(open_urls: &[Url], target: &Url) -> ClickAction {
    let mut wanted = target.clone();
    wanted.set_fragment(None);

    for (i, open) in open_urls.iter().enumerate() {
        let mut candidate = open.clone();
        candidate.set_fragment(None);
        if candidate == wanted {
            return ClickAction::FocusExisting(i);
        }
    }
    ClickAction::OpenNew
}

/// Display collaborator interface; implementations live outside the engine.
#[async_trait]
pub trait NotificationSink: Send + Sync {
    async fn display(&self, payload: &NotificationPayload) -> Result<(), Error>;
}
