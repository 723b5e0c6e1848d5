//! Reading the player's current location from the browser window.

mod browser;
mod evidence;
mod script;

pub use browser::{BrowserWindow, BrowserWindowProbe};
pub use evidence::EvidenceStore;

use std::path::PathBuf;

use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CapturedLocation {
    pub latitude: f64,
    pub longitude: f64,
    pub evidence_path: PathBuf,
}

/// Why a probe produced no coordinates. None of these are fatal.
#[derive(Debug, Error)]
pub enum ProbeError {
    #[error("no window with a title containing {needle:?} was found")]
    WindowNotFound { needle: String },
    #[error("could not read the address bar: {0}")]
    AddressUnreadable(String),
    #[error("no @lat,lng coordinates in {text:?}")]
    CoordinatesNotFound { text: String },
    #[error("screenshot failed: {0}")]
    Capture(String),
    #[error("probe gave up after {0}s")]
    Timeout(u64),
    #[error("window automation is not available on this platform")]
    Unsupported,
    #[error("probe worker failed: {0}")]
    Worker(String),
}

/// Captures coordinates and an evidence screenshot for one mark attempt.
///
/// Calls block until the external window has answered or failed, so callers on
/// an event loop should run them on a blocking thread.
pub trait LocationProbe: Send + Sync {
    fn capture_location(&self, label: &str) -> Result<CapturedLocation, ProbeError>;
}
