use std::path::PathBuf;

use serde::Serialize;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

use crate::models::SessionSummary;

/// Everything the session publishes for the presentation layer.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "kebab-case")]
pub enum SessionEvent {
    #[serde(rename_all = "camelCase")]
    SessionStarted {
        session_id: String,
        total_duration_secs: u64,
    },
    #[serde(rename_all = "camelCase")]
    TimerTick { remaining_secs: u64 },
    #[serde(rename_all = "camelCase")]
    DiscoverySucceeded {
        label: String,
        latitude: f64,
        longitude: f64,
        evidence_path: PathBuf,
        found: usize,
        total: usize,
    },
    #[serde(rename_all = "camelCase")]
    DiscoveryFailed { label: String, reason: String },
    #[serde(rename_all = "camelCase")]
    SinkWriteFailed { label: Option<String>, message: String },
    #[serde(rename_all = "camelCase")]
    SessionFinished { summary: SessionSummary },
}

/// Fire-and-forget publisher. A dropped receiver just means nobody is watching.
#[derive(Clone)]
pub struct EventEmitter {
    tx: UnboundedSender<SessionEvent>,
}

impl EventEmitter {
    pub fn channel() -> (Self, UnboundedReceiver<SessionEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    pub fn emit(&self, event: SessionEvent) {
        let _ = self.tx.send(event);
    }
}
