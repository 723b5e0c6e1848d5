use std::collections::HashSet;

use chrono::{DateTime, Utc};
use thiserror::Error;
use uuid::Uuid;

use crate::{
    models::{
        Catalog, Discovery, FinishReason, SessionPhase, SessionSnapshot, SessionSummary,
    },
    probe::{CapturedLocation, ProbeError},
};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SessionError {
    #[error("session already started")]
    AlreadyStarted,
    #[error("{0:?} is not on this bingo card")]
    UnknownItem(String),
    #[error("only a finished session can be reset")]
    NotFinished,
}

/// Whether a mark attempt should go on to probe the browser.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttemptGate {
    Proceed(AttemptTicket),
    Skip(SkipReason),
}

/// Issued by [`SessionState::begin_attempt`]; ties a probe answer to the
/// session that asked for it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttemptTicket {
    session_id: String,
    label: String,
}

impl AttemptTicket {
    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    NotRunning,
    AlreadyFound,
    InFlight,
}

#[derive(Debug)]
pub enum AttemptOutcome {
    Discovered {
        discovery: Discovery,
        /// Set when this discovery completed the card.
        finished: Option<SessionSummary>,
    },
    Failed(ProbeError),
    /// The probe answered after its session ended, after a reset, or after the
    /// item was already found.
    Discarded,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TickOutcome {
    Ignored,
    Remaining(u64),
    Expired(SessionSummary),
}

/// One bingo session. Not thread-safe; drive it from a single writer.
#[derive(Debug, Clone)]
pub struct SessionState {
    session_id: String,
    catalog: Catalog,
    discoveries: Vec<Discovery>,
    in_flight: HashSet<String>,
    total_duration_secs: u64,
    remaining_secs: u64,
    phase: SessionPhase,
    finish_reason: Option<FinishReason>,
    started_at: Option<DateTime<Utc>>,
    finished_at: Option<DateTime<Utc>>,
}

impl SessionState {
    pub fn new(catalog: Catalog) -> Self {
        Self {
            session_id: Uuid::new_v4().to_string(),
            catalog,
            discoveries: Vec::new(),
            in_flight: HashSet::new(),
            total_duration_secs: 0,
            remaining_secs: 0,
            phase: SessionPhase::NotStarted,
            finish_reason: None,
            started_at: None,
            finished_at: None,
        }
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    pub fn finish_reason(&self) -> Option<FinishReason> {
        self.finish_reason
    }

    pub fn remaining_secs(&self) -> u64 {
        self.remaining_secs
    }

    pub fn total_duration_secs(&self) -> u64 {
        self.total_duration_secs
    }

    /// Discoveries in the order they were made.
    pub fn discoveries(&self) -> &[Discovery] {
        &self.discoveries
    }

    pub fn is_found(&self, label: &str) -> bool {
        self.discoveries.iter().any(|d| d.label == label)
    }

    /// Start the countdown. A zero-minute game ends immediately as a loss, in
    /// which case the summary is returned.
    pub fn start(&mut self, duration_minutes: u64) -> Result<Option<SessionSummary>, SessionError> {
        if self.phase != SessionPhase::NotStarted {
            return Err(SessionError::AlreadyStarted);
        }

        self.total_duration_secs = duration_minutes.saturating_mul(60);
        self.remaining_secs = self.total_duration_secs;
        self.phase = SessionPhase::Running;
        self.started_at = Some(Utc::now());

        if self.total_duration_secs == 0 {
            return Ok(self.finish(FinishReason::TimedOut));
        }
        Ok(None)
    }

    /// One second of wall-clock time has passed.
    pub fn tick(&mut self) -> TickOutcome {
        if self.phase != SessionPhase::Running {
            return TickOutcome::Ignored;
        }

        self.remaining_secs = self.remaining_secs.saturating_sub(1);
        if self.remaining_secs == 0 {
            match self.finish(FinishReason::TimedOut) {
                Some(summary) => TickOutcome::Expired(summary),
                None => TickOutcome::Ignored,
            }
        } else {
            TickOutcome::Remaining(self.remaining_secs)
        }
    }

    /// First half of a mark attempt: decide whether to probe at all.
    pub fn begin_attempt(&mut self, label: &str) -> Result<AttemptGate, SessionError> {
        if !self.catalog.contains(label) {
            return Err(SessionError::UnknownItem(label.to_string()));
        }
        if self.phase != SessionPhase::Running {
            return Ok(AttemptGate::Skip(SkipReason::NotRunning));
        }
        if self.is_found(label) {
            return Ok(AttemptGate::Skip(SkipReason::AlreadyFound));
        }
        if !self.in_flight.insert(label.to_string()) {
            return Ok(AttemptGate::Skip(SkipReason::InFlight));
        }
        Ok(AttemptGate::Proceed(AttemptTicket {
            session_id: self.session_id.clone(),
            label: label.to_string(),
        }))
    }

    /// Second half of a mark attempt: apply what the probe returned.
    ///
    /// A timed-out probe keeps its label in flight: the worker is still running
    /// and [`release_attempt`](Self::release_attempt) frees the label once it
    /// returns.
    pub fn complete_attempt(
        &mut self,
        ticket: &AttemptTicket,
        probed: Result<CapturedLocation, ProbeError>,
    ) -> AttemptOutcome {
        if ticket.session_id != self.session_id {
            return AttemptOutcome::Discarded;
        }

        let label = ticket.label.as_str();
        if !matches!(probed, Err(ProbeError::Timeout(_))) {
            self.in_flight.remove(label);
        }

        if self.phase != SessionPhase::Running || self.is_found(label) {
            return AttemptOutcome::Discarded;
        }

        let location = match probed {
            Ok(location) => location,
            Err(err) => return AttemptOutcome::Failed(err),
        };

        let discovery = Discovery {
            label: label.to_string(),
            latitude: location.latitude,
            longitude: location.longitude,
            evidence_path: location.evidence_path,
            discovered_at: Utc::now(),
        };
        self.discoveries.push(discovery.clone());

        let finished = if self.discoveries.len() == self.catalog.len() {
            self.finish(FinishReason::Completed)
        } else {
            None
        };

        AttemptOutcome::Discovered { discovery, finished }
    }

    /// The worker behind `ticket` has returned. No effect on a later session.
    pub fn release_attempt(&mut self, ticket: &AttemptTicket) {
        if ticket.session_id == self.session_id {
            self.in_flight.remove(&ticket.label);
        }
    }

    pub fn is_in_flight(&self, label: &str) -> bool {
        self.in_flight.contains(label)
    }

    /// Finalise the session. Only the first call while running has any effect.
    pub(crate) fn finish(&mut self, reason: FinishReason) -> Option<SessionSummary> {
        if self.phase != SessionPhase::Running {
            return None;
        }

        self.phase = SessionPhase::Finished;
        self.finish_reason = Some(reason);
        self.finished_at = Some(Utc::now());
        self.in_flight.clear();
        self.summary()
    }

    pub fn summary(&self) -> Option<SessionSummary> {
        let reason = self.finish_reason?;
        let items_found = self.discoveries.len();
        Some(SessionSummary {
            items_found,
            items_remaining: self.catalog.len() - items_found,
            time_taken_secs: self.total_duration_secs - self.remaining_secs,
            result: reason.into(),
            reason,
        })
    }

    /// Replace a finished session with a fresh one over the same card.
    pub fn reset(&mut self) -> Result<(), SessionError> {
        if self.phase != SessionPhase::Finished {
            return Err(SessionError::NotFinished);
        }
        *self = Self::new(self.catalog.clone());
        Ok(())
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            session_id: self.session_id.clone(),
            phase: self.phase,
            finish_reason: self.finish_reason,
            total_duration_secs: self.total_duration_secs,
            remaining_secs: self.remaining_secs,
            found: self.discoveries.iter().map(|d| d.label.clone()).collect(),
            catalog_size: self.catalog.len(),
            started_at: self.started_at,
            finished_at: self.finished_at,
            summary: self.summary(),
        }
    }
}
