use std::{fs, io, sync::Arc, time::Duration};

use anyhow::{Context, Result};
use log::{error, info, warn};
use tokio::{
    sync::Mutex,
    task::JoinHandle,
    time::{self, Instant, MissedTickBehavior},
};
use tokio_util::sync::CancellationToken;

use crate::{
    models::{Catalog, SessionPhase, SessionSnapshot, SessionSummary},
    probe::{CapturedLocation, LocationProbe, ProbeError},
    sink::RecordSink,
};

use super::{
    events::{EventEmitter, SessionEvent},
    state::{
        AttemptGate, AttemptOutcome, AttemptTicket, SessionError, SessionState, SkipReason,
        TickOutcome,
    },
};

/// What a mark request turned into, for callers that want more than events.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MarkResult {
    Found { completed: bool },
    NotFound(String),
    Skipped(SkipReason),
    Discarded,
}

struct Ticker {
    handle: JoinHandle<()>,
    cancel: CancellationToken,
}

/// Single writer around [`SessionState`]: owns the countdown, runs probes off
/// the event loop and persists discoveries.
#[derive(Clone)]
pub struct SessionController {
    state: Arc<Mutex<SessionState>>,
    probe: Arc<dyn LocationProbe>,
    sink: Arc<dyn RecordSink>,
    events: EventEmitter,
    ticker: Arc<Mutex<Option<Ticker>>>,
    tick_interval: Duration,
    probe_timeout: Duration,
}

impl SessionController {
    pub fn new(
        catalog: Catalog,
        probe: Arc<dyn LocationProbe>,
        sink: Arc<dyn RecordSink>,
        events: EventEmitter,
    ) -> Self {
        Self {
            state: Arc::new(Mutex::new(SessionState::new(catalog))),
            probe,
            sink,
            events,
            ticker: Arc::new(Mutex::new(None)),
            tick_interval: Duration::from_secs(1),
            probe_timeout: Duration::from_secs(10),
        }
    }

    /// Length of one countdown second. Tests shrink this.
    pub fn with_tick_interval(mut self, tick_interval: Duration) -> Self {
        self.tick_interval = tick_interval;
        self
    }

    pub fn with_probe_timeout(mut self, probe_timeout: Duration) -> Self {
        self.probe_timeout = probe_timeout;
        self
    }

    pub async fn snapshot(&self) -> SessionSnapshot {
        self.state.lock().await.snapshot()
    }

    pub async fn start_session(&self, duration_minutes: u64) -> Result<SessionSnapshot> {
        let mut state = self.state.lock().await;
        if state.phase() != SessionPhase::NotStarted {
            return Err(SessionError::AlreadyStarted.into());
        }

        if let Err(err) = self.sink.reset() {
            error!("Failed to clear previous records: {err}");
            self.events.emit(SessionEvent::SinkWriteFailed {
                label: None,
                message: err.to_string(),
            });
        }

        let finished = state.start(duration_minutes)?;
        info!(
            "Session {} started: {} items, {}s on the clock",
            state.session_id(),
            state.catalog().len(),
            state.total_duration_secs()
        );
        self.events.emit(SessionEvent::SessionStarted {
            session_id: state.session_id().to_string(),
            total_duration_secs: state.total_duration_secs(),
        });

        match finished {
            Some(summary) => self.publish_finished(summary),
            None => self.spawn_ticker().await,
        }

        Ok(state.snapshot())
    }

    /// Try to mark `label` as found. The probe runs on a blocking thread with
    /// the session unlocked; its answer is discarded if the game ended or was
    /// reset meanwhile.
    pub async fn attempt_discovery(&self, label: &str) -> Result<MarkResult, SessionError> {
        let ticket = {
            let mut state = self.state.lock().await;
            match state.begin_attempt(label)? {
                AttemptGate::Proceed(ticket) => ticket,
                AttemptGate::Skip(reason) => {
                    log::debug!("Ignoring mark for {label}: {reason:?}");
                    return Ok(MarkResult::Skipped(reason));
                }
            }
        };

        let probed = self.run_probe(&ticket).await;

        let mut state = self.state.lock().await;
        match state.complete_attempt(&ticket, probed) {
            AttemptOutcome::Discarded => {
                info!("Discarding late probe result for {label}");
                Ok(MarkResult::Discarded)
            }
            AttemptOutcome::Failed(err) => {
                warn!("Could not read coordinates for {label}: {err}");
                let reason = err.to_string();
                self.events.emit(SessionEvent::DiscoveryFailed {
                    label: label.to_string(),
                    reason: reason.clone(),
                });
                Ok(MarkResult::NotFound(reason))
            }
            AttemptOutcome::Discovered {
                discovery,
                finished,
            } => {
                info!(
                    "{}: {}, {}",
                    discovery.label, discovery.latitude, discovery.longitude
                );

                // Still under the session lock, so appends land in discovery order.
                if let Err(err) = self.sink.append(&discovery) {
                    error!("Failed to persist {}: {err}", discovery.label);
                    self.events.emit(SessionEvent::SinkWriteFailed {
                        label: Some(discovery.label.clone()),
                        message: err.to_string(),
                    });
                }

                self.events.emit(SessionEvent::DiscoverySucceeded {
                    label: discovery.label.clone(),
                    latitude: discovery.latitude,
                    longitude: discovery.longitude,
                    evidence_path: discovery.evidence_path.clone(),
                    found: state.discoveries().len(),
                    total: state.catalog().len(),
                });

                let completed = finished.is_some();
                if let Some(summary) = finished {
                    info!("Bingo complete!");
                    self.cancel_ticker().await;
                    self.publish_finished(summary);
                }
                Ok(MarkResult::Found { completed })
            }
        }
    }

    /// Start over after a finished game. Records are cleared on the next start.
    pub async fn reset_session(&self) -> Result<SessionSnapshot, SessionError> {
        let mut state = self.state.lock().await;
        state.reset()?;
        self.cancel_ticker().await;
        info!("Session reset; new session {}", state.session_id());
        Ok(state.snapshot())
    }

    /// Stop the countdown task and wait for it to exit.
    pub async fn shutdown(&self) -> Result<()> {
        let ticker = self.ticker.lock().await.take();
        if let Some(ticker) = ticker {
            ticker.cancel.cancel();
            ticker
                .handle
                .await
                .context("countdown task failed to join")?;
        }
        Ok(())
    }

    async fn run_probe(&self, ticket: &AttemptTicket) -> Result<CapturedLocation, ProbeError> {
        let probe = Arc::clone(&self.probe);
        let label = ticket.label().to_string();
        let mut worker = tokio::task::spawn_blocking(move || probe.capture_location(&label));

        match time::timeout(self.probe_timeout, &mut worker).await {
            Ok(Ok(result)) => result,
            Ok(Err(join_err)) => Err(ProbeError::Worker(join_err.to_string())),
            Err(_) => {
                self.reap_abandoned(ticket.clone(), worker);
                Err(ProbeError::Timeout(self.probe_timeout.as_secs()))
            }
        }
    }

    /// Wait out a timed-out worker: drop any screenshot it still saves, then
    /// free its label for another attempt.
    fn reap_abandoned(
        &self,
        ticket: AttemptTicket,
        worker: JoinHandle<Result<CapturedLocation, ProbeError>>,
    ) {
        let state = Arc::clone(&self.state);
        tokio::spawn(async move {
            if let Ok(Ok(location)) = worker.await {
                match fs::remove_file(&location.evidence_path) {
                    Ok(()) => info!(
                        "Removed evidence from abandoned attempt: {}",
                        location.evidence_path.display()
                    ),
                    Err(err) if err.kind() == io::ErrorKind::NotFound => {}
                    Err(err) => warn!(
                        "Could not remove {}: {err}",
                        location.evidence_path.display()
                    ),
                }
            }
            state.lock().await.release_attempt(&ticket);
            log::debug!("Abandoned attempt for {} has returned", ticket.label());
        });
    }

    async fn spawn_ticker(&self) {
        let mut ticker_guard = self.ticker.lock().await;
        if let Some(previous) = ticker_guard.take() {
            previous.cancel.cancel();
            previous.handle.abort();
        }

        let cancel = CancellationToken::new();
        let token = cancel.clone();
        let controller = self.clone();
        let period = self.tick_interval;

        let handle = tokio::spawn(async move {
            let mut interval = time::interval_at(Instant::now() + period, period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Burst);

            loop {
                tokio::select! {
                    _ = interval.tick() => {
                        if !controller.handle_tick().await {
                            break;
                        }
                    }
                    _ = token.cancelled() => {
                        log::debug!("countdown cancelled");
                        break;
                    }
                }
            }
        });

        *ticker_guard = Some(Ticker { handle, cancel });
    }

    /// Returns whether the countdown should keep going.
    async fn handle_tick(&self) -> bool {
        let mut state = self.state.lock().await;
        match state.tick() {
            TickOutcome::Ignored => false,
            TickOutcome::Remaining(remaining_secs) => {
                self.events.emit(SessionEvent::TimerTick { remaining_secs });
                true
            }
            TickOutcome::Expired(summary) => {
                self.events.emit(SessionEvent::TimerTick { remaining_secs: 0 });
                info!("Time is up");
                self.publish_finished(summary);
                false
            }
        }
    }

    async fn cancel_ticker(&self) {
        if let Some(ticker) = self.ticker.lock().await.as_ref() {
            ticker.cancel.cancel();
        }
    }

    fn publish_finished(&self, summary: SessionSummary) {
        info!(
            "Session finished ({:?}): {} found, {} remaining, {}s taken",
            summary.reason, summary.items_found, summary.items_remaining, summary.time_taken_secs
        );
        self.events.emit(SessionEvent::SessionFinished { summary });
    }
}
