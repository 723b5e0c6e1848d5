//! End-to-end rounds through `SessionController` with a scripted probe and the
//! real CSV sink.

use std::{
    collections::VecDeque,
    fs,
    path::PathBuf,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc, Mutex,
    },
    thread,
    time::Duration,
};

use pretty_assertions::assert_eq;
use streetview_bingo_lib::{
    models::{Catalog, FinishReason, GameResult, SessionPhase, SessionSummary},
    probe::{CapturedLocation, LocationProbe, ProbeError},
    session::{EventEmitter, MarkResult, SessionController, SessionEvent, SkipReason},
    sink::{CsvRecordSink, CSV_HEADER},
};
use tempfile::{tempdir, TempDir};
use tokio::sync::mpsc::UnboundedReceiver;

/// Answers each call with the next scripted coordinates; `None` means "window
/// not found". Runs dry into "not found".
struct ScriptedProbe {
    answers: Mutex<VecDeque<Option<(f64, f64)>>>,
    delay: Duration,
    slow_calls: usize,
    evidence_dir: Option<PathBuf>,
    calls: AtomicUsize,
}

impl ScriptedProbe {
    fn new(answers: impl IntoIterator<Item = Option<(f64, f64)>>) -> Self {
        Self {
            answers: Mutex::new(answers.into_iter().collect()),
            delay: Duration::ZERO,
            slow_calls: usize::MAX,
            evidence_dir: None,
            calls: AtomicUsize::new(0),
        }
    }

    fn empty() -> Self {
        Self::new(Vec::<Option<(f64, f64)>>::new())
    }

    fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Only the first `count` calls sleep.
    fn slow_only_for(mut self, count: usize) -> Self {
        self.slow_calls = count;
        self
    }

    /// Write a placeholder screenshot per call instead of returning a bare path.
    fn with_evidence_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.evidence_dir = Some(dir.into());
        self
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl LocationProbe for ScriptedProbe {
    fn capture_location(&self, label: &str) -> Result<CapturedLocation, ProbeError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        if call < self.slow_calls && !self.delay.is_zero() {
            thread::sleep(self.delay);
        }
        match self.answers.lock().unwrap().pop_front().flatten() {
            Some((latitude, longitude)) => {
                let file_name = format!("{}.png", label.replace(' ', "_"));
                let evidence_path = match &self.evidence_dir {
                    Some(dir) => {
                        let path = dir.join(format!("{call}_{file_name}"));
                        fs::write(&path, b"png").unwrap();
                        path
                    }
                    None => PathBuf::from("screenshots").join(file_name),
                };
                Ok(CapturedLocation {
                    latitude,
                    longitude,
                    evidence_path,
                })
            }
            None => Err(ProbeError::WindowNotFound {
                needle: "Google Chrome".into(),
            }),
        }
    }
}

struct Harness {
    controller: SessionController,
    events: UnboundedReceiver<SessionEvent>,
    probe: Arc<ScriptedProbe>,
    csv_path: PathBuf,
    _dir: TempDir,
}

fn harness(labels: &[&str], probe: ScriptedProbe, tick: Duration) -> Harness {
    let dir = tempdir().unwrap();
    let csv_path = dir.path().join("bingo_map.csv");
    harness_with_sink(labels, probe, tick, CsvRecordSink::new(&csv_path), csv_path, dir)
}

fn harness_with_sink(
    labels: &[&str],
    probe: ScriptedProbe,
    tick: Duration,
    sink: CsvRecordSink,
    csv_path: PathBuf,
    dir: TempDir,
) -> Harness {
    let probe = Arc::new(probe);
    let (emitter, events) = EventEmitter::channel();
    let controller = SessionController::new(
        Catalog::new(labels.iter().copied()).unwrap(),
        probe.clone(),
        Arc::new(sink),
        emitter,
    )
    .with_tick_interval(tick);

    Harness {
        controller,
        events,
        probe,
        csv_path,
        _dir: dir,
    }
}

fn drain(events: &mut UnboundedReceiver<SessionEvent>) -> Vec<SessionEvent> {
    let mut out = Vec::new();
    while let Ok(event) = events.try_recv() {
        out.push(event);
    }
    out
}

async fn wait_for_finish(events: &mut UnboundedReceiver<SessionEvent>) -> SessionSummary {
    let wait = async {
        while let Some(event) = events.recv().await {
            if let SessionEvent::SessionFinished { summary } = event {
                return summary;
            }
        }
        panic!("event channel closed before the session finished");
    };
    tokio::time::timeout(Duration::from_secs(10), wait)
        .await
        .expect("session did not finish in time")
}

fn data_rows(csv_path: &PathBuf) -> Vec<String> {
    fs::read_to_string(csv_path)
        .unwrap()
        .lines()
        .skip(1)
        .map(str::to_string)
        .collect()
}

#[tokio::test]
async fn zero_minute_round_is_an_immediate_loss() {
    let mut h = harness(&["BBQ", "Flag"], ScriptedProbe::empty(), Duration::from_secs(1));

    let snapshot = h.controller.start_session(0).await.unwrap();
    assert_eq!(snapshot.phase, SessionPhase::Finished);
    assert_eq!(snapshot.finish_reason, Some(FinishReason::TimedOut));

    let events = drain(&mut h.events);
    assert!(matches!(events[0], SessionEvent::SessionStarted { total_duration_secs: 0, .. }));
    assert_eq!(
        events.last(),
        Some(&SessionEvent::SessionFinished {
            summary: SessionSummary {
                items_found: 0,
                items_remaining: 2,
                time_taken_secs: 0,
                result: GameResult::Loss,
                reason: FinishReason::TimedOut,
            }
        })
    );

    let late = h.controller.attempt_discovery("BBQ").await.unwrap();
    assert_eq!(late, MarkResult::Skipped(SkipReason::NotRunning));
    assert_eq!(h.probe.calls(), 0);
    assert!(!h.csv_path.exists());
}

#[tokio::test]
async fn finding_every_item_before_timeout_wins() {
    let probe = ScriptedProbe::new([Some((1.0, 2.0)), Some((3.0, 4.0))]);
    let mut h = harness(&["BBQ", "Flag"], probe, Duration::from_secs(1));

    h.controller.start_session(1).await.unwrap();
    assert_eq!(
        h.controller.attempt_discovery("BBQ").await.unwrap(),
        MarkResult::Found { completed: false }
    );
    assert_eq!(
        h.controller.attempt_discovery("Flag").await.unwrap(),
        MarkResult::Found { completed: true }
    );

    let snapshot = h.controller.snapshot().await;
    assert_eq!(snapshot.phase, SessionPhase::Finished);
    let summary = snapshot.summary.unwrap();
    assert_eq!(summary.items_found, 2);
    assert_eq!(summary.items_remaining, 0);
    assert_eq!(summary.result, GameResult::Win);

    let contents = fs::read_to_string(&h.csv_path).unwrap();
    assert_eq!(
        contents,
        format!("{CSV_HEADER}\nBBQ,1.0,2.0,screenshots/BBQ.png\nFlag,3.0,4.0,screenshots/Flag.png\n")
    );

    let events = drain(&mut h.events);
    let succeeded: Vec<&str> = events
        .iter()
        .filter_map(|event| match event {
            SessionEvent::DiscoverySucceeded { label, .. } => Some(label.as_str()),
            _ => None,
        })
        .collect();
    assert_eq!(succeeded, vec!["BBQ", "Flag"]);
    assert!(matches!(
        events.last(),
        Some(SessionEvent::SessionFinished { summary }) if summary.reason == FinishReason::Completed
    ));

    h.controller.shutdown().await.unwrap();
}

#[tokio::test]
async fn nothing_found_runs_out_the_clock() {
    let dir = tempdir().unwrap();
    let csv_path = dir.path().join("bingo_map.csv");
    let sink = CsvRecordSink::new(&csv_path).with_eager_header(true);
    let mut h = harness_with_sink(
        &["BBQ", "Flag"],
        ScriptedProbe::new([None, None, None]),
        Duration::from_millis(2),
        sink,
        csv_path,
        dir,
    );

    h.controller.start_session(1).await.unwrap();
    for label in ["BBQ", "Flag", "BBQ"] {
        let result = h.controller.attempt_discovery(label).await.unwrap();
        assert!(matches!(result, MarkResult::NotFound(_) | MarkResult::Skipped(_)));
    }

    let summary = wait_for_finish(&mut h.events).await;
    assert_eq!(summary.reason, FinishReason::TimedOut);
    assert_eq!(summary.items_found, 0);
    assert_eq!(summary.time_taken_secs, 60);

    let snapshot = h.controller.snapshot().await;
    assert_eq!(snapshot.remaining_secs, 0);
    assert_eq!(fs::read_to_string(&h.csv_path).unwrap(), format!("{CSV_HEADER}\n"));

    h.controller.shutdown().await.unwrap();
}

#[tokio::test]
async fn failed_probe_publishes_a_warning_and_allows_retry() {
    let probe = ScriptedProbe::new([None, Some((5.5, -6.5))]);
    let mut h = harness(&["BBQ", "Flag"], probe, Duration::from_secs(1));
    h.controller.start_session(5).await.unwrap();

    let first = h.controller.attempt_discovery("BBQ").await.unwrap();
    assert!(matches!(first, MarkResult::NotFound(ref reason) if reason.contains("Google Chrome")));
    let second = h.controller.attempt_discovery("BBQ").await.unwrap();
    assert_eq!(second, MarkResult::Found { completed: false });

    let events = drain(&mut h.events);
    assert!(events.iter().any(|event| matches!(
        event,
        SessionEvent::DiscoveryFailed { label, .. } if label == "BBQ"
    )));
    assert_eq!(data_rows(&h.csv_path), vec!["BBQ,5.5,-6.5,screenshots/BBQ.png".to_string()]);

    h.controller.shutdown().await.unwrap();
}

#[tokio::test]
async fn duplicate_marks_write_one_row() {
    let probe = ScriptedProbe::new([Some((1.0, 1.0)), Some((2.0, 2.0))]);
    let h = harness(&["BBQ", "Flag"], probe, Duration::from_secs(1));
    h.controller.start_session(5).await.unwrap();

    h.controller.attempt_discovery("BBQ").await.unwrap();
    let again = h.controller.attempt_discovery("BBQ").await.unwrap();

    assert_eq!(again, MarkResult::Skipped(SkipReason::AlreadyFound));
    assert_eq!(h.probe.calls(), 1);
    assert_eq!(data_rows(&h.csv_path).len(), 1);

    h.controller.shutdown().await.unwrap();
}

#[tokio::test]
async fn unknown_item_is_rejected() {
    let h = harness(&["BBQ"], ScriptedProbe::empty(), Duration::from_secs(1));
    h.controller.start_session(5).await.unwrap();
    assert!(h.controller.attempt_discovery("Unicorn").await.is_err());
    assert_eq!(h.probe.calls(), 0);
    h.controller.shutdown().await.unwrap();
}

#[tokio::test]
async fn probe_answer_after_timeout_is_discarded() {
    let probe = ScriptedProbe::new([Some((1.0, 2.0))]).with_delay(Duration::from_millis(600));
    let mut h = harness(&["BBQ", "Flag"], probe, Duration::from_millis(1));
    h.controller.start_session(1).await.unwrap();

    let result = h.controller.attempt_discovery("BBQ").await.unwrap();
    assert_eq!(result, MarkResult::Discarded);

    let summary = wait_for_finish(&mut h.events).await;
    assert_eq!(summary.items_found, 0);
    assert_eq!(summary.result, GameResult::Loss);
    assert!(!h.csv_path.exists());
    assert!(h.controller.snapshot().await.found.is_empty());
}

#[tokio::test]
async fn slow_probe_times_out_as_a_failed_attempt() {
    let probe = ScriptedProbe::new([Some((1.0, 2.0))]).with_delay(Duration::from_millis(400));
    let dir = tempdir().unwrap();
    let csv_path = dir.path().join("bingo_map.csv");
    let (emitter, _events) = EventEmitter::channel();
    let controller = SessionController::new(
        Catalog::new(["BBQ", "Flag"]).unwrap(),
        Arc::new(probe),
        Arc::new(CsvRecordSink::new(&csv_path)),
        emitter,
    )
    .with_probe_timeout(Duration::from_millis(50));

    controller.start_session(5).await.unwrap();
    let result = controller.attempt_discovery("BBQ").await.unwrap();
    assert!(matches!(result, MarkResult::NotFound(ref reason) if reason.contains("gave up")));
    assert!(controller.snapshot().await.found.is_empty());

    controller.shutdown().await.unwrap();
}

#[tokio::test]
async fn timed_out_attempt_blocks_retries_until_its_worker_returns() {
    let shots = tempdir().unwrap();
    let probe = ScriptedProbe::new([Some((1.0, 2.0)), Some((3.0, 4.0))])
        .with_delay(Duration::from_millis(300))
        .slow_only_for(1)
        .with_evidence_dir(shots.path());
    let mut h = harness(&["BBQ", "Flag"], probe, Duration::from_secs(1));
    h.controller = h.controller.with_probe_timeout(Duration::from_millis(50));

    h.controller.start_session(5).await.unwrap();
    let first = h.controller.attempt_discovery("BBQ").await.unwrap();
    assert!(matches!(first, MarkResult::NotFound(ref reason) if reason.contains("gave up")));

    let retry = h.controller.attempt_discovery("BBQ").await.unwrap();
    assert_eq!(retry, MarkResult::Skipped(SkipReason::InFlight));
    assert_eq!(h.probe.calls(), 1);

    tokio::time::sleep(Duration::from_millis(600)).await;
    let abandoned = shots.path().join("0_BBQ.png");
    assert!(!abandoned.exists(), "screenshot of a failed attempt was kept");

    let after = h.controller.attempt_discovery("BBQ").await.unwrap();
    assert_eq!(after, MarkResult::Found { completed: false });
    assert!(shots.path().join("1_BBQ.png").exists());
    assert_eq!(data_rows(&h.csv_path).len(), 1);

    h.controller.shutdown().await.unwrap();
}

#[tokio::test]
async fn mark_from_a_finished_round_does_not_leak_into_the_next() {
    let probe = ScriptedProbe::new([Some((9.0, 9.0))]).with_delay(Duration::from_millis(500));
    let mut h = harness(&["BBQ", "Flag"], probe, Duration::from_millis(1));

    h.controller.start_session(1).await.unwrap();
    let controller = h.controller.clone();
    let old_mark = tokio::spawn(async move { controller.attempt_discovery("BBQ").await });

    let probe = Arc::clone(&h.probe);
    tokio::time::timeout(Duration::from_secs(5), async {
        while probe.calls() == 0 {
            tokio::time::sleep(Duration::from_millis(1)).await;
        }
    })
    .await
    .expect("mark never started capturing");

    wait_for_finish(&mut h.events).await;
    h.controller.reset_session().await.unwrap();
    h.controller.start_session(60).await.unwrap();

    let result = old_mark.await.unwrap().unwrap();
    assert_eq!(result, MarkResult::Discarded);

    let snapshot = h.controller.snapshot().await;
    assert_eq!(snapshot.phase, SessionPhase::Running);
    assert!(snapshot.found.is_empty());
    assert!(!h.csv_path.exists());
    assert!(!drain(&mut h.events)
        .iter()
        .any(|event| matches!(event, SessionEvent::DiscoverySucceeded { .. })));

    h.controller.shutdown().await.unwrap();
}

#[tokio::test]
async fn sink_failure_is_reported_but_the_discovery_counts() {
    let dir = tempdir().unwrap();
    // A directory in place of the CSV file makes every append fail.
    let csv_path = dir.path().join("taken");
    fs::create_dir(&csv_path).unwrap();
    let mut h = harness_with_sink(
        &["BBQ"],
        ScriptedProbe::new([Some((1.0, 2.0))]),
        Duration::from_secs(1),
        CsvRecordSink::new(&csv_path),
        csv_path,
        dir,
    );

    h.controller.start_session(5).await.unwrap();
    let result = h.controller.attempt_discovery("BBQ").await.unwrap();
    assert_eq!(result, MarkResult::Found { completed: true });

    let events = drain(&mut h.events);
    assert!(events.iter().any(|event| matches!(
        event,
        SessionEvent::SinkWriteFailed { label: Some(label), .. } if label == "BBQ"
    )));
    assert!(matches!(
        events.last(),
        Some(SessionEvent::SessionFinished { summary }) if summary.result == GameResult::Win
    ));
}

#[tokio::test]
async fn reset_starts_a_fresh_round_with_clean_records() {
    let probe = ScriptedProbe::new([Some((1.0, 2.0)), Some((7.0, 8.0))]);
    let h = harness(&["BBQ"], probe, Duration::from_secs(1));

    assert!(h.controller.reset_session().await.is_err());

    h.controller.start_session(5).await.unwrap();
    assert!(h.controller.start_session(5).await.is_err());
    h.controller.attempt_discovery("BBQ").await.unwrap();
    assert_eq!(data_rows(&h.csv_path), vec!["BBQ,1.0,2.0,screenshots/BBQ.png".to_string()]);

    let snapshot = h.controller.reset_session().await.unwrap();
    assert_eq!(snapshot.phase, SessionPhase::NotStarted);
    assert!(snapshot.found.is_empty());

    h.controller.start_session(5).await.unwrap();
    assert!(!h.csv_path.exists());
    h.controller.attempt_discovery("BBQ").await.unwrap();
    assert_eq!(data_rows(&h.csv_path), vec!["BBQ,7.0,8.0,screenshots/BBQ.png".to_string()]);

    h.controller.shutdown().await.unwrap();
}

#[tokio::test]
async fn countdown_publishes_each_second() {
    let mut h = harness(&["BBQ"], ScriptedProbe::empty(), Duration::from_millis(2));
    h.controller.start_session(1).await.unwrap();

    let mut ticks = Vec::new();
    let collect = async {
        while let Some(event) = h.events.recv().await {
            match event {
                SessionEvent::TimerTick { remaining_secs } => ticks.push(remaining_secs),
                SessionEvent::SessionFinished { .. } => break,
                _ => {}
            }
        }
    };
    tokio::time::timeout(Duration::from_secs(10), collect)
        .await
        .expect("countdown did not finish");

    assert_eq!(ticks, (0..60).rev().collect::<Vec<u64>>());
    h.controller.shutdown().await.unwrap();
}
