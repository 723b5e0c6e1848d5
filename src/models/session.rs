use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub enum SessionPhase {
    #[default]
    NotStarted,
    Running,
    Finished,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum FinishReason {
    Completed,
    TimedOut,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum GameResult {
    Win,
    Loss,
}

impl From<FinishReason> for GameResult {
    fn from(reason: FinishReason) -> Self {
        match reason {
            FinishReason::Completed => GameResult::Win,
            FinishReason::TimedOut => GameResult::Loss,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSummary {
    pub items_found: usize,
    pub items_remaining: usize,
    pub time_taken_secs: u64,
    pub result: GameResult,
    pub reason: FinishReason,
}

/// Read model handed to the presentation layer.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSnapshot {
    pub session_id: String,
    pub phase: SessionPhase,
    pub finish_reason: Option<FinishReason>,
    pub total_duration_secs: u64,
    pub remaining_secs: u64,
    /// Labels in the order they were found.
    pub found: Vec<String>,
    pub catalog_size: usize,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
    pub summary: Option<SessionSummary>,
}
