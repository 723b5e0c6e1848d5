use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A marked item. Created once per label per session and never changed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Discovery {
    pub label: String,
    pub latitude: f64,
    pub longitude: f64,
    pub evidence_path: PathBuf,
    pub discovered_at: DateTime<Utc>,
}
