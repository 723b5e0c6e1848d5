use anyhow::{Context, Result};
use log::{debug, warn};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::{
    fs,
    path::{Path, PathBuf},
    sync::RwLock,
};

use crate::{
    models::{Catalog, DEFAULT_ITEMS},
    utils::parse_duration_minutes,
};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BingoSettings {
    /// Length of a round. Zero makes every round an instant loss.
    #[serde(deserialize_with = "lenient_minutes")]
    pub duration_minutes: u64,
    pub screenshot_dir: PathBuf,
    pub csv_path: PathBuf,
    /// Substring that identifies the map window's title.
    pub window_title_match: String,
    pub catalog: Vec<String>,
    pub probe_timeout_secs: u64,
    pub eager_csv_header: bool,
    pub grid_columns: usize,
}

impl Default for BingoSettings {
    fn default() -> Self {
        Self {
            duration_minutes: 30,
            screenshot_dir: PathBuf::from("screenshots"),
            csv_path: PathBuf::from("bingo_map.csv"),
            window_title_match: "Google Chrome".into(),
            catalog: DEFAULT_ITEMS.iter().map(|s| (*s).to_string()).collect(),
            probe_timeout_secs: 10,
            eager_csv_header: false,
            grid_columns: 5,
        }
    }
}

impl BingoSettings {
    pub fn catalog(&self) -> Result<Catalog> {
        Catalog::new(self.catalog.iter().cloned()).context("invalid bingo catalog")
    }
}

/// Negative, fractional or non-numeric durations become 0 instead of
/// rejecting the whole file.
fn lenient_minutes<'de, D>(deserializer: D) -> std::result::Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    let minutes = match Value::deserialize(deserializer)? {
        Value::Number(number) => number.as_u64().unwrap_or_else(|| {
            debug!("duration_minutes {number} clamped to 0");
            0
        }),
        Value::String(text) => parse_duration_minutes(&text),
        other => {
            debug!("duration_minutes {other} clamped to 0");
            0
        }
    };
    Ok(minutes)
}

/// Read a catalog file: one label per line, blank lines and `#` comments skipped.
pub fn load_catalog_file(path: &Path) -> Result<Vec<String>> {
    let contents = fs::read_to_string(path)
        .with_context(|| format!("Failed to read catalog from {}", path.display()))?;
    Ok(contents
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(str::to_string)
        .collect())
}

pub fn default_settings_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("streetview-bingo")
        .join("settings.json")
}

pub struct SettingsStore {
    path: PathBuf,
    data: RwLock<BingoSettings>,
}

impl SettingsStore {
    pub fn new(path: PathBuf) -> Result<Self> {
        let data = if path.exists() {
            let contents = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read settings from {}", path.display()))?;
            serde_json::from_str(&contents).unwrap_or_else(|err| {
                warn!(
                    "Ignoring malformed settings in {}: {err}; using defaults",
                    path.display()
                );
                BingoSettings::default()
            })
        } else {
            BingoSettings::default()
        };

        Ok(Self {
            path,
            data: RwLock::new(data),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn settings(&self) -> BingoSettings {
        self.data
            .read()
            .unwrap_or_else(|p| p.into_inner())
            .clone()
    }

    pub fn update(&self, settings: BingoSettings) -> Result<()> {
        let mut guard = self.data.write().unwrap_or_else(|p| p.into_inner());
        *guard = settings;
        self.persist(&guard)
    }

    fn persist(&self, data: &BingoSettings) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).with_context(|| {
                    format!("Failed to create settings directory {}", parent.display())
                })?;
            }
        }
        let serialized = serde_json::to_string_pretty(data)?;
        fs::write(&self.path, serialized)
            .with_context(|| format!("Failed to write settings to {}", self.path.display()))
    }
}
