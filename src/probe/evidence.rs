use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use chrono::{DateTime, Local};

use crate::utils::evidence_timestamp;

/// Directory that holds screenshot evidence for discoveries.
#[derive(Debug, Clone)]
pub struct EvidenceStore {
    dir: PathBuf,
}

impl EvidenceStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn ensure_dir(&self) -> Result<()> {
        fs::create_dir_all(&self.dir).with_context(|| {
            format!("failed to create screenshot directory {}", self.dir.display())
        })
    }

    /// `{label}_{YYYY-MM-DD_HH-MM-SS}.png` with spaces turned into underscores.
    pub fn path_for(&self, label: &str, at: &DateTime<Local>) -> PathBuf {
        let file_name = format!("{label}_{}.png", evidence_timestamp(at))
            .replace([' ', '/', '\\'], "_");
        self.dir.join(file_name)
    }

    /// Check that a freshly captured file is a readable image; remove it if not.
    pub fn verify(&self, path: &Path) -> Result<(u32, u32)> {
        match image::image_dimensions(path) {
            Ok(dimensions) => Ok(dimensions),
            Err(err) => {
                let _ = fs::remove_file(path);
                Err(err).with_context(|| format!("unreadable capture {}", path.display()))
            }
        }
    }
}
