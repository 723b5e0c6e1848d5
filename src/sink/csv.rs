use std::{
    fs::{self, OpenOptions},
    io::{self, Write},
    path::{Path, PathBuf},
    sync::Mutex,
};

use log::{debug, info};

use super::{RecordSink, SinkError};
use crate::models::Discovery;

pub const CSV_HEADER: &str = "Name,Latitude,Longitude,Description";

/// Map-import CSV (`Name,Latitude,Longitude,Description`), one row per discovery.
pub struct CsvRecordSink {
    path: PathBuf,
    eager_header: bool,
    write_lock: Mutex<()>,
}

impl CsvRecordSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            eager_header: false,
            write_lock: Mutex::new(()),
        }
    }

    /// Write the header on reset instead of waiting for the first row.
    pub fn with_eager_header(mut self, eager: bool) -> Self {
        self.eager_header = eager;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn io_error(&self, source: io::Error) -> SinkError {
        SinkError::Io {
            path: self.path.clone(),
            source,
        }
    }

    fn ensure_parent_dir(&self) -> io::Result<()> {
        match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => fs::create_dir_all(parent),
            _ => Ok(()),
        }
    }

    fn write_chunk(&self, chunk: &str) -> io::Result<()> {
        self.ensure_parent_dir()?;
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;

        let mut buffer = String::new();
        if file.metadata()?.len() == 0 {
            buffer.push_str(CSV_HEADER);
            buffer.push('\n');
        }
        buffer.push_str(chunk);

        file.write_all(buffer.as_bytes())?;
        file.flush()
    }
}

impl RecordSink for CsvRecordSink {
    fn reset(&self) -> Result<(), SinkError> {
        let _guard = self.write_lock.lock().unwrap_or_else(|p| p.into_inner());

        match fs::remove_file(&self.path) {
            Ok(()) => info!("Cleared previous records at {}", self.path.display()),
            Err(err) if err.kind() == io::ErrorKind::NotFound => {}
            Err(err) => return Err(self.io_error(err)),
        }

        if self.eager_header {
            self.write_chunk("").map_err(|err| self.io_error(err))?;
        }
        Ok(())
    }

    fn append(&self, discovery: &Discovery) -> Result<(), SinkError> {
        let _guard = self.write_lock.lock().unwrap_or_else(|p| p.into_inner());

        let evidence = discovery.evidence_path.to_string_lossy();
        let row = [
            escape_field(&discovery.label),
            format_coordinate(discovery.latitude),
            format_coordinate(discovery.longitude),
            escape_field(&evidence),
        ]
        .join(",");

        self.write_chunk(&format!("{row}\n"))
            .map_err(|err| self.io_error(err))?;
        debug!("Appended {} to {}", discovery.label, self.path.display());
        Ok(())
    }
}

/// Shortest round-trip form, keeping `.0` on whole numbers.
fn format_coordinate(value: f64) -> String {
    format!("{value:?}")
}

fn escape_field(field: &str) -> String {
    if field.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}
