use std::{path::Path, process::Command, time::Duration};

use chrono::Local;

use super::{
    script::{run_osascript, run_with_timeout, ScriptPolicy},
    CapturedLocation, EvidenceStore, LocationProbe, ProbeError,
};
use crate::coords::extract_coordinates;

const ENABLE_LOGS: bool = true;

use crate::{log_debug, log_info, log_warn};

const CAPTURE_TIMEOUT: Duration = Duration::from_secs(8);

/// Emits `process<TAB>title<TAB>x<TAB>y<TAB>w<TAB>h` for the first foreground
/// window whose title contains `item 1 of argv`, or nothing.
const FIND_WINDOW_SCRIPT: &str = r#"on run argv
set needle to item 1 of argv
tell application "System Events"
    repeat with proc in (every application process whose background only is false)
        repeat with win in (every window of proc)
            set winName to ""
            try
                set winName to (name of win) as text
            end try
            if winName contains needle then
                set {px, py} to position of win
                set {sw, sh} to size of win
                return (name of proc as text) & tab & winName & tab & px & tab & py & tab & sw & tab & sh
            end if
        end repeat
    end repeat
end tell
return ""
end run"#;

/// Chromium-family browsers expose the address bar as the active tab's URL.
const ACTIVE_TAB_URL_SCRIPT: &str = r#"on run argv
set appName to item 1 of argv
using terms from application "Google Chrome"
    tell application appName
        return URL of active tab of front window
    end tell
end using terms from
end run"#;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BrowserWindow {
    pub process: String,
    pub title: String,
    pub x: i64,
    pub y: i64,
    pub width: i64,
    pub height: i64,
}

impl BrowserWindow {
    fn has_usable_bounds(&self) -> bool {
        self.width > 0 && self.height > 0
    }
}

/// Finds the map window by title, reads its address bar and screenshots it.
pub struct BrowserWindowProbe {
    title_match: String,
    evidence: EvidenceStore,
    script_policy: ScriptPolicy,
}

impl BrowserWindowProbe {
    pub fn new(title_match: impl Into<String>, evidence: EvidenceStore) -> Self {
        Self {
            title_match: title_match.into(),
            evidence,
            script_policy: ScriptPolicy::default(),
        }
    }

    fn find_window(&self) -> Result<BrowserWindow, ProbeError> {
        let raw = run_osascript(FIND_WINDOW_SCRIPT, &[self.title_match.as_str()], self.script_policy)
            .map_err(ProbeError::AddressUnreadable)?;

        parse_window_row(&raw).ok_or_else(|| ProbeError::WindowNotFound {
            needle: self.title_match.clone(),
        })
    }

    /// Address bar text when the browser exposes it, else the window title.
    fn read_location_text(&self, window: &BrowserWindow) -> Vec<String> {
        let mut candidates = Vec::with_capacity(2);
        match run_osascript(ACTIVE_TAB_URL_SCRIPT, &[window.process.as_str()], self.script_policy) {
            Ok(url) if !url.is_empty() => candidates.push(url),
            Ok(_) => log_debug!("{} returned an empty URL", window.process),
            Err(err) => log_debug!("active tab URL unavailable for {}: {err}", window.process),
        }
        if !window.title.is_empty() {
            candidates.push(window.title.clone());
        }
        candidates
    }

    fn capture_window(&self, window: &BrowserWindow, path: &Path) -> Result<(), ProbeError> {
        let mut cmd = Command::new("screencapture");
        cmd.arg("-x");
        if window.has_usable_bounds() {
            cmd.arg("-R").arg(format!(
                "{},{},{},{}",
                window.x, window.y, window.width, window.height
            ));
        } else {
            log_warn!(
                "window {:?} reports no bounds; capturing the full screen",
                window.title
            );
        }
        cmd.arg(path);

        run_with_timeout(&mut cmd, CAPTURE_TIMEOUT).map_err(ProbeError::Capture)?;

        let (width, height) = self
            .evidence
            .verify(path)
            .map_err(|err| ProbeError::Capture(format!("{err:#}")))?;
        log_info!("Saved {}x{} evidence to {}", width, height, path.display());
        Ok(())
    }
}

impl LocationProbe for BrowserWindowProbe {
    fn capture_location(&self, label: &str) -> Result<CapturedLocation, ProbeError> {
        if !cfg!(target_os = "macos") {
            return Err(ProbeError::Unsupported);
        }

        let window = self.find_window()?;
        log_debug!("matched window {:?} of {}", window.title, window.process);

        let candidates = self.read_location_text(&window);
        if candidates.is_empty() {
            return Err(ProbeError::AddressUnreadable(format!(
                "{} exposed neither a URL nor a title",
                window.process
            )));
        }

        let (latitude, longitude) = candidates
            .iter()
            .find_map(|text| extract_coordinates(text))
            .ok_or_else(|| ProbeError::CoordinatesNotFound {
                text: candidates[0].clone(),
            })?;

        self.evidence
            .ensure_dir()
            .map_err(|err| ProbeError::Capture(format!("{err:#}")))?;
        let evidence_path = self.evidence.path_for(label, &Local::now());
        self.capture_window(&window, &evidence_path)?;

        Ok(CapturedLocation {
            latitude,
            longitude,
            evidence_path,
        })
    }
}

fn parse_window_row(raw: &str) -> Option<BrowserWindow> {
    let line = raw.lines().map(str::trim).find(|line| !line.is_empty())?;
    let parts: Vec<&str> = line.split('\t').collect();
    if parts.len() < 6 {
        return None;
    }

    // Titles may contain tabs; the four trailing fields are always numeric.
    let numeric = &parts[parts.len() - 4..];
    let parse = |value: &str| value.trim().parse::<f64>().ok().map(|v| v.round() as i64);

    Some(BrowserWindow {
        process: parts[0].to_string(),
        title: parts[1..parts.len() - 4].join("\t"),
        x: parse(numeric[0])?,
        y: parse(numeric[1])?,
        width: parse(numeric[2])?,
        height: parse(numeric[3])?,
    })
}
