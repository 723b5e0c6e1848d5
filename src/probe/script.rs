use std::{
    process::{Command, Stdio},
    thread,
    time::Duration,
};

use wait_timeout::ChildExt;

const ENABLE_LOGS: bool = true;

use crate::{log_debug, log_warn};

/// Retry policy for one AppleScript invocation.
#[derive(Debug, Clone, Copy)]
pub(crate) struct ScriptPolicy {
    pub attempts: u32,
    pub timeout: Duration,
    pub backoff: Duration,
}

impl Default for ScriptPolicy {
    fn default() -> Self {
        Self {
            attempts: 2,
            timeout: Duration::from_millis(1500),
            backoff: Duration::from_millis(80),
        }
    }
}

/// Run `osascript -e <script> -- <args...>` and return trimmed stdout.
///
/// Empty stdout from a successful run is returned as `Ok("")`; the caller
/// decides whether that means "nothing found".
pub(crate) fn run_osascript(
    script: &str,
    args: &[&str],
    policy: ScriptPolicy,
) -> Result<String, String> {
    if !cfg!(target_os = "macos") {
        return Err("osascript requires macOS".to_string());
    }

    let max_attempts = policy.attempts.max(1);
    let mut last_error = String::from("osascript produced no output");

    for attempt in 1..=max_attempts {
        let mut cmd = Command::new("osascript");
        cmd.arg("-e").arg(script);
        if !args.is_empty() {
            cmd.arg("--").args(args);
        }
        cmd.stdout(Stdio::piped()).stderr(Stdio::piped());

        match cmd.spawn() {
            Ok(mut child) => match child.wait_timeout(policy.timeout) {
                Ok(Some(_)) => match child.wait_with_output() {
                    Ok(output) => {
                        let stdout = String::from_utf8_lossy(&output.stdout).trim().to_string();
                        if output.status.success() {
                            log_debug!("osascript succeeded on attempt {attempt}/{max_attempts}");
                            return Ok(stdout);
                        }
                        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
                        let code = output.status.code().unwrap_or(1);
                        last_error = if stderr.is_empty() {
                            format!("osascript failed with status {code}")
                        } else {
                            stderr
                        };
                    }
                    Err(err) => last_error = format!("failed to collect osascript output: {err}"),
                },
                Ok(None) => {
                    let _ = child.kill();
                    let _ = child.wait();
                    last_error = format!(
                        "osascript timed out after {}ms (attempt {attempt}/{max_attempts})",
                        policy.timeout.as_millis()
                    );
                }
                Err(err) => {
                    let _ = child.kill();
                    let _ = child.wait();
                    last_error = format!("failed waiting for osascript: {err}");
                }
            },
            Err(err) => {
                // Nothing to retry if the binary cannot be spawned at all.
                return Err(format!("failed to spawn osascript: {err}"));
            }
        }

        log_warn!("{last_error}");
        if attempt < max_attempts {
            thread::sleep(policy.backoff.saturating_mul(attempt));
        }
    }

    Err(last_error)
}

/// Run an arbitrary command with a hard timeout, returning whether it succeeded.
pub(crate) fn run_with_timeout(cmd: &mut Command, timeout: Duration) -> Result<(), String> {
    let program = cmd.get_program().to_string_lossy().into_owned();
    let mut child = cmd
        .stdout(Stdio::null())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|err| format!("failed to spawn {program}: {err}"))?;

    match child.wait_timeout(timeout) {
        Ok(Some(status)) if status.success() => Ok(()),
        Ok(Some(status)) => Err(format!(
            "{program} exited with status {}",
            status.code().unwrap_or(1)
        )),
        Ok(None) => {
            let _ = child.kill();
            let _ = child.wait();
            Err(format!("{program} timed out after {}ms", timeout.as_millis()))
        }
        Err(err) => {
            let _ = child.kill();
            let _ = child.wait();
            Err(format!("failed waiting for {program}: {err}"))
        }
    }
}
