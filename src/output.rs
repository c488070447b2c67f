// ABOUTME: Output formatting for CLI feedback.
// ABOUTME: Supports normal, quiet (CI), and JSON output modes.

use serde::Serialize;
use std::time::Instant;

use crate::diagnostics::{Diagnostics, Warning, WarningKind};

/// Output mode for CLI feedback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    /// Human-friendly output with progress messages
    Normal,
    /// Minimal output for CI (only final result)
    Quiet,
    /// JSON lines for scripting
    Json,
}

impl OutputMode {
    pub fn from_flags(quiet: bool, json: bool) -> Self {
        if json {
            OutputMode::Json
        } else if quiet {
            OutputMode::Quiet
        } else {
            OutputMode::Normal
        }
    }
}

/// Handles CLI output based on the configured mode.
pub struct Output {
    mode: OutputMode,
    start_time: Option<Instant>,
}

impl Output {
    pub fn new(mode: OutputMode) -> Self {
        Self {
            mode,
            start_time: None,
        }
    }

    pub fn mode(&self) -> OutputMode {
        self.mode
    }

    /// Start timing an operation.
    pub fn start_timer(&mut self) {
        self.start_time = Some(Instant::now());
    }

    /// Get elapsed time since timer started.
    pub fn elapsed_secs(&self) -> f64 {
        self.start_time
            .map(|t| t.elapsed().as_secs_f64())
            .unwrap_or(0.0)
    }

    fn duration(&self) -> Option<f64> {
        self.start_time.map(|_| self.elapsed_secs())
    }

    /// Print a progress message (suppressed in quiet/json mode).
    pub fn progress(&self, message: &str) {
        if self.mode == OutputMode::Normal {
            println!("{message}");
        }
    }

    /// Print a success message with optional timing.
    pub fn success(&self, message: &str) {
        match self.mode {
            OutputMode::Normal => {
                let elapsed = self.elapsed_secs();
                if elapsed > 0.0 {
                    println!("{message} ({:.1}s)", elapsed);
                } else {
                    println!("{message}");
                }
            }
            OutputMode::Quiet => {
                println!("{message}");
            }
            OutputMode::Json => {
                self.emit_stdout(&JsonEvent {
                    event: "success",
                    message,
                    kind: None,
                    duration_secs: self.duration(),
                });
            }
        }
    }

    /// Print a warning (suppressed in quiet mode).
    pub fn warning(&self, warning: &Warning) {
        match self.mode {
            OutputMode::Normal => eprintln!(" ! {}", warning.message),
            OutputMode::Quiet => {}
            OutputMode::Json => {
                let event = JsonEvent {
                    event: "warning",
                    message: &warning.message,
                    kind: Some(warning.kind),
                    duration_secs: None,
                };
                if let Ok(json) = serde_json::to_string(&event) {
                    eprintln!("{json}");
                }
            }
        }
    }

    /// Print every collected warning.
    pub fn warnings(&self, diagnostics: &Diagnostics) {
        for warning in diagnostics.warnings() {
            self.warning(warning);
        }
    }

    /// Print a result document. Pretty in normal mode, one line otherwise.
    pub fn document<T: Serialize>(&self, value: &T) -> serde_json::Result<()> {
        let text = match self.mode {
            OutputMode::Normal => serde_json::to_string_pretty(value)?,
            OutputMode::Quiet | OutputMode::Json => serde_json::to_string(value)?,
        };
        println!("{text}");
        Ok(())
    }

    /// Print an error message.
    pub fn error(&self, message: &str) {
        match self.mode {
            OutputMode::Normal | OutputMode::Quiet => {
                eprintln!("Error: {message}");
            }
            OutputMode::Json => {
                let event = JsonEvent {
                    event: "error",
                    message,
                    kind: None,
                    duration_secs: self.duration(),
                };
                if let Ok(json) = serde_json::to_string(&event) {
                    eprintln!("{json}");
                }
            }
        }
    }

    fn emit_stdout(&self, event: &JsonEvent<'_>) {
        if let Ok(json) = serde_json::to_string(event) {
            println!("{json}");
        }
    }
}

#[derive(Serialize)]
struct JsonEvent<'a> {
    event: &'a str,
    message: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    kind: Option<WarningKind>,
    #[serde(skip_serializing_if = "Option::is_none")]
    duration_secs: Option<f64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mode_from_flags_prefers_json() {
        assert_eq!(OutputMode::from_flags(false, false), OutputMode::Normal);
        assert_eq!(OutputMode::from_flags(true, false), OutputMode::Quiet);
        assert_eq!(OutputMode::from_flags(true, true), OutputMode::Json);
    }

    #[test]
    fn warning_event_serializes_kind() {
        let event = JsonEvent {
            event: "warning",
            message: "m",
            kind: Some(WarningKind::TcpIngress),
            duration_secs: None,
        };
        let json = serde_json::to_string(&event).unwrap();
        assert_eq!(json, r#"{"event":"warning","message":"m","kind":"tcp_ingress"}"#);
    }
}
