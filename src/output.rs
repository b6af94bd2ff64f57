// ABOUTME: User-facing output for the CLI, separate from tracing logs.
// ABOUTME: Text for people, nothing but results for CI, JSON lines for scripts.

use serde::Serialize;
use std::time::Instant;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    /// Progress lines and results
    Normal,
    /// Results only
    Quiet,
    /// One JSON object per line
    Json,
}

#[derive(Debug, Clone, Copy)]
enum Stream {
    Stdout,
    Stderr,
}

#[derive(Debug)]
pub struct Output {
    mode: OutputMode,
    started: Option<Instant>,
}

impl Output {
    pub fn new(mode: OutputMode) -> Self {
        Self {
            mode,
            started: None,
        }
    }

    pub fn mode(&self) -> OutputMode {
        self.mode
    }

    /// Report elapsed time on later success lines.
    pub fn start_timer(&mut self) {
        self.started = Some(Instant::now());
    }

    fn elapsed(&self) -> Option<f64> {
        self.started.map(|t| t.elapsed().as_secs_f64())
    }

    pub fn progress(&self, message: &str) {
        match self.mode {
            OutputMode::Normal => println!("{message}"),
            OutputMode::Quiet | OutputMode::Json => {}
        }
    }

    pub fn success(&self, message: &str) {
        match (self.mode, self.elapsed()) {
            (OutputMode::Json, _) => self.emit(Stream::Stdout, "success", message, None),
            (OutputMode::Normal, Some(secs)) => println!("{message} ({secs:.1}s)"),
            _ => println!("{message}"),
        }
    }

    pub fn warning(&self, message: &str) {
        match self.mode {
            OutputMode::Json => self.emit(Stream::Stderr, "warning", message, None),
            _ => eprintln!("Warning: {message}"),
        }
    }

    pub fn error(&self, message: &str) {
        match self.mode {
            OutputMode::Json => self.emit(Stream::Stderr, "error", message, None),
            _ => eprintln!("Error: {message}"),
        }
    }

    /// A structured value: pretty JSON for people, a `result` event in JSON mode.
    pub fn result<T: Serialize>(&self, message: &str, value: &T) {
        match self.mode {
            OutputMode::Json => {
                let data = serde_json::to_value(value).ok();
                self.emit(Stream::Stdout, "result", message, data);
            }
            _ => match serde_json::to_string_pretty(value) {
                Ok(json) => println!("{json}"),
                Err(e) => eprintln!("Error: cannot render {message}: {e}"),
            },
        }
    }

    fn emit(&self, stream: Stream, event: &str, message: &str, data: Option<serde_json::Value>) {
        let line = JsonEvent {
            event,
            message,
            duration_secs: self.elapsed(),
            data,
        };
        let Ok(json) = serde_json::to_string(&line) else {
            return;
        };
        match stream {
            Stream::Stdout => println!("{json}"),
            Stream::Stderr => eprintln!("{json}"),
        }
    }
}

#[derive(Serialize)]
struct JsonEvent<'a> {
    event: &'a str,
    message: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    duration_secs: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<serde_json::Value>,
}
