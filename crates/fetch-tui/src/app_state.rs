//! AppState — shared read-only data passed to all components during render/event.
//!
//! Components read this for the button view, but never mutate it.
//! The App event-loop is the only thing that writes to AppState.

use std::time::{Duration, Instant};

use fetch_proto::ButtonView;

/// Lines kept for the log panel.
pub const MAX_LOG_LINES: usize = 500;

pub struct AppState {
    /// Latest snapshot from the controller.
    pub view: ButtonView,
    /// Watchdog setting, shown in the status bar.
    pub max_duration: Option<Duration>,
    /// When the current request started (`None` unless loading).
    pub loading_since: Option<Instant>,
    /// Whether the HTTP control API is listening.
    pub http_listening: Option<String>,
    /// In-app log lines (newest last).
    pub logs: Vec<String>,
}

impl AppState {
    pub fn new(view: ButtonView, max_duration: Option<Duration>) -> Self {
        Self {
            view,
            max_duration,
            loading_since: None,
            http_listening: None,
            logs: Vec::new(),
        }
    }

    pub fn push_log(&mut self, msg: impl Into<String>) {
        let stamp = chrono::Local::now().format("%H:%M:%S");
        self.logs.push(format!("{} {}", stamp, msg.into()));
        if self.logs.len() > MAX_LOG_LINES {
            let excess = self.logs.len() - MAX_LOG_LINES;
            self.logs.drain(..excess);
        }
    }
}
