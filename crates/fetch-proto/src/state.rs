//! Button state model and the view snapshot handed to rendering surfaces.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::RwLock;

/// The three mutually exclusive modes of the button.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ButtonState {
    #[default]
    Default, // idle, nothing outstanding
    Loading, // one request in flight
    Error,   // last attempt was cancelled, timed out or failed
}

impl ButtonState {
    /// Styling discriminator: the `fetch-button` base class plus the
    /// state's BEM modifier, if any.
    pub fn class_name(self) -> &'static str {
        match self {
            Self::Default => "fetch-button",
            Self::Loading => "fetch-button fetch-button--loading",
            Self::Error => "fetch-button fetch-button--error",
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Default => "default",
            Self::Loading => "loading",
            Self::Error => "error",
        }
    }
}

/// Label and tooltip text for one state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub label: String,
    pub tooltip: String,
}

impl Message {
    pub fn new(label: impl Into<String>, tooltip: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            tooltip: tooltip.into(),
        }
    }
}

/// Caller-supplied text for every state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateMessages {
    pub default: Message,
    pub loading: Message,
    pub error: Message,
}

impl StateMessages {
    pub fn for_state(&self, state: ButtonState) -> &Message {
        match state {
            ButtonState::Default => &self.default,
            ButtonState::Loading => &self.loading,
            ButtonState::Error => &self.error,
        }
    }
}

impl Default for StateMessages {
    fn default() -> Self {
        Self {
            default: Message::new("Launch Rocket", "Ignites the fuel"),
            loading: Message::new("Launching", "Cancel launch"),
            error: Message::new("Launch Rocket", "Ignition error"),
        }
    }
}

/// Why the last attempt ended in `ButtonState::Error`.
///
/// Rendering collapses all causes onto the one error message; the cause is
/// kept for logs, toasts and the JSON view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "cause", content = "detail", rename_all = "snake_case")]
pub enum FailureCause {
    UserCancelled,
    Timeout,
    Transport(String),
}

impl std::fmt::Display for FailureCause {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UserCancelled => write!(f, "cancelled by user"),
            Self::Timeout => write!(f, "watchdog timeout"),
            Self::Transport(e) => write!(f, "transport failure: {}", e),
        }
    }
}

/// Snapshot of everything a host UI needs to draw the button.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ButtonView {
    pub state: ButtonState,
    pub class_name: String,
    pub label: String,
    pub tooltip: String,
    pub disabled: bool,
    pub url: String,
    pub last_failure: Option<FailureCause>,
}

impl ButtonView {
    pub fn new(
        state: ButtonState,
        messages: &StateMessages,
        disabled: bool,
        url: impl Into<String>,
        last_failure: Option<FailureCause>,
    ) -> Self {
        let msg = messages.for_state(state);
        let mut class_name = state.class_name().to_string();
        if disabled {
            class_name.push_str(" fetch-button--disabled");
        }
        Self {
            state,
            class_name,
            label: msg.label.clone(),
            tooltip: msg.tooltip.clone(),
            disabled,
            url: url.into(),
            last_failure,
        }
    }
}

/// Shared, read-mostly copy of the latest `ButtonView`.
///
/// The event loop that owns the controller is the only writer; other
/// surfaces (the HTTP API) read from here.
pub struct ViewStore {
    view: Arc<RwLock<ButtonView>>,
}

impl ViewStore {
    pub fn new(initial: ButtonView) -> Self {
        Self {
            view: Arc::new(RwLock::new(initial)),
        }
    }

    pub async fn get(&self) -> ButtonView {
        self.view.read().await.clone()
    }

    /// Replace the snapshot. Returns `true` if it changed.
    pub async fn publish(&self, view: ButtonView) -> bool {
        let mut current = self.view.write().await;
        if *current == view {
            return false;
        }
        *current = view;
        true
    }
}
