//! Request lifecycle controller — the state machine behind the button.
//!
//! ```text
//!  Default --click--> Loading --success--------> Default
//!                     Loading --click----------> Error (UserCancelled)
//!                     Loading --watchdog-------> Error (Timeout)
//!                     Loading --fetch rejected-> Error (Transport)
//!  Error   --click--> Loading
//! ```
//!
//! All transitions run on the task that owns the controller. The request
//! and the watchdog run as spawned tasks and only report back through
//! `RequestEvent`s on the channel handed to `new`; the embedding event loop
//! feeds those into `handle_event`.
//!
//! The in-flight request (cancellation token + watchdog) lives inside the
//! `Loading` variant, so leaving `Loading` by any path drops both.

use std::sync::Arc;
use std::time::Duration;

use reqwest::Url;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

use crate::config::{ButtonConfig, ConfigError};
use crate::fetcher::{FetchError, FetchResult, Fetcher};
use crate::state::{ButtonState, ButtonView, FailureCause, StateMessages};

/// Reported by the spawned request and watchdog tasks.
#[derive(Debug)]
pub enum RequestEvent {
    /// The network call settled (or was abandoned after cancellation).
    Completed { id: u64, outcome: FetchResult },
    /// The watchdog for request `id` expired and cancelled it.
    WatchdogFired { id: u64 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum TransitionError {
    #[error("button is disabled")]
    Disabled,
    #[error("a request is already in flight")]
    AlreadyLoading,
    #[error("no request in flight")]
    NotLoading,
}

/// Cancellation capability for the one outstanding request.
#[derive(Debug)]
pub struct RequestHandle {
    id: u64,
    token: CancellationToken,
}

impl RequestHandle {
    fn new(id: u64) -> Self {
        Self {
            id,
            token: CancellationToken::new(),
        }
    }

    /// Abort the request. Cancelling twice is a no-op.
    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }
}

/// One scheduled callback that force-cancels a request that runs too long.
/// Aborted when dropped.
struct WatchdogTimer {
    task: JoinHandle<()>,
}

impl WatchdogTimer {
    fn arm(
        id: u64,
        duration: Duration,
        token: CancellationToken,
        events: mpsc::Sender<RequestEvent>,
    ) -> Self {
        let task = tokio::spawn(async move {
            tokio::time::sleep(duration).await;
            // Cancel first so a success racing this timer is seen as cancelled.
            token.cancel();
            let _ = events.send(RequestEvent::WatchdogFired { id }).await;
        });
        Self { task }
    }
}

impl Drop for WatchdogTimer {
    fn drop(&mut self) {
        self.task.abort();
    }
}

struct InFlight {
    handle: RequestHandle,
    watchdog: Option<WatchdogTimer>,
}

impl Drop for InFlight {
    fn drop(&mut self) {
        // Whatever ended the request, nothing it spawned may outlive it.
        self.handle.cancel();
    }
}

enum Lifecycle {
    Idle,
    Loading(InFlight),
    Failed(FailureCause),
}

pub struct RequestController {
    url: Url,
    max_duration: Option<Duration>,
    messages: StateMessages,
    disabled: bool,
    fetcher: Arc<dyn Fetcher>,
    events: mpsc::Sender<RequestEvent>,
    lifecycle: Lifecycle,
    next_id: u64,
    last_response: Option<serde_json::Value>,
}

impl RequestController {
    /// Validate `config` and build an idle controller.
    ///
    /// Request and watchdog tasks report on `events`; the caller owns the
    /// receiving end and passes every event to `handle_event`.
    pub fn new(
        config: &ButtonConfig,
        fetcher: Arc<dyn Fetcher>,
        events: mpsc::Sender<RequestEvent>,
    ) -> Result<Self, ConfigError> {
        let url = config.validate()?;
        Ok(Self {
            url,
            max_duration: config.max_duration(),
            messages: config.state_messages.clone(),
            disabled: config.is_disabled,
            fetcher,
            events,
            lifecycle: Lifecycle::Idle,
            next_id: 0,
            last_response: None,
        })
    }

    // ── Queries ───────────────────────────────────────────────────────────────

    pub fn state(&self) -> ButtonState {
        match self.lifecycle {
            Lifecycle::Idle => ButtonState::Default,
            Lifecycle::Loading(_) => ButtonState::Loading,
            Lifecycle::Failed(_) => ButtonState::Error,
        }
    }

    pub fn is_loading(&self) -> bool {
        matches!(self.lifecycle, Lifecycle::Loading(_))
    }

    pub fn is_disabled(&self) -> bool {
        self.disabled
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn max_duration(&self) -> Option<Duration> {
        self.max_duration
    }

    /// Cause of the current `Error` state; `None` in any other state.
    pub fn last_failure(&self) -> Option<&FailureCause> {
        match &self.lifecycle {
            Lifecycle::Failed(cause) => Some(cause),
            _ => None,
        }
    }

    /// Parsed body of the most recent successful request.
    pub fn last_response(&self) -> Option<&serde_json::Value> {
        self.last_response.as_ref()
    }

    /// Id of the live request, if any.
    pub fn in_flight_id(&self) -> Option<u64> {
        match &self.lifecycle {
            Lifecycle::Loading(f) => Some(f.handle.id),
            _ => None,
        }
    }

    pub fn watchdog_armed(&self) -> bool {
        match &self.lifecycle {
            Lifecycle::Loading(f) => f.watchdog.is_some(),
            _ => false,
        }
    }

    pub fn view(&self) -> ButtonView {
        ButtonView::new(
            self.state(),
            &self.messages,
            self.disabled,
            self.url.as_str(),
            self.last_failure().cloned(),
        )
    }

    // ── User intents ──────────────────────────────────────────────────────────

    /// Click handler: cancel while loading, otherwise start.
    ///
    /// Returns the new state, or `None` if the click was ignored (disabled).
    pub fn toggle(&mut self) -> Option<ButtonState> {
        if self.disabled {
            debug!("click ignored: button disabled");
            return None;
        }
        let result = if self.is_loading() {
            self.cancel()
        } else {
            self.start()
        };
        match result {
            Ok(()) => Some(self.state()),
            Err(e) => {
                warn!("click ignored: {}", e);
                None
            }
        }
    }

    /// Begin a request. Only valid from `Default` or `Error`.
    pub fn start(&mut self) -> Result<(), TransitionError> {
        if self.disabled {
            return Err(TransitionError::Disabled);
        }
        if self.is_loading() {
            return Err(TransitionError::AlreadyLoading);
        }

        self.next_id += 1;
        let handle = RequestHandle::new(self.next_id);
        let watchdog = self.max_duration.map(|d| {
            WatchdogTimer::arm(handle.id, d, handle.token.clone(), self.events.clone())
        });
        self.spawn_request(&handle);

        info!(
            "request #{} started: GET {} (watchdog {})",
            handle.id,
            self.url,
            match self.max_duration {
                Some(d) => format!("{}ms", d.as_millis()),
                None => "off".to_string(),
            }
        );
        self.lifecycle = Lifecycle::Loading(InFlight { handle, watchdog });
        Ok(())
    }

    /// Abort the in-flight request. Only valid from `Loading`.
    pub fn cancel(&mut self) -> Result<(), TransitionError> {
        let Some(id) = self.in_flight_id() else {
            return Err(TransitionError::NotLoading);
        };
        info!("request #{} cancelled by user", id);
        self.fail(FailureCause::UserCancelled);
        Ok(())
    }

    pub fn set_disabled(&mut self, disabled: bool) {
        if self.disabled != disabled {
            debug!("button {}", if disabled { "disabled" } else { "enabled" });
        }
        self.disabled = disabled;
    }

    // ── Outcomes ──────────────────────────────────────────────────────────────

    /// Feed one event from the request/watchdog tasks.
    /// Returns `true` if the button state changed.
    pub fn handle_event(&mut self, event: RequestEvent) -> bool {
        match event {
            RequestEvent::Completed { id, outcome } => match outcome {
                Ok(body) => self.on_success(id, body),
                Err(e) => self.on_failure(id, e),
            },
            RequestEvent::WatchdogFired { id } => self.on_watchdog(id),
        }
    }

    /// The request resolved. Ignored for stale ids; a request whose handle
    /// was already cancelled ends in `Error`, never `Default`.
    pub fn on_success(&mut self, id: u64, body: serde_json::Value) -> bool {
        let Some(cancelled) = self.live_handle(id).map(RequestHandle::is_cancelled) else {
            trace!("late success for request #{} ignored", id);
            return false;
        };
        if cancelled {
            // Only the watchdog cancels without leaving Loading itself.
            warn!("request #{} succeeded after its watchdog fired", id);
            self.fail(FailureCause::Timeout);
            return true;
        }
        info!("request #{} succeeded", id);
        self.last_response = Some(body);
        self.lifecycle = Lifecycle::Idle;
        true
    }

    /// The request rejected. Ignored for stale ids.
    pub fn on_failure(&mut self, id: u64, error: FetchError) -> bool {
        let Some(cancelled) = self.live_handle(id).map(RequestHandle::is_cancelled) else {
            trace!("late failure for request #{} ignored: {}", id, error);
            return false;
        };
        let cause = match error {
            FetchError::Aborted if cancelled => FailureCause::Timeout,
            FetchError::Aborted => FailureCause::Transport("aborted".to_string()),
            FetchError::Transport(e) => FailureCause::Transport(e),
        };
        warn!("request #{} failed: {}", id, cause);
        self.fail(cause);
        true
    }

    /// The watchdog expired. Ignored for stale ids.
    pub fn on_watchdog(&mut self, id: u64) -> bool {
        if self.live_handle(id).is_none() {
            trace!("stale watchdog for request #{} ignored", id);
            return false;
        }
        warn!("request #{} timed out", id);
        self.fail(FailureCause::Timeout);
        true
    }

    // ── Internals ─────────────────────────────────────────────────────────────

    fn live_handle(&self, id: u64) -> Option<&RequestHandle> {
        match &self.lifecycle {
            Lifecycle::Loading(f) if f.handle.id == id => Some(&f.handle),
            _ => None,
        }
    }

    /// Leave `Loading` for `Error`. Dropping the in-flight record cancels
    /// the token and disarms the watchdog.
    fn fail(&mut self, cause: FailureCause) {
        self.lifecycle = Lifecycle::Failed(cause);
    }

    fn spawn_request(&self, handle: &RequestHandle) {
        let id = handle.id;
        let token = handle.token.clone();
        let events = self.events.clone();
        let request = self.fetcher.fetch(self.url.clone());
        tokio::spawn(async move {
            let outcome = tokio::select! {
                biased;
                _ = token.cancelled() => Err(FetchError::Aborted),
                r = request => r,
            };
            let _ = events.send(RequestEvent::Completed { id, outcome }).await;
        });
    }
}
