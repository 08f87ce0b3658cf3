//! App — component-based event loop around the request controller.
//!
//! Architecture:
//! - `App` owns the components, `AppState` (read-only to components) and the
//!   `RequestController`.
//! - Terminal input arrives as `AppMessage`s from a blocking reader task.
//! - Request/watchdog outcomes arrive as `RequestEvent`s; HTTP API clicks as
//!   `ApiCommand`s. All of them are handled on this one task, so controller
//!   transitions never run concurrently.
//! - Components return `Vec<Action>`; App dispatches each Action.

use std::io;
use std::sync::Arc;
use std::time::{Duration, Instant};

use ratatui::crossterm::{
    event::{
        self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEvent, KeyEventKind,
        KeyModifiers, MouseEvent,
    },
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Rect},
    Terminal,
};
use tokio::sync::mpsc;
use tracing::{debug, info};

use fetch_proto::{ButtonState, RequestController, RequestEvent, ViewStore};

use crate::{
    action::Action,
    app_state::AppState,
    component::Component,
    components::{fetch_button::FetchButton, help_overlay::HelpOverlay, log_panel::LogPanel},
    http::ApiCommand,
    widgets::{status_bar, toast::ToastManager},
};

// ── Internal event bus ────────────────────────────────────────────────────────

enum AppMessage {
    Event(Event),
}

// ── App ───────────────────────────────────────────────────────────────────────

pub struct App {
    pub state: AppState,
    controller: RequestController,
    views: Arc<ViewStore>,

    // ── Components ────────────────────────────────────────────────────────────
    button: FetchButton,
    log_panel: LogPanel,
    help_overlay: HelpOverlay,
    toast: ToastManager,

    show_keys_bar: bool,
    should_quit: bool,

    /// Last-drawn layout rects — used for mouse hit-testing.
    button_area: Rect,
    log_area: Rect,
}

impl App {
    pub fn new(controller: RequestController, views: Arc<ViewStore>) -> Self {
        let state = AppState::new(controller.view(), controller.max_duration());
        Self {
            state,
            controller,
            views,
            button: FetchButton::new(),
            log_panel: LogPanel::new(),
            help_overlay: HelpOverlay::new(),
            toast: ToastManager::new(),
            show_keys_bar: true,
            should_quit: false,
            button_area: Rect::default(),
            log_area: Rect::default(),
        }
    }

    pub fn set_http_listening(&mut self, addr: Option<String>) {
        self.state.http_listening = addr;
    }

    // ── Main run loop ─────────────────────────────────────────────────────────

    pub async fn run(
        mut self,
        mut request_rx: mpsc::Receiver<RequestEvent>,
        mut api_rx: mpsc::Receiver<ApiCommand>,
    ) -> anyhow::Result<()> {
        debug!("run(): enabling raw mode");
        enable_raw_mode()?;
        let mut stdout = io::stdout();
        execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
        let backend = CrosstermBackend::new(stdout);
        let mut terminal = Terminal::new(backend)?;
        debug!("run(): terminal created, size={:?}", terminal.size());

        let (tx, mut rx) = mpsc::channel::<AppMessage>(1024);
        self.state.push_log(format!("ready: GET {}", self.state.view.url));

        // ── Background task: keyboard/mouse events ────────────────────────────
        tokio::task::spawn_blocking(move || loop {
            match event::read() {
                Ok(ev) => {
                    if tx.blocking_send(AppMessage::Event(ev)).is_err() {
                        break;
                    }
                }
                Err(_) => break,
            }
        });

        // Spinner animation, elapsed timer and toast expiry.
        let mut ui_tick = tokio::time::interval(Duration::from_millis(100));
        ui_tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        // ── Main loop ─────────────────────────────────────────────────────────
        let mut needs_redraw = true;
        loop {
            if needs_redraw {
                terminal.draw(|f| self.draw(f))?;
            }

            if self.should_quit {
                break;
            }

            needs_redraw = tokio::select! {
                Some(msg) = rx.recv() => self.handle_message(msg).await,

                Some(ev) = request_rx.recv() => self.on_request_event(ev).await,

                Some(cmd) = api_rx.recv() => {
                    self.on_api_command(cmd).await;
                    true
                }

                _ = ui_tick.tick() => {
                    self.toast.tick();
                    let actions = {
                        let s = &self.state;
                        let mut all = Vec::new();
                        all.extend(self.button.tick(s));
                        all.extend(self.log_panel.tick(s));
                        all
                    };
                    for action in actions {
                        self.dispatch(action).await;
                    }
                    true
                }
            };
        }

        // ── Teardown ──────────────────────────────────────────────────────────
        disable_raw_mode()?;
        execute!(
            terminal.backend_mut(),
            LeaveAlternateScreen,
            DisableMouseCapture
        )?;
        terminal.show_cursor()?;
        info!("fetch-button exiting");

        Ok(())
    }

    // ── Message handlers ──────────────────────────────────────────────────────

    /// Returns `true` if the message requires a redraw.
    async fn handle_message(&mut self, msg: AppMessage) -> bool {
        match msg {
            AppMessage::Event(Event::Key(key)) => {
                if key.kind == KeyEventKind::Release {
                    return false;
                }
                for a in self.handle_key(key) {
                    self.dispatch(a).await;
                }
            }
            AppMessage::Event(Event::Mouse(mouse)) => {
                for a in self.handle_mouse(mouse) {
                    self.dispatch(a).await;
                }
            }
            AppMessage::Event(Event::Resize(w, h)) => {
                self.dispatch(Action::Resize(w, h)).await;
            }
            AppMessage::Event(_) => return false,
        }
        true
    }

    async fn on_request_event(&mut self, ev: RequestEvent) -> bool {
        if !self.controller.handle_event(ev) {
            return false;
        }
        match self.controller.state() {
            ButtonState::Default => {
                let size = self
                    .controller
                    .last_response()
                    .map(|body| body.to_string().len())
                    .unwrap_or(0);
                self.toast.success("Response received");
                self.state
                    .push_log(format!("request finished: {} bytes of JSON", size));
            }
            ButtonState::Error => self.report_failure(),
            ButtonState::Loading => {}
        }
        self.sync_view().await;
        true
    }

    async fn on_api_command(&mut self, cmd: ApiCommand) {
        match cmd {
            ApiCommand::Click { reply } => {
                self.click().await;
                let _ = reply.send(self.controller.view());
            }
        }
    }

    // ── Input handling ────────────────────────────────────────────────────────

    fn handle_key(&mut self, key: KeyEvent) -> Vec<Action> {
        match key.code {
            KeyCode::Char('c') if key.modifiers == KeyModifiers::CONTROL => {
                return vec![Action::Quit];
            }
            KeyCode::Char('?') => return vec![Action::ToggleHelp],
            _ => {}
        }

        // Help overlay captures all keys when visible
        if self.help_overlay.visible {
            return self.help_overlay.handle_key(key, &self.state);
        }

        match key.code {
            KeyCode::Char('q') if key.modifiers == KeyModifiers::NONE => return vec![Action::Quit],
            KeyCode::Char('L') => return vec![Action::ToggleLogs],
            KeyCode::Char('K') => return vec![Action::ToggleKeys],
            KeyCode::Char('d') => return vec![Action::ToggleDisabled],
            _ => {}
        }

        let mut actions = self.log_panel.handle_key(key, &self.state);
        actions.extend(self.button.handle_key(key, &self.state));
        actions
    }

    fn handle_mouse(&mut self, mouse: MouseEvent) -> Vec<Action> {
        if self.help_overlay.visible {
            return vec![];
        }
        let mut actions = self
            .button
            .handle_mouse(mouse, self.button_area, &self.state);
        let in_log = mouse.column >= self.log_area.x
            && mouse.column < self.log_area.x + self.log_area.width
            && mouse.row >= self.log_area.y
            && mouse.row < self.log_area.y + self.log_area.height;
        if in_log {
            actions.extend(self.log_panel.handle_mouse(mouse, self.log_area, &self.state));
        }
        actions
    }

    // ── Action dispatcher ─────────────────────────────────────────────────────

    async fn dispatch(&mut self, action: Action) {
        let secondary: Vec<Action> = {
            let s = &self.state;
            let mut out = Vec::new();
            out.extend(self.button.on_action(&action, s));
            out.extend(self.log_panel.on_action(&action, s));
            out.extend(self.help_overlay.on_action(&action, s));
            out
        };

        self.apply_action(action).await;

        // Dispatch any secondary actions (depth-limited to 1 level)
        for a in secondary {
            self.apply_action(a).await;
        }
    }

    async fn apply_action(&mut self, action: Action) {
        match &action {
            Action::Hover(_) | Action::Noop => {}
            _ => debug!("apply_action: {:?}", action),
        }
        match action {
            Action::Click => self.click().await,
            Action::ToggleDisabled => {
                let disabled = !self.controller.is_disabled();
                self.controller.set_disabled(disabled);
                let msg = if disabled { "Button disabled" } else { "Button enabled" };
                self.toast.info(msg);
                self.state.push_log(msg);
                self.sync_view().await;
            }
            Action::ToggleKeys => self.show_keys_bar = !self.show_keys_bar,
            Action::Quit => self.should_quit = true,
            // Component-local or no-op at app level.
            Action::Hover(_)
            | Action::ToggleLogs
            | Action::ToggleHelp
            | Action::Resize(_, _)
            | Action::Noop => {}
        }
    }

    async fn click(&mut self) {
        match self.controller.toggle() {
            Some(ButtonState::Loading) => {
                self.state.loading_since = Some(Instant::now());
                self.state.push_log(format!(
                    "request #{} started",
                    self.controller.in_flight_id().unwrap_or_default()
                ));
            }
            Some(ButtonState::Error) => self.report_failure(),
            Some(ButtonState::Default) => {}
            None => self.state.push_log("click ignored"),
        }
        self.sync_view().await;
    }

    fn report_failure(&mut self) {
        if let Some(cause) = self.controller.last_failure().cloned() {
            self.toast.failure(&cause);
            self.state.push_log(format!("request failed: {}", cause));
        }
    }

    /// Copy the controller's view into AppState and the shared store.
    async fn sync_view(&mut self) {
        let view = self.controller.view();
        if view.state != ButtonState::Loading {
            self.state.loading_since = None;
        }
        self.state.view = view.clone();
        self.views.publish(view).await;
    }

    // ── Drawing ───────────────────────────────────────────────────────────────

    fn draw(&mut self, frame: &mut ratatui::Frame) {
        use crate::theme::C_BG;
        use ratatui::widgets::Block;
        let area = frame.area();

        frame.render_widget(
            Block::default().style(ratatui::style::Style::default().bg(C_BG)),
            area,
        );

        let log_h = if self.log_panel.expanded { 10u16 } else { 1 };
        let keys_h = if self.show_keys_bar { 1u16 } else { 0 };
        let outer = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Min(0),
                Constraint::Length(log_h),
                Constraint::Length(1),
                Constraint::Length(1),
                Constraint::Length(keys_h),
            ])
            .split(area);

        self.button_area = outer[0];
        self.button.draw(frame, outer[0], !self.log_panel.expanded, &self.state);

        self.log_area = outer[1];
        self.log_panel.draw(frame, outer[1], self.log_panel.expanded, &self.state);

        status_bar::draw_separator(frame, outer[2]);
        status_bar::draw_info_bar(frame, outer[3], &self.state);
        if self.show_keys_bar {
            status_bar::draw_keys_bar(frame, outer[4]);
        }

        // ── Help overlay (on top of everything) ──────────────────────────────
        if self.help_overlay.visible {
            self.help_overlay.draw(frame, area, false, &self.state);
        }

        // ── Toast notifications (topmost layer) ──────────────────────────────
        self.toast.draw(frame, area);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fetch_proto::fetcher::FetchResult;
    use fetch_proto::{ButtonConfig, FailureCause, Fetcher, Url};
    use futures_util::future::BoxFuture;
    use tokio::sync::oneshot;

    /// Resolves with an empty JSON object after the given delay.
    struct SleepFetcher(Duration);

    impl Fetcher for SleepFetcher {
        fn fetch(&self, _url: Url) -> BoxFuture<'static, FetchResult> {
            let delay = self.0;
            Box::pin(async move {
                tokio::time::sleep(delay).await;
                Ok(serde_json::json!({}))
            })
        }
    }

    fn app(max_duration_ms: u64) -> (App, mpsc::Receiver<RequestEvent>) {
        let (tx, rx) = mpsc::channel(16);
        let config = ButtonConfig::new("http://127.0.0.1:1/delay/5", max_duration_ms);
        let controller =
            RequestController::new(&config, Arc::new(SleepFetcher(Duration::from_secs(5))), tx)
                .unwrap();
        let views = Arc::new(ViewStore::new(controller.view()));
        (App::new(controller, views), rx)
    }

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    async fn press(app: &mut App, code: KeyCode) {
        app.handle_message(AppMessage::Event(Event::Key(key(code))))
            .await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_enter_starts_and_second_enter_cancels() {
        let (mut app, _rx) = app(1000);

        press(&mut app, KeyCode::Enter).await;
        assert_eq!(app.state.view.state, ButtonState::Loading);
        assert_eq!(app.views.get().await.state, ButtonState::Loading);
        assert!(app.state.loading_since.is_some());

        press(&mut app, KeyCode::Enter).await;
        assert_eq!(app.state.view.state, ButtonState::Error);
        assert_eq!(app.state.view.tooltip, "Ignition error");
        assert_eq!(
            app.views.get().await.last_failure,
            Some(FailureCause::UserCancelled)
        );
        assert!(app.state.loading_since.is_none());
        assert!(!app.toast.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_watchdog_event_reaches_view() {
        let (mut app, mut rx) = app(1000);
        press(&mut app, KeyCode::Char(' ')).await;

        while app.state.view.state == ButtonState::Loading {
            let ev = rx.recv().await.unwrap();
            app.on_request_event(ev).await;
        }
        assert_eq!(app.state.view.state, ButtonState::Error);
        assert_eq!(app.state.view.last_failure, Some(FailureCause::Timeout));
        assert!(app.state.logs.iter().any(|l| l.contains("watchdog timeout")));
    }

    #[tokio::test(start_paused = true)]
    async fn test_disabled_mode_blocks_clicks() {
        let (mut app, _rx) = app(1000);

        press(&mut app, KeyCode::Char('d')).await;
        assert!(app.state.view.disabled);
        press(&mut app, KeyCode::Enter).await;
        assert_eq!(app.state.view.state, ButtonState::Default);

        press(&mut app, KeyCode::Char('d')).await;
        press(&mut app, KeyCode::Enter).await;
        assert_eq!(app.state.view.state, ButtonState::Loading);
    }

    #[tokio::test(start_paused = true)]
    async fn test_api_click_replies_with_new_view() {
        let (mut app, _rx) = app(0);
        let (reply, rx) = oneshot::channel();
        app.on_api_command(ApiCommand::Click { reply }).await;
        let view = rx.await.unwrap();
        assert_eq!(view.state, ButtonState::Loading);
        assert_eq!(app.views.get().await.state, ButtonState::Loading);
    }

    #[tokio::test]
    async fn test_help_overlay_swallows_keys() {
        let (mut app, _rx) = app(1000);
        press(&mut app, KeyCode::Char('?')).await;
        assert!(app.help_overlay.visible);
        press(&mut app, KeyCode::Enter).await;
        assert_eq!(app.state.view.state, ButtonState::Default);
        press(&mut app, KeyCode::Esc).await;
        assert!(!app.help_overlay.visible);
    }

    #[tokio::test]
    async fn test_quit_keys() {
        let (mut app, _rx) = app(1000);
        press(&mut app, KeyCode::Char('q')).await;
        assert!(app.should_quit);
    }
}
