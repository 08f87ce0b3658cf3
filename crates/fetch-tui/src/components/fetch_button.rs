//! FetchButton component — the clickable button plus its tooltip.
//!
//! Renders whatever `ButtonView` the controller last published: the border
//! and label take the state's accent color, a spinner follows the label while
//! loading, and the tooltip hangs below the button. The tooltip shows on
//! hover and is always shown in the error state.

use std::time::Instant;

use ratatui::crossterm::event::{
    KeyCode, KeyEvent, KeyEventKind, MouseButton, MouseEvent, MouseEventKind,
};
use ratatui::{
    layout::{Alignment, Rect},
    style::Style,
    text::{Line, Span},
    widgets::{Block, BorderType, Borders, Clear, Paragraph},
    Frame,
};
use unicode_width::UnicodeWidthStr;

use fetch_proto::ButtonState;

use crate::{
    action::{Action, ComponentId},
    app_state::AppState,
    component::Component,
    theme::{button_color, style_button_label, style_muted, style_tooltip},
    widgets::toast::SPINNER_FRAMES,
};

const MIN_WIDTH: u16 = 24;
const BUTTON_HEIGHT: u16 = 3;
const TOOLTIP_HEIGHT: u16 = 2; // arrow row + text row

pub struct FetchButton {
    hovered: bool,
    spinner_frame: usize,
    /// Where the button box was last drawn — for mouse hit-testing.
    button_area: Rect,
}

impl FetchButton {
    pub fn new() -> Self {
        Self {
            hovered: false,
            spinner_frame: 0,
            button_area: Rect::default(),
        }
    }

    fn hit(&self, column: u16, row: u16) -> bool {
        contains(self.button_area, column, row)
    }
}

impl Default for FetchButton {
    fn default() -> Self {
        Self::new()
    }
}

impl Component for FetchButton {
    fn id(&self) -> ComponentId {
        ComponentId::FetchButton
    }

    fn handle_key(&mut self, key: KeyEvent, state: &AppState) -> Vec<Action> {
        if key.kind == KeyEventKind::Release || state.view.disabled {
            return vec![];
        }
        match key.code {
            KeyCode::Enter | KeyCode::Char(' ') => vec![Action::Click],
            _ => vec![],
        }
    }

    fn handle_mouse(&mut self, event: MouseEvent, _area: Rect, state: &AppState) -> Vec<Action> {
        let inside = self.hit(event.column, event.row);
        match event.kind {
            MouseEventKind::Down(MouseButton::Left) if inside && !state.view.disabled => {
                vec![Action::Click]
            }
            MouseEventKind::Moved if inside != self.hovered => vec![Action::Hover(inside)],
            _ => vec![],
        }
    }

    fn tick(&mut self, state: &AppState) -> Vec<Action> {
        if state.view.state == ButtonState::Loading {
            self.spinner_frame = (self.spinner_frame + 1) % SPINNER_FRAMES.len();
        } else {
            self.spinner_frame = 0;
        }
        vec![]
    }

    fn on_action(&mut self, action: &Action, _state: &AppState) -> Vec<Action> {
        if let Action::Hover(h) = action {
            self.hovered = *h;
        }
        vec![]
    }

    fn draw(&mut self, frame: &mut Frame, area: Rect, focused: bool, state: &AppState) {
        let view = &state.view;
        let label = if view.state == ButtonState::Loading {
            format!("{}  {}", view.label, SPINNER_FRAMES[self.spinner_frame])
        } else {
            view.label.clone()
        };

        let button = button_rect(area, label.width() as u16);
        self.button_area = button;
        if button.width == 0 || button.height == 0 {
            return;
        }

        let accent = button_color(view.state, view.disabled);
        let mut block = Block::default()
            .borders(Borders::ALL)
            .border_type(if focused && !view.disabled {
                BorderType::Thick
            } else {
                BorderType::Plain
            })
            .border_style(Style::default().fg(accent));
        if let Some(timer) = elapsed_badge(state) {
            block = block.title_bottom(Line::from(Span::styled(timer, style_muted())).right_aligned());
        }

        frame.render_widget(Clear, button);
        frame.render_widget(
            Paragraph::new(Line::from(Span::styled(
                label,
                style_button_label(view.state, view.disabled),
            )))
            .alignment(Alignment::Center)
            .block(block),
            button,
        );

        if !tooltip_visible(self.hovered || focused, view.state) {
            return;
        }
        let bottom = area.y + area.height;
        if button.y + BUTTON_HEIGHT + TOOLTIP_HEIGHT > bottom {
            return;
        }
        let arrow_area = Rect {
            x: button.x,
            y: button.y + BUTTON_HEIGHT,
            width: button.width,
            height: 1,
        };
        let text_area = Rect {
            y: arrow_area.y + 1,
            ..arrow_area
        };
        frame.render_widget(
            Paragraph::new(Span::styled("▲", Style::default().fg(accent)))
                .alignment(Alignment::Center),
            arrow_area,
        );
        frame.render_widget(
            Paragraph::new(Span::styled(
                view.tooltip.clone(),
                style_tooltip(view.state, view.disabled),
            ))
            .alignment(Alignment::Center)
            .style(style_tooltip(view.state, view.disabled)),
            text_area,
        );
    }
}

/// Centered box wide enough for the label, leaving room for the tooltip.
fn button_rect(area: Rect, label_width: u16) -> Rect {
    let width = label_width
        .saturating_add(6)
        .max(MIN_WIDTH)
        .min(area.width);
    let height = BUTTON_HEIGHT.min(area.height);
    let block_h = BUTTON_HEIGHT + TOOLTIP_HEIGHT;
    let y = area.y + area.height.saturating_sub(block_h) / 2;
    let x = area.x + (area.width - width) / 2;
    Rect {
        x,
        y,
        width,
        height,
    }
}

fn tooltip_visible(hovered: bool, state: ButtonState) -> bool {
    hovered || state == ButtonState::Error
}

fn contains(r: Rect, column: u16, row: u16) -> bool {
    column >= r.x && column < r.x + r.width && row >= r.y && row < r.y + r.height
}

/// "1.2s / 4.0s" while loading; `None` otherwise.
fn elapsed_badge(state: &AppState) -> Option<String> {
    if state.view.state != ButtonState::Loading {
        return None;
    }
    let since = state.loading_since?;
    let elapsed = Instant::now().saturating_duration_since(since).as_secs_f32();
    Some(match state.max_duration {
        Some(max) => format!(" {:.1}s / {:.1}s ", elapsed, max.as_secs_f32()),
        None => format!(" {:.1}s ", elapsed),
    })
}
