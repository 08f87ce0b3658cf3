//! Status bar — bottom lines with button state, request target, and keybindings.

use ratatui::{
    layout::Rect,
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::Paragraph,
    Frame,
};

use crate::app_state::AppState;
use crate::theme::{button_color, C_BADGE_LIVE, C_BADGE_PENDING, C_MUTED, C_SECONDARY, C_SEPARATOR};

/// Draw the info bar: state badge, url, watchdog and control API address.
pub fn draw_info_bar(frame: &mut Frame, area: Rect, state: &AppState) {
    let view = &state.view;
    let mode = if view.disabled {
        "DISABLED".to_string()
    } else {
        view.state.as_str().to_ascii_uppercase()
    };

    let mut spans = vec![
        Span::styled(
            format!(" {} ", mode),
            Style::default()
                .fg(button_color(view.state, view.disabled))
                .add_modifier(Modifier::BOLD),
        ),
        Span::styled(format!(" GET {}", view.url), Style::default().fg(C_SECONDARY)),
        Span::styled(
            format!("  watchdog {}", watchdog_label(state)),
            Style::default().fg(C_MUTED),
        ),
    ];
    match &state.http_listening {
        Some(addr) => spans.push(Span::styled(
            format!("  ● api {}", addr),
            Style::default().fg(C_BADGE_LIVE),
        )),
        None => spans.push(Span::styled("  ○ api off", Style::default().fg(C_BADGE_PENDING))),
    }

    frame.render_widget(Paragraph::new(Line::from(spans)), area);
}

/// Draw a horizontal separator line.
pub fn draw_separator(frame: &mut Frame, area: Rect) {
    let line = Line::from(Span::styled(
        "─".repeat(area.width as usize),
        Style::default().fg(C_SEPARATOR),
    ));
    frame.render_widget(Paragraph::new(line), area);
}

/// Draw the keybindings footer bar (one row).
pub fn draw_keys_bar(frame: &mut Frame, area: Rect) {
    let keys = " Enter/Space/click fetch or cancel  d disable  L logs  K keys  ? help  q quit";
    frame.render_widget(
        Paragraph::new(Span::styled(keys, Style::default().fg(C_MUTED))),
        area,
    );
}

fn watchdog_label(state: &AppState) -> String {
    match state.max_duration {
        Some(d) => format!("{}ms", d.as_millis()),
        None => "off".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fetch_proto::{ButtonState, ButtonView, StateMessages};
    use std::time::Duration;

    fn state(max: Option<Duration>) -> AppState {
        let view = ButtonView::new(
            ButtonState::Default,
            &StateMessages::default(),
            false,
            "http://localhost/",
            None,
        );
        AppState::new(view, max)
    }

    #[test]
    fn test_watchdog_label() {
        assert_eq!(watchdog_label(&state(None)), "off");
        assert_eq!(
            watchdog_label(&state(Some(Duration::from_millis(4000)))),
            "4000ms"
        );
    }
}
