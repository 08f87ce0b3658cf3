//! Color palette and style constants for the fetch button TUI.

use ratatui::style::{Color, Modifier, Style};

use fetch_proto::ButtonState;

// ── Color palette ─────────────────────────────────────────────────────────────

pub const C_BG: Color = Color::Rgb(18, 18, 18);
pub const C_PRIMARY: Color = Color::Rgb(210, 210, 225);
pub const C_SECONDARY: Color = Color::Rgb(115, 115, 138);
pub const C_MUTED: Color = Color::Rgb(72, 72, 88);
pub const C_SEPARATOR: Color = Color::Rgb(40, 40, 52);
pub const C_PANEL_BORDER: Color = Color::Rgb(40, 40, 52);
pub const C_PANEL_BORDER_FOCUSED: Color = Color::Rgb(120, 100, 200);

// Button states, from the web stylesheet: black / #f57901 / #f40002 / #4a4a4a.
// "Black" reads as light text on the dark terminal background.
pub const C_BUTTON_DEFAULT: Color = Color::Rgb(230, 230, 240);
pub const C_BUTTON_LOADING: Color = Color::Rgb(0xf5, 0x79, 0x01);
pub const C_BUTTON_ERROR: Color = Color::Rgb(0xf4, 0x00, 0x02);
pub const C_BUTTON_DISABLED: Color = Color::Rgb(0x4a, 0x4a, 0x4a);
pub const C_TOOLTIP_FG: Color = Color::Rgb(255, 255, 255);

pub const C_TOAST_INFO: Color = Color::Rgb(80, 160, 220);
pub const C_TOAST_SUCCESS: Color = Color::Rgb(80, 200, 120);
pub const C_TOAST_WARNING: Color = Color::Rgb(255, 184, 80);
pub const C_TOAST_ERROR: Color = Color::Rgb(255, 95, 95);

pub const C_BADGE_LIVE: Color = Color::Rgb(80, 200, 120);
pub const C_BADGE_PENDING: Color = Color::Rgb(255, 184, 80);

/// Accent color for a button in `state`.
pub fn button_color(state: ButtonState, disabled: bool) -> Color {
    if disabled {
        return C_BUTTON_DISABLED;
    }
    match state {
        ButtonState::Default => C_BUTTON_DEFAULT,
        ButtonState::Loading => C_BUTTON_LOADING,
        ButtonState::Error => C_BUTTON_ERROR,
    }
}

// ── Predefined styles ─────────────────────────────────────────────────────────

pub fn style_muted() -> Style {
    Style::default().fg(C_MUTED)
}

pub fn style_focused_border() -> Style {
    Style::default().fg(C_PANEL_BORDER_FOCUSED)
}

pub fn style_unfocused_border() -> Style {
    Style::default().fg(C_PANEL_BORDER)
}

pub fn style_button_label(state: ButtonState, disabled: bool) -> Style {
    Style::default()
        .fg(button_color(state, disabled))
        .add_modifier(Modifier::BOLD)
}

/// Tooltip: white on the state's accent, like the web version.
pub fn style_tooltip(state: ButtonState, disabled: bool) -> Style {
    let bg = button_color(state, disabled);
    let fg = if bg == C_BUTTON_DEFAULT { C_BG } else { C_TOOLTIP_FG };
    Style::default().fg(fg).bg(bg).add_modifier(Modifier::BOLD)
}
