pub mod fetch_button;
pub mod help_overlay;
pub mod log_panel;
