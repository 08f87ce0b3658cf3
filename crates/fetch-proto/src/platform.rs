//! Per-user directories for the config file and the log.

use std::path::PathBuf;

const APP_DIR: &str = "fetch-button";

/// `<data_dir>/fetch-button`, where `tui.log` lives.
pub fn data_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join(APP_DIR)
}

/// `<config_dir>/fetch-button`, where `config.toml` lives.
pub fn config_dir() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_DIR)
}
