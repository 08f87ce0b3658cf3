mod action;
mod app;
mod app_state;
mod component;
mod components;
mod http;
mod theme;
mod widgets;

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tokio::sync::mpsc;

use fetch_proto::{Config, HttpFetcher, RequestController, RequestEvent, ViewStore};

/// Terminal fetch button: click to GET a URL, click again to cancel.
#[derive(Parser, Debug)]
#[command(name = "fetch-button", version)]
struct Args {
    /// URL to GET (overrides the config file)
    #[arg(long)]
    url: Option<String>,
    /// Watchdog timeout in milliseconds; 0 disables it
    #[arg(long)]
    max_duration_ms: Option<u64>,
    /// Start with the button disabled
    #[arg(long)]
    disabled: bool,
    /// Read config from this file instead of the default location
    #[arg(long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let data_dir = fetch_proto::platform::data_dir();
    std::fs::create_dir_all(&data_dir)?;
    let log_path = data_dir.join("tui.log");

    let log_file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)?;

    // Allow RUST_LOG override; keep connection-level DEBUG from the HTTP
    // client internals out of the file.
    let log_filter = std::env::var("RUST_LOG")
        .unwrap_or_else(|_| "debug,hyper_util=warn,reqwest=warn,hyper=warn".to_string());
    tracing_subscriber::fmt()
        .with_writer(log_file)
        .with_env_filter(log_filter.as_str())
        .with_ansi(false)
        .init();

    // Print log path to stderr so the operator can tail it immediately.
    eprintln!("fetch-button log: {}", log_path.display());

    tracing::info!("fetch-button starting…");

    // ── Load config ──────────────────────────────────────────────────────────
    let loaded = match &args.config {
        Some(path) => Config::load_from(path),
        None => Config::load(),
    };
    let mut config = loaded.unwrap_or_else(|e| {
        tracing::warn!("Failed to load config, using defaults: {}", e);
        Config::default()
    });
    if let Some(url) = args.url {
        config.button.url = url;
    }
    if let Some(ms) = args.max_duration_ms {
        config.button.max_duration_ms = ms;
    }
    if args.disabled {
        config.button.is_disabled = true;
    }

    // ── Controller ───────────────────────────────────────────────────────────
    let fetcher = Arc::new(HttpFetcher::new()?);
    let (request_tx, request_rx) = mpsc::channel::<RequestEvent>(64);
    let controller = RequestController::new(&config.button, fetcher, request_tx)?;
    tracing::info!(
        "target: GET {} (watchdog {:?})",
        controller.url(),
        controller.max_duration()
    );

    let views = Arc::new(ViewStore::new(controller.view()));
    let (api_tx, api_rx) = mpsc::channel::<http::ApiCommand>(16);

    let mut app = app::App::new(controller, views.clone());

    // ── HTTP server ──────────────────────────────────────────────────────────
    if config.http.enabled {
        let (addr, _server) =
            http::start_server(&config.http.bind_address, config.http.port, views, api_tx)
                .await?;
        app.set_http_listening(Some(addr.to_string()));
    } else {
        drop(api_tx);
    }

    // ── Run TUI ──────────────────────────────────────────────────────────────
    app.run(request_rx, api_rx).await?;

    Ok(())
}
