//! Local HTTP control API.
//!
//! `GET /api/state` returns the current `ButtonView`; `GET|POST /api/click`
//! clicks the button and returns the view after the click. Clicks are
//! forwarded into the App event loop, which owns the controller.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{extract::State, http::StatusCode, response::Json, routing::get, Router};
use fetch_proto::{ButtonView, ViewStore};
use tokio::net::TcpListener;
use tokio::sync::{mpsc, oneshot};
use tracing::{error, info};

/// Requests from the API into the App event loop.
#[derive(Debug)]
pub enum ApiCommand {
    Click { reply: oneshot::Sender<ButtonView> },
}

#[derive(Clone)]
struct HttpState {
    views: Arc<ViewStore>,
    cmd_tx: mpsc::Sender<ApiCommand>,
}

fn router(views: Arc<ViewStore>, cmd_tx: mpsc::Sender<ApiCommand>) -> Router {
    Router::new()
        .route("/api/state", get(get_state))
        .route("/api/click", get(click).post(click))
        .with_state(HttpState { views, cmd_tx })
}

/// Bind the API and serve it in the background. Returns the bound address.
pub async fn start_server(
    bind_address: &str,
    port: u16,
    views: Arc<ViewStore>,
    cmd_tx: mpsc::Sender<ApiCommand>,
) -> anyhow::Result<(SocketAddr, tokio::task::JoinHandle<()>)> {
    let addr = format!("{}:{}", bind_address, port);
    let listener = TcpListener::bind(&addr).await?;
    let local = listener.local_addr()?;
    info!("HTTP API server listening on http://{}", local);

    let app = router(views, cmd_tx);
    let handle = tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await {
            error!("HTTP server error: {}", e);
        }
    });
    Ok((local, handle))
}

async fn get_state(State(state): State<HttpState>) -> Json<ButtonView> {
    Json(state.views.get().await)
}

async fn click(State(state): State<HttpState>) -> Result<Json<ButtonView>, StatusCode> {
    info!("HTTP API: click");
    let (reply, rx) = oneshot::channel();
    if state.cmd_tx.send(ApiCommand::Click { reply }).await.is_err() {
        error!("Failed to forward click: app loop gone");
        return Err(StatusCode::SERVICE_UNAVAILABLE);
    }
    rx.await
        .map(Json)
        .map_err(|_| StatusCode::SERVICE_UNAVAILABLE)
}

#[cfg(test)]
mod tests {
    use super::*;
    use fetch_proto::{ButtonState, StateMessages};

    fn view(state: ButtonState) -> ButtonView {
        ButtonView::new(state, &StateMessages::default(), false, "http://localhost/", None)
    }

    fn http_state() -> (HttpState, mpsc::Receiver<ApiCommand>) {
        let (cmd_tx, cmd_rx) = mpsc::channel(4);
        let views = Arc::new(ViewStore::new(view(ButtonState::Default)));
        (HttpState { views, cmd_tx }, cmd_rx)
    }

    #[tokio::test]
    async fn test_get_state_returns_published_view() {
        let (state, _rx) = http_state();
        state.views.publish(view(ButtonState::Loading)).await;
        let Json(v) = get_state(State(state)).await;
        assert_eq!(v.state, ButtonState::Loading);
        assert_eq!(v.label, "Launching");
    }

    #[tokio::test]
    async fn test_click_round_trips_through_app_loop() {
        let (state, mut rx) = http_state();
        tokio::spawn(async move {
            while let Some(ApiCommand::Click { reply }) = rx.recv().await {
                let _ = reply.send(view(ButtonState::Loading));
            }
        });
        let Json(v) = click(State(state)).await.unwrap();
        assert_eq!(v.state, ButtonState::Loading);
    }

    #[tokio::test]
    async fn test_click_without_app_loop_is_unavailable() {
        let (state, rx) = http_state();
        drop(rx);
        let err = click(State(state)).await.unwrap_err();
        assert_eq!(err, StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn test_start_server_binds_ephemeral_port() {
        let (state, _rx) = http_state();
        let (addr, handle) = start_server("127.0.0.1", 0, state.views, state.cmd_tx)
            .await
            .unwrap();
        assert_ne!(addr.port(), 0);
        handle.abort();
    }
}
