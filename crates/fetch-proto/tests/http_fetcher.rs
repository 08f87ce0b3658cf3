//! End-to-end tests: controller + reqwest fetcher against a local axum server.
//!
//! The server mimics httpbin's `/delay/N` so the button scenarios can run
//! without network access.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::{extract::Path, http::StatusCode, response::Json, routing::get, Router};
use fetch_proto::{
    ButtonConfig, ButtonState, FailureCause, HttpFetcher, RequestController, RequestEvent,
};
use serde_json::{json, Value};
use tokio::net::TcpListener;
use tokio::sync::mpsc;

async fn delay(Path(ms): Path<u64>) -> Json<Value> {
    tokio::time::sleep(Duration::from_millis(ms)).await;
    Json(json!({ "delayed_ms": ms }))
}

async fn status(Path(code): Path<u16>) -> StatusCode {
    StatusCode::from_u16(code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
}

async fn spawn_server() -> SocketAddr {
    let app = Router::new()
        .route("/delay/:ms", get(delay))
        .route("/status/:code", get(status))
        .route("/text", get(|| async { "not json" }));
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}

fn controller(
    url: String,
    max_duration_ms: u64,
) -> (RequestController, mpsc::Receiver<RequestEvent>) {
    let client = reqwest::Client::builder().no_proxy().build().unwrap();
    let (tx, rx) = mpsc::channel(16);
    let ctrl = RequestController::new(
        &ButtonConfig::new(url, max_duration_ms),
        Arc::new(HttpFetcher::with_client(client)),
        tx,
    )
    .unwrap();
    (ctrl, rx)
}

async fn settle(ctrl: &mut RequestController, rx: &mut mpsc::Receiver<RequestEvent>) {
    tokio::time::timeout(Duration::from_secs(10), async {
        while ctrl.is_loading() {
            let ev = rx.recv().await.expect("event channel closed");
            ctrl.handle_event(ev);
        }
    })
    .await
    .expect("request never settled");
}

#[tokio::test]
async fn test_response_before_watchdog_returns_to_default() {
    let addr = spawn_server().await;
    let (mut ctrl, mut rx) = controller(format!("http://{}/delay/200", addr), 2000);

    assert_eq!(ctrl.toggle(), Some(ButtonState::Loading));
    settle(&mut ctrl, &mut rx).await;

    assert_eq!(ctrl.state(), ButtonState::Default);
    assert_eq!(ctrl.last_response(), Some(&json!({ "delayed_ms": 200 })));
}

#[tokio::test]
async fn test_slow_endpoint_hits_watchdog() {
    let addr = spawn_server().await;
    let (mut ctrl, mut rx) = controller(format!("http://{}/delay/3000", addr), 200);
    let started = Instant::now();

    ctrl.toggle();
    settle(&mut ctrl, &mut rx).await;

    assert_eq!(ctrl.state(), ButtonState::Error);
    assert_eq!(ctrl.last_failure(), Some(&FailureCause::Timeout));
    assert!(started.elapsed() < Duration::from_millis(1500));

    // Nothing from the abandoned request may flip the state afterwards.
    tokio::time::sleep(Duration::from_millis(300)).await;
    while let Ok(ev) = rx.try_recv() {
        assert!(!ctrl.handle_event(ev));
    }
    assert_eq!(ctrl.state(), ButtonState::Error);
}

#[tokio::test]
async fn test_user_cancel_wins_over_response() {
    let addr = spawn_server().await;
    let (mut ctrl, mut rx) = controller(format!("http://{}/delay/300", addr), 0);

    ctrl.toggle();
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(ctrl.toggle(), Some(ButtonState::Error));

    tokio::time::sleep(Duration::from_millis(600)).await;
    while let Ok(ev) = rx.try_recv() {
        assert!(!ctrl.handle_event(ev));
    }
    assert_eq!(ctrl.state(), ButtonState::Error);
    assert_eq!(ctrl.last_failure(), Some(&FailureCause::UserCancelled));
    assert!(ctrl.last_response().is_none());
}

#[tokio::test]
async fn test_non_2xx_is_transport_failure() {
    let addr = spawn_server().await;
    let (mut ctrl, mut rx) = controller(format!("http://{}/status/503", addr), 2000);

    ctrl.toggle();
    settle(&mut ctrl, &mut rx).await;

    assert_eq!(ctrl.state(), ButtonState::Error);
    match ctrl.last_failure() {
        Some(FailureCause::Transport(msg)) => assert!(msg.contains("503"), "{}", msg),
        other => panic!("unexpected failure: {:?}", other),
    }
}

#[tokio::test]
async fn test_unparseable_body_is_transport_failure() {
    let addr = spawn_server().await;
    let (mut ctrl, mut rx) = controller(format!("http://{}/text", addr), 2000);

    ctrl.toggle();
    settle(&mut ctrl, &mut rx).await;

    assert_eq!(ctrl.state(), ButtonState::Error);
    assert!(matches!(ctrl.last_failure(), Some(FailureCause::Transport(_))));
}

#[tokio::test]
async fn test_connection_refused_is_transport_failure() {
    // Bind then drop to get a port nothing listens on.
    let addr = {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        listener.local_addr().unwrap()
    };
    let (mut ctrl, mut rx) = controller(format!("http://{}/delay/0", addr), 2000);

    ctrl.toggle();
    settle(&mut ctrl, &mut rx).await;

    assert_eq!(ctrl.state(), ButtonState::Error);
    assert!(matches!(ctrl.last_failure(), Some(FailureCause::Transport(_))));
}
