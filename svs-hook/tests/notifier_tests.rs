//! HttpNotifier against a local provider stub

use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::post;
use axum::{Form, Router};
use svs_common::config::NotifierConfig;
use svs_hook::notifier::{HttpNotifier, Notifier, NotifyError};

/// Provider stub answering with a scripted sequence of statuses
#[derive(Clone)]
struct Provider {
    script: Arc<Vec<StatusCode>>,
    calls: Arc<AtomicU32>,
    received: Arc<Mutex<Vec<HashMap<String, String>>>>,
}

async fn receive(
    State(provider): State<Provider>,
    Form(form): Form<HashMap<String, String>>,
) -> StatusCode {
    let call = provider.calls.fetch_add(1, Ordering::SeqCst) as usize;
    provider.received.lock().unwrap().push(form);
    provider
        .script
        .get(call)
        .copied()
        .unwrap_or(StatusCode::OK)
}

async fn start_provider(script: Vec<StatusCode>) -> (String, Provider) {
    let provider = Provider {
        script: Arc::new(script),
        calls: Arc::new(AtomicU32::new(0)),
        received: Arc::new(Mutex::new(Vec::new())),
    };
    let app = Router::new()
        .route("/send", post(receive))
        .with_state(provider.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    (format!("http://{}/send", addr), provider)
}

fn fast_config(url: &str, max_attempts: u32) -> NotifierConfig {
    NotifierConfig {
        url: Some(url.to_string()),
        max_attempts,
        initial_backoff_ms: 5,
        max_backoff_ms: 20,
        timeout_ms: 2000,
    }
}

#[tokio::test]
async fn test_sends_receptor_and_message() {
    let (url, provider) = start_provider(vec![]).await;
    let notifier = HttpNotifier::new(&url, &fast_config(&url, 3)).unwrap();

    notifier.send("09120001111", "Serial number X is valid").await.unwrap();

    let received = provider.received.lock().unwrap();
    assert_eq!(received.len(), 1);
    assert_eq!(received[0]["receptor"], "09120001111");
    assert_eq!(received[0]["message"], "Serial number X is valid");
}

#[tokio::test]
async fn test_retries_server_errors_then_succeeds() {
    let (url, provider) = start_provider(vec![
        StatusCode::SERVICE_UNAVAILABLE,
        StatusCode::TOO_MANY_REQUESTS,
    ])
    .await;
    let notifier = HttpNotifier::new(&url, &fast_config(&url, 3)).unwrap();

    notifier.send("0912", "hello").await.unwrap();
    assert_eq!(provider.calls.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn test_gives_up_after_max_attempts() {
    let (url, provider) = start_provider(vec![StatusCode::INTERNAL_SERVER_ERROR; 5]).await;
    let notifier = HttpNotifier::new(&url, &fast_config(&url, 2)).unwrap();

    let err = notifier.send("0912", "hello").await.unwrap_err();
    assert!(matches!(err, NotifyError::Exhausted { attempts: 2, .. }));
    assert_eq!(provider.calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_client_error_is_not_retried() {
    let (url, provider) = start_provider(vec![StatusCode::BAD_REQUEST]).await;
    let notifier = HttpNotifier::new(&url, &fast_config(&url, 3)).unwrap();

    let err = notifier.send("0912", "hello").await.unwrap_err();
    assert!(matches!(err, NotifyError::Rejected { status: 400, .. }));
    assert_eq!(provider.calls.load(Ordering::SeqCst), 1);
}
