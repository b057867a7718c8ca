//! Shared test helpers: scripted mock metadata provider
//!
//! Binds a real axum server on a loopback port so the client's full
//! HTTP path (reqwest, headers, status codes) is exercised. Each test
//! scripts an ordered list of responses; once the script is exhausted
//! the provider keeps answering 200 with the default body.

use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::{Json, Router};
use serde_json::{json, Value};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, Once};

/// One scripted provider response
#[derive(Debug, Clone)]
pub enum MockResponse {
    /// 200 with a JSON body
    Ok(Value),
    /// 200 with a raw body that is not valid JSON
    OkGarbled(String),
    /// 429, optionally with a Retry-After header value
    TooManyRequests { retry_after: Option<String> },
    /// Any other status with an empty body
    Status(u16),
}

pub struct ProviderScript {
    steps: Mutex<VecDeque<MockResponse>>,
    default_body: Value,
    hits: AtomicUsize,
}

impl ProviderScript {
    /// Live requests the provider has served so far.
    pub fn hits(&self) -> usize {
        self.hits.load(Ordering::SeqCst)
    }
}

/// A search body with one result, shared by several tests.
pub fn one_result_body() -> Value {
    json!({
        "results": [{
            "id": 603,
            "title": "The Matrix",
            "release_date": "1999-03-30",
            "overview": "A hacker learns the truth.",
            "popularity": 83.2
        }]
    })
}

async fn handler(State(script): State<Arc<ProviderScript>>) -> Response {
    script.hits.fetch_add(1, Ordering::SeqCst);

    let step = script
        .steps
        .lock()
        .expect("provider script lock poisoned")
        .pop_front();

    match step {
        None => (StatusCode::OK, Json(script.default_body.clone())).into_response(),
        Some(MockResponse::Ok(body)) => (StatusCode::OK, Json(body)).into_response(),
        Some(MockResponse::OkGarbled(body)) => (StatusCode::OK, body).into_response(),
        Some(MockResponse::TooManyRequests { retry_after }) => match retry_after {
            Some(value) => (
                StatusCode::TOO_MANY_REQUESTS,
                [(header::RETRY_AFTER, value)],
                "slow down",
            )
                .into_response(),
            None => (StatusCode::TOO_MANY_REQUESTS, "slow down").into_response(),
        },
        Some(MockResponse::Status(code)) => (
            StatusCode::from_u16(code).expect("scripted status code invalid"),
            "scripted error",
        )
            .into_response(),
    }
}

/// Start a mock provider with `steps`, then `default_body` forever.
/// Returns its base URL and the script handle for hit assertions.
pub async fn spawn_provider(
    steps: Vec<MockResponse>,
    default_body: Value,
) -> (String, Arc<ProviderScript>) {
    let script = Arc::new(ProviderScript {
        steps: Mutex::new(steps.into()),
        default_body,
        hits: AtomicUsize::new(0),
    });

    let app = Router::new()
        .fallback(handler)
        .with_state(Arc::clone(&script));

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind mock provider");
    let addr = listener.local_addr().expect("mock provider addr");

    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("mock provider serve");
    });

    (format!("http://{}", addr), script)
}

/// Install a test tracing subscriber once per process. RUST_LOG
/// controls verbosity as in the services this crate ships inside.
pub fn init_tracing() {
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}
