use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use axum::Router;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::get;

/// Hits seen per key, so every case gets its own counter.
#[derive(Clone, Default)]
struct Hits(Arc<Mutex<HashMap<String, u32>>>);

impl Hits {
    fn record(&self, key: &str) -> u32 {
        let mut hits = self.0.lock().unwrap_or_else(|e| e.into_inner());
        let count = hits.entry(key.to_string()).or_default();
        *count += 1;
        *count
    }
}

/// `/{mode}/{key}` answers with `attempt N` and a status picked by mode:
/// `flaky` fails with 503 twice and then succeeds, `unavailable` always
/// answers 503, `throttled` always answers 429 and anything else is a 404.
pub fn app() -> Router {
    Router::new()
        .route("/{mode}/{key}", get(handle))
        .with_state(Hits::default())
}

async fn handle(
    State(hits): State<Hits>,
    Path((mode, key)): Path<(String, String)>,
) -> (StatusCode, String) {
    let attempt = hits.record(&key);
    let status = match mode.as_str() {
        "flaky" if attempt > 2 => StatusCode::OK,
        "flaky" | "unavailable" => StatusCode::SERVICE_UNAVAILABLE,
        "throttled" => StatusCode::TOO_MANY_REQUESTS,
        _ => StatusCode::NOT_FOUND,
    };
    (status, format!("attempt {attempt}"))
}
