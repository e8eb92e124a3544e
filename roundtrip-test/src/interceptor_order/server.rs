use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};

use axum::Json;
use axum::Router;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::routing::get;

pub fn app() -> Router {
    Router::new()
        .route("/headers", get(echo_headers))
        .route("/fail-once", get(fail_once))
        .with_state(Arc::new(AtomicU32::new(0)))
}

/// Every request header, multiple values joined with `,`.
async fn echo_headers(headers: HeaderMap) -> Json<BTreeMap<String, String>> {
    let mut out = BTreeMap::new();
    for name in headers.keys() {
        let values: Vec<&str> = headers
            .get_all(name)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .collect();
        out.insert(name.to_string(), values.join(","));
    }
    Json(out)
}

async fn fail_once(State(hits): State<Arc<AtomicU32>>) -> (StatusCode, String) {
    let attempt = hits.fetch_add(1, Ordering::SeqCst) + 1;
    if attempt == 1 {
        (StatusCode::BAD_GATEWAY, format!("attempt {attempt}"))
    } else {
        (StatusCode::OK, format!("attempt {attempt}"))
    }
}
