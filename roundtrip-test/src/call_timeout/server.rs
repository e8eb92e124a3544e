use std::time::Duration;

use axum::Router;
use axum::extract::Path;
use axum::http::StatusCode;
use axum::routing::get;

pub fn app() -> Router {
    Router::new()
        .route("/sleep/{ms}", get(sleep))
        .route("/sleep-then-fail/{ms}", get(sleep_then_fail))
}

async fn sleep(Path(ms): Path<u64>) -> &'static str {
    tokio::time::sleep(Duration::from_millis(ms)).await;
    "done"
}

async fn sleep_then_fail(Path(ms): Path<u64>) -> StatusCode {
    tokio::time::sleep(Duration::from_millis(ms)).await;
    StatusCode::SERVICE_UNAVAILABLE
}
