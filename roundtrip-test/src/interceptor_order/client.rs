use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use futures::FutureExt;
use roundtrip_client::{
    Client, FnInterceptor, HeaderInterceptor, Interceptor, LoggingInterceptor, Next, Request,
    header::HeaderValue,
};

use crate::report::CaseResult;

type Headers = BTreeMap<String, String>;

/// Appends `name` to `x-trace` on the way out and to `log` on the way back.
fn tracer(name: &'static str, log: Arc<Mutex<Vec<&'static str>>>) -> impl Interceptor {
    FnInterceptor::new(move |mut request: Request, next: Next| {
        let log = log.clone();
        async move {
            request
                .headers_mut()
                .append("x-trace", HeaderValue::from_static(name));
            let outcome = next.call(request).await;
            log.lock().unwrap_or_else(|e| e.into_inner()).push(name);
            outcome
        }
        .boxed()
    })
}

async fn declaration_order(base: &str) -> anyhow::Result<()> {
    let log = Arc::new(Mutex::new(Vec::new()));
    let client = Client::builder()
        .base_url(base)
        .interceptor(tracer("outer", log.clone()))
        .interceptor(tracer("inner", log.clone()))
        .build()?;

    let headers: Headers = client.get_json("/headers").await?;
    let trace = headers.get("x-trace").map(String::as_str);
    if trace != Some("outer,inner") {
        anyhow::bail!("request phase order: {trace:?}");
    }
    let unwound = log.lock().unwrap_or_else(|e| e.into_inner()).clone();
    if unwound != ["inner", "outer"] {
        anyhow::bail!("response phase order: {unwound:?}");
    }
    Ok(())
}

async fn interceptors_wrap_retries(base: &str) -> anyhow::Result<()> {
    let calls = Arc::new(AtomicU32::new(0));
    let counted = calls.clone();
    let client = Client::builder()
        .base_url(base)
        .max_retries(2)
        .retry_backoff(Duration::from_millis(10), Duration::from_millis(50))
        .interceptor(LoggingInterceptor::new())
        .interceptor(FnInterceptor::new(move |request: Request, next: Next| {
            counted.fetch_add(1, Ordering::SeqCst);
            next.call(request).boxed()
        }))
        .build()?;

    let text = client.get("/fail-once").send().await.text().await?;
    if text != "attempt 2" {
        anyhow::bail!("expected the retry to succeed, got {text:?}");
    }
    let seen = calls.load(Ordering::SeqCst);
    if seen != 1 {
        anyhow::bail!("interceptor saw {seen} calls, expected 1");
    }
    Ok(())
}

async fn header_sources_merge(base: &str) -> anyhow::Result<()> {
    let client = Client::builder()
        .base_url(base)
        .header("x-client", "default")
        .header("x-override", "default")
        .interceptor(HeaderInterceptor::new("x-api-key", "secret")?)
        .build()?;

    let headers: Headers = client
        .get("/headers")
        .header("x-override", "request")
        .send()
        .await
        .json()
        .await?;

    for (name, expected) in [
        ("x-client", "default"),
        ("x-override", "request"),
        ("x-api-key", "secret"),
    ] {
        let got = headers.get(name).map(String::as_str);
        if got != Some(expected) {
            anyhow::bail!("header {name}: expected {expected:?}, got {got:?}");
        }
    }
    Ok(())
}

async fn added_after_build(base: &str) -> anyhow::Result<()> {
    let log = Arc::new(Mutex::new(Vec::new()));
    let client = Client::builder()
        .base_url(base)
        .interceptor(tracer("first", log.clone()))
        .build()?
        .with_interceptor(tracer("second", log.clone()));

    let headers: Headers = client.get_json("/headers").await?;
    let trace = headers.get("x-trace").map(String::as_str);
    if trace != Some("first,second") {
        anyhow::bail!("unexpected trace {trace:?}");
    }
    Ok(())
}

pub async fn run_interceptor_tests(base: &str) -> Vec<CaseResult> {
    vec![
        CaseResult::new(
            "interceptors run in declaration order",
            declaration_order(base).await,
        ),
        CaseResult::new(
            "interceptors see one call across retries",
            interceptors_wrap_retries(base).await,
        ),
        CaseResult::new(
            "default, interceptor and request headers merge",
            header_sources_merge(base).await,
        ),
        CaseResult::new(
            "interceptor added after build runs innermost",
            added_after_build(base).await,
        ),
    ]
}
