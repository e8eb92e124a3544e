use std::time::{Duration, Instant};

use roundtrip_client::{Client, ClientError};

use crate::report::CaseResult;

fn retrying_client(base: &str, max_retries: u32) -> anyhow::Result<Client> {
    Ok(Client::builder()
        .base_url(base)
        .max_retries(max_retries)
        .retry_backoff(Duration::from_millis(20), Duration::from_millis(200))
        .build()?)
}

fn expect_status(err: ClientError, code: u16, body: &str) -> anyhow::Result<()> {
    if !err.is_status(code) {
        anyhow::bail!("expected http {code}, got: {err}");
    }
    let got = err.body().map(|b| String::from_utf8_lossy(b).into_owned());
    if got.as_deref() != Some(body) {
        anyhow::bail!("expected body {body:?}, got {got:?}");
    }
    Ok(())
}

async fn succeeds_after_transient_failures(base: &str) -> anyhow::Result<()> {
    let client = retrying_client(base, 3)?;
    let started = Instant::now();
    let text = client.get("/flaky/a").send().await.text().await?;
    if text != "attempt 3" {
        anyhow::bail!("expected third attempt to succeed, got {text:?}");
    }
    // Two backoff waits of at least 0.75 * 20ms and 0.75 * 40ms.
    if started.elapsed() < Duration::from_millis(45) {
        anyhow::bail!("retries did not back off: {:?}", started.elapsed());
    }
    Ok(())
}

async fn exhausted_retries_return_last_response(base: &str) -> anyhow::Result<()> {
    let client = retrying_client(base, 2)?;
    let err = client
        .get("/unavailable/b")
        .send()
        .await
        .bytes()
        .await
        .err()
        .ok_or_else(|| anyhow::anyhow!("expected an error"))?;
    expect_status(err, 503, "attempt 3")
}

async fn throttling_is_retried(base: &str) -> anyhow::Result<()> {
    let client = retrying_client(base, 1)?;
    let status = client.get("/throttled/c").send().await.raw()?.status();
    if status != 429 {
        anyhow::bail!("expected 429, got {status}");
    }
    let response = client.get("/throttled/c").send().await.raw()?;
    let body = response.into_body().collect_bytes().await?;
    if body != "attempt 4" {
        anyhow::bail!("expected two attempts per call, got {body:?}");
    }
    Ok(())
}

async fn client_errors_are_not_retried(base: &str) -> anyhow::Result<()> {
    let client = retrying_client(base, 3)?;
    let err = client
        .get("/missing/d")
        .send()
        .await
        .text()
        .await
        .err()
        .ok_or_else(|| anyhow::anyhow!("expected an error"))?;
    expect_status(err, 404, "attempt 1")
}

async fn retries_are_off_by_default(base: &str) -> anyhow::Result<()> {
    let client = Client::builder().base_url(base).build()?;
    let err = client
        .get("/flaky/e")
        .send()
        .await
        .text()
        .await
        .err()
        .ok_or_else(|| anyhow::anyhow!("expected an error"))?;
    expect_status(err, 503, "attempt 1")
}

async fn custom_predicate_limits_retries(base: &str) -> anyhow::Result<()> {
    let client = Client::builder()
        .base_url(base)
        .max_retries(3)
        .retry_backoff(Duration::from_millis(10), Duration::from_millis(50))
        .retry_if(|outcome| matches!(outcome, Ok(response) if response.status() == 429))
        .build()?;
    let err = client
        .get("/unavailable/f")
        .send()
        .await
        .text()
        .await
        .err()
        .ok_or_else(|| anyhow::anyhow!("expected an error"))?;
    expect_status(err, 503, "attempt 1")
}

async fn connection_refused_is_retried_then_reported() -> anyhow::Result<()> {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    drop(listener);

    let client = retrying_client(&format!("http://{addr}"), 2)?;
    let started = Instant::now();
    let err = client
        .get("/")
        .send()
        .await
        .raw()
        .err()
        .ok_or_else(|| anyhow::anyhow!("expected an error"))?;
    if !err.is_transport() {
        anyhow::bail!("expected transport error, got: {err}");
    }
    if started.elapsed() < Duration::from_millis(45) {
        anyhow::bail!("transport error was not retried: {:?}", started.elapsed());
    }
    Ok(())
}

pub async fn run_retry_tests(base: &str) -> Vec<CaseResult> {
    vec![
        CaseResult::new(
            "succeeds after transient 503s",
            succeeds_after_transient_failures(base).await,
        ),
        CaseResult::new(
            "exhausted retries return the last response",
            exhausted_retries_return_last_response(base).await,
        ),
        CaseResult::new("429 is retried", throttling_is_retried(base).await),
        CaseResult::new(
            "4xx is not retried",
            client_errors_are_not_retried(base).await,
        ),
        CaseResult::new(
            "retries are off by default",
            retries_are_off_by_default(base).await,
        ),
        CaseResult::new(
            "custom predicate limits retries",
            custom_predicate_limits_retries(base).await,
        ),
        CaseResult::new(
            "connection refused is retried then reported",
            connection_refused_is_retried_then_reported().await,
        ),
    ]
}
