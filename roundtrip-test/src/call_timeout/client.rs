use std::time::{Duration, Instant};

use roundtrip_client::{CallContext, Client, ClientError, TimeoutInterceptor};

use crate::report::CaseResult;

fn expect_error(
    outcome: Result<String, ClientError>,
    check: fn(&ClientError) -> bool,
    what: &str,
) -> anyhow::Result<()> {
    match outcome {
        Ok(body) => anyhow::bail!("expected {what}, got body {body:?}"),
        Err(err) if check(&err) => Ok(()),
        Err(err) => anyhow::bail!("expected {what}, got: {err}"),
    }
}

fn is_deadline(err: &ClientError) -> bool {
    matches!(err, ClientError::DeadlineExceeded)
}

fn is_canceled(err: &ClientError) -> bool {
    matches!(err, ClientError::Canceled)
}

fn within(started: Instant, limit: Duration) -> anyhow::Result<()> {
    let elapsed = started.elapsed();
    if elapsed > limit {
        anyhow::bail!("call took {elapsed:?}, expected under {limit:?}");
    }
    Ok(())
}

async fn client_timeout_aborts_slow_call(base: &str) -> anyhow::Result<()> {
    let client = Client::builder()
        .base_url(base)
        .timeout(Duration::from_millis(200))
        .build()?;
    let started = Instant::now();
    let outcome = client.get("/sleep/5000").send().await.text().await;
    expect_error(outcome, is_deadline, "deadline exceeded")?;
    within(started, Duration::from_secs(2))
}

async fn request_timeout_shortens_client_timeout(base: &str) -> anyhow::Result<()> {
    let client = Client::builder().base_url(base).build()?;
    let started = Instant::now();
    let outcome = client
        .get("/sleep/5000")
        .timeout(Duration::from_millis(100))
        .send()
        .await
        .text()
        .await;
    expect_error(outcome, is_deadline, "deadline exceeded")?;
    within(started, Duration::from_secs(2))
}

async fn timeout_interceptor_bounds_call(base: &str) -> anyhow::Result<()> {
    let client = Client::builder()
        .base_url(base)
        .no_timeout()
        .interceptor(TimeoutInterceptor::new(Duration::from_millis(100)))
        .build()?;
    let started = Instant::now();
    let outcome = client.get("/sleep/5000").send().await.text().await;
    expect_error(outcome, is_deadline, "deadline exceeded")?;
    within(started, Duration::from_secs(2))
}

async fn timeout_covers_retries(base: &str) -> anyhow::Result<()> {
    let client = Client::builder()
        .base_url(base)
        .timeout(Duration::from_millis(300))
        .max_retries(10)
        .retry_backoff(Duration::from_millis(50), Duration::from_millis(100))
        .build()?;
    let started = Instant::now();
    let outcome = client.get("/sleep-then-fail/80").send().await.text().await;
    expect_error(outcome, is_deadline, "deadline exceeded")?;
    within(started, Duration::from_secs(2))
}

async fn caller_cancellation(base: &str) -> anyhow::Result<()> {
    let client = Client::builder().base_url(base).build()?;
    let ctx = CallContext::new();
    let canceler = ctx.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(100)).await;
        canceler.cancel();
    });

    let started = Instant::now();
    let outcome = client
        .get("/sleep/5000")
        .context(ctx)
        .send()
        .await
        .text()
        .await;
    expect_error(outcome, is_canceled, "canceled")?;
    within(started, Duration::from_secs(2))
}

async fn fast_call_completes(base: &str) -> anyhow::Result<()> {
    let client = Client::builder()
        .base_url(base)
        .timeout(Duration::from_secs(2))
        .build()?;
    let body = client.get("/sleep/10").send().await.text().await?;
    if body != "done" {
        anyhow::bail!("unexpected body {body:?}");
    }
    Ok(())
}

pub async fn run_timeout_tests(base: &str) -> Vec<CaseResult> {
    vec![
        CaseResult::new(
            "client timeout aborts a slow call",
            client_timeout_aborts_slow_call(base).await,
        ),
        CaseResult::new(
            "request timeout shortens the client timeout",
            request_timeout_shortens_client_timeout(base).await,
        ),
        CaseResult::new(
            "timeout interceptor bounds the call",
            timeout_interceptor_bounds_call(base).await,
        ),
        CaseResult::new(
            "client timeout covers retries",
            timeout_covers_retries(base).await,
        ),
        CaseResult::new("caller cancellation", caller_cancellation(base).await),
        CaseResult::new(
            "fast call completes under the timeout",
            fast_call_completes(base).await,
        ),
    ]
}
