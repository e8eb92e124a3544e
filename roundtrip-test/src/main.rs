mod server;
mod report;
mod retry_backoff;
mod interceptor_order;
mod call_timeout;
mod json_roundtrip;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    retry_backoff::run().await?;
    interceptor_order::run().await?;
    call_timeout::run().await?;
    json_roundtrip::run().await
}
