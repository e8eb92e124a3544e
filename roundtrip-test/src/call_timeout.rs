mod server;
mod client;

use crate::report::report;
use crate::server::TestServer;

pub async fn run() -> anyhow::Result<()> {
    let server = TestServer::start(server::app()).await?;
    let cases = client::run_timeout_tests(&server.url()).await;
    report("Timeouts and Cancellation", &cases)
}
