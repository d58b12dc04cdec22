use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use boardrelay::ClientArgs;

#[tokio::main]
async fn main() -> Result<()> {
    let args = ClientArgs::parse();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    boardrelay::client::run(&args).await
}
