use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use boardrelay::ServerArgs;

#[tokio::main]
async fn main() -> Result<()> {
    let args = ServerArgs::parse();

    let default_directive = if args.debug { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directive));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    boardrelay::server::run(&args).await
}
