use std::num::NonZeroUsize;

use clap::Parser;

#[derive(Debug, Clone, Parser)]
#[command(name = "server")]
#[command(about = "Relay server for shared whiteboards")]
pub struct ServerArgs {
    /// TCP port to listen on
    #[arg(short, long, default_value_t = 4444)]
    pub port: u16,

    /// Address to bind to
    #[arg(long, default_value = "0.0.0.0")]
    pub host: String,

    /// Outbound lines buffered per client before it is dropped as too slow
    #[arg(long, default_value = "1024")]
    pub queue_capacity: NonZeroUsize,

    /// Enable debug logging
    #[arg(short, long)]
    pub debug: bool,
}

impl ServerArgs {
    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[derive(Debug, Clone, Parser)]
#[command(name = "client")]
#[command(about = "Line client for the whiteboard relay")]
pub struct ClientArgs {
    /// Server address
    #[arg(long)]
    pub ip: String,

    /// Server port
    #[arg(long)]
    pub port: u16,
}

impl ClientArgs {
    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.ip, self.port)
    }
}
