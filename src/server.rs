use std::net::SocketAddr;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::net::TcpListener;
use tracing::{info, warn};

use crate::config::ServerArgs;
use crate::hub::{self, HubTx};
use crate::state::SessionId;

const HUB_CAPACITY: usize = 1024;

/// A bound listener plus the hub its sessions report to.
pub struct Server {
    listener: TcpListener,
    hub: HubTx,
    queue_capacity: usize,
}

impl Server {
    pub async fn bind(listen_addr: &str, queue_capacity: usize) -> Result<Self> {
        let listener = TcpListener::bind(listen_addr)
            .await
            .with_context(|| format!("failed to bind {listen_addr}"))?;

        Ok(Self {
            listener,
            hub: hub::spawn(HUB_CAPACITY),
            queue_capacity,
        })
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// Accepts connections forever.
    pub async fn run(self) -> Result<()> {
        info!("listening on {}", self.local_addr()?);

        let mut next_id = 0u64;

        loop {
            let (socket, peer) = match self.listener.accept().await {
                Ok(conn) => conn,
                Err(err) => {
                    warn!("accept failed: {err}");
                    tokio::time::sleep(Duration::from_millis(100)).await;
                    continue;
                }
            };

            next_id += 1;
            let id = SessionId(next_id);
            let hub = self.hub.clone();
            let queue_capacity = self.queue_capacity;

            tokio::spawn(async move {
                if let Err(err) = crate::conn::handle(hub, socket, peer, id, queue_capacity).await {
                    warn!(%peer, session = %id, "connection error: {err:?}");
                }
            });
        }
    }
}

pub async fn run(args: &ServerArgs) -> Result<()> {
    Server::bind(&args.listen_addr(), args.queue_capacity.get())
        .await?
        .run()
        .await
}
