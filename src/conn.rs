use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use futures::StreamExt;
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;
use tokio::net::tcp::OwnedWriteHalf;
use tokio::sync::{mpsc, watch};
use tokio_util::codec::FramedRead;
use tracing::{debug, info};

use crate::broadcast::Batch;
use crate::codec::{Inbound, LineCodec};
use crate::hub::{HubEvent, HubTx};
use crate::state::SessionId;

/// Shared shutdown flag for one session. The first `close` wins; later calls
/// from either half are no-ops.
#[derive(Clone, Debug)]
pub struct Closer {
    tx: Arc<watch::Sender<bool>>,
}

impl Closer {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(false);
        Self { tx: Arc::new(tx) }
    }

    /// Returns `true` only for the call that actually closed the session.
    pub fn close(&self) -> bool {
        self.tx.send_if_modified(|closed| {
            if *closed {
                false
            } else {
                *closed = true;
                true
            }
        })
    }

    pub fn is_closed(&self) -> bool {
        *self.tx.borrow()
    }

    /// Resolves once the session has been closed.
    pub async fn closed(&self) {
        let mut rx = self.tx.subscribe();
        let _ = rx.wait_for(|closed| *closed).await;
    }
}

impl Default for Closer {
    fn default() -> Self {
        Self::new()
    }
}

/// What the hub keeps for each connected session.
#[derive(Debug)]
pub struct SessionHandle {
    pub outbound: mpsc::Sender<Batch>,
    pub closer: Closer,
}

impl SessionHandle {
    /// `capacity` counts batches, not lines.
    pub fn new(capacity: usize) -> (Self, mpsc::Receiver<Batch>) {
        let (outbound, rx) = mpsc::channel(capacity);
        let handle = Self {
            outbound,
            closer: Closer::new(),
        };
        (handle, rx)
    }
}

/// Runs one client connection until it disconnects or is closed by the hub.
pub async fn handle(
    hub: HubTx,
    socket: TcpStream,
    peer: SocketAddr,
    id: SessionId,
    queue_capacity: usize,
) -> Result<()> {
    let (reader, writer) = socket.into_split();
    let mut lines = FramedRead::new(reader, LineCodec::default());

    let (handle, outbound_rx) = SessionHandle::new(queue_capacity);
    let closer = handle.closer.clone();

    hub.send(HubEvent::Connected { id, handle }).await?;
    info!(%peer, session = %id, "session opened");

    let writer_task = tokio::spawn(write_loop(writer, outbound_rx, closer.clone(), id));

    loop {
        tokio::select! {
            _ = closer.closed() => break,

            frame = lines.next() => {
                let event = match frame {
                    Some(Ok(Inbound::Line(line))) => {
                        if line.trim().is_empty() {
                            continue;
                        }
                        HubEvent::Line { id, line }
                    }

                    Some(Ok(Inbound::Malformed)) => HubEvent::Malformed { id },

                    // Client disconnected (EOF)
                    None => break,

                    Some(Err(err)) => {
                        debug!(session = %id, "read failed: {err}");
                        break;
                    }
                };

                if hub.send(event).await.is_err() {
                    break;
                }
            }
        }
    }

    closer.close();
    let _ = hub.send(HubEvent::Disconnected { id }).await;

    let _ = writer_task.await;
    info!(%peer, session = %id, "session closed");

    Ok(())
}

/// Drains the outbound queue onto the socket. Ends when the hub drops the
/// queue, or when the session is closed while a write is stalled.
async fn write_loop(
    mut writer: OwnedWriteHalf,
    mut outbound: mpsc::Receiver<Batch>,
    closer: Closer,
    id: SessionId,
) {
    while let Some(batch) = outbound.recv().await {
        let text: String = batch.iter().map(|reply| format!("{reply}\n")).collect();

        tokio::select! {
            biased;

            result = writer.write_all(text.as_bytes()) => {
                if let Err(err) = result {
                    debug!(session = %id, "write failed: {err}");
                    closer.close();
                    break;
                }
            }

            _ = closer.closed() => break,
        }
    }

    let _ = writer.shutdown().await;
}
