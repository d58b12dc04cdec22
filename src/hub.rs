use tokio::sync::mpsc::{self, Receiver, Sender};
use tracing::{debug, info};

use crate::broadcast::Outbox;
use crate::conn::SessionHandle;
use crate::protocol::{Reply, parse_command};
use crate::router::{self, Flow};
use crate::state::{ServerState, SessionId};

pub type HubTx = Sender<HubEvent>;

/// Everything a session can tell the hub.
#[derive(Debug)]
pub enum HubEvent {
    Connected { id: SessionId, handle: SessionHandle },
    Line { id: SessionId, line: String },
    /// A line that could not be decoded (bad UTF-8 or too long).
    Malformed { id: SessionId },
    Disconnected { id: SessionId },
}

/// Sole owner of the board store, the registry and every outbound queue.
/// Events are handled strictly one after another.
#[derive(Debug, Default)]
pub struct Hub {
    state: ServerState,
    outbox: Outbox,
}

impl Hub {
    pub fn new() -> Self {
        Self::default()
    }

    #[cfg(test)]
    fn state(&self) -> &ServerState {
        &self.state
    }

    pub fn handle_event(&mut self, event: HubEvent) {
        match event {
            HubEvent::Connected { id, handle } => {
                self.state.connect(id);
                self.outbox.insert(id, handle);
            }

            HubEvent::Line { id, line } => {
                if !self.outbox.contains(id) {
                    return;
                }

                match parse_command(&line) {
                    Ok(cmd) => {
                        if router::handle_command(&mut self.state, &mut self.outbox, id, cmd)
                            == Flow::Close
                        {
                            router::leave(&mut self.state, &mut self.outbox, id);
                        }
                    }
                    Err(err) => {
                        debug!(session = %id, %line, "rejected line: {err}");
                        self.outbox.send(id, Reply::Unrecognized);
                    }
                }
            }

            HubEvent::Malformed { id } => {
                debug!(session = %id, "rejected undecodable line");
                self.outbox.send(id, Reply::Unrecognized);
            }

            HubEvent::Disconnected { id } => {
                router::leave(&mut self.state, &mut self.outbox, id);
            }
        }

        while let Some(id) = self.outbox.take_evicted() {
            router::leave(&mut self.state, &mut self.outbox, id);
        }
    }

    pub async fn run(mut self, mut rx: Receiver<HubEvent>) {
        while let Some(event) = rx.recv().await {
            self.handle_event(event);
        }

        info!("hub stopped");
    }
}

pub fn spawn(capacity: usize) -> HubTx {
    let (tx, rx) = mpsc::channel(capacity);

    tokio::spawn(Hub::new().run(rx));

    tx
}
