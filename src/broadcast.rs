//! Fan-out of replies onto session outbound queues.
//!
//! Queues hold batches: every reply sequence produced by one transition for
//! one recipient (a board replay, a name list, a single echoed stroke) is one
//! entry, so queue capacity bounds how far a client lags behind in
//! transitions, not how large a single answer may be.
//!
//! Delivery never waits: a queue that is full means the client stopped
//! reading, and that session is evicted instead of letting it stall the hub.
//! After eviction nothing more is enqueued for it, so a client can lose the
//! tail of its stream but never sees a gap followed by later messages.

use std::collections::HashMap;

use tokio::sync::mpsc::error::TrySendError;
use tracing::warn;

use crate::conn::SessionHandle;
use crate::protocol::Reply;
use crate::state::{ServerState, SessionId};

/// Replies written back to back by a session's writer.
pub type Batch = Vec<Reply>;

#[derive(Debug, Default)]
pub struct Outbox {
    sessions: HashMap<SessionId, SessionHandle>,
    evicted: Vec<SessionId>,
}

impl Outbox {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, id: SessionId, handle: SessionHandle) {
        self.sessions.insert(id, handle);
    }

    pub fn contains(&self, id: SessionId) -> bool {
        self.sessions.contains_key(&id)
    }

    /// Drops the session's queue and closes it. Queued replies are still
    /// flushed by the writer if the socket accepts them.
    pub fn close(&mut self, id: SessionId) -> bool {
        match self.sessions.remove(&id) {
            Some(handle) => {
                handle.closer.close();
                true
            }
            None => false,
        }
    }

    /// Next session that was evicted during delivery and still needs cleanup.
    pub fn take_evicted(&mut self) -> Option<SessionId> {
        self.evicted.pop()
    }

    pub fn send(&mut self, to: SessionId, reply: Reply) {
        self.deliver(to, vec![reply]);
    }

    /// Enqueues `replies` as a single batch.
    pub fn send_all<I>(&mut self, to: SessionId, replies: I)
    where
        I: IntoIterator<Item = Reply>,
    {
        let batch: Batch = replies.into_iter().collect();
        if !batch.is_empty() {
            self.deliver(to, batch);
        }
    }

    /// Every session currently on `board`, membership read from `state` at
    /// call time. Unknown boards have no members.
    pub fn board_cast(&mut self, state: &ServerState, board: &str, replies: &[Reply]) {
        for id in state.members_of(board) {
            self.deliver(id, replies.to_vec());
        }
    }

    /// Every connected session, named or not.
    pub fn server_cast(&mut self, replies: &[Reply]) {
        let mut ids: Vec<SessionId> = self.sessions.keys().copied().collect();
        ids.sort();

        for id in ids {
            self.deliver(id, replies.to_vec());
        }
    }

    fn deliver(&mut self, to: SessionId, batch: Batch) {
        let Some(handle) = self.sessions.get(&to) else {
            return;
        };

        match handle.outbound.try_send(batch) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) => {
                warn!(session = %to, "outbound queue full, evicting slow client");
                self.evict(to);
            }
            Err(TrySendError::Closed(_)) => self.evict(to),
        }
    }

    fn evict(&mut self, id: SessionId) {
        if self.close(id) {
            self.evicted.push(id);
        }
    }
}
