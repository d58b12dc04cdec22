use std::collections::HashMap;
use std::fmt;

use crate::board::BoardStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SessionId(pub u64);

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Default)]
struct Entry {
    username: Option<String>,
    board: Option<String>,
}

#[derive(Debug, PartialEq, Eq)]
pub enum RegisterError {
    Taken,
    AlreadyNamed,
    UnknownSession,
}

#[derive(Debug, PartialEq, Eq)]
pub enum SelectError {
    NoSuchUsername,
    NoSuchBoard,
}

/// Where a session was before it moved or left.
#[derive(Debug, PartialEq, Eq)]
pub struct Departure {
    pub username: Option<String>,
    pub board: Option<String>,
}

/// The registry and the board store. Board membership and the session to
/// board mapping are only ever changed together, inside one method call.
#[derive(Debug, Default)]
pub struct ServerState {
    pub boards: BoardStore,
    sessions: HashMap<SessionId, Entry>,
    usernames: HashMap<String, SessionId>,
}

impl ServerState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn connect(&mut self, id: SessionId) {
        self.sessions.entry(id).or_default();
    }

    #[cfg(test)]
    pub(crate) fn is_connected(&self, id: SessionId) -> bool {
        self.sessions.contains_key(&id)
    }

    pub fn username(&self, id: SessionId) -> Option<&str> {
        self.sessions.get(&id)?.username.as_deref()
    }

    pub fn board_of(&self, id: SessionId) -> Option<&str> {
        self.sessions.get(&id)?.board.as_deref()
    }

    pub fn session_for(&self, username: &str) -> Option<SessionId> {
        self.usernames.get(username).copied()
    }

    pub fn register(&mut self, id: SessionId, username: &str) -> Result<(), RegisterError> {
        if self.usernames.contains_key(username) {
            return Err(RegisterError::Taken);
        }

        let entry = self
            .sessions
            .get_mut(&id)
            .ok_or(RegisterError::UnknownSession)?;
        if entry.username.is_some() {
            return Err(RegisterError::AlreadyNamed);
        }

        entry.username = Some(username.to_string());
        self.usernames.insert(username.to_string(), id);

        Ok(())
    }

    /// Moves `id` onto `board`. `username` must be registered to `id` itself.
    /// On success returns the board the session left, if any.
    pub fn select_board(
        &mut self,
        id: SessionId,
        username: &str,
        board: &str,
    ) -> Result<Option<String>, SelectError> {
        if self.session_for(username) != Some(id) {
            return Err(SelectError::NoSuchUsername);
        }
        if !self.boards.contains(board) {
            return Err(SelectError::NoSuchBoard);
        }

        let entry = self
            .sessions
            .get_mut(&id)
            .ok_or(SelectError::NoSuchUsername)?;

        let previous = entry.board.replace(board.to_string());
        if let Some(old) = previous.as_deref() {
            self.boards.leave(old, username);
        }
        self.boards.join(board, username);

        Ok(previous.filter(|old| old != board))
    }

    /// Forgets the session entirely. Returns `None` if it was already gone.
    pub fn remove(&mut self, id: SessionId) -> Option<Departure> {
        let entry = self.sessions.remove(&id)?;

        if let Some(name) = entry.username.as_deref() {
            self.usernames.remove(name);
            if let Some(board) = entry.board.as_deref() {
                self.boards.leave(board, name);
            }
        }

        Some(Departure {
            username: entry.username,
            board: entry.board,
        })
    }

    /// Sessions currently on `board`, in join order. Empty for unknown boards.
    pub fn members_of(&self, board: &str) -> Vec<SessionId> {
        self.boards
            .get(board)
            .map(|b| {
                b.members()
                    .iter()
                    .filter_map(|name| self.session_for(name))
                    .collect()
            })
            .unwrap_or_default()
    }
}
