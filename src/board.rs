use std::collections::HashMap;

use crate::protocol::Stroke;

/// A named drawing surface: the append-only log of accepted strokes and the
/// usernames currently on it, in join order.
#[derive(Debug, Default)]
pub struct Board {
    log: Vec<Stroke>,
    members: Vec<String>,
}

impl Board {
    pub fn log(&self) -> &[Stroke] {
        &self.log
    }

    pub fn members(&self) -> &[String] {
        &self.members
    }

    fn join(&mut self, username: &str) {
        if !self.members.iter().any(|m| m == username) {
            self.members.push(username.to_string());
        }
    }

    fn leave(&mut self, username: &str) -> bool {
        let before = self.members.len();
        self.members.retain(|m| m != username);
        self.members.len() != before
    }
}

/// Every board ever created. Boards are never removed, and names are listed in
/// creation order.
#[derive(Debug, Default)]
pub struct BoardStore {
    order: Vec<String>,
    boards: HashMap<String, Board>,
}

impl BoardStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `false` if a board with this name already exists.
    pub fn create(&mut self, name: &str) -> bool {
        if self.boards.contains_key(name) {
            return false;
        }

        self.order.push(name.to_string());
        self.boards.insert(name.to_string(), Board::default());

        true
    }

    pub fn contains(&self, name: &str) -> bool {
        self.boards.contains_key(name)
    }

    pub fn get(&self, name: &str) -> Option<&Board> {
        self.boards.get(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.order.iter().map(String::as_str)
    }

    /// Appends to the target board's log. Returns `false` when the board is unknown.
    pub fn append(&mut self, stroke: Stroke) -> bool {
        match self.boards.get_mut(&stroke.board) {
            Some(board) => {
                board.log.push(stroke);
                true
            }
            None => false,
        }
    }

    pub(crate) fn join(&mut self, board: &str, username: &str) -> bool {
        match self.boards.get_mut(board) {
            Some(b) => {
                b.join(username);
                true
            }
            None => false,
        }
    }

    pub(crate) fn leave(&mut self, board: &str, username: &str) -> bool {
        self.boards
            .get_mut(board)
            .is_some_and(|b| b.leave(username))
    }
}
