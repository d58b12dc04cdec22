//! Applies one parsed command from one session to the shared state and decides
//! who hears about it. Callers run these one at a time, so each function is a
//! complete, atomic transition.

use tracing::{debug, info, warn};

use crate::broadcast::Outbox;
use crate::protocol::{Command, Reply, Stroke};
use crate::state::{RegisterError, SelectError, ServerState, SessionId};

/// Whether the session stays connected after a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Close,
}

pub fn handle_command(
    state: &mut ServerState,
    outbox: &mut Outbox,
    id: SessionId,
    cmd: Command,
) -> Flow {
    match cmd {
        Command::NewUsername(name) => new_username(state, outbox, id, &name),
        Command::AddBoard(name) => add_board(state, outbox, id, &name),
        Command::SelectBoard { username, board } => {
            select_board(state, outbox, id, &username, &board)
        }
        Command::Stroke(stroke) => stroke_board(state, outbox, stroke),
        Command::Disconnect(name) => {
            if state.username(id).is_some_and(|own| own != name) {
                warn!(session = %id, requested = %name, "disconnect names another user, closing sender");
            }
            return Flow::Close;
        }
    }

    Flow::Continue
}

/// Tears a session out of the registry and its board, then tells its former
/// board-mates. Safe to call more than once for the same session.
pub fn leave(state: &mut ServerState, outbox: &mut Outbox, id: SessionId) {
    outbox.close(id);

    let Some(departure) = state.remove(id) else {
        return;
    };

    if let (Some(username), Some(board)) = (departure.username, departure.board) {
        info!(session = %id, %username, %board, "left board");
        outbox.board_cast(state, &board, &[Reply::RemoveClient(username)]);
    }
}

pub fn board_names(state: &ServerState) -> Vec<Reply> {
    state
        .boards
        .names()
        .map(|name| Reply::ExistingBoard(name.to_string()))
        .chain([Reply::DoneBoardNames])
        .collect()
}

fn member_names(state: &ServerState, board: &str) -> Vec<Reply> {
    let members = state.boards.get(board).map(|b| b.members()).unwrap_or_default();

    [Reply::UpdatingClients]
        .into_iter()
        .chain(members.iter().map(|m| Reply::SameClient(m.clone())))
        .chain([Reply::DoneClientNames])
        .collect()
}

fn new_username(state: &mut ServerState, outbox: &mut Outbox, id: SessionId, name: &str) {
    match state.register(id, name) {
        Ok(()) => {
            info!(session = %id, username = %name, "username registered");
            let mut replies = board_names(state);
            replies.push(Reply::SelectBoard);
            outbox.send_all(id, replies);
        }
        Err(RegisterError::Taken) => outbox.send(id, Reply::UsernameTaken),
        Err(RegisterError::AlreadyNamed) => {
            debug!(session = %id, "username already set");
            outbox.send(id, Reply::Unrecognized);
        }
        Err(RegisterError::UnknownSession) => {
            warn!(session = %id, "command from unregistered session");
        }
    }
}

fn add_board(state: &mut ServerState, outbox: &mut Outbox, id: SessionId, name: &str) {
    if state.boards.create(name) {
        info!(session = %id, board = %name, "board created");
        outbox.send(id, Reply::BoardAdded(name.to_string()));
    } else {
        outbox.send(id, Reply::BoardExists);
    }

    outbox.server_cast(&board_names(state));
}

fn select_board(
    state: &mut ServerState,
    outbox: &mut Outbox,
    id: SessionId,
    username: &str,
    board: &str,
) {
    let previous = match state.select_board(id, username, board) {
        Ok(previous) => previous,
        Err(SelectError::NoSuchUsername) => return outbox.send(id, Reply::NoSuchUsername),
        Err(SelectError::NoSuchBoard) => return outbox.send(id, Reply::NoSuchBoard),
    };

    info!(session = %id, %username, %board, "selected board");

    if let Some(old) = previous {
        outbox.board_cast(state, &old, &[Reply::RemoveClient(username.to_string())]);
    }

    outbox.board_cast(state, board, &member_names(state, board));

    // acknowledgement and full history go out as one batch, ahead of any live stroke
    let ack = Reply::OnBoard {
        username: username.to_string(),
        board: board.to_string(),
    };
    let history = state.boards.get(board).map(|b| b.log()).unwrap_or_default();
    outbox.send_all(
        id,
        std::iter::once(ack).chain(history.iter().cloned().map(Reply::Stroke)),
    );
}

fn stroke_board(state: &mut ServerState, outbox: &mut Outbox, stroke: Stroke) {
    let board = stroke.board.clone();
    let reply = Reply::Stroke(stroke.clone());

    if state.boards.append(stroke) {
        outbox.board_cast(state, &board, &[reply]);
    } else {
        debug!(%board, "stroke for unknown board dropped");
    }
}

#[cfg(test)]
mod tests {
    use tokio::sync::mpsc;

    use super::*;
    use crate::broadcast::Batch;
    use crate::conn::SessionHandle;
    use crate::protocol::parse_command;

    struct Rig {
        state: ServerState,
        outbox: Outbox,
        inboxes: Vec<mpsc::Receiver<Batch>>,
    }

    impl Rig {
        fn new(sessions: u64) -> Self {
            Self::with_capacity(sessions, 64)
        }

        fn with_capacity(sessions: u64, capacity: usize) -> Self {
            let mut state = ServerState::new();
            let mut outbox = Outbox::new();
            let mut inboxes = Vec::new();
            for n in 0..sessions {
                let (handle, rx) = SessionHandle::new(capacity);
                state.connect(SessionId(n));
                outbox.insert(SessionId(n), handle);
                inboxes.push(rx);
            }
            Self {
                state,
                outbox,
                inboxes,
            }
        }

        fn run(&mut self, n: u64, line: &str) -> Flow {
            let cmd = parse_command(line).unwrap();
            handle_command(&mut self.state, &mut self.outbox, SessionId(n), cmd)
        }

        fn lines(&mut self, n: usize) -> Vec<String> {
            let mut out = Vec::new();
            while let Ok(batch) = self.inboxes[n].try_recv() {
                out.extend(batch.iter().map(Reply::to_string));
            }
            out
        }
    }

    #[test]
    fn naming_lists_boards_then_prompts() {
        let mut rig = Rig::new(2);
        rig.run(1, "addBoard a");
        rig.lines(0);

        rig.run(0, "new username bob");
        assert_eq!(
            rig.lines(0),
            vec![
                "Existing Whiteboards a",
                "Done sending whiteboard names",
                "Select a whiteboard"
            ]
        );

        rig.lines(1);
        rig.run(1, "new username bob");
        assert_eq!(
            rig.lines(1),
            vec!["Username already taken. Please select a new username."]
        );
        assert_eq!(rig.state.session_for("bob"), Some(SessionId(0)));
    }

    #[test]
    fn add_board_twice_still_broadcasts() {
        let mut rig = Rig::new(2);

        rig.run(0, "addBoard test");
        rig.run(0, "addBoard test");

        assert_eq!(
            rig.lines(0),
            vec![
                "Board test added",
                "Existing Whiteboards test",
                "Done sending whiteboard names",
                "Whiteboard already exists.",
                "Existing Whiteboards test",
                "Done sending whiteboard names",
            ]
        );
        assert_eq!(
            rig.lines(1),
            vec![
                "Existing Whiteboards test",
                "Done sending whiteboard names",
                "Existing Whiteboards test",
                "Done sending whiteboard names",
            ]
        );
    }

    #[test]
    fn select_updates_members_then_replays() {
        let mut rig = Rig::new(2);
        rig.run(0, "new username bob");
        rig.run(1, "new username amy");
        rig.run(0, "addBoard test");
        rig.run(0, "bob selectBoard test");
        rig.run(0, "test draw 0 0 100 100 50 12 34 56");
        rig.run(0, "test erase 1 2 3 4 5");
        rig.lines(0);
        rig.lines(1);

        rig.run(1, "amy selectBoard test");

        assert_eq!(
            rig.lines(0),
            vec![
                "Updating Clients",
                "sameClient bob",
                "sameClient amy",
                "Done sending client names"
            ]
        );
        assert_eq!(
            rig.lines(1),
            vec![
                "Updating Clients",
                "sameClient bob",
                "sameClient amy",
                "Done sending client names",
                "amy on board test",
                "test draw 0 0 100 100 50 12 34 56",
                "test erase 1 2 3 4 5",
            ]
        );
    }

    #[test]
    fn select_rejections_leave_state_alone() {
        let mut rig = Rig::new(2);
        rig.run(0, "new username bob");
        rig.run(1, "new username amy");
        rig.lines(0);

        rig.run(0, "bob selectBoard nowhere");
        rig.run(0, "amy selectBoard nowhere");
        rig.run(0, "ghost selectBoard nowhere");

        assert_eq!(
            rig.lines(0),
            vec![
                "Whiteboard does not exist. Select a different board or make a board.",
                "Username does not exist.",
                "Username does not exist.",
            ]
        );
        assert_eq!(rig.state.board_of(SessionId(0)), None);
    }

    #[test]
    fn strokes_echo_to_members_only() {
        let mut rig = Rig::new(3);
        rig.run(0, "new username bob");
        rig.run(1, "new username amy");
        rig.run(0, "addBoard test");
        rig.run(0, "addBoard other");
        rig.run(0, "bob selectBoard test");
        rig.run(1, "amy selectBoard other");
        for n in 0..3 {
            rig.lines(n);
        }

        rig.run(2, "test draw 0 0 100 100 50 12 34 56");
        rig.run(2, "nowhere erase 0 0 1 1 1");

        assert_eq!(rig.lines(0), vec!["test draw 0 0 100 100 50 12 34 56"]);
        assert!(rig.lines(1).is_empty());
        assert!(rig.lines(2).is_empty());
        assert_eq!(rig.state.boards.get("test").unwrap().log().len(), 1);
    }

    #[test]
    fn switching_boards_notifies_old_mates() {
        let mut rig = Rig::new(2);
        rig.run(0, "new username bob");
        rig.run(1, "new username amy");
        rig.run(0, "addBoard a");
        rig.run(0, "addBoard b");
        rig.run(0, "bob selectBoard a");
        rig.run(1, "amy selectBoard a");
        rig.lines(0);
        rig.lines(1);

        rig.run(0, "bob selectBoard b");

        assert_eq!(rig.lines(1), vec!["removeClient bob"]);
        assert_eq!(rig.state.members_of("a"), vec![SessionId(1)]);
    }

    #[test]
    fn disconnect_closes_and_notifies() {
        let mut rig = Rig::new(2);
        rig.run(0, "new username bob");
        rig.run(1, "new username amy");
        rig.run(0, "addBoard test");
        rig.run(0, "bob selectBoard test");
        rig.run(1, "amy selectBoard test");
        rig.lines(1);

        assert_eq!(rig.run(0, "Disconnect bob"), Flow::Close);
        leave(&mut rig.state, &mut rig.outbox, SessionId(0));
        leave(&mut rig.state, &mut rig.outbox, SessionId(0));

        assert_eq!(rig.lines(1), vec!["removeClient bob"]);
        assert_eq!(rig.state.session_for("bob"), None);
        assert!(!rig.outbox.contains(SessionId(0)));
    }

    #[test]
    fn replay_longer_than_queue_is_delivered_whole() {
        let mut rig = Rig::with_capacity(2, 4);
        rig.run(0, "new username bob");
        rig.run(1, "addBoard big");
        rig.lines(0);
        rig.lines(1);

        // session 1 is not on the board, so its strokes echo to nobody
        for x in 0..200 {
            rig.run(1, &format!("big erase {x} 0 {x} 1 3"));
        }
        rig.run(0, "bob selectBoard big");

        assert_eq!(rig.outbox.take_evicted(), None);
        let lines = rig.lines(0);
        assert_eq!(lines.len(), 3 + 1 + 200);
        assert_eq!(lines[3], "bob on board big");
        assert_eq!(lines[4], "big erase 0 0 0 1 3");
        assert_eq!(lines[203], "big erase 199 0 199 1 3");
    }

    #[test]
    fn board_list_longer_than_queue_is_delivered_whole() {
        let mut rig = Rig::with_capacity(2, 4);
        for n in 0..50 {
            rig.run(1, &format!("addBoard b{n}"));
            rig.lines(0);
            rig.lines(1);
        }

        rig.run(0, "new username bob");

        assert_eq!(rig.outbox.take_evicted(), None);
        let lines = rig.lines(0);
        assert_eq!(lines.len(), 50 + 2);
        assert_eq!(lines[0], "Existing Whiteboards b0");
        assert_eq!(lines[51], "Select a whiteboard");
    }
}
