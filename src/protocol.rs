//! Line grammar spoken between clients and the relay.
//!
//! Every inbound line is parsed exactly once into a [`Command`]; everything
//! downstream matches on the variant. Every outbound line is a [`Reply`]
//! rendered through its `Display` impl.

use std::fmt;

use crate::error::ProtocolError;

/// An RGB stroke colour. Each channel is validated to `0..=255` at parse time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rgb(pub u8, pub u8, pub u8);

/// Line segment endpoints in board coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Segment {
    pub x1: i32,
    pub y1: i32,
    pub x2: i32,
    pub y2: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StrokeKind {
    Draw(Rgb),
    Erase,
}

/// A draw or erase operation addressed to a board. This is what a board's
/// replay log stores and what gets echoed to its members.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Stroke {
    pub board: String,
    pub segment: Segment,
    pub size: i32,
    pub kind: StrokeKind,
}

impl fmt::Display for Stroke {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let Segment { x1, y1, x2, y2 } = self.segment;
        match self.kind {
            StrokeKind::Draw(Rgb(r, g, b)) => write!(
                f,
                "{} draw {x1} {y1} {x2} {y2} {} {r} {g} {b}",
                self.board, self.size
            ),
            StrokeKind::Erase => write!(
                f,
                "{} erase {x1} {y1} {x2} {y2} {}",
                self.board, self.size
            ),
        }
    }
}

/// Client to server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    NewUsername(String),
    AddBoard(String),
    SelectBoard { username: String, board: String },
    Stroke(Stroke),
    Disconnect(String),
}

pub fn parse_command(line: &str) -> Result<Command, ProtocolError> {
    let tokens: Vec<&str> = line.split_ascii_whitespace().collect();

    match tokens.as_slice() {
        ["new", "username", name] => Ok(Command::NewUsername(name.to_string())),
        ["addBoard", name] => Ok(Command::AddBoard(name.to_string())),
        ["Disconnect", name] => Ok(Command::Disconnect(name.to_string())),
        [username, "selectBoard", board] => Ok(Command::SelectBoard {
            username: username.to_string(),
            board: board.to_string(),
        }),
        [board, "draw", x1, y1, x2, y2, size, r, g, b] => {
            let segment = parse_segment([x1, y1, x2, y2])?;
            let size = parse_int("strokeSize", size)?;
            let color = Rgb(
                parse_channel("r", r)?,
                parse_channel("g", g)?,
                parse_channel("b", b)?,
            );

            Ok(Command::Stroke(Stroke {
                board: board.to_string(),
                segment,
                size,
                kind: StrokeKind::Draw(color),
            }))
        }
        [board, "erase", x1, y1, x2, y2, size] => {
            let segment = parse_segment([x1, y1, x2, y2])?;
            let size = parse_int("strokeSize", size)?;

            Ok(Command::Stroke(Stroke {
                board: board.to_string(),
                segment,
                size,
                kind: StrokeKind::Erase,
            }))
        }
        _ => Err(ProtocolError::Unrecognized),
    }
}

/// Only the canonical decimal form is accepted (no `+`, no leading zeros,
/// no `-0`), so the echoed line is byte-for-byte what the client sent.
fn parse_int(field: &'static str, raw: &str) -> Result<i32, ProtocolError> {
    match raw.parse::<i32>() {
        Ok(value) if value.to_string() == raw => Ok(value),
        _ => Err(ProtocolError::BadNumber { field }),
    }
}

fn parse_segment([x1, y1, x2, y2]: [&&str; 4]) -> Result<Segment, ProtocolError> {
    Ok(Segment {
        x1: parse_int("x1", x1)?,
        y1: parse_int("y1", y1)?,
        x2: parse_int("x2", x2)?,
        y2: parse_int("y2", y2)?,
    })
}

fn parse_channel(channel: &'static str, raw: &str) -> Result<u8, ProtocolError> {
    let value = parse_int(channel, raw)?;
    u8::try_from(value).map_err(|_| ProtocolError::ColorOutOfRange { channel, value })
}

/// Server to client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    ExistingBoard(String),
    DoneBoardNames,
    SelectBoard,
    UsernameTaken,
    BoardExists,
    BoardAdded(String),
    OnBoard { username: String, board: String },
    UpdatingClients,
    SameClient(String),
    DoneClientNames,
    RemoveClient(String),
    NoSuchBoard,
    NoSuchUsername,
    Stroke(Stroke),
    Unrecognized,
}

impl fmt::Display for Reply {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Reply::ExistingBoard(name) => write!(f, "Existing Whiteboards {name}"),
            Reply::DoneBoardNames => f.write_str("Done sending whiteboard names"),
            Reply::SelectBoard => f.write_str("Select a whiteboard"),
            Reply::UsernameTaken => {
                f.write_str("Username already taken. Please select a new username.")
            }
            Reply::BoardExists => f.write_str("Whiteboard already exists."),
            Reply::BoardAdded(name) => write!(f, "Board {name} added"),
            Reply::OnBoard { username, board } => write!(f, "{username} on board {board}"),
            Reply::UpdatingClients => f.write_str("Updating Clients"),
            Reply::SameClient(name) => write!(f, "sameClient {name}"),
            Reply::DoneClientNames => f.write_str("Done sending client names"),
            Reply::RemoveClient(name) => write!(f, "removeClient {name}"),
            Reply::NoSuchBoard => f.write_str(
                "Whiteboard does not exist. Select a different board or make a board.",
            ),
            Reply::NoSuchUsername => f.write_str("Username does not exist."),
            Reply::Stroke(stroke) => fmt::Display::fmt(stroke, f),
            Reply::Unrecognized => f.write_str("Unrecognized command."),
        }
    }
}
