//! Inbound line framing. Wraps `LinesCodec` so that a bad line becomes an
//! item instead of an error: `FramedRead` ends the stream after the first
//! decoder error, and a malformed line must not end the session.

use std::io;

use bytes::BytesMut;
use tokio_util::codec::{Decoder, LinesCodec, LinesCodecError};

pub const MAX_LINE_LENGTH: usize = 4096;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Inbound {
    Line(String),
    /// Not UTF-8, or longer than the line limit. The rest of the line is skipped.
    Malformed,
}

#[derive(Debug)]
pub struct LineCodec {
    inner: LinesCodec,
}

impl LineCodec {
    pub fn new(max_length: usize) -> Self {
        Self {
            inner: LinesCodec::new_with_max_length(max_length),
        }
    }
}

impl Default for LineCodec {
    fn default() -> Self {
        Self::new(MAX_LINE_LENGTH)
    }
}

impl Decoder for LineCodec {
    type Item = Inbound;
    type Error = io::Error;

    fn decode(&mut self, src: &mut BytesMut) -> io::Result<Option<Inbound>> {
        recover(self.inner.decode(src))
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> io::Result<Option<Inbound>> {
        recover(self.inner.decode_eof(src))
    }
}

fn recover(result: Result<Option<String>, LinesCodecError>) -> io::Result<Option<Inbound>> {
    match result {
        Ok(line) => Ok(line.map(Inbound::Line)),
        Err(LinesCodecError::MaxLineLengthExceeded) => Ok(Some(Inbound::Malformed)),
        Err(LinesCodecError::Io(err)) if err.kind() == io::ErrorKind::InvalidData => {
            Ok(Some(Inbound::Malformed))
        }
        Err(LinesCodecError::Io(err)) => Err(err),
    }
}
