use thiserror::Error;

/// Why an inbound line was rejected by the grammar. Every variant is answered
/// with the same generic reply; the detail is only logged.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProtocolError {
    #[error("line does not match any command")]
    Unrecognized,

    #[error("field `{field}` is not a signed integer")]
    BadNumber { field: &'static str },

    #[error("colour channel `{channel}` is {value}, expected 0..=255")]
    ColorOutOfRange { channel: &'static str, value: i32 },
}
