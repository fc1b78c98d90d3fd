// Error type for the client core.
//
// Nothing in the core is fatal: every `ClientError` is either returned to
// the caller of a public operation (`enqueue`, `dequeue`, ...) or logged by
// the state machine, which then stays put or drops back to Queue.

use conquer_protocol::{DecodeError, EncodeError};
use thiserror::Error;

use crate::connection::ChannelKind;
use crate::session::Mode;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("{0} connection is not open")]
    NotConnected(ChannelKind),
    #[error("transport error: {0}")]
    Transport(String),
    #[error(transparent)]
    Encode(#[from] EncodeError),
    #[error(transparent)]
    Decode(#[from] DecodeError),
    #[error("invalid configuration: {0}")]
    Config(String),
    #[error("{action} is only valid in {expected:?} mode (currently {actual:?})")]
    WrongMode {
        action: &'static str,
        expected: Mode,
        actual: Mode,
    },
}
