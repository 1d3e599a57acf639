use thiserror::Error;

use crate::protocols::common::CursorError;

/// Errors returned by the TOPS sub-message loop.
#[derive(Debug, Error)]
pub enum TopsError {
    #[error(transparent)]
    OutOfBounds(#[from] CursorError),
    #[error(
        "sub-message {index} overruns the envelope: {consumed} bytes consumed, payload length {payload_length}"
    )]
    PayloadOverrun {
        index: u16,
        consumed: usize,
        payload_length: u16,
    },
}
