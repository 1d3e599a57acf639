use thiserror::Error;

use crate::protocols::common::CursorError;

/// Errors returned by the Ethernet / IPv4 / UDP decoders.
///
/// Note: this error type is re-exported from the crate root.
///
/// # Examples
/// ```
/// use iextools_core::LinkError;
///
/// let err = LinkError::UnsupportedTransport { protocol: 6 };
/// assert!(err.to_string().contains("unsupported transport protocol"));
/// ```
#[derive(Debug, Error)]
pub enum LinkError {
    #[error(transparent)]
    OutOfBounds(#[from] CursorError),
    #[error("IPv4 options are not supported (IHL={ihl}, expected 5)")]
    UnsupportedOptions { ihl: u8 },
    #[error("unsupported transport protocol {protocol}: only UDP (17) is supported")]
    UnsupportedTransport { protocol: u8 },
}
