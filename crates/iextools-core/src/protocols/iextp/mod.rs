//! IEX-TP session envelope decoding.
//!
//! The envelope sits directly after the UDP header and frames a batch of
//! length-prefixed sub-messages. All fields are little-endian. The decoder
//! performs no validation; message count and payload length are checked by
//! the sub-message loop in `protocols::tops`.

pub mod layout;
pub mod parser;

pub use parser::Envelope;
