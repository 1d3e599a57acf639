//! TOPS application message decoding.
//!
//! Sub-messages are length-prefixed and dispatched on a one-byte tag.
//! Trading-status, quote-update and trade-report messages are decoded; every
//! other tag is skipped using its declared length. All fields are
//! little-endian; prices are fixed-point with four implied decimals.

pub mod error;
pub mod layout;
pub mod message;
pub mod parser;

pub use error::TopsError;
pub use message::{
    ApplicationMessage, MessageType, QuoteUpdateMessage, Symbol, TradeReportMessage,
    TradingStatus, TradingStatusMessage, format_record, price_to_f64,
};
pub use parser::{EnvelopeOutcome, LengthMismatch, SubMessage, decode_body, walk_messages};
