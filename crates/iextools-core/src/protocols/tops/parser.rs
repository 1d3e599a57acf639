use serde::Serialize;

use crate::protocols::common::{ByteCursor, CursorError};
use crate::protocols::iextp::Envelope;
use crate::protocols::iextp::layout::MESSAGE_LENGTH_PREFIX_LEN;

use super::error::TopsError;
use super::message::{
    ApplicationMessage, MessageType, QuoteUpdateMessage, Symbol, TradeReportMessage,
    TradingStatus, TradingStatusMessage, price_to_f64,
};

/// One sub-message as seen by the dispatch loop.
#[derive(Debug, Clone, PartialEq)]
pub enum SubMessage {
    Decoded(ApplicationMessage),
    /// Recognized-but-undecoded or unknown tag, skipped by its declared length.
    Skipped { message_type: MessageType, length: u16 },
}

/// Accumulated sub-message length did not match the declared payload length.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LengthMismatch {
    pub declared: u16,
    pub consumed: usize,
}

/// Result of walking one envelope's sub-messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct EnvelopeOutcome {
    pub decoded: u32,
    pub skipped: u32,
    pub length_mismatch: Option<LengthMismatch>,
}

/// Decode the message body that follows the tag byte, or `None` when the tag
/// is not decoded.
pub fn decode_body(
    message_type: MessageType,
    body: &mut ByteCursor<'_>,
) -> Result<Option<ApplicationMessage>, CursorError> {
    let message = match message_type {
        MessageType::TradingStatus => ApplicationMessage::TradingStatus(TradingStatusMessage {
            status: TradingStatus::from_code(body.read()?),
            timestamp: body.read_le()?,
            symbol: Symbol(body.read_array()?),
            reason: body.read_array()?,
        }),
        MessageType::QuoteUpdate => ApplicationMessage::QuoteUpdate(QuoteUpdateMessage {
            flags: body.read()?,
            timestamp: body.read_le()?,
            symbol: Symbol(body.read_array()?),
            bid_size: body.read_le()?,
            bid_price: body.read_le()?,
            ask_price: body.read_le()?,
            ask_size: body.read_le()?,
        }),
        MessageType::TradeReport => ApplicationMessage::TradeReport(TradeReportMessage {
            flags: body.read()?,
            timestamp: body.read_le()?,
            symbol: Symbol(body.read_array()?),
            size: body.read_le()?,
            price: price_to_f64(body.read_le()?),
            trade_id: body.read_le()?,
        }),
        _ => return Ok(None),
    };
    Ok(Some(message))
}

/// Walk the sub-messages of `envelope`, handing each one to `visit`.
///
/// The running total (each declared length plus its two-byte prefix) may never
/// exceed the envelope payload length; an overrun is fatal. A total that ends
/// short of the payload length is returned as a non-fatal `LengthMismatch`.
/// Each body is bounded by its declared length.
pub fn walk_messages<F>(envelope: &Envelope<'_>, mut visit: F) -> Result<EnvelopeOutcome, TopsError>
where
    F: FnMut(SubMessage),
{
    let mut outcome = EnvelopeOutcome::default();
    let mut cursor = envelope.payload;
    let mut consumed = 0usize;

    if envelope.message_count > 0 && envelope.payload_length > 0 {
        for index in 0..envelope.message_count {
            let length: u16 = cursor.read_le()?;
            consumed += length as usize + MESSAGE_LENGTH_PREFIX_LEN;
            if consumed > envelope.payload_length as usize {
                return Err(TopsError::PayloadOverrun {
                    index,
                    consumed,
                    payload_length: envelope.payload_length,
                });
            }

            let mut body = cursor.bounded(length as usize)?;
            let tag: u8 = body.read()?;
            let message_type = MessageType::from_tag(tag);
            match decode_body(message_type, &mut body)? {
                Some(message) => {
                    outcome.decoded += 1;
                    visit(SubMessage::Decoded(message));
                }
                None => {
                    tracing::debug!(%message_type, length, "skipping sub-message");
                    outcome.skipped += 1;
                    visit(SubMessage::Skipped {
                        message_type,
                        length,
                    });
                }
            }
            // The body was read through a bounded copy, so the tag and the
            // remaining `length - 1` bytes are skipped here in one step.
            cursor.advance(length as usize)?;
        }
    }

    if consumed != envelope.payload_length as usize {
        outcome.length_mismatch = Some(LengthMismatch {
            declared: envelope.payload_length,
            consumed,
        });
    }
    Ok(outcome)
}
