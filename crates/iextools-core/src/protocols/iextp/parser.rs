use std::fmt;

use crate::protocols::common::{ByteCursor, CursorError};

/// Decoded IEX-TP header plus a cursor at the first sub-message.
#[derive(Debug, Clone)]
pub struct Envelope<'a> {
    pub version: u8,
    pub protocol_id: u16,
    pub channel_id: u32,
    pub session_id: u32,
    pub payload_length: u16,
    pub message_count: u16,
    pub stream_offset: i64,
    pub first_sequence_number: i64,
    pub send_time: i64,
    pub payload: ByteCursor<'a>,
}

impl<'a> Envelope<'a> {
    pub fn decode(cursor: &mut ByteCursor<'a>) -> Result<Self, CursorError> {
        let version = cursor.read()?;
        let _reserved: u8 = cursor.read()?;
        let protocol_id = cursor.read_le()?;
        let channel_id = cursor.read_le()?;
        let session_id = cursor.read_le()?;
        let payload_length = cursor.read_le()?;
        let message_count = cursor.read_le()?;
        let stream_offset = cursor.read_le()?;
        let first_sequence_number = cursor.read_le()?;
        let send_time = cursor.read_le()?;

        Ok(Self {
            version,
            protocol_id,
            channel_id,
            session_id,
            payload_length,
            message_count,
            stream_offset,
            first_sequence_number,
            send_time,
            payload: *cursor,
        })
    }
}

impl fmt::Display for Envelope<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "IEX-TP v{} Protocol=0x{:x} Send Time={} Length={} Messages={} Channel={} Session={}",
            self.version,
            self.protocol_id,
            self.send_time,
            self.payload_length,
            self.message_count,
            self.channel_id,
            self.session_id
        )
    }
}
