/// version(1) reserved(1) protocol(2) channel(4) session(4) payload length(2)
/// message count(2) stream offset(8) first sequence(8) send time(8)
pub const IEXTP_HEADER_LEN: usize = 40;
/// Bytes of the little-endian length prefix in front of every sub-message.
pub const MESSAGE_LENGTH_PREFIX_LEN: usize = 2;
/// Message protocol id of the TOPS feed.
pub const TOPS_PROTOCOL_ID: u16 = 0x8003;
