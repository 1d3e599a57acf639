//! Byte layout of the pcap-ng container.

/// First four bytes of every pcap-ng file (Section Header Block type).
pub const PCAPNG_MAGIC: [u8; 4] = [0x0a, 0x0d, 0x0d, 0x0a];
/// Section byte-order magic as read in the section's own byte order.
pub const BYTE_ORDER_MAGIC: u32 = 0x1A2B_3C4D;

/// Block type + leading length + trailing length.
pub const BLOCK_FRAMING_LEN: u32 = 12;
pub const BLOCK_TYPE_LEN: usize = 4;
pub const BLOCK_LENGTH_LEN: usize = 4;
/// Offset of the byte-order magic from the end of the leading length.
pub const SECTION_BOM_OFFSET: usize = 0;

pub const SECTION_HEADER_BLOCK: u32 = 0x0A0D_0D0A;
pub const INTERFACE_DESCRIPTION_BLOCK: u32 = 0x0000_0001;
pub const PACKET_BLOCK: u32 = 0x0000_0002;
pub const SIMPLE_PACKET_BLOCK: u32 = 0x0000_0003;
pub const NAME_RESOLUTION_BLOCK: u32 = 0x0000_0004;
pub const INTERFACE_STATISTICS_BLOCK: u32 = 0x0000_0005;
pub const ENHANCED_PACKET_BLOCK: u32 = 0x0000_0006;
pub const CUSTOM_BLOCK_COPIABLE: u32 = 0x0000_0BAD;
pub const CUSTOM_BLOCK_NON_COPIABLE: u32 = 0x4000_0BAD;

/// Interface id, timestamp high/low, captured and original length.
pub const ENHANCED_PACKET_HEADER_LEN: usize = 20;
/// Timestamps are assumed to use the default microsecond resolution.
pub const TIMESTAMP_DIVISOR: f64 = 1e6;
