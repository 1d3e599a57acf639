use crate::protocols::common::Endianness;

use super::layout;

/// Check whether a buffer starts with the pcap-ng Section Header Block type.
///
/// # Examples
/// This helper is part of an internal module, so the example is marked as
/// text example.
/// ```text
/// assert!(is_pcapng_magic(&[0x0a, 0x0d, 0x0d, 0x0a, 0x1c]));
/// assert!(!is_pcapng_magic(&[0xd4, 0xc3, 0xb2, 0xa1]));
/// ```
pub fn is_pcapng_magic(data: &[u8]) -> bool {
    data.get(..layout::PCAPNG_MAGIC.len()) == Some(&layout::PCAPNG_MAGIC[..])
}

/// Resolve the section byte order from the byte-order magic read as
/// little-endian.
pub fn byte_order_from_magic(magic_le: u32) -> Option<Endianness> {
    if magic_le == layout::BYTE_ORDER_MAGIC {
        Some(Endianness::Little)
    } else if magic_le == layout::BYTE_ORDER_MAGIC.swap_bytes() {
        Some(Endianness::Big)
    } else {
        None
    }
}

/// Assemble the 64-bit timestamp from its two 32-bit halves.
pub fn assemble_timestamp(ts_high: u32, ts_low: u32) -> u64 {
    ((ts_high as u64) << 32) | (ts_low as u64)
}

/// Convert a raw pcap-ng timestamp to seconds using the fixed resolution.
///
/// # Examples
/// This helper is part of an internal module, so the example is marked as
/// text example.
/// ```text
/// let seconds = pcapng_ts_to_seconds(1_500_000);
/// assert!((seconds - 1.5).abs() < f64::EPSILON);
/// ```
pub fn pcapng_ts_to_seconds(raw: u64) -> f64 {
    raw as f64 / layout::TIMESTAMP_DIVISOR
}
