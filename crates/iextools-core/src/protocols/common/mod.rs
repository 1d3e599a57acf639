pub(crate) mod cursor;

pub use cursor::{ByteCursor, CursorError, Endianness, FixedWidth};

/// Render a MAC address as colon-separated lowercase hex.
pub(crate) fn format_mac(addr: &[u8; 6]) -> String {
    addr.iter()
        .map(|b| format!("{:02x}", b))
        .collect::<Vec<_>>()
        .join(":")
}

#[cfg(test)]
mod tests {
    use super::format_mac;

    #[test]
    fn format_mac_pads_and_joins() {
        assert_eq!(
            format_mac(&[0x01, 0x00, 0x5e, 0x57, 0x15, 0x04]),
            "01:00:5e:57:15:04"
        );
    }
}
