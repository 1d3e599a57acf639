use std::fmt;

use crate::protocols::common::{ByteCursor, Endianness};
use crate::protocols::iextp::Envelope;
use crate::protocols::link::{EthernetHeader, Ipv4Header, UdpHeader, decode_link_stack};

use super::error::PcapNgError;
use super::reader::{assemble_timestamp, pcapng_ts_to_seconds};

/// Decoded Enhanced Packet Block carrying one IEX-TP datagram.
#[derive(Debug, Clone)]
pub struct EnhancedPacket<'a> {
    pub interface_id: u32,
    /// Raw timestamp, `ts_high << 32 | ts_low`.
    pub timestamp_raw: u64,
    pub captured_length: u32,
    pub original_length: u32,
    pub ethernet: EthernetHeader,
    pub ipv4: Ipv4Header,
    pub udp: UdpHeader,
    pub envelope: Envelope<'a>,
}

impl<'a> EnhancedPacket<'a> {
    /// Decode the block body `start..end` of an Enhanced Packet Block.
    ///
    /// Reads are bounded by the captured packet data, which itself must fit
    /// inside the block, so no cursor produced here can pass `end`.
    pub(crate) fn decode(
        buf: &'a [u8],
        start: usize,
        end: usize,
        order: Endianness,
        frame_number: u32,
    ) -> Result<Self, PcapNgError> {
        let oob = |source| PcapNgError::OutOfBounds {
            frame_number,
            source,
        };
        let mut cursor = ByteCursor::at(buf, start)
            .and_then(|c| c.bounded_to(end))
            .map_err(oob)?;

        let interface_id: u32 = cursor.read_with(order).map_err(oob)?;
        let ts_high: u32 = cursor.read_with(order).map_err(oob)?;
        let ts_low: u32 = cursor.read_with(order).map_err(oob)?;
        let captured_length: u32 = cursor.read_with(order).map_err(oob)?;
        let original_length: u32 = cursor.read_with(order).map_err(oob)?;

        let mut packet = cursor.bounded(captured_length as usize).map_err(oob)?;
        let link = decode_link_stack(&mut packet).map_err(|source| PcapNgError::Link {
            frame_number,
            source,
        })?;
        let envelope = Envelope::decode(&mut packet).map_err(oob)?;

        Ok(Self {
            interface_id,
            timestamp_raw: assemble_timestamp(ts_high, ts_low),
            captured_length,
            original_length,
            ethernet: link.ethernet,
            ipv4: link.ipv4,
            udp: link.udp,
            envelope,
        })
    }

    /// Capture timestamp in seconds since the Unix epoch.
    pub fn timestamp(&self) -> f64 {
        pcapng_ts_to_seconds(self.timestamp_raw)
    }
}

impl fmt::Display for EnhancedPacket<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "EnhancedPacketBlock - timestamp={:.6} captured_len={}",
            self.timestamp(),
            self.captured_length
        )
    }
}

#[cfg(test)]
mod tests {
    use crate::fixture::{CaptureBuilder, FrameSpec, envelope_payload, trade_report_message};
    use crate::protocols::common::Endianness;
    use crate::protocols::link::LinkError;
    use crate::source::pcapng::error::PcapNgError;
    use crate::source::pcapng::parser::parse_blocks;

    fn single_trade_payload() -> Vec<u8> {
        envelope_payload(&[trade_report_message(1_000, *b"IBM     ", 100, 1_000_000, 7)])
    }

    #[test]
    fn decodes_headers_and_envelope() {
        let data = CaptureBuilder::new()
            .packet(1_500_000, &FrameSpec::default(), &single_trade_payload())
            .build();
        let blocks = parse_blocks(&data).unwrap();
        let packet = blocks[2].enhanced_packet().expect("enhanced packet");
        assert_eq!(packet.interface_id, 0);
        assert!((packet.timestamp() - 1.5).abs() < f64::EPSILON);
        assert_eq!(packet.captured_length, packet.original_length);
        assert_eq!(packet.ipv4.protocol, 17);
        assert_eq!(packet.udp.destination_port, FrameSpec::default().destination_port);
        assert_eq!(packet.envelope.message_count, 1);
        assert_eq!(packet.envelope.payload_length, 40);
    }

    #[test]
    fn big_endian_section_decodes_packet_header() {
        let data = CaptureBuilder::new()
            .byte_order(Endianness::Big)
            .packet((7u64 << 32) | 9, &FrameSpec::default(), &single_trade_payload())
            .build();
        let blocks = parse_blocks(&data).unwrap();
        let packet = blocks[2].enhanced_packet().unwrap();
        assert_eq!(packet.timestamp_raw, (7u64 << 32) | 9);
        assert_eq!(packet.envelope.message_count, 1);
    }

    #[test]
    fn non_udp_protocol_is_rejected() {
        let spec = FrameSpec {
            protocol: 6,
            ..FrameSpec::default()
        };
        let data = CaptureBuilder::new()
            .packet(0, &spec, &single_trade_payload())
            .build();
        let err = parse_blocks(&data).unwrap_err();
        assert!(matches!(
            err,
            PcapNgError::Link {
                frame_number: 2,
                source: LinkError::UnsupportedTransport { protocol: 6 }
            }
        ));
    }

    #[test]
    fn ipv4_options_are_rejected() {
        let spec = FrameSpec {
            ihl: 6,
            ..FrameSpec::default()
        };
        let data = CaptureBuilder::new()
            .packet(0, &spec, &single_trade_payload())
            .build();
        let err = parse_blocks(&data).unwrap_err();
        assert!(matches!(
            err,
            PcapNgError::Link {
                source: LinkError::UnsupportedOptions { ihl: 6 },
                ..
            }
        ));
    }

    #[test]
    fn captured_length_past_block_end_is_out_of_bounds() {
        let mut data = CaptureBuilder::new()
            .packet(0, &FrameSpec::default(), &single_trade_payload())
            .build();
        // Enhanced Packet header starts 8 bytes into the third block; the
        // captured length is its fourth field.
        let blocks_len = 28 + 20;
        let caplen_at = blocks_len + 8 + 12;
        data[caplen_at..caplen_at + 4].copy_from_slice(&4096u32.to_le_bytes());
        let err = parse_blocks(&data).unwrap_err();
        assert!(matches!(err, PcapNgError::OutOfBounds { frame_number: 2, .. }));
    }

    #[test]
    fn truncated_envelope_is_out_of_bounds() {
        let data = CaptureBuilder::new()
            .packet(0, &FrameSpec::default(), &[0u8; 10])
            .build();
        let err = parse_blocks(&data).unwrap_err();
        assert!(matches!(err, PcapNgError::OutOfBounds { .. }));
    }
}
