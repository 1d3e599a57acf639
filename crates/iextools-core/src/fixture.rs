//! Builders for synthetic pcap-ng captures carrying IEX-TP / TOPS traffic.
//!
//! Used by the unit and integration tests and by the `tops_fixture` binary.
//! Every builder writes exactly what the decoder expects to read back, so a
//! test can corrupt a single field and assert on the resulting error.
//!
//! # Examples
//! ```
//! use iextools_core::fixture::{CaptureBuilder, FrameSpec, envelope_payload, trade_report_message};
//!
//! let payload = envelope_payload(&[trade_report_message(1, *b"IBM     ", 100, 1_000_000, 1)]);
//! let capture = CaptureBuilder::new()
//!     .packet(0, &FrameSpec::default(), &payload)
//!     .build();
//! assert_eq!(&capture[..4], &[0x0a, 0x0d, 0x0d, 0x0a]);
//! ```

use std::net::Ipv4Addr;

use crate::protocols::common::Endianness;
use crate::protocols::iextp::layout::{IEXTP_HEADER_LEN, MESSAGE_LENGTH_PREFIX_LEN, TOPS_PROTOCOL_ID};
use crate::protocols::link::layout::{
    ETHERNET_HEADER_LEN, ETHERTYPE_IPV4, IP_PROTOCOL_UDP, IPV4_HEADER_LEN, IPV4_IHL_NO_OPTIONS,
    UDP_HEADER_LEN,
};
use crate::protocols::tops::layout::{
    QUOTE_UPDATE, SECURITY_DIRECTORY, SYSTEM_EVENT, TRADE_REPORT, TRADING_STATUS,
};
use crate::source::pcapng::layout::{
    BLOCK_FRAMING_LEN, BYTE_ORDER_MAGIC, ENHANCED_PACKET_BLOCK, ENHANCED_PACKET_HEADER_LEN, INTERFACE_DESCRIPTION_BLOCK,
    SECTION_HEADER_BLOCK,
};

const LINKTYPE_ETHERNET: u16 = 1;
const SNAPLEN: u32 = 65_535;
/// Default IEX DEEP/TOPS multicast port.
pub const TOPS_PORT: u16 = 10_378;

/// Addressing and header knobs for one Ethernet/IPv4/UDP frame.
#[derive(Debug, Clone)]
pub struct FrameSpec {
    pub source_mac: [u8; 6],
    pub destination_mac: [u8; 6],
    pub source_ip: Ipv4Addr,
    pub destination_ip: Ipv4Addr,
    pub source_port: u16,
    pub destination_port: u16,
    /// IP protocol number written into the header.
    pub protocol: u8,
    /// Header length nibble. The header itself is always 20 bytes.
    pub ihl: u8,
    pub ttl: u8,
}

impl Default for FrameSpec {
    fn default() -> Self {
        Self {
            source_mac: [0x0a, 0x0b, 0x0c, 0x0d, 0x0e, 0x0f],
            destination_mac: [0x01, 0x00, 0x5e, 0x57, 0x15, 0x04],
            source_ip: Ipv4Addr::new(10, 0, 0, 1),
            destination_ip: Ipv4Addr::new(233, 215, 21, 4),
            source_port: TOPS_PORT,
            destination_port: TOPS_PORT,
            protocol: IP_PROTOCOL_UDP,
            ihl: IPV4_IHL_NO_OPTIONS,
            ttl: 64,
        }
    }
}

impl FrameSpec {
    /// Wrap `payload` in Ethernet II, IPv4 and UDP headers.
    pub fn build(&self, payload: &[u8]) -> Vec<u8> {
        let mut frame =
            Vec::with_capacity(ETHERNET_HEADER_LEN + IPV4_HEADER_LEN + UDP_HEADER_LEN + payload.len());
        frame.extend_from_slice(&self.destination_mac);
        frame.extend_from_slice(&self.source_mac);
        frame.extend_from_slice(&ETHERTYPE_IPV4);

        let total_len = (IPV4_HEADER_LEN + UDP_HEADER_LEN + payload.len()) as u16;
        let mut ip_header = [0u8; IPV4_HEADER_LEN];
        ip_header[0] = 0x40 | (self.ihl & 0x0f);
        ip_header[2..4].copy_from_slice(&total_len.to_be_bytes());
        ip_header[8] = self.ttl;
        ip_header[9] = self.protocol;
        ip_header[12..16].copy_from_slice(&self.source_ip.octets());
        ip_header[16..20].copy_from_slice(&self.destination_ip.octets());
        let checksum = ipv4_checksum(&ip_header);
        ip_header[10..12].copy_from_slice(&checksum.to_be_bytes());
        frame.extend_from_slice(&ip_header);

        let udp_len = (UDP_HEADER_LEN + payload.len()) as u16;
        frame.extend_from_slice(&self.source_port.to_be_bytes());
        frame.extend_from_slice(&self.destination_port.to_be_bytes());
        frame.extend_from_slice(&udp_len.to_be_bytes());
        frame.extend_from_slice(&0u16.to_be_bytes());

        frame.extend_from_slice(payload);
        frame
    }
}

fn ipv4_checksum(header: &[u8; IPV4_HEADER_LEN]) -> u16 {
    let mut sum = 0u32;
    for chunk in header.chunks(2) {
        sum = sum.wrapping_add(u16::from_be_bytes([chunk[0], chunk[1]]) as u32);
    }
    while (sum >> 16) != 0 {
        sum = (sum & 0xFFFF) + (sum >> 16);
    }
    !(sum as u16)
}

/// Single-section, single-interface pcap-ng capture.
#[derive(Debug, Clone, Default)]
pub struct CaptureBuilder {
    order: Endianness,
    packets: Vec<(u64, Vec<u8>)>,
}

impl CaptureBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Byte order of the section; all block fields are written in it.
    pub fn byte_order(mut self, order: Endianness) -> Self {
        self.order = order;
        self
    }

    /// Append an Enhanced Packet Block with the raw timestamp `ts_raw`
    /// (microseconds) and a frame built from `frame` around `payload`.
    pub fn packet(mut self, ts_raw: u64, frame: &FrameSpec, payload: &[u8]) -> Self {
        self.packets.push((ts_raw, frame.build(payload)));
        self
    }

    /// Append an Enhanced Packet Block around an already-built frame.
    pub fn raw_packet(mut self, ts_raw: u64, frame: Vec<u8>) -> Self {
        self.packets.push((ts_raw, frame));
        self
    }

    pub fn build(&self) -> Vec<u8> {
        let order = self.order;
        let mut output = Vec::new();
        output.extend_from_slice(&pcapng_block(
            order,
            SECTION_HEADER_BLOCK,
            &section_header_body(order),
        ));
        output.extend_from_slice(&pcapng_block(
            order,
            INTERFACE_DESCRIPTION_BLOCK,
            &interface_desc_body(order),
        ));
        for (ts_raw, frame) in &self.packets {
            output.extend_from_slice(&pcapng_block(
                order,
                ENHANCED_PACKET_BLOCK,
                &enhanced_packet_body(order, *ts_raw, frame),
            ));
        }
        output
    }
}

/// Frame `body` as a pcap-ng block: type, leading length, body, trailing length.
pub fn pcapng_block(order: Endianness, block_type: u32, body: &[u8]) -> Vec<u8> {
    let total_len = body.len() as u32 + BLOCK_FRAMING_LEN;
    let mut block = Vec::with_capacity(total_len as usize);
    put_u32(&mut block, order, block_type);
    put_u32(&mut block, order, total_len);
    block.extend_from_slice(body);
    put_u32(&mut block, order, total_len);
    block
}

fn section_header_body(order: Endianness) -> Vec<u8> {
    let mut body = Vec::with_capacity(16);
    put_u32(&mut body, order, BYTE_ORDER_MAGIC);
    put_u16(&mut body, order, 1);
    put_u16(&mut body, order, 0);
    let section_len = match order {
        Endianness::Little => (-1i64).to_le_bytes(),
        Endianness::Big => (-1i64).to_be_bytes(),
    };
    body.extend_from_slice(&section_len);
    body
}

fn interface_desc_body(order: Endianness) -> Vec<u8> {
    let mut body = Vec::with_capacity(8);
    put_u16(&mut body, order, LINKTYPE_ETHERNET);
    put_u16(&mut body, order, 0);
    put_u32(&mut body, order, SNAPLEN);
    body
}

fn enhanced_packet_body(order: Endianness, ts_raw: u64, data: &[u8]) -> Vec<u8> {
    let cap_len = data.len() as u32;
    let mut body = Vec::with_capacity(ENHANCED_PACKET_HEADER_LEN + data.len() + 3);
    put_u32(&mut body, order, 0);
    put_u32(&mut body, order, (ts_raw >> 32) as u32);
    put_u32(&mut body, order, ts_raw as u32);
    put_u32(&mut body, order, cap_len);
    put_u32(&mut body, order, cap_len);
    body.extend_from_slice(data);
    let pad_len = (4 - (data.len() % 4)) % 4;
    body.resize(body.len() + pad_len, 0);
    body
}

fn put_u16(out: &mut Vec<u8>, order: Endianness, value: u16) {
    match order {
        Endianness::Little => out.extend_from_slice(&value.to_le_bytes()),
        Endianness::Big => out.extend_from_slice(&value.to_be_bytes()),
    }
}

fn put_u32(out: &mut Vec<u8>, order: Endianness, value: u32) {
    match order {
        Endianness::Little => out.extend_from_slice(&value.to_le_bytes()),
        Endianness::Big => out.extend_from_slice(&value.to_be_bytes()),
    }
}

/// IEX-TP envelope whose count and payload length match `messages`.
pub fn envelope_payload(messages: &[Vec<u8>]) -> Vec<u8> {
    let payload_length: usize = messages.iter().map(Vec::len).sum();
    envelope_bytes(messages.len() as u16, payload_length as u16, messages)
}

/// IEX-TP envelope with explicit header counts, for building inconsistent
/// envelopes. `messages` are appended verbatim.
pub fn envelope_bytes(message_count: u16, payload_length: u16, messages: &[Vec<u8>]) -> Vec<u8> {
    let body_len: usize = messages.iter().map(Vec::len).sum();
    let mut bytes = Vec::with_capacity(IEXTP_HEADER_LEN + body_len);
    bytes.push(1);
    bytes.push(0);
    bytes.extend_from_slice(&TOPS_PROTOCOL_ID.to_le_bytes());
    bytes.extend_from_slice(&1u32.to_le_bytes());
    bytes.extend_from_slice(&1u32.to_le_bytes());
    bytes.extend_from_slice(&payload_length.to_le_bytes());
    bytes.extend_from_slice(&message_count.to_le_bytes());
    bytes.extend_from_slice(&0i64.to_le_bytes());
    bytes.extend_from_slice(&1i64.to_le_bytes());
    bytes.extend_from_slice(&0i64.to_le_bytes());
    for message in messages {
        bytes.extend_from_slice(message);
    }
    bytes
}

/// Length-prefixed sub-message; the prefix counts the tag and `body`.
pub fn raw_message(tag: u8, body: &[u8]) -> Vec<u8> {
    let length = (body.len() + 1) as u16;
    let mut message = Vec::with_capacity(MESSAGE_LENGTH_PREFIX_LEN + length as usize);
    message.extend_from_slice(&length.to_le_bytes());
    message.push(tag);
    message.extend_from_slice(body);
    message
}

pub fn trade_report_message(
    timestamp: i64,
    symbol: [u8; 8],
    size: u32,
    price_raw: i64,
    trade_id: i64,
) -> Vec<u8> {
    let mut body = Vec::with_capacity(37);
    body.push(0);
    body.extend_from_slice(&timestamp.to_le_bytes());
    body.extend_from_slice(&symbol);
    body.extend_from_slice(&size.to_le_bytes());
    body.extend_from_slice(&price_raw.to_le_bytes());
    body.extend_from_slice(&trade_id.to_le_bytes());
    raw_message(TRADE_REPORT, &body)
}

pub fn quote_update_message(
    timestamp: i64,
    symbol: [u8; 8],
    bid_size: u32,
    bid_price: i64,
    ask_price: i64,
    ask_size: u32,
) -> Vec<u8> {
    let mut body = Vec::with_capacity(41);
    body.push(0);
    body.extend_from_slice(&timestamp.to_le_bytes());
    body.extend_from_slice(&symbol);
    body.extend_from_slice(&bid_size.to_le_bytes());
    body.extend_from_slice(&bid_price.to_le_bytes());
    body.extend_from_slice(&ask_price.to_le_bytes());
    body.extend_from_slice(&ask_size.to_le_bytes());
    raw_message(QUOTE_UPDATE, &body)
}

pub fn trading_status_message(timestamp: i64, symbol: [u8; 8], status: u8, reason: [u8; 4]) -> Vec<u8> {
    let mut body = Vec::with_capacity(21);
    body.push(status);
    body.extend_from_slice(&timestamp.to_le_bytes());
    body.extend_from_slice(&symbol);
    body.extend_from_slice(&reason);
    raw_message(TRADING_STATUS, &body)
}

/// 2016-12-13T14:30:00Z in nanoseconds, the message clock of the sample captures.
pub const SESSION_START_NS: i64 = 1_481_639_400_000_000_000;
const PACKET_INTERVAL_US: u64 = 250_000;

/// Three-packet opening session: a system event, a directory entry and a halt,
/// then a resume with a quote, then trades in ZIEXT, IBM and AAPL.
pub fn session_capture() -> Vec<u8> {
    let first_packet_us = (SESSION_START_NS / 1_000) as u64;
    let frame = FrameSpec::default();
    let packets = [
        envelope_payload(&[
            raw_message(SYSTEM_EVENT, &system_event_body(b'R', SESSION_START_NS)),
            raw_message(SECURITY_DIRECTORY, &[0u8; 30]),
            trading_status_message(SESSION_START_NS, *b"ZIEXT   ", b'H', *b"IPO1"),
        ]),
        envelope_payload(&[
            trading_status_message(SESSION_START_NS + 1, *b"ZIEXT   ", b'T', *b"    "),
            quote_update_message(SESSION_START_NS + 2, *b"ZIEXT   ", 100, 99_500, 100_500, 200),
        ]),
        envelope_payload(&[
            trade_report_message(SESSION_START_NS + 3, *b"ZIEXT   ", 100, 100_000, 1),
            trade_report_message(SESSION_START_NS + 4, *b"IBM     ", 100, 1_000_000, 2),
            trade_report_message(SESSION_START_NS + 5, *b"AAPL    ", 50, 1_250_000, 3),
        ]),
    ];

    packets
        .iter()
        .enumerate()
        .fold(CaptureBuilder::new(), |builder, (idx, payload)| {
            builder.packet(first_packet_us + idx as u64 * PACKET_INTERVAL_US, &frame, payload)
        })
        .build()
}

/// One trade whose envelope declares eight more payload bytes than it carries.
pub fn length_mismatch_capture() -> Vec<u8> {
    let messages = [trade_report_message(SESSION_START_NS, *b"IBM     ", 10, 1_000_000, 1)];
    let declared = messages.iter().map(Vec::len).sum::<usize>() as u16 + 8;
    CaptureBuilder::new()
        .packet(
            (SESSION_START_NS / 1_000) as u64,
            &FrameSpec::default(),
            &envelope_bytes(1, declared, &messages),
        )
        .build()
}

fn system_event_body(event: u8, timestamp: i64) -> Vec<u8> {
    let mut body = Vec::with_capacity(9);
    body.push(event);
    body.extend_from_slice(&timestamp.to_le_bytes());
    body
}
