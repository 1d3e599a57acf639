use std::fmt;
use std::net::Ipv4Addr;

use serde::Serialize;

use crate::protocols::common::{ByteCursor, CursorError, format_mac};

use super::error::LinkError;
use super::layout;

/// Ethernet II header. The type code is kept as the two wire bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct EthernetHeader {
    pub destination: [u8; 6],
    pub source: [u8; 6],
    pub ether_type: [u8; 2],
}

impl EthernetHeader {
    pub fn decode(cursor: &mut ByteCursor<'_>) -> Result<Self, CursorError> {
        let destination = cursor.read_array()?;
        let source = cursor.read_array()?;
        let ether_type = cursor.read_array()?;
        Ok(Self {
            destination,
            source,
            ether_type,
        })
    }

    /// Type code in network order, for display.
    pub fn ether_type_code(&self) -> u16 {
        u16::from_be_bytes(self.ether_type)
    }
}

impl fmt::Display for EthernetHeader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Ethernet II, src={} dst={} type={:x}",
            format_mac(&self.source),
            format_mac(&self.destination),
            self.ether_type_code()
        )
    }
}

/// Fixed 20-byte IPv4 header, integers converted to host order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Ipv4Header {
    pub version: u8,
    pub ihl: u8,
    pub dscp: u8,
    pub ecn: u8,
    pub total_length: u16,
    pub identification: u16,
    pub flags: u16,
    pub ttl: u8,
    pub protocol: u8,
    pub header_checksum: u16,
    pub source: Ipv4Addr,
    pub destination: Ipv4Addr,
}

impl Ipv4Header {
    /// Decode the header; a header carrying options is rejected after the
    /// fixed 20 bytes are consumed.
    pub fn decode(cursor: &mut ByteCursor<'_>) -> Result<Self, LinkError> {
        let version_ihl: u8 = cursor.read()?;
        let dscp_ecn: u8 = cursor.read()?;
        let total_length = cursor.read_be()?;
        let identification = cursor.read_be()?;
        let flags = cursor.read_be()?;
        let ttl = cursor.read()?;
        let protocol = cursor.read()?;
        let header_checksum = cursor.read_be()?;
        let source = Ipv4Addr::from(cursor.read_array::<4>()?);
        let destination = Ipv4Addr::from(cursor.read_array::<4>()?);

        let ihl = version_ihl & layout::IPV4_IHL_MASK;
        if ihl != layout::IPV4_IHL_NO_OPTIONS {
            return Err(LinkError::UnsupportedOptions { ihl });
        }

        Ok(Self {
            version: version_ihl >> layout::IPV4_VERSION_SHIFT,
            ihl,
            dscp: dscp_ecn >> layout::IPV4_DSCP_SHIFT,
            ecn: dscp_ecn & layout::IPV4_ECN_MASK,
            total_length,
            identification,
            flags,
            ttl,
            protocol,
            header_checksum,
            source,
            destination,
        })
    }
}

impl fmt::Display for Ipv4Header {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "IPv{} IHL={} total_length={} Identification=0x{:x} ({}) Flags=0x{:x} TTL={} Protocol={} checksum=0x{:x} Source={} Destination={}",
            self.version,
            self.ihl,
            self.total_length,
            self.identification,
            self.identification,
            self.flags,
            self.ttl,
            self.protocol,
            self.header_checksum,
            self.source,
            self.destination
        )
    }
}

/// UDP header, all fields converted from network order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct UdpHeader {
    pub source_port: u16,
    pub destination_port: u16,
    pub length: u16,
    pub checksum: u16,
}

impl UdpHeader {
    pub fn decode(cursor: &mut ByteCursor<'_>) -> Result<Self, CursorError> {
        Ok(Self {
            source_port: cursor.read_be()?,
            destination_port: cursor.read_be()?,
            length: cursor.read_be()?,
            checksum: cursor.read_be()?,
        })
    }
}

impl fmt::Display for UdpHeader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "UDP src_port={} dst_port={} length={} checksum=0x{:x}",
            self.source_port, self.destination_port, self.length, self.checksum
        )
    }
}

/// The three headers in front of a UDP datagram payload.
#[derive(Debug, Clone, Copy)]
pub struct LinkStack {
    pub ethernet: EthernetHeader,
    pub ipv4: Ipv4Header,
    pub udp: UdpHeader,
}

/// Decode Ethernet, IPv4 and UDP in order, leaving the cursor at the UDP
/// payload. Any IP protocol other than UDP is rejected before the transport
/// header is read.
pub fn decode_link_stack(cursor: &mut ByteCursor<'_>) -> Result<LinkStack, LinkError> {
    let ethernet = EthernetHeader::decode(cursor)?;
    let ipv4 = Ipv4Header::decode(cursor)?;
    if ipv4.protocol != layout::IP_PROTOCOL_UDP {
        return Err(LinkError::UnsupportedTransport {
            protocol: ipv4.protocol,
        });
    }
    let udp = UdpHeader::decode(cursor)?;
    Ok(LinkStack {
        ethernet,
        ipv4,
        udp,
    })
}
