//! Link-layer stack decoding: Ethernet II, IPv4 and UDP.
//!
//! Each decoder consumes a `ByteCursor` and returns a header struct. Only the
//! fixed 20-byte IPv4 header and the UDP transport are supported; anything
//! else is reported as an explicit error rather than a partial header.

pub mod error;
pub mod layout;
pub mod parser;

pub use error::LinkError;
pub use parser::{EthernetHeader, Ipv4Header, LinkStack, UdpHeader, decode_link_stack};
