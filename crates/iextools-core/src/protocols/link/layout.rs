pub const ETHERNET_HEADER_LEN: usize = 14;
pub const ETHERTYPE_IPV4: [u8; 2] = [0x08, 0x00];

pub const IPV4_HEADER_LEN: usize = 20;
/// Header length in 32-bit words for a header without options.
pub const IPV4_IHL_NO_OPTIONS: u8 = 5;
pub const IPV4_VERSION_SHIFT: u8 = 4;
pub const IPV4_IHL_MASK: u8 = 0x0f;
pub const IPV4_DSCP_SHIFT: u8 = 2;
pub const IPV4_ECN_MASK: u8 = 0x03;

pub const IP_PROTOCOL_UDP: u8 = 17;

pub const UDP_HEADER_LEN: usize = 8;
