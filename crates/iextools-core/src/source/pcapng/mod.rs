//! pcap-ng block container.
//!
//! The container is walked in a single forward pass over the loaded buffer.
//! Every block is framed by a leading and a trailing length which must agree;
//! a disagreement stops the pass. Only Enhanced Packet Blocks are decoded
//! further, through the link, envelope and message layers.

pub mod error;
pub mod layout;
pub mod packet;
pub mod parser;
pub mod reader;

pub use error::PcapNgError;
pub use packet::EnhancedPacket;
pub use parser::{Block, BlockIter, BlockPayload, BlockType, parse_blocks};
