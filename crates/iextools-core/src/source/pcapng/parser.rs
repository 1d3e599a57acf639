use std::fmt;

use crate::protocols::common::{ByteCursor, CursorError, Endianness};

use super::error::PcapNgError;
use super::layout;
use super::packet::EnhancedPacket;
use super::reader::byte_order_from_magic;

/// Kind of a pcap-ng block, resolved from its type code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum BlockType {
    SectionHeader,
    InterfaceDescription,
    Packet,
    SimplePacket,
    NameResolution,
    InterfaceStatistics,
    EnhancedPacket,
    CustomCopiable,
    CustomNonCopiable,
    Unknown(u32),
}

impl BlockType {
    pub fn from_code(code: u32) -> Self {
        match code {
            layout::SECTION_HEADER_BLOCK => BlockType::SectionHeader,
            layout::INTERFACE_DESCRIPTION_BLOCK => BlockType::InterfaceDescription,
            layout::PACKET_BLOCK => BlockType::Packet,
            layout::SIMPLE_PACKET_BLOCK => BlockType::SimplePacket,
            layout::NAME_RESOLUTION_BLOCK => BlockType::NameResolution,
            layout::INTERFACE_STATISTICS_BLOCK => BlockType::InterfaceStatistics,
            layout::ENHANCED_PACKET_BLOCK => BlockType::EnhancedPacket,
            layout::CUSTOM_BLOCK_COPIABLE => BlockType::CustomCopiable,
            layout::CUSTOM_BLOCK_NON_COPIABLE => BlockType::CustomNonCopiable,
            other => BlockType::Unknown(other),
        }
    }

    pub fn code(&self) -> u32 {
        match self {
            BlockType::SectionHeader => layout::SECTION_HEADER_BLOCK,
            BlockType::InterfaceDescription => layout::INTERFACE_DESCRIPTION_BLOCK,
            BlockType::Packet => layout::PACKET_BLOCK,
            BlockType::SimplePacket => layout::SIMPLE_PACKET_BLOCK,
            BlockType::NameResolution => layout::NAME_RESOLUTION_BLOCK,
            BlockType::InterfaceStatistics => layout::INTERFACE_STATISTICS_BLOCK,
            BlockType::EnhancedPacket => layout::ENHANCED_PACKET_BLOCK,
            BlockType::CustomCopiable => layout::CUSTOM_BLOCK_COPIABLE,
            BlockType::CustomNonCopiable => layout::CUSTOM_BLOCK_NON_COPIABLE,
            BlockType::Unknown(code) => *code,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            BlockType::SectionHeader => "Header Block",
            BlockType::InterfaceDescription => "Interface Description Block",
            BlockType::Packet => "Packet Block",
            BlockType::SimplePacket => "Simple Packet Block",
            BlockType::NameResolution => "Name Resolution Block",
            BlockType::InterfaceStatistics => "Interface Statistics Block",
            BlockType::EnhancedPacket => "Enhanced Packet Block",
            BlockType::CustomCopiable => "Custom Block (copiable)",
            BlockType::CustomNonCopiable => "Custom Block (non-copiable)",
            BlockType::Unknown(_) => "Unknown Block",
        }
    }
}

impl fmt::Display for BlockType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Typed body of a block. Only Enhanced Packet blocks are decoded.
#[derive(Debug, Clone)]
pub enum BlockPayload<'a> {
    EnhancedPacket(EnhancedPacket<'a>),
}

/// One framed pcap-ng block.
///
/// `start_offset` points just past the leading length field and `end_offset`
/// at the trailing length field, so the body is `start_offset..end_offset`.
#[derive(Debug, Clone)]
pub struct Block<'a> {
    pub block_type: BlockType,
    pub frame_number: u32,
    pub declared_length: u32,
    pub start_offset: usize,
    pub end_offset: usize,
    pub payload: Option<BlockPayload<'a>>,
}

impl<'a> Block<'a> {
    pub fn enhanced_packet(&self) -> Option<&EnhancedPacket<'a>> {
        match &self.payload {
            Some(BlockPayload::EnhancedPacket(packet)) => Some(packet),
            None => None,
        }
    }
}

impl fmt::Display for Block<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Pcap Frame No: {:08} Type: {} (0x{:x}) Len: {}",
            self.frame_number,
            self.block_type,
            self.block_type.code(),
            self.declared_length
        )
    }
}

/// Forward, restartable pass over the blocks of a capture buffer.
///
/// Cloning the iterator restarts from the clone point without copying the
/// buffer. After the first error the iterator is exhausted.
#[derive(Debug, Clone)]
pub struct BlockIter<'a> {
    buf: &'a [u8],
    cursor: ByteCursor<'a>,
    frame_number: u32,
    order: Endianness,
    failed: bool,
}

impl<'a> BlockIter<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Self {
            buf,
            cursor: ByteCursor::new(buf),
            frame_number: 0,
            order: Endianness::default(),
            failed: false,
        }
    }

    /// Byte order of the section currently being walked.
    pub fn byte_order(&self) -> Endianness {
        self.order
    }

    fn next_block(&mut self) -> Result<Block<'a>, PcapNgError> {
        let frame_number = self.frame_number;
        let offset = self.cursor.position();
        let oob = |source: CursorError| PcapNgError::OutOfBounds {
            frame_number,
            source,
        };

        let code: u32 = self.cursor.peek_at(0, self.order).map_err(oob)?;
        if code == layout::SECTION_HEADER_BLOCK {
            let bom_at = layout::BLOCK_TYPE_LEN + layout::BLOCK_LENGTH_LEN + layout::SECTION_BOM_OFFSET;
            let magic: u32 = self
                .cursor
                .peek_at(bom_at, Endianness::Little)
                .map_err(oob)?;
            self.order = byte_order_from_magic(magic).ok_or(PcapNgError::UnknownByteOrder {
                frame_number,
                magic,
            })?;
        }

        let code: u32 = self.cursor.read_with(self.order).map_err(oob)?;
        let leading: u32 = self.cursor.read_with(self.order).map_err(oob)?;
        if leading < layout::BLOCK_FRAMING_LEN {
            return Err(PcapNgError::InvalidBlockLength {
                frame_number,
                offset,
                length: leading,
            });
        }
        let start_offset = self.cursor.position();
        self.cursor
            .advance((leading - layout::BLOCK_FRAMING_LEN) as usize)
            .map_err(oob)?;
        let end_offset = self.cursor.position();
        let trailing: u32 = self.cursor.read_with(self.order).map_err(oob)?;

        if leading != trailing {
            return Err(PcapNgError::FramingMismatch {
                frame_number,
                offset,
                leading,
                trailing,
            });
        }

        let block_type = BlockType::from_code(code);
        let payload = match block_type {
            BlockType::EnhancedPacket => Some(BlockPayload::EnhancedPacket(EnhancedPacket::decode(
                self.buf,
                start_offset,
                end_offset,
                self.order,
                frame_number,
            )?)),
            _ => None,
        };

        tracing::debug!(
            frame = frame_number,
            block = block_type.name(),
            length = leading,
            "parsed pcap-ng block"
        );

        Ok(Block {
            block_type,
            frame_number,
            declared_length: leading,
            start_offset,
            end_offset,
            payload,
        })
    }
}

impl<'a> Iterator for BlockIter<'a> {
    type Item = Result<Block<'a>, PcapNgError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed || self.cursor.is_at_end() {
            return None;
        }
        let result = self.next_block();
        match result {
            Ok(_) => self.frame_number += 1,
            Err(_) => self.failed = true,
        }
        Some(result)
    }
}

/// Walk the whole buffer and collect every block, stopping at the first error.
pub fn parse_blocks(buf: &[u8]) -> Result<Vec<Block<'_>>, PcapNgError> {
    BlockIter::new(buf).collect()
}
