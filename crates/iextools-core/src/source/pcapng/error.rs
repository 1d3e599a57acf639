use thiserror::Error;

use crate::protocols::common::CursorError;
use crate::protocols::link::LinkError;

/// Errors returned while walking the pcap-ng block container.
///
/// Every variant is fatal: the block pass stops at the first error.
///
/// # Examples
/// ```
/// use iextools_core::PcapNgError;
///
/// let err = PcapNgError::FramingMismatch {
///     frame_number: 2,
///     offset: 64,
///     leading: 32,
///     trailing: 36,
/// };
/// assert!(err.to_string().contains("block length mismatch"));
/// ```
#[derive(Debug, Error)]
pub enum PcapNgError {
    #[error(
        "block length mismatch in frame {frame_number} at offset {offset}: leading {leading}, trailing {trailing}"
    )]
    FramingMismatch {
        frame_number: u32,
        offset: usize,
        leading: u32,
        trailing: u32,
    },
    #[error("invalid block length {length} in frame {frame_number} at offset {offset}")]
    InvalidBlockLength {
        frame_number: u32,
        offset: usize,
        length: u32,
    },
    #[error("unknown byte-order magic 0x{magic:08x} in frame {frame_number}")]
    UnknownByteOrder { frame_number: u32, magic: u32 },
    #[error("frame {frame_number}: {source}")]
    OutOfBounds {
        frame_number: u32,
        #[source]
        source: CursorError,
    },
    #[error("frame {frame_number}: {source}")]
    Link {
        frame_number: u32,
        #[source]
        source: LinkError,
    },
}

impl PcapNgError {
    /// Frame number of the block that failed to decode.
    pub fn frame_number(&self) -> u32 {
        match self {
            PcapNgError::FramingMismatch { frame_number, .. }
            | PcapNgError::InvalidBlockLength { frame_number, .. }
            | PcapNgError::UnknownByteOrder { frame_number, .. }
            | PcapNgError::OutOfBounds { frame_number, .. }
            | PcapNgError::Link { frame_number, .. } => *frame_number,
        }
    }
}
