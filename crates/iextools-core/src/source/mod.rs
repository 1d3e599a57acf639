pub(crate) mod pcapng;

pub use pcapng::{
    Block, BlockIter, BlockPayload, BlockType, EnhancedPacket, PcapNgError, parse_blocks,
};

use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;

/// Capture file loaded fully into memory.
///
/// Every decoded structure borrows from this buffer; it is never mutated.
#[derive(Debug, Clone)]
pub struct CaptureBuffer {
    path: Option<PathBuf>,
    data: Vec<u8>,
}

impl CaptureBuffer {
    pub fn open(path: &Path) -> Result<Self, SourceError> {
        let data = fs::read(path).map_err(|source| SourceError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(Self {
            path: Some(path.to_path_buf()),
            data,
        })
    }

    pub fn from_bytes(data: Vec<u8>) -> Self {
        Self { path: None, data }
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn bytes(&self) -> &[u8] {
        &self.data
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Whether the buffer starts with a pcap-ng Section Header Block.
    pub fn is_pcapng(&self) -> bool {
        pcapng::reader::is_pcapng_magic(&self.data)
    }

    /// Restartable pass over the blocks of this capture.
    pub fn blocks(&self) -> BlockIter<'_> {
        BlockIter::new(&self.data)
    }
}

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
