//! In-memory block device.

use core::fmt;
use gpt_disk_io::BlockIo;
use gpt_disk_types::{BlockSize, Lba};

extern crate alloc;
use alloc::vec;
use alloc::vec::Vec;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemDiskError {
    /// Sector size rejected by `BlockSize`
    InvalidBlockSize,
    /// Buffer length is not a whole number of sectors
    Misaligned { len: usize },
    /// Transfer runs past the end of the disk
    OutOfBounds { lba: u64, len: usize },
}

impl fmt::Display for MemDiskError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidBlockSize => write!(f, "invalid block size"),
            Self::Misaligned { len } => write!(f, "buffer of {} bytes is not sector aligned", len),
            Self::OutOfBounds { lba, len } => {
                write!(f, "{} bytes at LBA {} run past the end of the disk", len, lba)
            }
        }
    }
}

/// A disk image held entirely in memory.
pub struct MemDisk {
    data: Vec<u8>,
    block_size: BlockSize,
    sector_size: usize,
}

impl MemDisk {
    /// Zero-filled disk of `sectors` blocks.
    pub fn new(sector_size: u32, sectors: usize) -> Result<Self, MemDiskError> {
        Self::from_bytes(sector_size, vec![0u8; sector_size as usize * sectors])
    }

    /// Wrap existing image bytes; the length must be a whole number of sectors.
    pub fn from_bytes(sector_size: u32, data: Vec<u8>) -> Result<Self, MemDiskError> {
        let block_size = BlockSize::new(sector_size).ok_or(MemDiskError::InvalidBlockSize)?;
        let sector_size = sector_size as usize;
        if data.len() % sector_size != 0 {
            return Err(MemDiskError::Misaligned { len: data.len() });
        }
        Ok(Self {
            data,
            block_size,
            sector_size,
        })
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    fn range(&self, lba: Lba, len: usize) -> Result<core::ops::Range<usize>, MemDiskError> {
        if len % self.sector_size != 0 {
            return Err(MemDiskError::Misaligned { len });
        }
        let start = (lba.0 as usize)
            .checked_mul(self.sector_size)
            .ok_or(MemDiskError::OutOfBounds { lba: lba.0, len })?;
        match start.checked_add(len) {
            Some(end) if end <= self.data.len() => Ok(start..end),
            _ => Err(MemDiskError::OutOfBounds { lba: lba.0, len }),
        }
    }
}

impl BlockIo for MemDisk {
    type Error = MemDiskError;

    fn block_size(&self) -> BlockSize {
        self.block_size
    }

    fn num_blocks(&mut self) -> Result<u64, Self::Error> {
        Ok((self.data.len() / self.sector_size) as u64)
    }

    fn read_blocks(&mut self, start_lba: Lba, dst: &mut [u8]) -> Result<(), Self::Error> {
        let range = self.range(start_lba, dst.len())?;
        dst.copy_from_slice(&self.data[range]);
        Ok(())
    }

    fn write_blocks(&mut self, start_lba: Lba, src: &[u8]) -> Result<(), Self::Error> {
        let range = self.range(start_lba, src.len())?;
        self.data[range].copy_from_slice(src);
        Ok(())
    }

    fn flush(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }
}
