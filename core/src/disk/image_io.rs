//! Byte-granular access to a sector-addressed image.
//!
//! FAT links are two bytes wide and payloads end mid-sector, while
//! [`BlockIo`] only moves whole sectors. `ImageIo` bridges the two with a
//! one-sector scratch buffer: partial sectors are read, patched and written
//! back, whole sectors are written straight through.

use crate::fs::Fat12Error;
use gpt_disk_io::BlockIo;
use gpt_disk_types::{BlockSize, Lba};

extern crate alloc;
use alloc::vec;
use alloc::vec::Vec;

/// Largest zero buffer used when clearing a region (in sectors)
const ZERO_CHUNK_SECTORS: usize = 64;

pub struct ImageIo<'a, B: BlockIo> {
    block_io: &'a mut B,
    sector_size: usize,
    len: u64,
    scratch: Vec<u8>,
}

fn read_blocks<B: BlockIo>(block_io: &mut B, lba: u64, dst: &mut [u8]) -> Result<(), Fat12Error> {
    block_io.read_blocks(Lba(lba), dst).map_err(|e| {
        log::error!("image read failed at LBA {}: {}", lba, e);
        Fat12Error::IoError
    })
}

fn write_blocks<B: BlockIo>(block_io: &mut B, lba: u64, src: &[u8]) -> Result<(), Fat12Error> {
    block_io.write_blocks(Lba(lba), src).map_err(|e| {
        log::error!("image write failed at LBA {}: {}", lba, e);
        Fat12Error::IoError
    })
}

impl<'a, B: BlockIo> ImageIo<'a, B> {
    /// Wrap `block_io`, which must use `sector_size` byte blocks.
    pub fn new(block_io: &'a mut B, sector_size: u32) -> Result<Self, Fat12Error> {
        match BlockSize::new(sector_size) {
            Some(expected) if expected == block_io.block_size() => {}
            _ => return Err(Fat12Error::InvalidBlockSize),
        }

        let blocks = block_io.num_blocks().map_err(|e| {
            log::error!("cannot determine image size: {}", e);
            Fat12Error::IoError
        })?;

        let sector_size = sector_size as usize;
        Ok(Self {
            block_io,
            sector_size,
            len: blocks.saturating_mul(sector_size as u64),
            scratch: vec![0u8; sector_size],
        })
    }

    /// Addressable image length in bytes
    pub fn byte_len(&self) -> u64 {
        self.len
    }

    /// Fail with `ImageTooSmall` unless `[offset, offset + len)` lies inside the image.
    pub fn ensure_fits(&self, offset: u64, len: u64) -> Result<(), Fat12Error> {
        let end = offset.saturating_add(len);
        if end > self.len {
            return Err(Fat12Error::ImageTooSmall {
                required: end,
                available: self.len,
            });
        }
        Ok(())
    }

    pub fn read_at(&mut self, offset: u64, dst: &mut [u8]) -> Result<(), Fat12Error> {
        self.ensure_fits(offset, dst.len() as u64)?;

        let sector = self.sector_size as u64;
        let mut done = 0;
        while done < dst.len() {
            let pos = offset + done as u64;
            let within = (pos % sector) as usize;
            let chunk = (self.sector_size - within).min(dst.len() - done);

            read_blocks(self.block_io, pos / sector, &mut self.scratch)?;
            dst[done..done + chunk].copy_from_slice(&self.scratch[within..within + chunk]);
            done += chunk;
        }
        Ok(())
    }

    pub fn write_at(&mut self, offset: u64, src: &[u8]) -> Result<(), Fat12Error> {
        self.ensure_fits(offset, src.len() as u64)?;

        let sector = self.sector_size as u64;
        let mut done = 0;
        while done < src.len() {
            let pos = offset + done as u64;
            let lba = pos / sector;
            let within = (pos % sector) as usize;
            let remaining = src.len() - done;

            if within == 0 && remaining >= self.sector_size {
                let whole = remaining - remaining % self.sector_size;
                write_blocks(self.block_io, lba, &src[done..done + whole])?;
                done += whole;
                continue;
            }

            // Partial sector: keep the bytes around the patch
            let chunk = (self.sector_size - within).min(remaining);
            read_blocks(self.block_io, lba, &mut self.scratch)?;
            self.scratch[within..within + chunk].copy_from_slice(&src[done..done + chunk]);
            write_blocks(self.block_io, lba, &self.scratch)?;
            done += chunk;
        }
        Ok(())
    }

    /// Zero `len` bytes starting at `offset`.
    pub fn zero_range(&mut self, offset: u64, len: u64) -> Result<(), Fat12Error> {
        self.ensure_fits(offset, len)?;

        let chunk = (len as usize).min(self.sector_size * ZERO_CHUNK_SECTORS);
        let zeros = vec![0u8; chunk];
        let mut done = 0u64;
        while done < len {
            let n = ((len - done) as usize).min(chunk);
            self.write_at(offset + done, &zeros[..n])?;
            done += n as u64;
        }
        Ok(())
    }

    pub fn flush(&mut self) -> Result<(), Fat12Error> {
        self.block_io.flush().map_err(|e| {
            log::error!("image flush failed: {}", e);
            Fat12Error::IoError
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::disk::MemDisk;

    #[test]
    fn rejects_mismatched_block_size() {
        let mut disk = MemDisk::new(512, 4).unwrap();
        assert_eq!(
            ImageIo::new(&mut disk, 1024).err(),
            Some(Fat12Error::InvalidBlockSize)
        );
    }

    #[test]
    fn unaligned_write_preserves_neighbours() {
        let mut disk = MemDisk::from_bytes(512, vec![0xAA; 512 * 3]).unwrap();
        {
            let mut io = ImageIo::new(&mut disk, 512).unwrap();
            // spans the end of sector 0, all of sector 1 and the start of sector 2
            io.write_at(500, &[0x11; 530]).unwrap();
        }
        let bytes = disk.as_bytes();
        assert!(bytes[..500].iter().all(|&b| b == 0xAA));
        assert!(bytes[500..1030].iter().all(|&b| b == 0x11));
        assert!(bytes[1030..].iter().all(|&b| b == 0xAA));
    }

    #[test]
    fn read_back_across_sectors() {
        let mut disk = MemDisk::new(512, 2).unwrap();
        let mut io = ImageIo::new(&mut disk, 512).unwrap();
        assert_eq!(io.byte_len(), 1024);
        io.write_at(510, &[1, 2, 3, 4]).unwrap();

        let mut out = [0u8; 4];
        io.read_at(510, &mut out).unwrap();
        assert_eq!(out, [1, 2, 3, 4]);
    }

    #[test]
    fn writes_past_end_are_rejected() {
        let mut disk = MemDisk::new(512, 2).unwrap();
        let mut io = ImageIo::new(&mut disk, 512).unwrap();
        assert_eq!(
            io.write_at(1020, &[0u8; 8]),
            Err(Fat12Error::ImageTooSmall {
                required: 1028,
                available: 1024
            })
        );
    }

    #[test]
    fn zero_range_clears_only_the_range() {
        let mut disk = MemDisk::from_bytes(512, vec![0xFF; 512 * 4]).unwrap();
        {
            let mut io = ImageIo::new(&mut disk, 512).unwrap();
            io.zero_range(256, 1024).unwrap();
        }
        let bytes = disk.as_bytes();
        assert!(bytes[..256].iter().all(|&b| b == 0xFF));
        assert!(bytes[256..1280].iter().all(|&b| b == 0));
        assert!(bytes[1280..].iter().all(|&b| b == 0xFF));
    }
}
