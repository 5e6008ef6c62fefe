// FAT mirror management

use super::super::Fat12Error;
use super::geometry::{Geometry, FIRST_DATA_CLUSTER, RESERVED_CLUSTER_MIN};
use crate::disk::ImageIo;
use gpt_disk_io::BlockIo;

extern crate alloc;
use alloc::vec::Vec;

/// Media descriptor pattern stamped over entries 0 and 1 of every mirror
pub const MEDIA_HEADER: [u8; 4] = [0xF8, 0xFF, 0xFF, 0xFF];

/// Link value closing a chain
pub const END_OF_CHAIN: u16 = 0xFFFF;

/// The mirrored cluster-link tables.
///
/// Every mutation goes to all mirrors with identical bytes, so the copies
/// never diverge.
#[derive(Debug, Clone, Copy)]
pub struct FatTable {
    geometry: Geometry,
}

impl FatTable {
    pub fn new(geometry: Geometry) -> Self {
        Self { geometry }
    }

    /// First cluster number this table cannot link.
    pub fn cluster_limit(&self) -> u32 {
        self.geometry.cluster_limit()
    }

    fn entry_offset(&self, mirror: u32, cluster: u16) -> u64 {
        self.geometry.mirror_offset(mirror) + cluster as u64 * 2
    }

    /// Clear every mirror and stamp the media header.
    pub fn reset<B: BlockIo>(&self, io: &mut ImageIo<'_, B>) -> Result<(), Fat12Error> {
        for mirror in 0..self.geometry.num_fats {
            let offset = self.geometry.mirror_offset(mirror);
            io.zero_range(offset, self.geometry.fat_bytes())?;
            io.write_at(offset, &MEDIA_HEADER)?;
        }
        log::debug!(
            "reset {} FAT mirror(s) of {} bytes",
            self.geometry.num_fats,
            self.geometry.fat_bytes()
        );
        Ok(())
    }

    /// Fail unless `count` clusters starting at `start` fit in the table.
    pub fn check_capacity(&self, start: u16, count: u32) -> Result<(), Fat12Error> {
        if count == 0 {
            return Ok(());
        }
        let last_cluster = start as u32 + count - 1;
        let limit = self.cluster_limit();
        if last_cluster >= limit {
            return Err(Fat12Error::FatOverflow {
                last_cluster,
                limit,
            });
        }
        Ok(())
    }

    /// Link `count` consecutive clusters from `start` and terminate the chain.
    pub fn allocate_chain<B: BlockIo>(
        &self,
        io: &mut ImageIo<'_, B>,
        start: u16,
        count: u32,
    ) -> Result<(), Fat12Error> {
        self.check_capacity(start, count)?;
        if count == 0 {
            return Ok(());
        }

        // Consecutive clusters have consecutive entries, so the chain is one run
        let mut links = Vec::with_capacity(count as usize * 2);
        for i in 1..count {
            let next = start + i as u16;
            links.extend_from_slice(&next.to_le_bytes());
        }
        links.extend_from_slice(&END_OF_CHAIN.to_le_bytes());

        for mirror in 0..self.geometry.num_fats {
            io.write_at(self.entry_offset(mirror, start), &links)?;
        }
        Ok(())
    }

    pub fn read_entry<B: BlockIo>(
        &self,
        io: &mut ImageIo<'_, B>,
        mirror: u32,
        cluster: u16,
    ) -> Result<u16, Fat12Error> {
        let mut raw = [0u8; 2];
        io.read_at(self.entry_offset(mirror, cluster), &mut raw)?;
        Ok(u16::from_le_bytes(raw))
    }

    /// Follow the chain from `start` in the first mirror.
    ///
    /// Stops on any reserved or end-of-chain link, on a free (zero) link, or
    /// once more clusters have been visited than the table can hold.
    pub fn chain<B: BlockIo>(
        &self,
        io: &mut ImageIo<'_, B>,
        start: u16,
    ) -> Result<Vec<u16>, Fat12Error> {
        let mut out = Vec::new();
        if start < FIRST_DATA_CLUSTER {
            return Ok(out);
        }

        let limit = self.cluster_limit() as usize;
        let mut current = start;
        loop {
            out.push(current);
            let next = self.read_entry(io, 0, current)?;
            if next < FIRST_DATA_CLUSTER || next >= RESERVED_CLUSTER_MIN || out.len() >= limit {
                break;
            }
            current = next;
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::disk::MemDisk;
    use crate::fs::fat12_ops::FatConfig;

    fn small_config() -> FatConfig {
        FatConfig {
            sector_size: 512,
            reserved_sectors: 1,
            num_fats: 2,
            sectors_per_fat: 1,
            root_entries: 16,
        }
    }

    fn mirrors(disk: &MemDisk, geometry: &Geometry) -> (Vec<u8>, Vec<u8>) {
        let bytes = disk.as_bytes();
        let len = geometry.fat_bytes() as usize;
        let a = geometry.mirror_offset(0) as usize;
        let b = geometry.mirror_offset(1) as usize;
        (bytes[a..a + len].to_vec(), bytes[b..b + len].to_vec())
    }

    #[test]
    fn reset_leaves_header_only() {
        let geometry = small_config().geometry();
        let mut disk = MemDisk::from_bytes(512, vec![0x5A; 512 * 8]).unwrap();
        {
            let mut io = ImageIo::new(&mut disk, 512).unwrap();
            FatTable::new(geometry).reset(&mut io).unwrap();
        }
        let (first, second) = mirrors(&disk, &geometry);
        assert_eq!(first, second);
        assert_eq!(&first[..4], &MEDIA_HEADER);
        assert!(first[4..].iter().all(|&b| b == 0));
    }

    #[test]
    fn chain_links_and_terminates_in_every_mirror() {
        let geometry = small_config().geometry();
        let mut disk = MemDisk::new(512, 8).unwrap();
        let fat = FatTable::new(geometry);
        {
            let mut io = ImageIo::new(&mut disk, 512).unwrap();
            fat.reset(&mut io).unwrap();
            fat.allocate_chain(&mut io, 2, 3).unwrap();
            fat.allocate_chain(&mut io, 5, 1).unwrap();

            assert_eq!(fat.read_entry(&mut io, 0, 2).unwrap(), 3);
            assert_eq!(fat.read_entry(&mut io, 0, 3).unwrap(), 4);
            assert_eq!(fat.read_entry(&mut io, 1, 4).unwrap(), END_OF_CHAIN);
            assert_eq!(fat.chain(&mut io, 2).unwrap(), vec![2, 3, 4]);
            assert_eq!(fat.chain(&mut io, 5).unwrap(), vec![5]);
        }
        let (first, second) = mirrors(&disk, &geometry);
        assert_eq!(first, second);
    }

    #[test]
    fn zero_length_chain_writes_nothing() {
        let geometry = small_config().geometry();
        let mut disk = MemDisk::new(512, 8).unwrap();
        let fat = FatTable::new(geometry);
        let mut io = ImageIo::new(&mut disk, 512).unwrap();
        fat.reset(&mut io).unwrap();
        fat.allocate_chain(&mut io, 2, 0).unwrap();
        assert_eq!(fat.read_entry(&mut io, 0, 2).unwrap(), 0);
    }

    #[test]
    fn overflow_is_rejected_before_writing() {
        // one 512-byte mirror holds 256 entries
        let geometry = small_config().geometry();
        let mut disk = MemDisk::new(512, 8).unwrap();
        let fat = FatTable::new(geometry);
        let mut io = ImageIo::new(&mut disk, 512).unwrap();
        fat.reset(&mut io).unwrap();

        assert!(fat.allocate_chain(&mut io, 2, 254).is_ok());
        assert_eq!(
            fat.allocate_chain(&mut io, 256, 1),
            Err(Fat12Error::FatOverflow {
                last_cluster: 256,
                limit: 256
            })
        );
        // second mirror starts right after the first and must be untouched beyond its own chain
        assert_eq!(fat.read_entry(&mut io, 1, 0).unwrap(), 0xFFF8);
    }

    #[test]
    fn boot_disk_limit_stops_below_reserved_range() {
        let fat = FatTable::new(FatConfig::BOOT_DISK.geometry());
        assert_eq!(fat.cluster_limit(), 0xFFF0);
        assert!(fat.check_capacity(0xFFEF, 1).is_ok());
        assert!(fat.check_capacity(0xFFEF, 2).is_err());
    }
}
