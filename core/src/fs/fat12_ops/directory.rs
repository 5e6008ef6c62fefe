// FAT12 root directory operations

use super::super::Fat12Error;
use super::geometry::Geometry;
use super::types::{is_never_used, DirEntry, DIR_ENTRY_SIZE};
use crate::disk::ImageIo;
use gpt_disk_io::BlockIo;

extern crate alloc;
use alloc::vec;
use alloc::vec::Vec;

/// The fixed-size root directory region.
///
/// Only a zero leading byte counts as free. Deleted (`0xE5`) records are not
/// reused: every run starts from a zeroed region.
#[derive(Debug, Clone, Copy)]
pub struct RootDirectory {
    geometry: Geometry,
}

impl RootDirectory {
    pub fn new(geometry: Geometry) -> Self {
        Self { geometry }
    }

    /// Number of record slots the region can hold
    pub fn slot_count(&self) -> usize {
        (self.geometry.root_dir_bytes() / DIR_ENTRY_SIZE as u64) as usize
    }

    fn slot_offset(&self, slot: usize) -> u64 {
        self.geometry.root_offset + (slot * DIR_ENTRY_SIZE) as u64
    }

    pub fn reset<B: BlockIo>(&self, io: &mut ImageIo<'_, B>) -> Result<(), Fat12Error> {
        io.zero_range(self.geometry.root_offset, self.geometry.root_dir_bytes())?;
        log::debug!(
            "cleared root directory: {} slots at offset {:#x}",
            self.slot_count(),
            self.geometry.root_offset
        );
        Ok(())
    }

    /// Index of the first never-used record.
    pub fn find_free_slot<B: BlockIo>(&self, io: &mut ImageIo<'_, B>) -> Result<usize, Fat12Error> {
        let sector_size = self.geometry.sector_size as usize;
        let per_sector = sector_size / DIR_ENTRY_SIZE;
        let mut sector = vec![0u8; sector_size];

        for sec in 0..self.geometry.root_dir_sectors as usize {
            io.read_at(
                self.geometry.root_offset + (sec * sector_size) as u64,
                &mut sector,
            )?;
            for (i, raw) in sector.chunks_exact(DIR_ENTRY_SIZE).enumerate() {
                let slot = sec * per_sector + i;
                if slot >= self.slot_count() {
                    break;
                }
                if is_never_used(raw) {
                    return Ok(slot);
                }
            }
        }

        Err(Fat12Error::RootDirectoryFull)
    }

    pub fn write_entry<B: BlockIo>(
        &self,
        io: &mut ImageIo<'_, B>,
        slot: usize,
        entry: &DirEntry,
    ) -> Result<(), Fat12Error> {
        if slot >= self.slot_count() {
            return Err(Fat12Error::RootDirectoryFull);
        }
        io.write_at(self.slot_offset(slot), &entry.encode())
    }

    pub fn read_entry<B: BlockIo>(
        &self,
        io: &mut ImageIo<'_, B>,
        slot: usize,
    ) -> Result<Option<DirEntry>, Fat12Error> {
        let mut raw = [0u8; DIR_ENTRY_SIZE];
        io.read_at(self.slot_offset(slot), &mut raw)?;
        if is_never_used(&raw) {
            return Ok(None);
        }
        Ok(Some(DirEntry::decode(&raw)))
    }

    /// All records up to the first never-used one.
    pub fn entries<B: BlockIo>(&self, io: &mut ImageIo<'_, B>) -> Result<Vec<DirEntry>, Fat12Error> {
        let mut out = Vec::new();
        for slot in 0..self.slot_count() {
            match self.read_entry(io, slot)? {
                Some(entry) => out.push(entry),
                None => break,
            }
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::disk::MemDisk;
    use crate::fs::fat12_ops::{FatConfig, ShortName};

    fn geometry(root_entries: u32) -> Geometry {
        FatConfig {
            sector_size: 512,
            reserved_sectors: 1,
            num_fats: 1,
            sectors_per_fat: 1,
            root_entries,
        }
        .geometry()
    }

    fn entry(name: &str, cluster: u16, size: u32) -> DirEntry {
        DirEntry::file(ShortName::parse(name).unwrap(), cluster, size)
    }

    #[test]
    fn slots_fill_in_order() {
        let root = RootDirectory::new(geometry(32));
        let mut disk = MemDisk::from_bytes(512, vec![0x77; 512 * 6]).unwrap();
        let mut io = ImageIo::new(&mut disk, 512).unwrap();
        root.reset(&mut io).unwrap();

        assert_eq!(root.find_free_slot(&mut io).unwrap(), 0);
        root.write_entry(&mut io, 0, &entry("FOO.TXT", 2, 12)).unwrap();
        assert_eq!(root.find_free_slot(&mut io).unwrap(), 1);
        root.write_entry(&mut io, 1, &entry("BAR.TXT", 3, 7)).unwrap();

        let list = root.entries(&mut io).unwrap();
        assert_eq!(list.len(), 2);
        assert_eq!(list[0].name.as_bytes(), b"FOO     TXT");
        assert_eq!(list[0].first_cluster, 2);
        assert_eq!(list[1].file_size, 7);
    }

    #[test]
    fn scan_crosses_sector_boundary() {
        let root = RootDirectory::new(geometry(32));
        let mut disk = MemDisk::new(512, 6).unwrap();
        let mut io = ImageIo::new(&mut disk, 512).unwrap();
        root.reset(&mut io).unwrap();

        for slot in 0..16 {
            root.write_entry(&mut io, slot, &entry("F", 2, 1)).unwrap();
        }
        assert_eq!(root.find_free_slot(&mut io).unwrap(), 16);
    }

    #[test]
    fn full_directory_is_fatal() {
        let root = RootDirectory::new(geometry(16));
        let mut disk = MemDisk::new(512, 4).unwrap();
        let mut io = ImageIo::new(&mut disk, 512).unwrap();
        root.reset(&mut io).unwrap();

        for slot in 0..root.slot_count() {
            root.write_entry(&mut io, slot, &entry("F", 2, 1)).unwrap();
        }
        assert_eq!(root.find_free_slot(&mut io), Err(Fat12Error::RootDirectoryFull));
        assert_eq!(
            root.write_entry(&mut io, 16, &entry("G", 2, 1)),
            Err(Fat12Error::RootDirectoryFull)
        );
    }

    #[test]
    fn deleted_records_are_not_free() {
        let root = RootDirectory::new(geometry(16));
        let mut disk = MemDisk::new(512, 4).unwrap();
        let mut io = ImageIo::new(&mut disk, 512).unwrap();
        root.reset(&mut io).unwrap();

        let mut deleted = [0u8; DIR_ENTRY_SIZE];
        deleted[0] = 0xE5;
        io.write_at(geometry(16).root_offset, &deleted).unwrap();
        assert_eq!(root.find_free_slot(&mut io).unwrap(), 1);
    }
}
