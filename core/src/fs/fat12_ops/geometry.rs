//! Filesystem geometry.
//!
//! The bootloader and kernel hardcode these offsets, so the configuration is
//! a compile-time contract rather than something read from the image.

use super::types::DIR_ENTRY_SIZE;

/// First cluster number that maps to the data region
pub const FIRST_DATA_CLUSTER: u16 = 2;

/// Link values at or above this are reserved or end-of-chain for the kernel driver
pub const RESERVED_CLUSTER_MIN: u16 = 0xFFF0;

/// Static FAT layout parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FatConfig {
    pub sector_size: u32,
    pub reserved_sectors: u32,
    pub num_fats: u32,
    pub sectors_per_fat: u32,
    pub root_entries: u32,
}

impl FatConfig {
    /// Layout of the boot disk; must match `boot.asm`.
    pub const BOOT_DISK: Self = Self {
        sector_size: 512,
        reserved_sectors: 4096,
        num_fats: 2,
        sectors_per_fat: 256,
        root_entries: 512,
    };

    pub const fn geometry(&self) -> Geometry {
        let sector = self.sector_size as u64;
        let fat_offset = self.reserved_sectors as u64 * sector;
        let root_offset =
            fat_offset + self.num_fats as u64 * self.sectors_per_fat as u64 * sector;
        let root_dir_sectors =
            (self.root_entries * DIR_ENTRY_SIZE as u32).div_ceil(self.sector_size);
        let data_offset = root_offset + root_dir_sectors as u64 * sector;

        Geometry {
            sector_size: self.sector_size,
            num_fats: self.num_fats,
            sectors_per_fat: self.sectors_per_fat,
            root_entries: self.root_entries,
            root_dir_sectors,
            fat_offset,
            root_offset,
            data_offset,
        }
    }
}

/// Byte offsets derived from a [`FatConfig`]. Never mutated after resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Geometry {
    pub sector_size: u32,
    pub num_fats: u32,
    pub sectors_per_fat: u32,
    pub root_entries: u32,
    pub root_dir_sectors: u32,
    pub fat_offset: u64,
    pub root_offset: u64,
    pub data_offset: u64,
}

impl Geometry {
    /// Size of one FAT mirror in bytes
    pub const fn fat_bytes(&self) -> u64 {
        self.sectors_per_fat as u64 * self.sector_size as u64
    }

    /// Start of FAT mirror `index`
    pub const fn mirror_offset(&self, index: u32) -> u64 {
        self.fat_offset + index as u64 * self.fat_bytes()
    }

    pub const fn root_dir_bytes(&self) -> u64 {
        self.root_dir_sectors as u64 * self.sector_size as u64
    }

    /// Number of 16-bit link entries one mirror holds
    pub const fn fat_entry_capacity(&self) -> u32 {
        (self.fat_bytes() / 2) as u32
    }

    /// First cluster number the FAT cannot link.
    pub const fn cluster_limit(&self) -> u32 {
        let capacity = self.fat_entry_capacity();
        if capacity < RESERVED_CLUSTER_MIN as u32 {
            capacity
        } else {
            RESERVED_CLUSTER_MIN as u32
        }
    }

    /// Largest payload the linkable clusters can hold, capped by the 32-bit
    /// size field of a directory record.
    pub const fn max_file_size(&self) -> u64 {
        let limit = self.cluster_limit();
        if limit <= FIRST_DATA_CLUSTER as u32 {
            return 0;
        }
        let bytes = (limit - FIRST_DATA_CLUSTER as u32) as u64 * self.sector_size as u64;
        if bytes > u32::MAX as u64 {
            u32::MAX as u64
        } else {
            bytes
        }
    }

    /// Byte offset of the first sector of `cluster` (one sector per cluster).
    /// Clusters 0 and 1 have no data sector.
    pub const fn cluster_offset(&self, cluster: u16) -> Option<u64> {
        if cluster < FIRST_DATA_CLUSTER {
            return None;
        }
        Some(self.data_offset + (cluster - FIRST_DATA_CLUSTER) as u64 * self.sector_size as u64)
    }

    /// Clusters needed for `len` payload bytes.
    pub const fn clusters_for(&self, len: u64) -> u64 {
        len.div_ceil(self.sector_size as u64)
    }
}
