//! FAT12 boot image injector.
//!
//! Places an ordered manifest of files into a pre-formatted FAT12 image:
//! payload bytes into the data region, one cluster chain per file into every
//! FAT mirror, one record per file into the root directory. Works over any
//! [`gpt_disk_io::BlockIo`], so the same code drives a raw image file or an
//! in-memory disk.

#![cfg_attr(not(test), no_std)]

extern crate alloc;

pub mod disk;
pub mod fs;

pub use disk::{ImageIo, MemDisk};
pub use fs::fat12_ops::{
    inject, FatConfig, Geometry, InjectReport, Injector, Manifest, ManifestEntry, PayloadSource,
    ShortName,
};
pub use fs::Fat12Error;
