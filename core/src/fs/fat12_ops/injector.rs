//! Injection orchestrator.
//!
//! Drives the data writer, FAT manager and root directory manager for every
//! manifest entry in order, threading one forward-only [`ClusterCursor`]
//! through the run. Each entry moves through
//! `Pending -> Allocated -> Written -> Recorded -> Done`, or straight to
//! `Skipped` when its payload cannot be loaded. There is no rollback: a fatal
//! error leaves the image partially written.

use super::super::Fat12Error;
use super::directory::RootDirectory;
use super::fat_table::FatTable;
use super::file_ops::write_payload;
use super::filename::ShortName;
use super::geometry::{FatConfig, Geometry, FIRST_DATA_CLUSTER};
use super::manifest::{Manifest, ManifestEntry};
use super::types::DirEntry;
use crate::disk::ImageIo;
use core::fmt;
use gpt_disk_io::BlockIo;

extern crate alloc;
use alloc::string::{String, ToString};
use alloc::vec::Vec;

/// Supplies the bytes of each manifest entry.
///
/// A load failure is not fatal: the entry is skipped and the run continues.
pub trait PayloadSource {
    type Error: fmt::Display;

    fn load(&mut self, entry: &ManifestEntry) -> Result<Vec<u8>, Self::Error>;
}

/// Next free cluster. Starts at 2 and only moves forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct ClusterCursor(u16);

impl ClusterCursor {
    pub const START: Self = Self(FIRST_DATA_CLUSTER);

    pub const fn cluster(self) -> u16 {
        self.0
    }

    // Capacity was checked against the FAT limit, which sits below u16::MAX
    fn advance(self, clusters: u32) -> Self {
        Self(self.0 + clusters as u16)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryState {
    Pending,
    Allocated,
    Written,
    Recorded,
    Done,
    Skipped,
}

struct Progress<'n> {
    name: &'n ShortName,
    state: EntryState,
}

impl<'n> Progress<'n> {
    fn new(name: &'n ShortName) -> Self {
        Self {
            name,
            state: EntryState::Pending,
        }
    }

    fn advance(&mut self, next: EntryState) {
        log::trace!("{}: {:?} -> {:?}", self.name, self.state, next);
        self.state = next;
    }
}

/// Where one file ended up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InjectedFile {
    pub name: ShortName,
    /// Root directory slot
    pub slot: usize,
    /// First cluster, 0 for an empty file
    pub start_cluster: u16,
    pub clusters: u32,
    pub size: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedFile {
    pub name: ShortName,
    pub source: String,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InjectReport {
    pub injected: Vec<InjectedFile>,
    pub skipped: Vec<SkippedFile>,
    /// Cursor after the last injected file
    pub next_cluster: ClusterCursor,
}

impl InjectReport {
    pub fn injected_count(&self) -> usize {
        self.injected.len()
    }
}

/// Validated placement for one payload, computed before any byte is written
struct Allocation {
    start: u16,
    clusters: u32,
    size: u32,
    slot: usize,
}

/// Sole owner of the image for the duration of a run.
pub struct Injector<'a, B: BlockIo> {
    io: ImageIo<'a, B>,
    geometry: Geometry,
    fat: FatTable,
    root: RootDirectory,
}

impl<'a, B: BlockIo> Injector<'a, B> {
    pub fn open(block_io: &'a mut B, config: &FatConfig) -> Result<Self, Fat12Error> {
        // A zero sector size is caught here, before the geometry divides by it
        let io = ImageIo::new(block_io, config.sector_size)?;
        let geometry = config.geometry();
        io.ensure_fits(0, geometry.data_offset)?;

        log::debug!(
            "image of {} bytes: {} FAT(s) at {:#x}, root directory at {:#x} ({} sectors), data at {:#x}",
            io.byte_len(),
            geometry.num_fats,
            geometry.fat_offset,
            geometry.root_offset,
            geometry.root_dir_sectors,
            geometry.data_offset
        );

        Ok(Self {
            io,
            geometry,
            fat: FatTable::new(geometry),
            root: RootDirectory::new(geometry),
        })
    }

    /// Zero the root directory and reset every FAT mirror to its header.
    pub fn reset(&mut self) -> Result<(), Fat12Error> {
        self.root.reset(&mut self.io)?;
        self.fat.reset(&mut self.io)
    }

    fn allocate(&mut self, cursor: ClusterCursor, len: usize) -> Result<Allocation, Fat12Error> {
        let size = u32::try_from(len).map_err(|_| Fat12Error::FileTooLarge { size: len as u64 })?;
        let clusters = self.geometry.clusters_for(size as u64) as u32;

        // Empty files own no cluster; the kernel reads start cluster 0 as "no data"
        let start = if clusters == 0 { 0 } else { cursor.cluster() };
        if clusters > 0 {
            self.fat.check_capacity(start, clusters)?;
            let offset = self
                .geometry
                .cluster_offset(start)
                .ok_or(Fat12Error::InvalidCluster { cluster: start })?;
            self.io
                .ensure_fits(offset, clusters as u64 * self.geometry.sector_size as u64)?;
        }

        let slot = self.root.find_free_slot(&mut self.io)?;
        Ok(Allocation {
            start,
            clusters,
            size,
            slot,
        })
    }

    /// Place one file at `cursor`, returning its placement and the cursor
    /// for the next file.
    pub fn place(
        &mut self,
        cursor: ClusterCursor,
        name: &ShortName,
        data: &[u8],
    ) -> Result<(InjectedFile, ClusterCursor), Fat12Error> {
        let mut progress = Progress::new(name);

        let alloc = self.allocate(cursor, data.len())?;
        progress.advance(EntryState::Allocated);

        write_payload(&mut self.io, &self.geometry, alloc.start, data)?;
        progress.advance(EntryState::Written);

        self.fat
            .allocate_chain(&mut self.io, alloc.start, alloc.clusters)?;
        self.root.write_entry(
            &mut self.io,
            alloc.slot,
            &DirEntry::file(*name, alloc.start, alloc.size),
        )?;
        progress.advance(EntryState::Recorded);

        #[cfg(feature = "fat12_debug")]
        {
            let chain = self.fat.chain(&mut self.io, alloc.start)?;
            log::debug!(
                "{}: chain of {} cluster(s) {:?}..={:?}",
                name,
                chain.len(),
                chain.first(),
                chain.last()
            );
        }

        let next = cursor.advance(alloc.clusters);
        progress.advance(EntryState::Done);
        log::info!(
            "injected {} ({} bytes) at cluster {}",
            name,
            alloc.size,
            alloc.start
        );

        Ok((
            InjectedFile {
                name: *name,
                slot: alloc.slot,
                start_cluster: alloc.start,
                clusters: alloc.clusters,
                size: alloc.size,
            },
            next,
        ))
    }

    /// Reset the metadata regions and inject `manifest` in order.
    ///
    /// The image is flushed whether or not the run succeeds.
    pub fn run<S: PayloadSource>(
        &mut self,
        manifest: &Manifest,
        source: &mut S,
    ) -> Result<InjectReport, Fat12Error> {
        let result = self.inject_all(manifest, source);
        let flushed = self.io.flush();
        let report = result?;
        flushed?;
        Ok(report)
    }

    fn inject_all<S: PayloadSource>(
        &mut self,
        manifest: &Manifest,
        source: &mut S,
    ) -> Result<InjectReport, Fat12Error> {
        self.reset()?;

        let mut cursor = ClusterCursor::START;
        let mut injected = Vec::with_capacity(manifest.len());
        let mut skipped = Vec::new();

        for entry in manifest {
            let data = match source.load(entry) {
                Ok(data) => data,
                Err(e) => {
                    log::warn!("skipping {}: {}: {}", entry.name(), entry.source(), e);
                    Progress::new(entry.name()).advance(EntryState::Skipped);
                    skipped.push(SkippedFile {
                        name: *entry.name(),
                        source: entry.source().to_string(),
                        reason: e.to_string(),
                    });
                    continue;
                }
            };

            let (file, next) = self.place(cursor, entry.name(), &data)?;
            injected.push(file);
            cursor = next;
        }

        Ok(InjectReport {
            injected,
            skipped,
            next_cluster: cursor,
        })
    }

    pub fn fat_entry(&mut self, mirror: u32, cluster: u16) -> Result<u16, Fat12Error> {
        self.fat.read_entry(&mut self.io, mirror, cluster)
    }

    /// Clusters linked from `start` in the first FAT mirror.
    pub fn chain(&mut self, start: u16) -> Result<Vec<u16>, Fat12Error> {
        self.fat.chain(&mut self.io, start)
    }

    pub fn root_entries(&mut self) -> Result<Vec<DirEntry>, Fat12Error> {
        self.root.entries(&mut self.io)
    }
}
