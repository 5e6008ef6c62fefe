// FAT12 boot image injection - fixed-geometry writer for the boot disk

mod directory;
mod fat_table;
mod file_ops;
pub mod filename;
mod geometry;
mod injector;
pub mod manifest;
pub mod types;

use super::Fat12Error;
use gpt_disk_io::BlockIo;

pub use directory::RootDirectory;
pub use fat_table::{FatTable, END_OF_CHAIN, MEDIA_HEADER};
pub use file_ops::write_payload;
pub use filename::ShortName;
pub use geometry::{FatConfig, Geometry, FIRST_DATA_CLUSTER};
pub use injector::{
    ClusterCursor, EntryState, InjectReport, InjectedFile, Injector, PayloadSource, SkippedFile,
};
pub use manifest::{Manifest, ManifestEntry, ManifestError};

/// Reset the image metadata and inject every manifest entry in order.
///
/// Cluster and directory slot assignment follow manifest order, so the same
/// manifest over a freshly reset image always yields the same bytes.
pub fn inject<B: BlockIo, S: PayloadSource>(
    block_io: &mut B,
    config: &FatConfig,
    manifest: &Manifest,
    source: &mut S,
) -> Result<InjectReport, Fat12Error> {
    let mut injector = Injector::open(block_io, config)?;
    injector.run(manifest, source)
}
