// FAT12 data region writes

use super::super::Fat12Error;
use super::geometry::Geometry;
use crate::disk::ImageIo;
use gpt_disk_io::BlockIo;

/// Copy `data` into the clusters starting at `start_cluster`.
///
/// Exact length: the unused tail of the last sector keeps whatever the image
/// already held there.
pub fn write_payload<B: BlockIo>(
    io: &mut ImageIo<'_, B>,
    geometry: &Geometry,
    start_cluster: u16,
    data: &[u8],
) -> Result<(), Fat12Error> {
    if data.is_empty() {
        return Ok(());
    }
    let offset = geometry
        .cluster_offset(start_cluster)
        .ok_or(Fat12Error::InvalidCluster {
            cluster: start_cluster,
        })?;
    io.write_at(offset, data)
}
