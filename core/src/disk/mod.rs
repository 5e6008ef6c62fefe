// Disk image access over gpt_disk_io block devices

mod image_io;
mod mem;

pub use image_io::ImageIo;
pub use mem::{MemDisk, MemDiskError};
