// FAT12 filesystem support

pub mod fat12_ops;

use core::fmt;

pub use fat12_ops::filename::NameError;

/// Fatal injector errors. Any of these aborts the whole run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fat12Error {
    /// The underlying block device failed a read, write or flush
    IoError,
    /// The device sector size does not match the configured geometry
    InvalidBlockSize,
    /// The image ends before `required` bytes
    ImageTooSmall { required: u64, available: u64 },
    /// No never-used record left in the root directory
    RootDirectoryFull,
    /// A chain would end past the last usable FAT entry
    FatOverflow { last_cluster: u32, limit: u32 },
    /// Payload does not fit the 32-bit size field
    FileTooLarge { size: u64 },
    /// Clusters 0 and 1 do not map to the data region
    InvalidCluster { cluster: u16 },
}

impl fmt::Display for Fat12Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::IoError => write!(f, "disk image I/O error"),
            Self::InvalidBlockSize => write!(f, "device block size does not match FAT geometry"),
            Self::ImageTooSmall {
                required,
                available,
            } => write!(
                f,
                "disk image too small: need {} bytes, image has {}",
                required, available
            ),
            Self::RootDirectoryFull => write!(f, "root directory is full"),
            Self::FatOverflow { last_cluster, limit } => write!(
                f,
                "cluster chain ends at {} but the FAT only addresses clusters below {}",
                last_cluster, limit
            ),
            Self::FileTooLarge { size } => write!(f, "file of {} bytes exceeds FAT size field", size),
            Self::InvalidCluster { cluster } => {
                write!(f, "cluster {} is not in the data region", cluster)
            }
        }
    }
}
