//! Raw disk image file as a block device.

use gpt_disk_io::BlockIo;
use gpt_disk_types::{BlockSize, Lba};
use std::fmt;
use std::fs::{File, OpenOptions};
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

#[derive(Debug)]
pub enum ImageFileError {
    /// The image could not be opened; it is never created
    Open { path: PathBuf, source: io::Error },
    InvalidBlockSize,
    Io(io::Error),
    /// Buffer length is not a whole number of sectors
    Misaligned { len: usize },
    OutOfBounds { lba: u64, len: usize },
}

impl fmt::Display for ImageFileError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Open { path, source } => {
                write!(f, "cannot open image {}: {}", path.display(), source)
            }
            Self::InvalidBlockSize => write!(f, "invalid block size"),
            Self::Io(e) => write!(f, "image I/O failed: {}", e),
            Self::Misaligned { len } => write!(f, "buffer of {} bytes is not sector aligned", len),
            Self::OutOfBounds { lba, len } => {
                write!(f, "{} bytes at LBA {} run past the end of the image", len, lba)
            }
        }
    }
}

impl std::error::Error for ImageFileError {}

impl From<io::Error> for ImageFileError {
    fn from(e: io::Error) -> Self {
        Self::Io(e)
    }
}

/// An existing image file opened read-write.
///
/// A trailing partial sector is not addressable.
pub struct ImageFile {
    file: File,
    block_size: BlockSize,
    sector_size: u64,
    len: u64,
}

impl ImageFile {
    pub fn open(path: &Path, sector_size: u32) -> Result<Self, ImageFileError> {
        let block_size = BlockSize::new(sector_size).ok_or(ImageFileError::InvalidBlockSize)?;
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .open(path)
            .map_err(|source| ImageFileError::Open {
                path: path.to_path_buf(),
                source,
            })?;
        let sector_size = sector_size as u64;
        let len = file.metadata()?.len();
        let tail = len % sector_size;
        if tail != 0 {
            log::warn!(
                "{}: {} trailing byte(s) past the last whole sector are ignored",
                path.display(),
                tail
            );
        }

        Ok(Self {
            file,
            block_size,
            sector_size,
            len: len - tail,
        })
    }

    fn seek_to(&mut self, lba: Lba, len: usize) -> Result<(), ImageFileError> {
        if len as u64 % self.sector_size != 0 {
            return Err(ImageFileError::Misaligned { len });
        }
        let end = lba
            .0
            .checked_mul(self.sector_size)
            .and_then(|start| Some((start, start.checked_add(len as u64)?)));
        match end {
            Some((start, end)) if end <= self.len => {
                self.file.seek(SeekFrom::Start(start))?;
                Ok(())
            }
            _ => Err(ImageFileError::OutOfBounds { lba: lba.0, len }),
        }
    }
}

impl BlockIo for ImageFile {
    type Error = ImageFileError;

    fn block_size(&self) -> BlockSize {
        self.block_size
    }

    fn num_blocks(&mut self) -> Result<u64, Self::Error> {
        Ok(self.len / self.sector_size)
    }

    fn read_blocks(&mut self, start_lba: Lba, dst: &mut [u8]) -> Result<(), Self::Error> {
        self.seek_to(start_lba, dst.len())?;
        self.file.read_exact(dst)?;
        Ok(())
    }

    fn write_blocks(&mut self, start_lba: Lba, src: &[u8]) -> Result<(), Self::Error> {
        self.seek_to(start_lba, src.len())?;
        self.file.write_all(src)?;
        Ok(())
    }

    fn flush(&mut self) -> Result<(), Self::Error> {
        self.file.flush()?;
        self.file.sync_data()?;
        Ok(())
    }
}
