//! Payloads read from the host filesystem.

use fatinject_core::{ManifestEntry, PayloadSource};
use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

#[derive(Debug)]
pub enum SourceError {
    Read { path: PathBuf, source: io::Error },
    Placeholder { path: PathBuf, source: io::Error },
}

impl fmt::Display for SourceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Read { path, source } => write!(f, "{}: {}", path.display(), source),
            Self::Placeholder { path, source } => {
                write!(f, "cannot create placeholder {}: {}", path.display(), source)
            }
        }
    }
}

impl std::error::Error for SourceError {}

/// Resolves manifest source paths against a root directory.
pub struct DirectorySource {
    root: PathBuf,
}

impl DirectorySource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn create_placeholder(path: &Path, size: u32) -> Result<Vec<u8>, SourceError> {
        let data = vec![0u8; size as usize];
        fs::write(path, &data).map_err(|source| SourceError::Placeholder {
            path: path.to_path_buf(),
            source,
        })?;
        log::info!("created {} ({} zero bytes)", path.display(), size);
        Ok(data)
    }
}

impl PayloadSource for DirectorySource {
    type Error = SourceError;

    fn load(&mut self, entry: &ManifestEntry) -> Result<Vec<u8>, Self::Error> {
        let path = self.root.join(entry.source());
        match fs::read(&path) {
            Ok(data) => Ok(data),
            Err(e) if e.kind() == io::ErrorKind::NotFound => match entry.placeholder_size() {
                Some(size) => Self::create_placeholder(&path, size),
                None => Err(SourceError::Read { path, source: e }),
            },
            Err(source) => Err(SourceError::Read { path, source }),
        }
    }
}
