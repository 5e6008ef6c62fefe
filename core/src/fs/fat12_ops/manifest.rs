//! The ordered list of files to inject.
//!
//! Order is part of the contract: the n-th injected entry gets the n-th
//! directory slot and the clusters right after its predecessor's.

use super::filename::{NameError, ShortName};
use core::fmt;

extern crate alloc;
use alloc::string::{String, ToString};
use alloc::vec::Vec;

/// Size of the zero-filled persistence file the kernel expects
pub const TRUTH_PLACEHOLDER_SIZE: u32 = 300_000;

/// Files placed on the boot disk, in injection order
const BOOT_IMAGE: &[(&str, &str, Option<u32>)] = &[
    ("WALL.BMP", "assets/wallpaper.bmp", None),
    ("INIT.ELF", "apps/init.elf", None),
    ("HELLO.ELF", "apps/hello.elf", None),
    ("CALC.ELF", "apps/calc.elf", None),
    ("DF.ELF", "apps/df.elf", None),
    ("EXPLORER.ELF", "apps/explorer.elf", None),
    ("SH.ELF", "apps/sh.elf", None),
    ("TERM.ELF", "apps/terminal.elf", None),
    ("LS.ELF", "apps/ls.elf", None),
    ("CAT.ELF", "apps/cat.elf", None),
    ("MKDIR.ELF", "apps/mkdir.elf", None),
    ("TEXTVIEW.ELF", "apps/textview.elf", None),
    ("POSIX_T.ELF", "apps/posix_test.elf", None),
    ("POSIX_S.ELF", "apps/posix_suite.elf", None),
    ("UTILS.ELF", "apps/file_utils.elf", None),
    ("NOTEPAD.ELF", "apps/notepad.elf", None),
    ("TEST.ELF", "apps/test.elf", None),
    ("PING.ELF", "apps/ping.elf", None),
    ("TCPTEST.ELF", "apps/tcptest.elf", None),
    ("TRUTH.DAT", "TRUTH.DAT", Some(TRUTH_PLACEHOLDER_SIZE)),
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManifestEntry {
    name: ShortName,
    source: String,
    placeholder_size: Option<u32>,
    /// Manifest line this entry came from, 0 until pushed
    line: usize,
}

impl ManifestEntry {
    pub fn new(name: &str, source: &str) -> Result<Self, NameError> {
        Ok(Self {
            name: ShortName::parse(name)?,
            source: source.to_string(),
            placeholder_size: None,
            line: 0,
        })
    }

    /// Create the source zero-filled with `size` bytes when it is missing.
    pub fn with_placeholder(mut self, size: u32) -> Self {
        self.placeholder_size = Some(size);
        self
    }

    pub fn name(&self) -> &ShortName {
        &self.name
    }

    /// Source path, relative to the working root
    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn placeholder_size(&self) -> Option<u32> {
        self.placeholder_size
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ManifestErrorKind {
    InvalidName(NameError),
    DuplicateName(ShortName),
    MissingSource,
    InvalidPlaceholder,
    /// Placeholder larger than the FAT can hold
    PlaceholderTooLarge { size: u32, limit: u64 },
    UnexpectedField,
}

/// A rejected manifest line (1-based).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManifestError {
    pub line: usize,
    pub kind: ManifestErrorKind,
}

impl fmt::Display for ManifestError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "manifest line {}: ", self.line)?;
        match &self.kind {
            ManifestErrorKind::InvalidName(e) => write!(f, "invalid name: {}", e),
            ManifestErrorKind::DuplicateName(name) => write!(f, "{} is listed twice", name),
            ManifestErrorKind::MissingSource => write!(f, "missing source path"),
            ManifestErrorKind::InvalidPlaceholder => {
                write!(f, "expected placeholder=<bytes>")
            }
            ManifestErrorKind::PlaceholderTooLarge { size, limit } => write!(
                f,
                "placeholder of {} bytes exceeds the {} bytes the FAT can hold",
                size, limit
            ),
            ManifestErrorKind::UnexpectedField => write!(f, "unexpected extra field"),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Manifest {
    entries: Vec<ManifestEntry>,
}

impl Manifest {
    pub fn new() -> Self {
        Self::default()
    }

    /// The built-in boot disk manifest.
    pub fn boot_image() -> Result<Self, ManifestError> {
        let mut manifest = Self::new();
        for (idx, &(name, source, placeholder)) in BOOT_IMAGE.iter().enumerate() {
            let line = idx + 1;
            let mut entry = ManifestEntry::new(name, source).map_err(|e| ManifestError {
                line,
                kind: ManifestErrorKind::InvalidName(e),
            })?;
            if let Some(size) = placeholder {
                entry = entry.with_placeholder(size);
            }
            manifest.push_at(line, entry)?;
        }
        Ok(manifest)
    }

    /// Parse the text form: `NAME.EXT source/path [placeholder=BYTES]` per
    /// line, `#` starts a comment.
    pub fn parse(text: &str) -> Result<Self, ManifestError> {
        let mut manifest = Self::new();
        for (idx, raw_line) in text.lines().enumerate() {
            let line = idx + 1;
            let err = |kind| ManifestError { line, kind };

            let content = raw_line.split('#').next().unwrap_or("");
            let mut fields = content.split_whitespace();
            let Some(name) = fields.next() else {
                continue;
            };
            let source = fields
                .next()
                .ok_or_else(|| err(ManifestErrorKind::MissingSource))?;

            let mut entry = ManifestEntry::new(name, source)
                .map_err(|e| err(ManifestErrorKind::InvalidName(e)))?;

            if let Some(field) = fields.next() {
                let size = field
                    .strip_prefix("placeholder=")
                    .and_then(|n| n.parse::<u32>().ok())
                    .ok_or_else(|| err(ManifestErrorKind::InvalidPlaceholder))?;
                entry = entry.with_placeholder(size);
            }
            if fields.next().is_some() {
                return Err(err(ManifestErrorKind::UnexpectedField));
            }

            manifest.push_at(line, entry)?;
        }
        Ok(manifest)
    }

    /// Append an entry; names must be unique.
    pub fn push(&mut self, entry: ManifestEntry) -> Result<(), ManifestError> {
        let line = self.entries.len() + 1;
        self.push_at(line, entry)
    }

    fn push_at(&mut self, line: usize, mut entry: ManifestEntry) -> Result<(), ManifestError> {
        if self.entries.iter().any(|e| e.name == entry.name) {
            return Err(ManifestError {
                line,
                kind: ManifestErrorKind::DuplicateName(entry.name),
            });
        }
        entry.line = line;
        self.entries.push(entry);
        Ok(())
    }

    /// Reject placeholders that could never be injected under a FAT that
    /// holds at most `limit` bytes per file.
    pub fn check_placeholders(&self, limit: u64) -> Result<(), ManifestError> {
        for entry in &self.entries {
            match entry.placeholder_size {
                Some(size) if size as u64 > limit => {
                    return Err(ManifestError {
                        line: entry.line,
                        kind: ManifestErrorKind::PlaceholderTooLarge { size, limit },
                    });
                }
                _ => {}
            }
        }
        Ok(())
    }

    pub fn entries(&self) -> &[ManifestEntry] {
        &self.entries
    }

    pub fn iter(&self) -> core::slice::Iter<'_, ManifestEntry> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<'a> IntoIterator for &'a Manifest {
    type Item = &'a ManifestEntry;
    type IntoIter = core::slice::Iter<'a, ManifestEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn boot_image_keeps_order() {
        let manifest = Manifest::boot_image().unwrap();
        assert_eq!(manifest.len(), 20);
        assert_eq!(manifest.entries()[0].name().to_string(), "WALL.BMP");
        assert_eq!(manifest.entries()[1].source(), "apps/init.elf");

        let truth = &manifest.entries()[19];
        assert_eq!(truth.name().as_bytes(), b"TRUTH   DAT");
        assert_eq!(truth.placeholder_size(), Some(TRUTH_PLACEHOLDER_SIZE));
    }

    #[test]
    fn parses_text_manifest() {
        let text = "\
# boot disk
INIT.ELF   apps/init.elf

TRUTH.DAT  TRUTH.DAT  placeholder=4096   # persistence
";
        let manifest = Manifest::parse(text).unwrap();
        assert_eq!(manifest.len(), 2);
        assert_eq!(manifest.entries()[0].source(), "apps/init.elf");
        assert_eq!(manifest.entries()[0].placeholder_size(), None);
        assert_eq!(manifest.entries()[1].placeholder_size(), Some(4096));
    }

    #[test]
    fn reports_offending_line() {
        let err = Manifest::parse("INIT.ELF apps/init.elf\nVERYLONGNAME.ELF x\n").unwrap_err();
        assert_eq!(err.line, 2);
        assert_eq!(
            err.kind,
            ManifestErrorKind::InvalidName(NameError::BaseTooLong { len: 12 })
        );

        let err = Manifest::parse("INIT.ELF\n").unwrap_err();
        assert_eq!(err.kind, ManifestErrorKind::MissingSource);

        let err = Manifest::parse("A.B x size=3\n").unwrap_err();
        assert_eq!(err.kind, ManifestErrorKind::InvalidPlaceholder);

        let err = Manifest::parse("A.B x placeholder=4294967296\n").unwrap_err();
        assert_eq!(err.kind, ManifestErrorKind::InvalidPlaceholder);

        let err = Manifest::parse("A.B x placeholder=18446744073709551615\n").unwrap_err();
        assert_eq!(err.kind, ManifestErrorKind::InvalidPlaceholder);

        let err = Manifest::parse("A.B x placeholder=3 extra\n").unwrap_err();
        assert_eq!(err.kind, ManifestErrorKind::UnexpectedField);
    }

    #[test]
    fn rejects_duplicate_names() {
        let err = Manifest::parse("init.elf a\nINIT.ELF b\n").unwrap_err();
        assert_eq!(err.line, 2);
        assert!(matches!(err.kind, ManifestErrorKind::DuplicateName(_)));

        let mut manifest = Manifest::new();
        manifest.push(ManifestEntry::new("A.TXT", "a").unwrap()).unwrap();
        assert!(manifest.push(ManifestEntry::new("a.txt", "b").unwrap()).is_err());
    }

    #[test]
    fn oversized_placeholder_points_at_its_line() {
        let text = "# disk\nINIT.ELF apps/init.elf\n\nTRUTH.DAT TRUTH.DAT placeholder=4294967295\n";
        let manifest = Manifest::parse(text).unwrap();
        let err = manifest.check_placeholders(1 << 20).unwrap_err();
        assert_eq!(err.line, 4);
        assert_eq!(
            err.kind,
            ManifestErrorKind::PlaceholderTooLarge {
                size: u32::MAX,
                limit: 1 << 20
            }
        );

        assert!(Manifest::boot_image()
            .unwrap()
            .check_placeholders(TRUTH_PLACEHOLDER_SIZE as u64)
            .is_ok());
    }
}
