// FAT12 on-disk record types

use super::filename::ShortName;

pub const DIR_ENTRY_SIZE: usize = 32;

pub const ATTR_ARCHIVE: u8 = 0x20;

/// Leading name byte of a record that has never been used
pub const ENTRY_NEVER_USED: u8 = 0x00;

const NAME_RANGE: core::ops::Range<usize> = 0..11;
const ATTR_OFFSET: usize = 11;
const FIRST_CLUSTER_RANGE: core::ops::Range<usize> = 26..28;
const FILE_SIZE_RANGE: core::ops::Range<usize> = 28..32;

/// Root directory record.
///
/// Layout (little endian): name+ext `[0..11]`, attribute `[11]`, reserved and
/// timestamp fields `[12..26]` (always zero here), first cluster `[26..28]`,
/// size in bytes `[28..32]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DirEntry {
    pub name: ShortName,
    pub attr: u8,
    pub first_cluster: u16,
    pub file_size: u32,
}

impl DirEntry {
    /// Plain file record with the archive bit set.
    pub fn file(name: ShortName, first_cluster: u16, file_size: u32) -> Self {
        Self {
            name,
            attr: ATTR_ARCHIVE,
            first_cluster,
            file_size,
        }
    }

    pub fn encode(&self) -> [u8; DIR_ENTRY_SIZE] {
        let mut raw = [0u8; DIR_ENTRY_SIZE];
        raw[NAME_RANGE].copy_from_slice(self.name.as_bytes());
        raw[ATTR_OFFSET] = self.attr;
        raw[FIRST_CLUSTER_RANGE].copy_from_slice(&self.first_cluster.to_le_bytes());
        raw[FILE_SIZE_RANGE].copy_from_slice(&self.file_size.to_le_bytes());
        raw
    }

    pub fn decode(raw: &[u8; DIR_ENTRY_SIZE]) -> Self {
        let mut name = [0u8; 11];
        name.copy_from_slice(&raw[NAME_RANGE]);
        Self {
            name: ShortName::from_raw(name),
            attr: raw[ATTR_OFFSET],
            first_cluster: u16::from_le_bytes([raw[26], raw[27]]),
            file_size: u32::from_le_bytes([raw[28], raw[29], raw[30], raw[31]]),
        }
    }
}

/// True when a raw record has never been used.
pub fn is_never_used(raw: &[u8]) -> bool {
    raw.first() == Some(&ENTRY_NEVER_USED)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encodes_fixed_layout() {
        let entry = DirEntry::file(ShortName::parse("INIT.ELF").unwrap(), 0x1234, 0x0001_E240);
        let raw = entry.encode();

        assert_eq!(&raw[0..11], b"INIT    ELF");
        assert_eq!(raw[11], ATTR_ARCHIVE);
        assert!(raw[12..26].iter().all(|&b| b == 0));
        assert_eq!(&raw[26..28], &[0x34, 0x12]);
        assert_eq!(&raw[28..32], &[0x40, 0xE2, 0x01, 0x00]);
    }

    #[test]
    fn decode_reads_what_encode_wrote() {
        let entry = DirEntry::file(ShortName::parse("TRUTH.DAT").unwrap(), 7, 300_000);
        assert_eq!(DirEntry::decode(&entry.encode()), entry);
    }

    #[test]
    fn never_used_marker() {
        assert!(is_never_used(&[0u8; 32]));
        let used = DirEntry::file(ShortName::parse("A").unwrap(), 2, 1).encode();
        assert!(!is_never_used(&used));
    }
}
