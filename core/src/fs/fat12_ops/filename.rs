//! 8.3 short names.
//!
//! `"INIT.ELF"` becomes the 11-byte field `"INIT    ELF"`: base name left
//! justified in 8 bytes, extension in 3, both space padded, no dot stored.
//! Over-long parts are rejected rather than truncated, since a truncated name
//! would silently collide or never be found by the kernel.

use core::fmt;

pub const BASE_LEN: usize = 8;
pub const EXT_LEN: usize = 3;

/// Characters that may not appear in a short name
const FORBIDDEN: &[u8] = b"\"*+,/:;<=>?[\\]| ";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NameError {
    Empty,
    BaseTooLong { len: usize },
    ExtensionTooLong { len: usize },
    TooManyDots,
    InvalidCharacter(char),
}

impl fmt::Display for NameError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => write!(f, "empty base name"),
            Self::BaseTooLong { len } => {
                write!(f, "base name has {} characters, at most {} allowed", len, BASE_LEN)
            }
            Self::ExtensionTooLong { len } => {
                write!(f, "extension has {} characters, at most {} allowed", len, EXT_LEN)
            }
            Self::TooManyDots => write!(f, "more than one '.'"),
            Self::InvalidCharacter(c) => write!(f, "character {:?} not allowed in 8.3 name", c),
        }
    }
}

/// A validated, upper-cased 8.3 name in its on-disk form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ShortName([u8; BASE_LEN + EXT_LEN]);

fn check_part(part: &str) -> Result<(), NameError> {
    for c in part.chars() {
        if !c.is_ascii() || c.is_ascii_control() || FORBIDDEN.contains(&(c as u8)) {
            return Err(NameError::InvalidCharacter(c));
        }
    }
    Ok(())
}

impl ShortName {
    /// Parse `"NAME.EXT"` or `"NAME"`.
    pub fn parse(name: &str) -> Result<Self, NameError> {
        let (base, ext) = match name.split_once('.') {
            Some((_, rest)) if rest.contains('.') => return Err(NameError::TooManyDots),
            Some((base, ext)) => (base, ext),
            None => (name, ""),
        };

        if base.is_empty() {
            return Err(NameError::Empty);
        }
        check_part(base)?;
        check_part(ext)?;
        if base.len() > BASE_LEN {
            return Err(NameError::BaseTooLong { len: base.len() });
        }
        if ext.len() > EXT_LEN {
            return Err(NameError::ExtensionTooLong { len: ext.len() });
        }

        let mut raw = [b' '; BASE_LEN + EXT_LEN];
        for (dst, src) in raw[..BASE_LEN].iter_mut().zip(base.bytes()) {
            *dst = src.to_ascii_uppercase();
        }
        for (dst, src) in raw[BASE_LEN..].iter_mut().zip(ext.bytes()) {
            *dst = src.to_ascii_uppercase();
        }
        Ok(Self(raw))
    }

    /// Wrap an on-disk name field as read back from a record.
    pub const fn from_raw(raw: [u8; BASE_LEN + EXT_LEN]) -> Self {
        Self(raw)
    }

    pub const fn as_bytes(&self) -> &[u8; BASE_LEN + EXT_LEN] {
        &self.0
    }

    fn base(&self) -> &[u8] {
        trim_padding(&self.0[..BASE_LEN])
    }

    fn extension(&self) -> &[u8] {
        trim_padding(&self.0[BASE_LEN..])
    }
}

fn trim_padding(field: &[u8]) -> &[u8] {
    let end = field.iter().rposition(|&b| b != b' ').map_or(0, |i| i + 1);
    &field[..end]
}

impl fmt::Display for ShortName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for &b in self.base() {
            write!(f, "{}", b as char)?;
        }
        let ext = self.extension();
        if !ext.is_empty() {
            write!(f, ".")?;
            for &b in ext {
                write!(f, "{}", b as char)?;
            }
        }
        Ok(())
    }
}
