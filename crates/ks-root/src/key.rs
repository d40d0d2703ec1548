//! TKey records: the header ROOT puts in front of every stored object.

use crate::error::Result;
use crate::rbuffer::RBuffer;
use crate::wbuffer::WBuffer;

/// Key class version written for small (< 2 GB) files.
pub const KEY_VERSION: u16 = 4;

/// Fixed part of a small-file key header, before the three strings.
const KEY_FIXED_LEN: usize = 4 + 2 + 4 + 4 + 2 + 2 + 4 + 4;

/// A parsed TKey record.
#[derive(Debug, Clone)]
pub struct Key {
    /// Total number of bytes in compressed object + key header.
    pub n_bytes: u32,
    /// Version of key class.
    pub version: u16,
    /// Uncompressed object length.
    pub obj_len: u32,
    /// Key creation time (ROOT datime).
    pub datime: u32,
    /// Length of the key header itself.
    pub key_len: u16,
    /// Cycle number (ROOT versioning within a directory).
    pub cycle: u16,
    /// Absolute position of this key in the file.
    pub seek_key: u64,
    /// Parent directory seek position.
    pub seek_pdir: u64,
    /// Class name of the stored object.
    pub class_name: String,
    /// Object name.
    pub name: String,
    /// Object title.
    pub title: String,
}

/// Public info about a key (for `list_keys()`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyInfo {
    /// Object name.
    pub name: String,
    /// Object class name (e.g. "TTree", "TH1F").
    pub class_name: String,
    /// Object title.
    pub title: String,
    /// Cycle number.
    pub cycle: u16,
}

impl KeyInfo {
    /// Create from an internal Key.
    pub fn from_key(key: &Key) -> Self {
        Self {
            name: key.name.clone(),
            class_name: key.class_name.clone(),
            title: key.title.clone(),
            cycle: key.cycle,
        }
    }
}

impl Key {
    /// Read a TKey from the buffer at the current position.
    pub fn read(r: &mut RBuffer, is_large: bool) -> Result<Self> {
        let n_bytes = r.read_u32()?;
        let version = r.read_u16()?;
        let obj_len = r.read_u32()?;
        let datime = r.read_u32()?;
        let key_len = r.read_u16()?;
        let cycle = r.read_u16()?;

        let (seek_key, seek_pdir) = if version > 1000 || is_large {
            (r.read_u64()?, r.read_u64()?)
        } else {
            (r.read_u32()? as u64, r.read_u32()? as u64)
        };

        let class_name = r.read_string()?;
        let name = r.read_string()?;
        let title = r.read_string()?;

        Ok(Key {
            n_bytes,
            version,
            obj_len,
            datime,
            key_len,
            cycle,
            seek_key,
            seek_pdir,
            class_name,
            name,
            title,
        })
    }

    /// Build a small-file key header; sizes and seek are filled in later.
    pub fn new(class_name: &str, name: &str, title: &str, datime: u32) -> Self {
        let key_len = header_len(class_name, name, title) as u16;
        Key {
            n_bytes: 0,
            version: KEY_VERSION,
            obj_len: 0,
            datime,
            key_len,
            cycle: 1,
            seek_key: 0,
            seek_pdir: 0,
            class_name: class_name.to_string(),
            name: name.to_string(),
            title: title.to_string(),
        }
    }

    /// Whether the payload is stored without compression.
    pub fn is_uncompressed(&self) -> bool {
        self.n_bytes.saturating_sub(self.key_len as u32) == self.obj_len
    }

    /// Serialize this key header (small-file layout, 32-bit seeks).
    pub fn write(&self, w: &mut WBuffer) {
        w.write_u32(self.n_bytes);
        w.write_u16(self.version);
        w.write_u32(self.obj_len);
        w.write_u32(self.datime);
        w.write_u16(self.key_len);
        w.write_u16(self.cycle);
        w.write_u32(self.seek_key as u32);
        w.write_u32(self.seek_pdir as u32);
        w.write_string(&self.class_name);
        w.write_string(&self.name);
        w.write_string(&self.title);
    }
}

/// Encoded size of a `TString`.
pub(crate) fn tstring_len(s: &str) -> usize {
    if s.len() < 255 { 1 + s.len() } else { 5 + s.len() }
}

/// Length of a small-file key header with the given strings.
pub fn header_len(class_name: &str, name: &str, title: &str) -> usize {
    KEY_FIXED_LEN + tstring_len(class_name) + tstring_len(name) + tstring_len(title)
}
