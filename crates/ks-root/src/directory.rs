//! TDirectory parsing and key-list navigation.

use crate::error::Result;
use crate::key::Key;
use crate::rbuffer::RBuffer;
use crate::wbuffer::WBuffer;

/// A parsed TDirectory: an ordered list of TKeys.
///
/// Order is the order of the on-disk key list, which is the order objects
/// were first written (a newer cycle of a name sits before the older one).
#[derive(Debug, Clone, Default)]
pub struct Directory {
    keys: Vec<Key>,
}

impl Directory {
    /// Directory over an explicit list of keys.
    pub fn from_keys(keys: Vec<Key>) -> Self {
        Self { keys }
    }

    /// Read the key list from the file at `seek_keys`.
    ///
    /// The key list starts with a TKey header for the list itself, then
    /// a u32 `nkeys`, followed by `nkeys` TKey records.
    pub fn read_key_list(file_data: &[u8], seek_keys: usize, is_large: bool) -> Result<Self> {
        let mut r = RBuffer::new(file_data);
        r.set_pos(seek_keys);

        let _list_key = Key::read(&mut r, is_large)?;
        let nkeys = r.read_u32()? as usize;

        let mut keys = Vec::with_capacity(nkeys.min(r.remaining() / 26 + 1));
        for _ in 0..nkeys {
            keys.push(Key::read(&mut r, is_large)?);
        }
        log::debug!("directory at {seek_keys}: {} keys", keys.len());

        Ok(Directory { keys })
    }

    /// Read a subdirectory from the payload of a TDirectoryFile key.
    ///
    /// The payload starts with a TDirectory streamer that carries the seek
    /// of the subdirectory's key list.
    pub fn read_from_payload(payload: &[u8], is_large: bool, file_data: &[u8]) -> Result<Self> {
        let mut r = RBuffer::new(payload);

        let dir_version = r.read_u16()?;
        let _datime_c = r.read_u32()?;
        let _datime_m = r.read_u32()?;
        let _nbytes_keys = r.read_u32()?;
        let _nbytes_name = r.read_u32()?;

        let seek_keys = if dir_version > 1000 {
            r.skip(16)?;
            r.read_u64()?
        } else {
            r.skip(8)?;
            r.read_u32()? as u64
        };

        if seek_keys == 0 {
            return Ok(Directory::default());
        }

        Self::read_key_list(file_data, seek_keys as usize, is_large)
    }

    /// Access the list of keys.
    pub fn keys(&self) -> &[Key] {
        &self.keys
    }

    /// The first stored key.
    pub fn first(&self) -> Option<&Key> {
        self.keys.first()
    }

    /// Find a key by name (returns the highest cycle).
    pub fn find_key(&self, name: &str) -> Option<&Key> {
        self.keys.iter().filter(|k| k.name == name).max_by_key(|k| k.cycle)
    }

    /// Serialize the key-list body: `nkeys` then every key header.
    pub fn write_keys(&self, w: &mut WBuffer) {
        w.write_u32(self.keys.len() as u32);
        for key in &self.keys {
            key.write(w);
        }
    }
}
