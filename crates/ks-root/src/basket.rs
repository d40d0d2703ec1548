//! TBasket records: one block of consecutive entries of one branch.

use crate::compression::decompress;
use crate::error::{Result, RootError};
use crate::key::Key;
use crate::rbuffer::RBuffer;
use crate::wbuffer::WBuffer;

/// TBasket class version written by this crate.
const BASKET_VERSION: u16 = 3;

/// Bytes the TBasket header adds after the standard key fields.
pub const BASKET_HEADER_EXTRA: usize = 2 + 4 * 4 + 1;

/// Header fields specific to TBasket (after the TKey part).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BasketHeader {
    /// `fBufferSize`.
    pub buffer_size: i32,
    /// `fNevBufSize`: bytes per entry for fixed-size data.
    pub nev_buf_size: i32,
    /// `fNevBuf`: number of entries in this basket.
    pub nev_buf: i32,
    /// `fLast`: key length plus used payload bytes.
    pub last: i32,
}

impl BasketHeader {
    /// Write the TBasket extension; must directly follow the key fields.
    pub fn write(&self, w: &mut WBuffer) {
        w.write_u16(BASKET_VERSION);
        w.write_i32(self.buffer_size);
        w.write_i32(self.nev_buf_size);
        w.write_i32(self.nev_buf);
        w.write_i32(self.last);
        w.write_u8(0); // no entry-offset/displacement arrays follow
    }

    fn read(r: &mut RBuffer) -> Result<Self> {
        let _version = r.read_u16()?;
        Ok(BasketHeader {
            buffer_size: r.read_i32()?,
            nev_buf_size: r.read_i32()?,
            nev_buf: r.read_i32()?,
            last: r.read_i32()?,
        })
    }
}

/// Read and decompress a single basket from the file.
///
/// Returns the basket header and the payload (big-endian encoded values,
/// entry offsets still attached when the branch has them).
pub fn read_basket(file_data: &[u8], seek: u64, is_large: bool) -> Result<(BasketHeader, Vec<u8>)> {
    let pos = seek as usize;
    if pos >= file_data.len() {
        return Err(RootError::BufferUnderflow { offset: pos, need: 1, have: 0 });
    }

    let mut r = RBuffer::new(file_data);
    r.set_pos(pos);
    let key = Key::read(&mut r, is_large)?;
    let header = BasketHeader::read(&mut r)?;

    let key_end = pos + key.n_bytes as usize;
    if key_end > file_data.len() {
        return Err(RootError::BufferUnderflow {
            offset: pos,
            need: key.n_bytes as usize,
            have: file_data.len() - pos,
        });
    }

    let stored = &file_data[pos + key.key_len as usize..key_end];
    let payload =
        if key.is_uncompressed() { stored.to_vec() } else { decompress(stored, key.obj_len as usize)? };
    log::debug!(
        "basket '{}' at {seek}: {} entries, {} -> {} bytes",
        key.name,
        header.nev_buf,
        stored.len(),
        payload.len()
    );
    Ok((header, payload))
}

/// Drop the trailing entry-offset table of a basket payload.
///
/// With `entry_offset_len > 0` the payload ends with the offset array
/// (one i32 count plus `n_entries` i32 offsets) that describes
/// variable-size entries.
pub fn strip_entry_offsets(payload: &[u8], n_entries: usize, entry_offset_len: i32) -> &[u8] {
    if entry_offset_len <= 0 || n_entries == 0 {
        return payload;
    }
    let table = (n_entries + 1) * 4;
    if payload.len() > table { &payload[..payload.len() - table] } else { payload }
}
