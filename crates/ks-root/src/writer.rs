//! `RootWriter`: create a ROOT file holding TH1F histograms and flat TTrees.
//!
//! The file is assembled in memory and written out by [`RootWriter::close`].
//! Layout, in order:
//!
//! ```text
//!      0  file header (padded to fBEGIN = 100)
//!    100  TFile key + TNamed + TDirectory record
//!         object keys (baskets, trees, histograms) in write order
//!         StreamerInfo key (empty TList)
//!         key list of the top directory
//!         free-segments key (TFile key + one TFree)
//! ```
//!
//! Only the small-file layout (32-bit seeks) is produced.

use std::collections::HashMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::basket::{BASKET_HEADER_EXTRA, BasketHeader};
use crate::compression::{Compression, maybe_compress};
use crate::directory::Directory;
use crate::error::{Result, RootError};
use crate::file::ROOT_MAGIC;
use crate::hist1f::Hist1F;
use crate::key::{Key, header_len, tstring_len};
use crate::objects::{self, BASKET_SIZE, BranchLayout, TreeLayout};
use crate::table::{TabularWriter, TreeWriter};
use crate::wbuffer::WBuffer;

/// ROOT version recorded in the header (6.28/00).
const FILE_VERSION: u32 = 62800;
/// Offset of the top directory record.
const BEGIN: usize = 100;
/// Bytes of the small-file TDirectory record, padding included.
const DIRECTORY_RECORD_LEN: usize = 60;
/// Small files address at most this many bytes.
const MAX_SMALL_FILE: usize = 2_000_000_000;
/// Bytes of one small-file `TFree` record: version, first, last.
const FREE_RECORD_LEN: usize = 10;
/// Datime stamped on every key: 2024-01-01 00:00:00 in ROOT's packed form.
/// Fixed so that rewriting the same content gives the same bytes.
const FIXED_DATIME: u32 = ((2024 - 1995) << 26) | (1 << 22) | (1 << 17);

/// Writer for a freshly created ROOT file.
pub struct RootWriter {
    file: fs::File,
    path: PathBuf,
    file_name: String,
    compression: Compression,
    data: Vec<u8>,
    keys: Vec<Key>,
    cycles: HashMap<String, u16>,
}

impl RootWriter {
    /// Create (or truncate) the file at `path`.
    pub fn recreate(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = fs::File::create(&path)?;
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        let data = vec![0u8; BEGIN + top_record_len(&file_name)];
        log::debug!("created {}", path.display());

        Ok(Self {
            file,
            path,
            file_name,
            compression: Compression::default(),
            data,
            keys: Vec::new(),
            cycles: HashMap::new(),
        })
    }

    /// Use `compression` for every object written from now on.
    pub fn with_compression(mut self, compression: Compression) -> Self {
        self.compression = compression;
        self
    }

    /// Path of the file being written.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Write a histogram as a `TH1F` key in the top directory.
    pub fn write_hist1f(&mut self, hist: &Hist1F) -> Result<()> {
        let key_len = header_len("TH1F", hist.name(), hist.title());
        let mut w = WBuffer::with_origin(key_len);
        objects::write_th1f(&mut w, hist);
        self.write_keyed("TH1F", hist.name(), hist.title(), &w.into_inner())
    }

    /// Write a tree: its baskets first, then the `TTree` key in the top
    /// directory.
    pub fn write_tree(&mut self, tree: &TreeWriter) -> Result<()> {
        let entries = tree.entry_count();
        let mut branches = Vec::with_capacity(tree.branches().len());

        for (i, schema) in tree.branches().iter().enumerate() {
            let size = schema.leaf_type.byte_size();
            let per_basket = (BASKET_SIZE as usize / size).max(1);
            let column = tree.column(i);

            let mut layout = BranchLayout {
                name: schema.name.clone(),
                leaf_type: schema.leaf_type,
                basket_bytes: Vec::new(),
                basket_entry: Vec::new(),
                basket_seek: Vec::new(),
                tot_bytes: 0,
                zip_bytes: 0,
            };
            for (b, chunk) in column.chunks(per_basket * size).enumerate() {
                let (key, seek) = self.write_basket(&schema.name, tree.name(), size, chunk)?;
                layout.basket_bytes.push(key.n_bytes);
                layout.basket_entry.push((b * per_basket) as u64);
                layout.basket_seek.push(seek);
                layout.tot_bytes += key.key_len as i64 + key.obj_len as i64;
                layout.zip_bytes += key.n_bytes as i64;
            }
            layout.basket_entry.push(entries);
            log::debug!(
                "branch '{}': {entries} entries in {} baskets",
                schema.name,
                layout.basket_seek.len()
            );
            branches.push(layout);
        }

        let layout = TreeLayout {
            name: tree.name().to_string(),
            title: tree.title().to_string(),
            entries,
            compress: self.compression.root_setting(),
            branches,
        };
        let key_len = header_len("TTree", tree.name(), tree.title());
        let mut w = WBuffer::with_origin(key_len);
        objects::write_ttree(&mut w, &layout);
        self.write_keyed("TTree", tree.name(), tree.title(), &w.into_inner())
    }

    /// Finish the file: StreamerInfo, key list, free list, header.
    pub fn close(mut self) -> Result<()> {
        let (info_seek, info_len) = {
            let key_len = header_len("TList", "StreamerInfo", "Doubly linked list");
            let mut w = WBuffer::with_origin(key_len);
            objects::write_empty_tlist(&mut w, "");
            let key =
                self.append_key("TList", "StreamerInfo", "Doubly linked list", 1, &w.into_inner())?;
            (key.seek_key, key.n_bytes)
        };

        // key list: never compressed
        let mut list_key = Key::new("TFile", &self.file_name, "", FIXED_DATIME);
        let mut body = WBuffer::new();
        Directory::from_keys(std::mem::take(&mut self.keys)).write_keys(&mut body);
        let body = body.into_inner();
        list_key.obj_len = body.len() as u32;
        list_key.n_bytes = list_key.key_len as u32 + body.len() as u32;
        list_key.seek_key = self.data.len() as u64;
        list_key.seek_pdir = BEGIN as u64;
        self.push_record(&list_key, &body)?;

        // free list: a TFile key over one TFree segment covering everything past the end
        let mut free_key = Key::new("TFile", &self.file_name, "", FIXED_DATIME);
        free_key.obj_len = FREE_RECORD_LEN as u32;
        free_key.n_bytes = free_key.key_len as u32 + FREE_RECORD_LEN as u32;
        free_key.seek_key = self.data.len() as u64;
        free_key.seek_pdir = BEGIN as u64;
        let end = self.data.len() + free_key.n_bytes as usize;
        let mut w = WBuffer::new();
        w.write_u16(1); // TFree version
        w.write_u32(end as u32);
        w.write_u32(MAX_SMALL_FILE as u32);
        self.push_record(&free_key, &w.into_inner())?;

        let top = self.top_record(list_key.seek_key, list_key.n_bytes);
        self.data[BEGIN..BEGIN + top.len()].copy_from_slice(&top);

        let header = self.file_header(
            end,
            free_key.seek_key as usize,
            free_key.n_bytes as usize,
            info_seek,
            info_len,
        );
        self.data[..header.len()].copy_from_slice(&header);

        self.file.write_all(&self.data)?;
        self.file.flush()?;
        log::debug!("wrote {} ({} bytes)", self.path.display(), self.data.len());
        Ok(())
    }

    fn write_keyed(&mut self, class: &str, name: &str, title: &str, payload: &[u8]) -> Result<()> {
        let cycle = self.next_cycle(name);
        let key = self.append_key(class, name, title, cycle, payload)?;
        self.keys.push(key);
        Ok(())
    }

    /// Append a key record (header plus possibly compressed payload).
    fn append_key(
        &mut self,
        class: &str,
        name: &str,
        title: &str,
        cycle: u16,
        payload: &[u8],
    ) -> Result<Key> {
        let mut key = Key::new(class, name, title, FIXED_DATIME);
        key.cycle = cycle;
        let packed = maybe_compress(payload, self.compression)?;
        let stored = packed.as_deref().unwrap_or(payload);
        key.obj_len = payload.len() as u32;
        key.n_bytes = key.key_len as u32 + stored.len() as u32;
        key.seek_key = self.data.len() as u64;
        key.seek_pdir = BEGIN as u64;
        self.push_record(&key, stored)?;
        Ok(key)
    }

    fn write_basket(
        &mut self,
        branch: &str,
        tree: &str,
        entry_size: usize,
        values: &[u8],
    ) -> Result<(Key, u64)> {
        let mut key = Key::new("TBasket", branch, tree, FIXED_DATIME);
        key.key_len += BASKET_HEADER_EXTRA as u16;
        let packed = maybe_compress(values, self.compression)?;
        let stored = packed.as_deref().unwrap_or(values);
        key.obj_len = values.len() as u32;
        key.n_bytes = key.key_len as u32 + stored.len() as u32;
        key.seek_key = self.data.len() as u64;
        key.seek_pdir = BEGIN as u64;

        let header = BasketHeader {
            buffer_size: BASKET_SIZE,
            nev_buf_size: entry_size as i32,
            nev_buf: (values.len() / entry_size) as i32,
            last: key.key_len as i32 + values.len() as i32,
        };
        let mut w = WBuffer::new();
        key.write(&mut w);
        header.write(&mut w);
        w.write_bytes(stored);
        self.data.extend_from_slice(w.as_slice());
        self.check_size()?;
        let seek = key.seek_key;
        Ok((key, seek))
    }

    fn push_record(&mut self, key: &Key, stored: &[u8]) -> Result<()> {
        let mut w = WBuffer::new();
        key.write(&mut w);
        w.write_bytes(stored);
        self.data.extend_from_slice(w.as_slice());
        self.check_size()
    }

    fn next_cycle(&mut self, name: &str) -> u16 {
        let c = self.cycles.entry(name.to_string()).or_insert(0);
        *c += 1;
        *c
    }

    fn check_size(&self) -> Result<()> {
        if self.data.len() > MAX_SMALL_FILE {
            return Err(RootError::Write(format!(
                "{} exceeds {MAX_SMALL_FILE} bytes",
                self.path.display()
            )));
        }
        Ok(())
    }

    /// TFile key, its TNamed strings and the TDirectory record at `fBEGIN`.
    fn top_record(&self, seek_keys: u64, nbytes_keys: u32) -> Vec<u8> {
        let mut key = Key::new("TFile", &self.file_name, "", FIXED_DATIME);
        let names = tstring_len(&self.file_name) + tstring_len("");
        key.obj_len = (names + DIRECTORY_RECORD_LEN) as u32;
        key.n_bytes = key.key_len as u32 + key.obj_len;
        key.seek_key = BEGIN as u64;

        let mut w = WBuffer::new();
        key.write(&mut w);
        w.write_string(&self.file_name);
        w.write_string("");
        let nbytes_name = w.len() as u32;

        w.write_u16(5); // TDirectory version, small seeks
        w.write_u32(FIXED_DATIME); // fDatimeC
        w.write_u32(FIXED_DATIME); // fDatimeM
        w.write_u32(nbytes_keys);
        w.write_u32(nbytes_name);
        w.write_u32(BEGIN as u32); // fSeekDir
        w.write_u32(0); // fSeekParent
        w.write_u32(seek_keys as u32);
        w.write_u16(1); // UUID version
        w.write_bytes(&[0u8; 16]);
        w.write_bytes(&[0u8; 12]);
        w.into_inner()
    }

    fn file_header(
        &self,
        end: usize,
        seek_free: usize,
        nbytes_free: usize,
        seek_info: u64,
        nbytes_info: u32,
    ) -> Vec<u8> {
        let nbytes_name = header_len("TFile", &self.file_name, "")
            + tstring_len(&self.file_name)
            + tstring_len("");

        let mut w = WBuffer::new();
        w.write_bytes(ROOT_MAGIC);
        w.write_u32(FILE_VERSION);
        w.write_u32(BEGIN as u32);
        w.write_u32(end as u32);
        w.write_u32(seek_free as u32);
        w.write_u32(nbytes_free as u32);
        w.write_u32(1); // nfree
        w.write_u32(nbytes_name as u32);
        w.write_u8(4); // fUnits
        w.write_i32(self.compression.root_setting());
        w.write_u32(seek_info as u32);
        w.write_u32(nbytes_info);
        w.write_u16(1); // UUID version
        w.write_bytes(&[0u8; 16]);
        w.into_inner()
    }
}

/// Bytes reserved at `fBEGIN` for the top directory record.
fn top_record_len(file_name: &str) -> usize {
    header_len("TFile", file_name, "")
        + tstring_len(file_name)
        + tstring_len("")
        + DIRECTORY_RECORD_LEN
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::file::RootFile;
    use crate::rbuffer::RBuffer;
    use crate::tree::LeafType;

    #[test]
    fn empty_file_has_no_keys() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty.root");
        RootWriter::recreate(&path).unwrap().close().unwrap();

        let f = RootFile::open(&path).unwrap();
        assert!(f.list_keys().unwrap().is_empty());
        assert!(matches!(f.first_key(), Err(RootError::EmptyFile(_))));
    }

    #[test]
    fn header_points_at_top_directory() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("hdr.root");
        let mut w = RootWriter::recreate(&path).unwrap().with_compression(Compression::None);
        w.write_hist1f(&Hist1F::new("h", "t", 4, 0.0, 1.0)).unwrap();
        w.close().unwrap();

        let bytes = fs::read(&path).unwrap();
        assert_eq!(&bytes[..4], b"root");
        assert_eq!(u32::from_be_bytes(bytes[4..8].try_into().unwrap()), FILE_VERSION);
        assert_eq!(u32::from_be_bytes(bytes[8..12].try_into().unwrap()), BEGIN as u32);
        assert_eq!(u32::from_be_bytes(bytes[12..16].try_into().unwrap()) as usize, bytes.len());
        assert_eq!(i32::from_be_bytes(bytes[33..37].try_into().unwrap()), 0);
    }

    #[test]
    fn repeated_names_get_new_cycles() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cycles.root");
        let mut w = RootWriter::recreate(&path).unwrap();
        w.write_hist1f(&Hist1F::new("h", "first", 2, 0.0, 1.0)).unwrap();
        w.write_hist1f(&Hist1F::new("h", "second", 2, 0.0, 1.0)).unwrap();
        let mut t = TreeWriter::new("t", "");
        t.add_branch("x", LeafType::F32).unwrap();
        w.write_tree(&t).unwrap();
        w.close().unwrap();

        let f = RootFile::open(&path).unwrap();
        let keys = f.list_keys().unwrap();
        let cycles: Vec<(&str, u16)> = keys.iter().map(|k| (k.name.as_str(), k.cycle)).collect();
        assert_eq!(cycles, vec![("h", 1), ("h", 2), ("t", 1)]);
        assert_eq!(f.get_histogram("h").unwrap().title, "second");
        assert_eq!(f.get_tree("t").unwrap().entries, 0);
    }

    #[test]
    fn free_list_is_a_keyed_record() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("free.root");
        let mut t = TreeWriter::new("t", "");
        t.add_branch("x", LeafType::F32).unwrap();
        t.append_values(&[1.5]).unwrap();
        let mut w = RootWriter::recreate(&path).unwrap();
        w.write_tree(&t).unwrap();
        w.close().unwrap();

        let bytes = fs::read(&path).unwrap();
        let be32 = |at: usize| u32::from_be_bytes(bytes[at..at + 4].try_into().unwrap()) as usize;
        let (end, seek_free, nbytes_free) = (be32(12), be32(16), be32(20));
        assert_eq!(end, bytes.len());
        assert_eq!(seek_free + nbytes_free, end);

        let mut r = RBuffer::new(&bytes);
        r.set_pos(seek_free);
        let key = Key::read(&mut r, false).unwrap();
        assert_eq!(key.class_name, "TFile");
        assert_eq!(key.name, "free.root");
        assert_eq!(key.seek_key as usize, seek_free);
        assert_eq!(key.n_bytes as usize, nbytes_free);
        assert_eq!(key.obj_len as usize, FREE_RECORD_LEN);

        let body = seek_free + key.key_len as usize;
        assert_eq!(u16::from_be_bytes(bytes[body..body + 2].try_into().unwrap()), 1);
        assert_eq!(be32(body + 2), end);
        assert_eq!(be32(body + 6), MAX_SMALL_FILE);
    }
}
