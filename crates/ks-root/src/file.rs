//! `RootFile`: the read side of a ROOT file.

use std::fs;
use std::ops::Deref;
use std::path::{Path, PathBuf};

use crate::branch_reader::BranchReader;
use crate::compression::decompress;
use crate::directory::Directory;
use crate::error::{Result, RootError};
use crate::histogram::Histogram;
use crate::key::{Key, KeyInfo};
use crate::objects;
use crate::rbuffer::RBuffer;
use crate::tree::Tree;

/// Magic bytes at the start of every ROOT file.
pub(crate) const ROOT_MAGIC: &[u8; 4] = b"root";

/// Smallest file that can hold a complete header.
const MIN_FILE_LEN: usize = 64;

/// Backing bytes: memory-mapped from disk, or owned (`from_bytes`).
enum FileBytes {
    Owned(Vec<u8>),
    Mmap(memmap2::Mmap),
}

impl Deref for FileBytes {
    type Target = [u8];

    #[inline]
    fn deref(&self) -> &[u8] {
        match self {
            FileBytes::Owned(v) => v,
            FileBytes::Mmap(m) => m,
        }
    }
}

/// Parsed ROOT file header (the fields needed for navigation).
#[derive(Debug, Clone, Copy)]
struct FileHeader {
    /// ROOT version that wrote the file.
    version: u32,
    /// Whether the file uses large (64-bit) seek pointers (version >= 1000000).
    is_large: bool,
    /// Compression setting recorded in the header.
    compress: u32,
    /// Offset where top-level directory keys are stored.
    seek_keys: u64,
}

/// A ROOT file opened for reading histograms and trees.
pub struct RootFile {
    data: FileBytes,
    header: FileHeader,
    path: PathBuf,
}

impl RootFile {
    /// Open and parse a ROOT file from disk using memory mapping.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = fs::File::open(&path)?;
        // SAFETY: the mapping is read-only and the tools never write to an
        // input file while it is open.
        let mmap = unsafe { memmap2::Mmap::map(&file)? };
        Self::from_source(FileBytes::Mmap(mmap), path)
    }

    /// Parse a ROOT file from a byte vector; `path` is used in diagnostics.
    pub fn from_bytes(data: Vec<u8>, path: PathBuf) -> Result<Self> {
        Self::from_source(FileBytes::Owned(data), path)
    }

    fn from_source(data: FileBytes, path: PathBuf) -> Result<Self> {
        if data.len() < MIN_FILE_LEN || &data[0..4] != ROOT_MAGIC {
            return Err(RootError::BadMagic);
        }
        let header = parse_header(&data)?;
        log::debug!(
            "opened {} (ROOT version {}, compress {}, {} bytes)",
            path.display(),
            header.version,
            header.compress,
            data.len()
        );
        Ok(Self { data, header, path })
    }

    /// Path this file was opened from.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Access the raw file data.
    pub fn file_data(&self) -> &[u8] {
        &self.data
    }

    /// Whether file uses 64-bit seek pointers.
    pub fn is_large(&self) -> bool {
        self.header.is_large
    }

    /// List all keys in the top-level directory, in stored order.
    pub fn list_keys(&self) -> Result<Vec<KeyInfo>> {
        let dir = self.read_top_directory()?;
        Ok(dir.keys().iter().map(KeyInfo::from_key).collect())
    }

    /// The first stored keyed object of the top-level directory.
    pub fn first_key(&self) -> Result<KeyInfo> {
        let dir = self.read_top_directory()?;
        dir.first()
            .map(KeyInfo::from_key)
            .ok_or_else(|| RootError::EmptyFile(self.path.display().to_string()))
    }

    /// Read the first stored keyed object as a TTree.
    pub fn read_first_tree(&self) -> Result<Tree> {
        let dir = self.read_top_directory()?;
        let key = dir.first().ok_or_else(|| RootError::EmptyFile(self.path.display().to_string()))?;
        self.read_tree_from_key(key)
    }

    /// Read a TTree by name from the top-level directory.
    pub fn get_tree(&self, name: &str) -> Result<Tree> {
        let dir = self.read_top_directory()?;
        let key = dir.find_key(name).ok_or_else(|| RootError::TreeNotFound(name.to_string()))?;
        self.read_tree_from_key(key)
    }

    fn read_tree_from_key(&self, key: &Key) -> Result<Tree> {
        if key.class_name != "TTree" {
            return Err(RootError::TreeNotFound(format!(
                "'{}' is {} not TTree",
                key.name, key.class_name
            )));
        }
        let payload = self.read_key_payload(key)?;
        objects::read_ttree(&payload, key.key_len as usize)
    }

    /// Get a histogram by its full path (e.g. `"subdir/hist_name"`).
    pub fn get_histogram(&self, path: &str) -> Result<Histogram> {
        let parts: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
        let Some((&name, dirs)) = parts.split_last() else {
            return Err(RootError::KeyNotFound(path.to_string()));
        };

        let mut dir = self.read_top_directory()?;
        for &part in dirs {
            let key = dir
                .find_key(part)
                .ok_or_else(|| RootError::KeyNotFound(format!("{part} (in path {path})")))?;
            if key.class_name != "TDirectoryFile" && key.class_name != "TDirectory" {
                return Err(RootError::Deserialization(format!(
                    "'{part}' is not a directory (class: {})",
                    key.class_name
                )));
            }
            let payload = self.read_key_payload(key)?;
            dir = Directory::read_from_payload(&payload, self.header.is_large, &self.data)?;
        }

        let key = dir.find_key(name).ok_or_else(|| RootError::KeyNotFound(name.to_string()))?;
        let payload = self.read_key_payload(key)?;
        objects::read_histogram(&payload, &key.class_name)
    }

    /// Create a [`BranchReader`] for the named flat branch.
    pub fn branch_reader<'a>(&'a self, tree: &'a Tree, branch: &str) -> Result<BranchReader<'a>> {
        let info = tree.branch(branch)?;
        BranchReader::new(&self.data, info, self.header.is_large)
    }

    /// Convenience: read all entries from a branch as `f64`.
    pub fn branch_data(&self, tree: &Tree, branch: &str) -> Result<Vec<f64>> {
        self.branch_reader(tree, branch)?.as_f64()
    }

    fn read_top_directory(&self) -> Result<Directory> {
        Directory::read_key_list(&self.data, self.header.seek_keys as usize, self.header.is_large)
    }

    /// Read and decompress the payload of a TKey.
    pub(crate) fn read_key_payload(&self, key: &Key) -> Result<Vec<u8>> {
        read_key_payload_from(&self.data, key)
    }
}

/// Parse the file-level header and the top directory it points at.
///
/// ROOT file header layout (small file, version < 1000000):
/// ```text
/// offset  size  field
///    0      4   magic "root"
///    4      4   fVersion
///    8      4   fBEGIN
///   12      4   fEND
///   16      4   fSeekFree
///   20      4   fNbytesFree
///   24      4   nfree
///   28      4   fNbytesName
///   32      1   fUnits
///   33      4   fCompress
///   37      4   fSeekInfo
///   41      4   fNbytesInfo
///   45     18   fUUID
/// ```
/// Large files widen fEND, fSeekFree and fSeekInfo to 8 bytes.
/// The TDirectory streamer is located at `fBEGIN + fNbytesName`.
fn parse_header(data: &[u8]) -> Result<FileHeader> {
    let mut r = RBuffer::new(data);
    r.skip(4)?; // magic

    let version = r.read_u32()?;
    let is_large = version >= 1_000_000;
    let begin = r.read_u32()? as usize;
    r.skip(if is_large { 16 } else { 8 })?; // fEND, fSeekFree
    let _nbytes_free = r.read_u32()?;
    let _nfree = r.read_u32()?;
    let nbytes_name = r.read_u32()? as usize;
    let _units = r.read_u8()?;
    let compress = r.read_u32()?;

    let dir_offset = begin + nbytes_name;
    if dir_offset >= data.len() {
        return Err(RootError::Deserialization("TDirectory offset past end of file".into()));
    }
    r.set_pos(dir_offset);
    let dir_version = r.read_u16()?;
    r.skip(4 * 4)?; // fDatimeC, fDatimeM, fNbytesKeys, fNbytesName
    let seek_keys = if dir_version > 1000 {
        r.skip(16)?;
        r.read_u64()?
    } else {
        r.skip(8)?;
        r.read_u32()? as u64
    };

    Ok(FileHeader { version, is_large, compress, seek_keys })
}

/// Read and decompress the payload of `key` from raw file bytes.
pub(crate) fn read_key_payload_from(data: &[u8], key: &Key) -> Result<Vec<u8>> {
    let seek = key.seek_key as usize;
    let end = seek + key.n_bytes as usize;
    if end > data.len() || (key.n_bytes as usize) < key.key_len as usize {
        return Err(RootError::BufferUnderflow {
            offset: seek,
            need: key.n_bytes as usize,
            have: data.len().saturating_sub(seek),
        });
    }

    let stored = &data[seek + key.key_len as usize..end];
    if key.is_uncompressed() {
        Ok(stored.to_vec())
    } else {
        decompress(stored, key.obj_len as usize)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reject_non_root_file() {
        let data = vec![0u8; 100];
        let result = RootFile::from_bytes(data, PathBuf::from("test.root"));
        assert!(matches!(result, Err(RootError::BadMagic)));
    }

    #[test]
    fn reject_too_small() {
        let data = b"root".to_vec();
        let result = RootFile::from_bytes(data, PathBuf::from("test.root"));
        assert!(matches!(result, Err(RootError::BadMagic)));
    }

    #[test]
    fn reject_directory_past_end() {
        let mut data = vec![0u8; 100];
        data[..4].copy_from_slice(ROOT_MAGIC);
        data[4..8].copy_from_slice(&62800u32.to_be_bytes());
        data[8..12].copy_from_slice(&100u32.to_be_bytes());
        data[28..32].copy_from_slice(&50u32.to_be_bytes());
        let result = RootFile::from_bytes(data, PathBuf::from("test.root"));
        assert!(matches!(result, Err(RootError::Deserialization(_))));
    }

    #[test]
    fn payload_range_is_checked() {
        let mut key = Key::new("TH1F", "h", "", 0);
        key.seek_key = 10;
        key.n_bytes = 500;
        assert!(matches!(
            read_key_payload_from(&[0u8; 100], &key),
            Err(RootError::BufferUnderflow { offset: 10, .. })
        ));
    }
}
