//! TTree, TBranch and TLeaf streamers.
//!
//! Reading accepts TTree versions 16-20 and records every branch with its
//! leaves; writing produces TTree v20 with flat single-leaf TBranches.

use std::collections::HashMap;

use crate::error::{Result, RootError};
use crate::rbuffer::RBuffer;
use crate::tree::{BranchInfo, LeafInfo, LeafType, Tree};
use crate::wbuffer::{K_BYTE_COUNT_MASK, K_CLASS_MASK, K_MAP_OFFSET, K_NEW_CLASS_TAG, WBuffer};

/// Basket buffer size recorded on written branches.
pub const BASKET_SIZE: i32 = 32000;

/// Read a TTree from a decompressed TKey payload.
///
/// `origin` is the key header length; class references inside the payload
/// are relative to the start of the key.
pub fn read_ttree(payload: &[u8], origin: usize) -> Result<Tree> {
    let mut r = RBuffer::with_origin(payload, origin);
    let mut tags = ClassTags::default();

    let (tree_ver, tree_end) = r.read_version()?;
    let tree_end =
        tree_end.ok_or_else(|| RootError::Deserialization("TTree missing byte count".into()))?;
    if tree_ver < 16 {
        return Err(RootError::Deserialization(format!("TTree version {tree_ver} too old")));
    }

    let (name, title) = r.read_tnamed()?;

    // TAttLine, TAttFill, TAttMarker
    r.skip_versioned()?;
    r.skip_versioned()?;
    r.skip_versioned()?;

    let entries = r.read_i64()?.max(0) as u64; // fEntries
    let _tot_bytes = r.read_i64()?;
    let _zip_bytes = r.read_i64()?;
    let _saved_bytes = r.read_i64()?;
    if tree_ver >= 18 {
        let _flushed_bytes = r.read_i64()?;
    }

    let _weight = r.read_f64()?;
    let _timer_interval = r.read_i32()?;
    let _scan_field = r.read_i32()?;
    let _update = r.read_i32()?;
    if tree_ver >= 18 {
        let _default_entry_offset_len = r.read_i32()?;
    }
    let n_cluster_range = if tree_ver >= 19 { r.read_i32()?.max(0) as usize } else { 0 };

    let _max_entries = r.read_i64()?;
    let _max_entry_loop = r.read_i64()?;
    let _max_virtual_size = r.read_i64()?;
    let _auto_save = r.read_i64()?;
    if tree_ver >= 18 {
        let _auto_flush = r.read_i64()?;
    }
    let _estimate = r.read_i64()?;

    if tree_ver >= 19 {
        // fClusterRangeEnd, fClusterSize: flag byte then n i64 values each
        for _ in 0..2 {
            if r.read_u8()? != 0 {
                r.skip(8 * n_cluster_range)?;
            }
        }
    }

    if tree_ver >= 20 {
        r.skip_versioned()?; // fIOFeatures
    }

    let branches = read_branch_array(&mut r, &mut tags)?;

    r.set_pos(tree_end);
    log::debug!("TTree '{name}' v{tree_ver}: {entries} entries, {} branches", branches.len());

    Ok(Tree { name, title, entries, branches })
}

// ── class tags ─────────────────────────────────────────────────

/// Class names registered by key-relative tag, shared by every array
/// streamed inside one key.
#[derive(Default)]
struct ClassTags {
    classes: HashMap<u32, String>,
}

/// One element of a TObjArray.
struct Element {
    class_name: String,
    end: usize,
}

impl ClassTags {
    /// Read the header of one array element.
    ///
    /// Returns `None` for a null slot; object back-references are treated as
    /// already-read objects and also yield `None`.
    fn read_element(&mut self, r: &mut RBuffer) -> Result<Option<Element>> {
        let start = r.pos();
        let tag = r.read_u32()?;
        if tag == 0 {
            return Ok(None);
        }
        if tag & K_BYTE_COUNT_MASK == 0 {
            return Ok(None);
        }
        let end = start + 4 + (tag & !K_BYTE_COUNT_MASK) as usize;

        let class_tag_pos = r.key_pos() as u32;
        let class_tag = r.read_u32()?;
        let class_name = if class_tag == K_NEW_CLASS_TAG {
            let name = r.read_cstring()?;
            self.classes.insert(class_tag_pos + K_MAP_OFFSET, name.clone());
            name
        } else if class_tag & K_CLASS_MASK != 0 {
            let key = class_tag & !K_CLASS_MASK;
            match self.classes.get(&key) {
                Some(name) => name.clone(),
                None => {
                    log::debug!("unresolved class reference {class_tag:#010x}");
                    String::from("<unknown>")
                }
            }
        } else {
            return Err(RootError::Deserialization(format!(
                "unexpected class tag {class_tag:#010x} at key offset {class_tag_pos}"
            )));
        };

        Ok(Some(Element { class_name, end }))
    }
}

/// Open a TObjArray: returns `(element_count, end_pos)`.
fn read_objarray_header(r: &mut RBuffer) -> Result<(usize, usize)> {
    let (_ver, end) = r.read_version()?;
    let end = end.ok_or_else(|| RootError::Deserialization("TObjArray missing byte count".into()))?;
    r.read_tobject()?;
    let _name = r.read_string()?;
    let count = r.read_i32()?.max(0) as usize;
    let _low_bound = r.read_i32()?;
    Ok((count, end))
}

// ── TBranch ────────────────────────────────────────────────────

fn read_branch_array(r: &mut RBuffer, tags: &mut ClassTags) -> Result<Vec<BranchInfo>> {
    let (count, arr_end) = read_objarray_header(r)?;
    let mut branches = Vec::with_capacity(count.min(256));

    for _ in 0..count {
        let Some(el) = tags.read_element(r)? else {
            continue;
        };
        let parsed = if el.class_name == "TBranch" {
            read_tbranch(r, tags)
        } else {
            // derived branch classes stream their TBranch base first
            r.read_version().and_then(|_| read_tbranch(r, tags))
        };
        match parsed {
            Ok(mut branch) => {
                branch.class_name = el.class_name;
                branches.push(branch);
            }
            Err(e) => log::debug!("skipping {} element: {e}", el.class_name),
        }
        r.set_pos(el.end);
    }

    r.set_pos(arr_end);
    Ok(branches)
}

fn read_tbranch(r: &mut RBuffer, tags: &mut ClassTags) -> Result<BranchInfo> {
    let (branch_ver, branch_end) = r.read_version()?;
    let branch_end = branch_end
        .ok_or_else(|| RootError::Deserialization("TBranch missing byte count".into()))?;

    let (name, title) = r.read_tnamed()?;
    r.skip_versioned()?; // TAttFill

    let _compress = r.read_i32()?;
    let _basket_size = r.read_i32()?;
    let entry_offset_len = r.read_i32()?;
    let write_basket = r.read_i32()?.max(0) as usize;
    let _entry_number = r.read_i64()?;
    if branch_ver >= 13 {
        r.skip_versioned()?; // fIOFeatures
    }
    let _offset = r.read_i32()?;
    let max_baskets = r.read_i32()?.max(0) as usize;
    let _split_level = r.read_i32()?;
    let entries = r.read_i64()?.max(0) as u64;
    if branch_ver >= 11 {
        let _first_entry = r.read_i64()?;
    }
    let _tot_bytes = r.read_i64()?;
    let _zip_bytes = r.read_i64()?;

    let sub_branches = read_branch_array(r, tags)?;
    let leaves = read_leaf_array(r, tags)?;
    skip_objarray(r, tags)?; // fBaskets

    let n_baskets = write_basket.min(max_baskets);

    let basket_bytes: Vec<u32> = read_basic_pointer(r, max_baskets, 4)?
        .chunks_exact(4)
        .take(n_baskets)
        .map(|c| i32::from_be_bytes([c[0], c[1], c[2], c[3]]).max(0) as u32)
        .collect();
    let basket_entry: Vec<u64> = read_basic_pointer(r, max_baskets, 8)?
        .chunks_exact(8)
        .take(n_baskets + 1)
        .map(be_i64_as_u64)
        .collect();
    let basket_seek: Vec<u64> = read_basic_pointer(r, max_baskets, 8)?
        .chunks_exact(8)
        .take(n_baskets)
        .map(be_i64_as_u64)
        .collect();

    if basket_seek.len() < n_baskets || basket_entry.len() < n_baskets {
        return Err(RootError::Deserialization(format!(
            "branch '{name}': {n_baskets} baskets but arrays hold {}",
            basket_seek.len()
        )));
    }

    r.set_pos(branch_end);

    Ok(BranchInfo {
        name,
        title,
        class_name: String::from("TBranch"),
        leaves,
        n_sub_branches: sub_branches.len(),
        entry_offset_len,
        entries,
        basket_bytes,
        basket_entry,
        basket_seek,
        n_baskets,
    })
}

/// A `[fMaxBaskets]` pointer array: flag byte, then `n` elements if set.
fn read_basic_pointer<'a>(r: &mut RBuffer<'a>, n: usize, width: usize) -> Result<&'a [u8]> {
    if r.read_u8()? == 0 {
        return Ok(&[]);
    }
    r.read_bytes(n * width)
}

fn be_i64_as_u64(c: &[u8]) -> u64 {
    let mut b = [0u8; 8];
    b.copy_from_slice(c);
    i64::from_be_bytes(b).max(0) as u64
}

fn skip_objarray(r: &mut RBuffer, tags: &mut ClassTags) -> Result<()> {
    let (count, end) = read_objarray_header(r)?;
    for _ in 0..count {
        if let Some(el) = tags.read_element(r)? {
            r.set_pos(el.end);
        }
    }
    r.set_pos(end);
    Ok(())
}

// ── TLeaf ──────────────────────────────────────────────────────

fn read_leaf_array(r: &mut RBuffer, tags: &mut ClassTags) -> Result<Vec<LeafInfo>> {
    let (count, arr_end) = read_objarray_header(r)?;
    let mut leaves = Vec::with_capacity(count.min(256));

    for _ in 0..count {
        let Some(el) = tags.read_element(r)? else {
            continue;
        };
        let leaf = match read_tleaf(r, &el.class_name) {
            Ok(leaf) => leaf,
            Err(e) => {
                log::debug!("unreadable {} leaf: {e}", el.class_name);
                LeafInfo {
                    name: String::new(),
                    title: String::new(),
                    class_name: el.class_name.clone(),
                    leaf_type: None,
                    len: 0,
                    has_count: false,
                }
            }
        };
        leaves.push(leaf);
        r.set_pos(el.end);
    }

    r.set_pos(arr_end);
    Ok(leaves)
}

fn read_tleaf(r: &mut RBuffer, class_name: &str) -> Result<LeafInfo> {
    let _typed = r.read_version()?; // TLeafX wrapper
    let _base = r.read_version()?; // TLeaf
    let (name, title) = r.read_tnamed()?;
    let len = r.read_i32()?;
    let _len_type = r.read_i32()?;
    let _offset = r.read_i32()?;
    let _is_range = r.read_u8()?;
    let is_unsigned = r.read_u8()? != 0;
    let leaf_count = r.read_u32()?;

    Ok(LeafInfo {
        name,
        title,
        class_name: class_name.to_string(),
        leaf_type: LeafType::from_class(class_name, is_unsigned),
        len,
        has_count: leaf_count != 0,
    })
}

// ── writing ────────────────────────────────────────────────────

/// On-disk placement of one written branch.
#[derive(Debug, Clone)]
pub struct BranchLayout {
    /// Branch (and leaf) name.
    pub name: String,
    /// Element type of the single leaf.
    pub leaf_type: LeafType,
    /// Total bytes of each basket record (key header + stored payload).
    pub basket_bytes: Vec<u32>,
    /// First entry of each basket, followed by the total entry count.
    pub basket_entry: Vec<u64>,
    /// File offset of each basket record.
    pub basket_seek: Vec<u64>,
    /// Uncompressed bytes over all baskets, key headers included.
    pub tot_bytes: i64,
    /// Stored bytes over all baskets, key headers included.
    pub zip_bytes: i64,
}

/// Everything needed to stream a TTree whose baskets are already on disk.
#[derive(Debug, Clone)]
pub struct TreeLayout {
    /// Tree name.
    pub name: String,
    /// Tree title.
    pub title: String,
    /// Entry count.
    pub entries: u64,
    /// `fCompress` setting recorded on each branch.
    pub compress: i32,
    /// Branches in schema order.
    pub branches: Vec<BranchLayout>,
}

/// Stream a TTree (v20) into `w`.
pub fn write_ttree(w: &mut WBuffer, tree: &TreeLayout) {
    let entries = tree.entries as i64;
    let tot_bytes: i64 = tree.branches.iter().map(|b| b.tot_bytes).sum();
    let zip_bytes: i64 = tree.branches.iter().map(|b| b.zip_bytes).sum();

    let c = w.write_version(20);
    w.write_tnamed(&tree.name, &tree.title);
    write_att_line(w);
    write_att_fill(w, 0, 1001);
    write_att_marker(w);

    w.write_i64(entries); // fEntries
    w.write_i64(tot_bytes);
    w.write_i64(zip_bytes);
    w.write_i64(0); // fSavedBytes
    w.write_i64(0); // fFlushedBytes
    w.write_f64(1.0); // fWeight
    w.write_i32(0); // fTimerInterval
    w.write_i32(25); // fScanField
    w.write_i32(0); // fUpdate
    w.write_i32(1000); // fDefaultEntryOffsetLen
    w.write_i32(0); // fNClusterRange
    w.write_i64(1_000_000_000_000); // fMaxEntries
    w.write_i64(1_000_000_000_000); // fMaxEntryLoop
    w.write_i64(0); // fMaxVirtualSize
    w.write_i64(-300_000_000); // fAutoSave
    w.write_i64(-30_000_000); // fAutoFlush
    w.write_i64(1_000_000); // fEstimate
    w.write_u8(0); // fClusterRangeEnd
    w.write_u8(0); // fClusterSize
    write_io_features(w);

    // fBranches
    let arr = begin_objarray(w, tree.branches.len());
    let mut leaf_tags = Vec::with_capacity(tree.branches.len());
    for branch in &tree.branches {
        leaf_tags.push(write_tbranch(w, branch, entries, tree.compress));
    }
    w.set_byte_count(arr);

    // fLeaves: references to the leaves streamed inside the branches
    let arr = begin_objarray(w, leaf_tags.len());
    for tag in leaf_tags {
        w.write_object_ref(tag);
    }
    w.set_byte_count(arr);

    w.write_null_pointer(); // fAliases
    w.write_tarray_f64(&[]); // fIndexValues
    w.write_i32(0); // fIndex
    w.write_null_pointer(); // fTreeIndex
    w.write_null_pointer(); // fFriends
    w.write_null_pointer(); // fUserInfo
    w.write_null_pointer(); // fBranchRef
    w.set_byte_count(c);
}

/// Stream one TBranch as an array element; returns its leaf's object tag.
fn write_tbranch(w: &mut WBuffer, b: &BranchLayout, entries: i64, compress: i32) -> u32 {
    let n_baskets = b.basket_seek.len();
    let max_baskets = (n_baskets + 1).max(10);

    let (obj, _) = w.begin_object("TBranch");
    let c = w.write_version(13);
    w.write_tnamed(&b.name, &format!("{}/{}", b.name, b.leaf_type.type_code()));
    write_att_fill(w, 0, 1001);
    w.write_i32(compress); // fCompress
    w.write_i32(BASKET_SIZE); // fBasketSize
    w.write_i32(0); // fEntryOffsetLen
    w.write_i32(n_baskets as i32); // fWriteBasket
    w.write_i64(entries); // fEntryNumber
    write_io_features(w);
    w.write_i32(0); // fOffset
    w.write_i32(max_baskets as i32);
    w.write_i32(0); // fSplitLevel
    w.write_i64(entries);
    w.write_i64(0); // fFirstEntry
    w.write_i64(b.tot_bytes);
    w.write_i64(b.zip_bytes);

    let arr = begin_objarray(w, 0); // fBranches
    w.set_byte_count(arr);

    let arr = begin_objarray(w, 1); // fLeaves
    let leaf_tag = write_leaf(w, &b.name, b.leaf_type);
    w.set_byte_count(arr);

    let arr = begin_objarray(w, 0); // fBaskets
    w.set_byte_count(arr);

    w.write_u8(1);
    for i in 0..max_baskets {
        w.write_i32(b.basket_bytes.get(i).copied().unwrap_or(0) as i32);
    }
    w.write_u8(1);
    for i in 0..max_baskets {
        w.write_i64(b.basket_entry.get(i).copied().unwrap_or(0) as i64);
    }
    w.write_u8(1);
    for i in 0..max_baskets {
        w.write_i64(b.basket_seek.get(i).copied().unwrap_or(0) as i64);
    }
    w.write_string(""); // fFileName
    w.set_byte_count(c);
    w.end_object(obj);

    leaf_tag
}

fn write_leaf(w: &mut WBuffer, name: &str, leaf_type: LeafType) -> u32 {
    let (obj, tag) = w.begin_object(leaf_type.class_name());
    let typed = w.write_version(1);
    let base = w.write_version(2);
    w.write_tnamed(name, name);
    w.write_i32(1); // fLen
    w.write_i32(leaf_type.byte_size() as i32); // fLenType
    w.write_i32(0); // fOffset
    w.write_u8(0); // fIsRange
    w.write_bool(leaf_type.is_unsigned());
    w.write_null_pointer(); // fLeafCount
    w.set_byte_count(base);
    // fMinimum, fMaximum in the leaf's own type
    w.write_bytes(&vec![0u8; 2 * leaf_type.byte_size()]);
    w.set_byte_count(typed);
    w.end_object(obj);
    tag
}

fn begin_objarray(w: &mut WBuffer, count: usize) -> usize {
    let c = w.write_version(3);
    w.write_tobject();
    w.write_string("");
    w.write_i32(count as i32);
    w.write_i32(0); // fLowerBound
    c
}

fn write_io_features(w: &mut WBuffer) {
    let c = w.write_version(1);
    w.write_u8(0);
    w.set_byte_count(c);
}

/// `TAttLine` with ROOT's default (color 1, style 1, width 1).
pub(crate) fn write_att_line(w: &mut WBuffer) {
    write_att_line_color(w, 1);
}

/// `TAttLine` with a given color.
pub(crate) fn write_att_line_color(w: &mut WBuffer, color: i16) {
    let c = w.write_version(2);
    w.write_i16(color);
    w.write_i16(1);
    w.write_i16(1);
    w.set_byte_count(c);
}

/// `TAttFill` (color, style).
pub(crate) fn write_att_fill(w: &mut WBuffer, color: i16, style: i16) {
    let c = w.write_version(2);
    w.write_i16(color);
    w.write_i16(style);
    w.set_byte_count(c);
}

/// `TAttMarker` with ROOT's default (color 1, style 1, size 1).
pub(crate) fn write_att_marker(w: &mut WBuffer) {
    let c = w.write_version(2);
    w.write_i16(1);
    w.write_i16(1);
    w.write_f32(1.0);
    w.set_byte_count(c);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn layout() -> TreeLayout {
        TreeLayout {
            name: "events".into(),
            title: "K_S K_S candidates".into(),
            entries: 25,
            compress: 101,
            branches: vec![
                BranchLayout {
                    name: "M_FinalState".into(),
                    leaf_type: LeafType::F32,
                    basket_bytes: vec![140, 90],
                    basket_entry: vec![0, 20, 25],
                    basket_seek: vec![1000, 1140],
                    tot_bytes: 230,
                    zip_bytes: 230,
                },
                BranchLayout {
                    name: "Weight".into(),
                    leaf_type: LeafType::F32,
                    basket_bytes: vec![160],
                    basket_entry: vec![0, 25],
                    basket_seek: vec![1230],
                    tot_bytes: 160,
                    zip_bytes: 160,
                },
                BranchLayout {
                    name: "nTracks".into(),
                    leaf_type: LeafType::U16,
                    basket_bytes: vec![110],
                    basket_entry: vec![0, 25],
                    basket_seek: vec![1390],
                    tot_bytes: 110,
                    zip_bytes: 110,
                },
            ],
        }
    }

    #[test]
    fn written_tree_reads_back() {
        let origin = 64;
        let mut w = WBuffer::with_origin(origin);
        write_ttree(&mut w, &layout());
        let payload = w.into_inner();

        let tree = read_ttree(&payload, origin).unwrap();
        assert_eq!(tree.name, "events");
        assert_eq!(tree.title, "K_S K_S candidates");
        assert_eq!(tree.entries, 25);
        assert_eq!(tree.branch_names(), ["M_FinalState", "Weight", "nTracks"]);

        let m = tree.branch("M_FinalState").unwrap();
        assert_eq!(m.title, "M_FinalState/F");
        assert_eq!(m.n_baskets, 2);
        assert_eq!(m.basket_entry, [0, 20, 25]);
        assert_eq!(m.basket_seek, [1000, 1140]);
        assert_eq!(m.basket_bytes, [140, 90]);
        assert_eq!(m.scalar_type().unwrap(), LeafType::F32);

        // second TLeafF uses a class back-reference
        let wgt = tree.branch("Weight").unwrap();
        assert_eq!(wgt.scalar_type().unwrap(), LeafType::F32);
        assert_eq!(wgt.leaves[0].name, "Weight");

        let n = tree.branch("nTracks").unwrap();
        assert_eq!(n.scalar_type().unwrap(), LeafType::U16);
    }

    #[test]
    fn origin_mismatch_breaks_class_references() {
        let mut w = WBuffer::with_origin(64);
        write_ttree(&mut w, &layout());
        let payload = w.into_inner();

        // Reading with the wrong origin cannot resolve the back-referenced
        // TBranch class, so later branches are not recognised as flat.
        let tree = read_ttree(&payload, 0).unwrap();
        let flat = tree.branches.iter().filter(|b| b.scalar_type().is_ok()).count();
        assert!(flat < 3);
    }

    #[test]
    fn truncated_payload_is_an_error() {
        let mut w = WBuffer::with_origin(64);
        write_ttree(&mut w, &layout());
        let payload = w.into_inner();
        assert!(read_ttree(&payload[..40], 64).is_err());
    }
}
