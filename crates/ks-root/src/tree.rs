//! Public types for TTree branch metadata.

use crate::error::{Result, RootError};

/// Leaf data type (maps to ROOT TLeaf class names).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LeafType {
    /// `TLeafF`: 32-bit float.
    F32,
    /// `TLeafD`: 64-bit float.
    F64,
    /// `TLeafI`: 32-bit signed integer.
    I32,
    /// `TLeafL`: 64-bit signed integer.
    I64,
    /// `TLeafI` unsigned variant.
    U32,
    /// `TLeafL` unsigned variant.
    U64,
    /// `TLeafS`: 16-bit signed integer.
    I16,
    /// `TLeafS` unsigned variant.
    U16,
    /// `TLeafB`: 8-bit signed integer.
    I8,
    /// `TLeafB` unsigned variant.
    U8,
    /// `TLeafO`: boolean (1 byte).
    Bool,
}

impl LeafType {
    /// Size in bytes of one element.
    pub fn byte_size(self) -> usize {
        match self {
            LeafType::F32 | LeafType::I32 | LeafType::U32 => 4,
            LeafType::F64 | LeafType::I64 | LeafType::U64 => 8,
            LeafType::I16 | LeafType::U16 => 2,
            LeafType::I8 | LeafType::U8 | LeafType::Bool => 1,
        }
    }

    /// ROOT leaf class streamed for this type.
    pub fn class_name(self) -> &'static str {
        match self {
            LeafType::F32 => "TLeafF",
            LeafType::F64 => "TLeafD",
            LeafType::I32 | LeafType::U32 => "TLeafI",
            LeafType::I64 | LeafType::U64 => "TLeafL",
            LeafType::I16 | LeafType::U16 => "TLeafS",
            LeafType::I8 | LeafType::U8 => "TLeafB",
            LeafType::Bool => "TLeafO",
        }
    }

    /// Type code used in a branch leaf-list title (`"x/F"`).
    pub fn type_code(self) -> char {
        match self {
            LeafType::F32 => 'F',
            LeafType::F64 => 'D',
            LeafType::I32 => 'I',
            LeafType::U32 => 'i',
            LeafType::I64 => 'L',
            LeafType::U64 => 'l',
            LeafType::I16 => 'S',
            LeafType::U16 => 's',
            LeafType::I8 => 'B',
            LeafType::U8 => 'b',
            LeafType::Bool => 'O',
        }
    }

    /// Whether the leaf carries ROOT's `fIsUnsigned` flag.
    pub fn is_unsigned(self) -> bool {
        matches!(self, LeafType::U32 | LeafType::U64 | LeafType::U16 | LeafType::U8)
    }

    /// Map a TLeaf class name and its unsigned flag to a type.
    pub fn from_class(class_name: &str, unsigned: bool) -> Option<Self> {
        let lt = match (class_name, unsigned) {
            ("TLeafF", _) => LeafType::F32,
            ("TLeafD", _) => LeafType::F64,
            ("TLeafI", false) => LeafType::I32,
            ("TLeafI", true) => LeafType::U32,
            ("TLeafL", false) => LeafType::I64,
            ("TLeafL", true) => LeafType::U64,
            ("TLeafS", false) => LeafType::I16,
            ("TLeafS", true) => LeafType::U16,
            ("TLeafB", false) => LeafType::I8,
            ("TLeafB", true) => LeafType::U8,
            ("TLeafO", _) => LeafType::Bool,
            _ => return None,
        };
        Some(lt)
    }

    /// Decode one big-endian element as f64.
    ///
    /// `bytes` must hold at least [`byte_size`](Self::byte_size) bytes.
    pub fn decode_f64(self, bytes: &[u8]) -> f64 {
        fn arr<const N: usize>(b: &[u8]) -> [u8; N] {
            let mut out = [0u8; N];
            out.copy_from_slice(&b[..N]);
            out
        }
        match self {
            LeafType::F32 => f32::from_be_bytes(arr(bytes)) as f64,
            LeafType::F64 => f64::from_be_bytes(arr(bytes)),
            LeafType::I32 => i32::from_be_bytes(arr(bytes)) as f64,
            LeafType::U32 => u32::from_be_bytes(arr(bytes)) as f64,
            LeafType::I64 => i64::from_be_bytes(arr(bytes)) as f64,
            LeafType::U64 => u64::from_be_bytes(arr(bytes)) as f64,
            LeafType::I16 => i16::from_be_bytes(arr(bytes)) as f64,
            LeafType::U16 => u16::from_be_bytes(arr(bytes)) as f64,
            LeafType::I8 => bytes[0] as i8 as f64,
            LeafType::U8 => bytes[0] as f64,
            LeafType::Bool => {
                if bytes[0] != 0 {
                    1.0
                } else {
                    0.0
                }
            }
        }
    }

    /// Append `v` encoded big-endian as this type (integers truncate toward zero).
    pub fn encode_f64(self, v: f64, out: &mut Vec<u8>) {
        match self {
            LeafType::F32 => out.extend_from_slice(&(v as f32).to_be_bytes()),
            LeafType::F64 => out.extend_from_slice(&v.to_be_bytes()),
            LeafType::I32 => out.extend_from_slice(&(v as i32).to_be_bytes()),
            LeafType::U32 => out.extend_from_slice(&(v as u32).to_be_bytes()),
            LeafType::I64 => out.extend_from_slice(&(v as i64).to_be_bytes()),
            LeafType::U64 => out.extend_from_slice(&(v as u64).to_be_bytes()),
            LeafType::I16 => out.extend_from_slice(&(v as i16).to_be_bytes()),
            LeafType::U16 => out.extend_from_slice(&(v as u16).to_be_bytes()),
            LeafType::I8 => out.push(v as i8 as u8),
            LeafType::U8 => out.push(v as u8),
            LeafType::Bool => out.push(u8::from(v != 0.0)),
        }
    }
}

/// Metadata for the leaf of a branch.
#[derive(Debug, Clone)]
pub struct LeafInfo {
    /// Leaf name.
    pub name: String,
    /// Leaf title.
    pub title: String,
    /// Streamed leaf class (`TLeafF`, `TLeafElement`, ...).
    pub class_name: String,
    /// Element type, when the class is a basic-type leaf.
    pub leaf_type: Option<LeafType>,
    /// Fixed element count per entry (`fLen`).
    pub len: i32,
    /// Whether the element count comes from another leaf (variable length).
    pub has_count: bool,
}

/// Metadata for a single TBranch in a TTree.
#[derive(Debug, Clone)]
pub struct BranchInfo {
    /// Branch name.
    pub name: String,
    /// Branch title (the leaf list, e.g. `"x/F"`).
    pub title: String,
    /// Streamed branch class.
    pub class_name: String,
    /// Leaves of this branch.
    pub leaves: Vec<LeafInfo>,
    /// Number of sub-branches.
    pub n_sub_branches: usize,
    /// `fEntryOffsetLen`: non-zero when baskets carry an entry-offset table.
    pub entry_offset_len: i32,
    /// Total number of entries in this branch.
    pub entries: u64,
    /// Compressed byte sizes for each basket.
    pub basket_bytes: Vec<u32>,
    /// Entry boundaries for each basket (`n_baskets + 1` values).
    pub basket_entry: Vec<u64>,
    /// Absolute file offsets (seek positions) for each basket.
    pub basket_seek: Vec<u64>,
    /// Number of valid baskets (`fWriteBasket`).
    pub n_baskets: usize,
}

impl BranchInfo {
    /// The scalar element type, or why this branch is not a flat scalar.
    pub fn scalar_type(&self) -> Result<LeafType> {
        let unsupported = |reason: &str| RootError::UnsupportedBranch {
            name: self.name.clone(),
            reason: reason.to_string(),
        };
        if self.class_name != "TBranch" {
            return Err(unsupported(&format!("branch class {}", self.class_name)));
        }
        if self.n_sub_branches > 0 {
            return Err(unsupported("has sub-branches"));
        }
        let [leaf] = self.leaves.as_slice() else {
            return Err(unsupported(&format!("{} leaves", self.leaves.len())));
        };
        if leaf.has_count {
            return Err(unsupported("variable-length leaf"));
        }
        if leaf.len != 1 {
            return Err(unsupported(&format!("fixed array of {} elements", leaf.len)));
        }
        leaf.leaf_type.ok_or_else(|| unsupported(&format!("leaf class {}", leaf.class_name)))
    }

    /// The basket holding `entry`, if any.
    pub fn basket_for_entry(&self, entry: u64) -> Option<usize> {
        if entry >= self.entries || self.n_baskets == 0 {
            return None;
        }
        let starts = &self.basket_entry[..self.n_baskets];
        let idx = starts.partition_point(|&first| first <= entry);
        idx.checked_sub(1)
    }

    /// First entry and one-past-last entry of basket `i`.
    pub fn basket_range(&self, i: usize) -> (u64, u64) {
        let first = self.basket_entry[i];
        let end = self.basket_entry.get(i + 1).copied().unwrap_or(self.entries).min(self.entries);
        (first, end)
    }
}

/// A parsed TTree with branch metadata.
#[derive(Debug, Clone)]
pub struct Tree {
    /// Tree name.
    pub name: String,
    /// Tree title.
    pub title: String,
    /// Total number of entries.
    pub entries: u64,
    /// Top-level branches, in schema order.
    pub branches: Vec<BranchInfo>,
}

impl Tree {
    /// Find a branch by name.
    pub fn find_branch(&self, name: &str) -> Option<&BranchInfo> {
        self.branches.iter().find(|b| b.name == name)
    }

    /// Find a branch by name, failing with `BranchNotFound`.
    pub fn branch(&self, name: &str) -> Result<&BranchInfo> {
        self.find_branch(name).ok_or_else(|| RootError::BranchNotFound(name.to_string()))
    }

    /// List all branch names.
    pub fn branch_names(&self) -> Vec<&str> {
        self.branches.iter().map(|b| b.name.as_str()).collect()
    }
}
