//! Entry-level tabular access: read records out of a tree, build new trees.

use std::cell::RefCell;
use std::collections::HashMap;

use crate::branch_reader::BranchReader;
use crate::error::{Result, RootError};
use crate::file::RootFile;
use crate::tree::{LeafType, Tree};

/// Read side of a record table: named numeric fields addressed by entry.
pub trait TabularReader {
    /// Number of entries.
    fn entry_count(&self) -> u64;

    /// Value of field `name` at entry `index`, widened to f64.
    fn read_field(&self, name: &str, index: u64) -> Result<f64>;

    /// Every value of field `name`, in entry order.
    fn column(&self, name: &str) -> Result<Vec<f64>> {
        (0..self.entry_count()).map(|i| self.read_field(name, i)).collect()
    }
}

/// Write side of a record table: a fixed schema plus appended entries.
pub trait TabularWriter: Sized {
    /// An empty table with the same name, title and fields as `tree`.
    fn clone_schema(tree: &Tree) -> Result<Self>;

    /// Append one entry: the raw big-endian bytes of each field, in schema order.
    fn append_entry(&mut self, fields: &[&[u8]]) -> Result<()>;

    /// Number of entries appended so far.
    fn entry_count(&self) -> u64;
}

/// The basket currently decoded for one branch.
struct LoadedBasket {
    index: usize,
    first_entry: u64,
    data: Vec<u8>,
}

/// Entry-level reader over a tree of an open file.
///
/// Each branch keeps its most recently decoded basket, so a forward scan
/// decodes every needed basket once and never touches baskets past the last
/// requested entry.
pub struct TreeReader<'a> {
    file: &'a RootFile,
    tree: &'a Tree,
    loaded: RefCell<HashMap<usize, LoadedBasket>>,
}

impl<'a> TreeReader<'a> {
    /// Reader over `tree`, which must come from `file`.
    pub fn new(file: &'a RootFile, tree: &'a Tree) -> Self {
        Self { file, tree, loaded: RefCell::new(HashMap::new()) }
    }

    /// The tree being read.
    pub fn tree(&self) -> &Tree {
        self.tree
    }

    /// Raw bytes of every field of entry `index`, in schema order.
    pub fn read_entry(&self, index: u64) -> Result<Vec<Vec<u8>>> {
        (0..self.tree.branches.len())
            .map(|b| self.with_field(b, index, <[u8]>::to_vec))
            .collect()
    }

    fn branch_index(&self, name: &str) -> Result<usize> {
        self.tree
            .branches
            .iter()
            .position(|b| b.name == name)
            .ok_or_else(|| RootError::BranchNotFound(name.to_string()))
    }

    fn with_field<R>(&self, branch: usize, index: u64, f: impl FnOnce(&[u8]) -> R) -> Result<R> {
        if index >= self.tree.entries {
            return Err(RootError::EntryOutOfRange { index, entries: self.tree.entries });
        }
        let info = &self.tree.branches[branch];
        let reader = BranchReader::new(self.file.file_data(), info, self.file.is_large())?;
        let basket = info
            .basket_for_entry(index)
            .ok_or(RootError::EntryOutOfRange { index, entries: info.entries })?;

        let mut loaded = self.loaded.borrow_mut();
        let stale = loaded.get(&branch).is_none_or(|l| l.index != basket);
        if stale {
            let data = reader.read_basket_values(basket)?;
            let (first_entry, _) = info.basket_range(basket);
            loaded.insert(branch, LoadedBasket { index: basket, first_entry, data });
        }
        let Some(current) = loaded.get(&branch) else {
            return Err(RootError::Deserialization(format!("basket cache lost '{}'", info.name)));
        };

        let size = reader.entry_size();
        let offset = (index - current.first_entry) as usize * size;
        Ok(f(&current.data[offset..offset + size]))
    }
}

impl TabularReader for TreeReader<'_> {
    fn entry_count(&self) -> u64 {
        self.tree.entries
    }

    fn read_field(&self, name: &str, index: u64) -> Result<f64> {
        let b = self.branch_index(name)?;
        let lt = self.tree.branches[b].scalar_type()?;
        self.with_field(b, index, |bytes| lt.decode_f64(bytes))
    }

    fn column(&self, name: &str) -> Result<Vec<f64>> {
        let reader = self.file.branch_reader(self.tree, name)?;
        let values = reader.read_prefix_f64(self.tree.entries)?;
        if (values.len() as u64) < self.tree.entries {
            return Err(RootError::Deserialization(format!(
                "branch '{name}' holds {} entries, tree '{}' has {}",
                values.len(),
                self.tree.name,
                self.tree.entries
            )));
        }
        Ok(values)
    }
}

/// Schema of one written branch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BranchSchema {
    /// Branch (and leaf) name.
    pub name: String,
    /// Element type.
    pub leaf_type: LeafType,
}

/// An in-memory flat tree, built entry by entry and written with
/// [`RootWriter::write_tree`](crate::RootWriter::write_tree).
#[derive(Debug, Clone)]
pub struct TreeWriter {
    name: String,
    title: String,
    branches: Vec<BranchSchema>,
    columns: Vec<Vec<u8>>,
    entries: u64,
}

impl TreeWriter {
    /// Empty tree without branches.
    pub fn new(name: &str, title: &str) -> Self {
        Self {
            name: name.to_string(),
            title: title.to_string(),
            branches: Vec::new(),
            columns: Vec::new(),
            entries: 0,
        }
    }

    /// Add a scalar branch. Only allowed before the first entry.
    pub fn add_branch(&mut self, name: &str, leaf_type: LeafType) -> Result<()> {
        if self.entries > 0 {
            return Err(RootError::Write(format!(
                "cannot add branch '{name}' after {} entries",
                self.entries
            )));
        }
        if self.branches.iter().any(|b| b.name == name) {
            return Err(RootError::Write(format!("duplicate branch '{name}'")));
        }
        self.branches.push(BranchSchema { name: name.to_string(), leaf_type });
        self.columns.push(Vec::new());
        Ok(())
    }

    /// Append one entry given as numbers, encoded per branch type.
    pub fn append_values(&mut self, values: &[f64]) -> Result<()> {
        self.check_width(values.len())?;
        for ((col, schema), &v) in self.columns.iter_mut().zip(&self.branches).zip(values) {
            schema.leaf_type.encode_f64(v, col);
        }
        self.entries += 1;
        Ok(())
    }

    /// Tree name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Tree title.
    pub fn title(&self) -> &str {
        &self.title
    }

    /// Branch schema, in order.
    pub fn branches(&self) -> &[BranchSchema] {
        &self.branches
    }

    /// Raw big-endian column of branch `i`.
    pub fn column(&self, i: usize) -> &[u8] {
        &self.columns[i]
    }

    fn check_width(&self, n: usize) -> Result<()> {
        if n != self.branches.len() {
            return Err(RootError::TypeMismatch(format!(
                "entry has {n} fields, tree '{}' has {} branches",
                self.name,
                self.branches.len()
            )));
        }
        Ok(())
    }
}

impl TabularWriter for TreeWriter {
    fn clone_schema(tree: &Tree) -> Result<Self> {
        let mut out = TreeWriter::new(&tree.name, &tree.title);
        for branch in &tree.branches {
            out.add_branch(&branch.name, branch.scalar_type()?)?;
        }
        Ok(out)
    }

    fn append_entry(&mut self, fields: &[&[u8]]) -> Result<()> {
        self.check_width(fields.len())?;
        for (schema, field) in self.branches.iter().zip(fields) {
            if field.len() != schema.leaf_type.byte_size() {
                return Err(RootError::TypeMismatch(format!(
                    "field '{}' is {} bytes, {:?} needs {}",
                    schema.name,
                    field.len(),
                    schema.leaf_type,
                    schema.leaf_type.byte_size()
                )));
            }
        }
        for (col, field) in self.columns.iter_mut().zip(fields) {
            col.extend_from_slice(field);
        }
        self.entries += 1;
        Ok(())
    }

    fn entry_count(&self) -> u64 {
        self.entries
    }
}
