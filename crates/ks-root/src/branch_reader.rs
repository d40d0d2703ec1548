//! Column-oriented data extraction from flat TTree branches.

use rayon::prelude::*;

use crate::basket::{read_basket, strip_entry_offsets};
use crate::error::{Result, RootError};
use crate::tree::{BranchInfo, LeafType};

/// Reader for extracting column data from a flat scalar branch.
pub struct BranchReader<'a> {
    file_data: &'a [u8],
    branch: &'a BranchInfo,
    leaf_type: LeafType,
    is_large: bool,
}

impl<'a> BranchReader<'a> {
    /// Create a reader; fails with `UnsupportedBranch` unless the branch is a
    /// flat scalar.
    pub fn new(file_data: &'a [u8], branch: &'a BranchInfo, is_large: bool) -> Result<Self> {
        let leaf_type = branch.scalar_type()?;
        Ok(Self { file_data, branch, leaf_type, is_large })
    }

    /// Bytes per entry.
    pub fn entry_size(&self) -> usize {
        self.leaf_type.byte_size()
    }

    /// Raw big-endian values of basket `i`, exactly one element per entry.
    pub fn read_basket_values(&self, i: usize) -> Result<Vec<u8>> {
        let seek = *self.branch.basket_seek.get(i).ok_or_else(|| {
            RootError::Deserialization(format!(
                "branch '{}' has no basket {i} ({} baskets)",
                self.branch.name, self.branch.n_baskets
            ))
        })?;
        let (first, end) = self.branch.basket_range(i);
        let n_entries = end.saturating_sub(first) as usize;

        let (_header, payload) = read_basket(self.file_data, seek, self.is_large)?;
        let data = strip_entry_offsets(&payload, n_entries, self.branch.entry_offset_len);

        let need = n_entries * self.entry_size();
        if data.len() < need {
            return Err(RootError::Deserialization(format!(
                "basket {i} of '{}' holds {} bytes, {n_entries} entries need {need}",
                self.branch.name,
                data.len()
            )));
        }
        Ok(data[..need].to_vec())
    }

    /// Raw values of the first `n` entries (capped at the branch's entry
    /// count). Baskets starting at or after entry `n` are never read.
    pub fn read_prefix(&self, n: u64) -> Result<Vec<u8>> {
        let n = n.min(self.branch.entries);
        let needed = (0..self.branch.n_baskets)
            .take_while(|&i| self.branch.basket_entry[i] < n)
            .collect::<Vec<_>>();

        let baskets: Vec<Vec<u8>> =
            needed.into_par_iter().map(|i| self.read_basket_values(i)).collect::<Result<_>>()?;

        let mut out: Vec<u8> = baskets.concat();
        let want = n as usize * self.entry_size();
        if out.len() < want {
            return Err(RootError::Deserialization(format!(
                "branch '{}': baskets hold {} entries, expected {n}",
                self.branch.name,
                out.len() / self.entry_size()
            )));
        }
        out.truncate(want);
        Ok(out)
    }

    /// Raw values of every entry.
    pub fn read_raw(&self) -> Result<Vec<u8>> {
        self.read_prefix(self.branch.entries)
    }

    /// Read all entries as `f64`, converting from the native type.
    pub fn as_f64(&self) -> Result<Vec<f64>> {
        self.read_prefix_f64(self.branch.entries)
    }

    /// Read the first `n` entries as `f64`.
    pub fn read_prefix_f64(&self, n: u64) -> Result<Vec<f64>> {
        let raw = self.read_prefix(n)?;
        Ok(raw.chunks_exact(self.entry_size()).map(|c| self.leaf_type.decode_f64(c)).collect())
    }
}
