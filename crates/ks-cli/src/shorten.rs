//! `kskit shorten`: copy the leading entries of a tree into a new file.

use anyhow::{Context, Result};
use std::path::Path;

use ks_root::{RootFile, RootWriter, TabularReader, TabularWriter, TreeReader, TreeWriter};

/// Entries to copy from a tree of `available` entries when `requested` are asked for.
fn effective_count(requested: i64, available: u64) -> u64 {
    u64::try_from(requested).map_or(0, |n| n.min(available))
}

pub fn cmd_shorten(input: &Path, n_events: i64, tree_name: Option<&str>) -> Result<()> {
    if n_events < 0 {
        tracing::warn!(n_events, "negative entry count, writing an empty tree");
    }

    let file = RootFile::open(input)
        .with_context(|| format!("failed to open ROOT file {}", input.display()))?;
    let tree = crate::open_tree(&file, tree_name)
        .with_context(|| format!("no usable tree in {}", input.display()))?;

    let reader = TreeReader::new(&file, &tree);
    let keep = effective_count(n_events, reader.entry_count());
    tracing::debug!(tree = %tree.name, available = reader.entry_count(), keep, "copying entries");

    let mut short = TreeWriter::clone_schema(&tree)
        .with_context(|| format!("cannot copy the schema of tree '{}'", tree.name))?;
    for i in 0..keep {
        let fields = reader.read_entry(i).with_context(|| format!("failed to read entry {i}"))?;
        let refs: Vec<&[u8]> = fields.iter().map(Vec::as_slice).collect();
        short.append_entry(&refs)?;
    }

    let output = crate::sibling_output(input, "_short");
    let mut writer = RootWriter::recreate(&output)
        .with_context(|| format!("failed to create {}", output.display()))?;
    writer.write_tree(&short).with_context(|| format!("failed to write tree '{}'", tree.name))?;
    writer.close().with_context(|| format!("failed to finish {}", output.display()))?;

    tracing::info!(entries = keep, output = %output.display(), "tree written");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn effective_count_is_capped() {
        assert_eq!(effective_count(0, 10), 0);
        assert_eq!(effective_count(4, 10), 4);
        assert_eq!(effective_count(25, 10), 10);
        assert_eq!(effective_count(-3, 10), 0);
        assert_eq!(effective_count(i64::MAX, 0), 0);
    }
}
