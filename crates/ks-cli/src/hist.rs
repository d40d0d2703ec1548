//! `kskit hist`: invariant-mass histograms from a K_S K_S tree.

use anyhow::{Context, Result};
use std::path::Path;

use ks_root::{HistogramSpec, RootFile, RootWriter, TreeReader, fill_histograms};

const MASS_BRANCH: &str = "M_FinalState";
const WEIGHT_BRANCH: &str = "Weight";
const X_MIN: f64 = 1.0;
const X_MAX: f64 = 2.0;
const X_TITLE: &str = "IM(K_{S}K_{S}) (GeV/c^{2})";
const TITLE: &str = "Invariant Mass of K_{S}K_{S}";
const TITLE_UNWEIGHTED: &str = "Invariant Mass of K_{S}K_{S} (Unweighted)";

/// hist1..hist4: (name, bins, weighted).
const HISTOGRAMS: [(&str, usize, bool); 4] =
    [("hist1", 40, true), ("hist2", 40, false), ("hist3", 50, true), ("hist4", 50, false)];

fn specs() -> Vec<HistogramSpec> {
    HISTOGRAMS
        .iter()
        .map(|&(name, n_bins, weighted)| {
            let bin_mev = ((X_MAX - X_MIN) / n_bins as f64 * 1000.0).round();
            HistogramSpec {
                name: name.to_string(),
                title: if weighted { TITLE } else { TITLE_UNWEIGHTED }.to_string(),
                x_title: X_TITLE.to_string(),
                y_title: format!("counts / {bin_mev} MeV/c^{{2}}"),
                n_bins,
                x_min: X_MIN,
                x_max: X_MAX,
                variable: MASS_BRANCH.to_string(),
                weight: weighted.then(|| WEIGHT_BRANCH.to_string()),
            }
        })
        .collect()
}

pub fn cmd_hist(input: &Path, tree_name: Option<&str>) -> Result<()> {
    let file = RootFile::open(input)
        .with_context(|| format!("failed to open ROOT file {}", input.display()))?;
    let tree = crate::open_tree(&file, tree_name)
        .with_context(|| format!("no usable tree in {}", input.display()))?;
    tracing::debug!(tree = %tree.name, entries = tree.entries, "tree opened");

    let reader = TreeReader::new(&file, &tree);
    let hists = fill_histograms(&specs(), &reader)
        .with_context(|| format!("failed to fill histograms from tree '{}'", tree.name))?;

    let output = crate::sibling_output(input, "_hist");
    let mut writer = RootWriter::recreate(&output)
        .with_context(|| format!("failed to create {}", output.display()))?;
    for h in &hists {
        writer
            .write_hist1f(h)
            .with_context(|| format!("failed to write histogram '{}'", h.name()))?;
    }
    writer.close().with_context(|| format!("failed to finish {}", output.display()))?;

    tracing::info!(entries = tree.entries, output = %output.display(), "histograms written");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn four_histograms_in_order() {
        let s = specs();
        let names: Vec<&str> = s.iter().map(|h| h.name.as_str()).collect();
        assert_eq!(names, ["hist1", "hist2", "hist3", "hist4"]);
        assert_eq!(s[0].y_title, "counts / 25 MeV/c^{2}");
        assert_eq!(s[3].y_title, "counts / 20 MeV/c^{2}");
        assert_eq!(s[1].title, "Invariant Mass of K_{S}K_{S} (Unweighted)");
        assert_eq!(s[2].weight.as_deref(), Some("Weight"));
        assert!(s[3].weight.is_none());
        assert!(s.iter().all(|h| h.x_title == X_TITLE && h.variable == MASS_BRANCH));
    }
}
