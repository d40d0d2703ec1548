//! Single-pass histogram filling from tabular data with optional weights.

use std::collections::HashMap;

use crate::error::{Result, RootError};
use crate::hist1f::Hist1F;
use crate::table::TabularReader;

/// Specification for filling one fixed-binning histogram.
#[derive(Debug, Clone, PartialEq)]
pub struct HistogramSpec {
    /// Histogram name.
    pub name: String,
    /// Histogram title.
    pub title: String,
    /// X-axis title.
    pub x_title: String,
    /// Y-axis title.
    pub y_title: String,
    /// Number of bins.
    pub n_bins: usize,
    /// Lower edge of the first bin.
    pub x_min: f64,
    /// Upper edge of the last bin.
    pub x_max: f64,
    /// Field holding the observable.
    pub variable: String,
    /// Field holding the per-entry weight; `None` fills with weight 1.
    pub weight: Option<String>,
}

impl HistogramSpec {
    fn book(&self) -> Hist1F {
        Hist1F::new(&self.name, &self.title, self.n_bins, self.x_min, self.x_max)
            .with_axis_titles(&self.x_title, &self.y_title)
    }
}

/// Fill every histogram in `specs` in a single pass over `table`.
///
/// Each referenced field is fetched once, however many specs use it.
/// Unweighted specs go through [`Hist1F::fill`], weighted ones through
/// [`Hist1F::fill_weighted`], entry by entry in table order.
pub fn fill_histograms(specs: &[HistogramSpec], table: &impl TabularReader) -> Result<Vec<Hist1F>> {
    if specs.is_empty() {
        return Ok(Vec::new());
    }

    let n_entries = table.entry_count() as usize;
    let mut columns: HashMap<&str, Vec<f64>> = HashMap::new();
    for spec in specs {
        for field in std::iter::once(&spec.variable).chain(spec.weight.as_ref()) {
            if !columns.contains_key(field.as_str()) {
                let values = table.column(field)?;
                log::debug!("fetched column '{field}' ({} values)", values.len());
                if values.len() != n_entries {
                    return Err(RootError::Deserialization(format!(
                        "column '{field}' holds {} values, table has {n_entries} entries",
                        values.len()
                    )));
                }
                columns.insert(field, values);
            }
        }
    }

    let mut hists: Vec<Hist1F> = specs.iter().map(HistogramSpec::book).collect();
    let inputs: Vec<(&[f64], Option<&[f64]>)> = specs
        .iter()
        .map(|s| {
            (
                columns[s.variable.as_str()].as_slice(),
                s.weight.as_deref().map(|w| columns[w].as_slice()),
            )
        })
        .collect();

    for entry in 0..n_entries {
        for (hist, &(values, weights)) in hists.iter_mut().zip(&inputs) {
            match weights {
                Some(w) => hist.fill_weighted(values[entry], w[entry]),
                None => hist.fill(values[entry]),
            };
        }
    }

    Ok(hists)
}
