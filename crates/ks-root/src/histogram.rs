//! Public histogram type returned by `RootFile::get_histogram`.

/// A 1D histogram extracted from a ROOT file.
#[derive(Debug, Clone)]
pub struct Histogram {
    /// Histogram name.
    pub name: String,
    /// Histogram title.
    pub title: String,
    /// X-axis title.
    pub x_title: String,
    /// Y-axis title.
    pub y_title: String,
    /// Number of bins (excluding under/overflow).
    pub n_bins: usize,
    /// Lower edge of first bin.
    pub x_min: f64,
    /// Upper edge of last bin.
    pub x_max: f64,
    /// Bin edges (length = n_bins + 1).
    pub bin_edges: Vec<f64>,
    /// Bin contents (length = n_bins, excluding under/overflow).
    pub bin_content: Vec<f64>,
    /// Sum of weights squared per bin (length = n_bins), if stored.
    pub sumw2: Option<Vec<f64>>,
    /// Underflow bin content.
    pub underflow: f64,
    /// Overflow bin content.
    pub overflow: f64,
    /// Number of fills recorded by ROOT (`fEntries`).
    pub entries: f64,
    /// Sum of in-range weights (`fTsumw`).
    pub sum_weights: f64,
}

impl Histogram {
    /// Sum of in-range bin contents.
    pub fn integral(&self) -> f64 {
        self.bin_content.iter().sum()
    }
}
