//! `Hist1F`: a fixed-binning 1D accumulator with `TH1F` fill semantics.

/// A one-dimensional histogram with single-precision bin storage.
///
/// Cell 0 is the underflow, cells `1..=n_bins` are the bins and cell
/// `n_bins + 1` is the overflow. Per-bin sums of squared weights are kept
/// only once a fill with a weight other than 1 has been seen.
#[derive(Debug, Clone)]
pub struct Hist1F {
    name: String,
    title: String,
    x_title: String,
    y_title: String,
    n_bins: usize,
    x_min: f64,
    x_max: f64,
    cells: Vec<f32>,
    sumw2: Option<Vec<f64>>,
    entries: f64,
    tsumw: f64,
    tsumw2: f64,
    tsumwx: f64,
    tsumwx2: f64,
}

impl Hist1F {
    /// Create an empty histogram with `n_bins` equal bins over `[x_min, x_max)`.
    ///
    /// # Panics
    ///
    /// Panics if `n_bins` is zero or the range is empty.
    pub fn new(name: &str, title: &str, n_bins: usize, x_min: f64, x_max: f64) -> Self {
        assert!(n_bins > 0, "histogram needs at least one bin");
        assert!(x_max > x_min, "histogram range [{x_min}, {x_max}) is empty");
        Self {
            name: name.to_string(),
            title: title.to_string(),
            x_title: String::new(),
            y_title: String::new(),
            n_bins,
            x_min,
            x_max,
            cells: vec![0.0; n_bins + 2],
            sumw2: None,
            entries: 0.0,
            tsumw: 0.0,
            tsumw2: 0.0,
            tsumwx: 0.0,
            tsumwx2: 0.0,
        }
    }

    /// Set the axis titles.
    pub fn with_axis_titles(mut self, x_title: &str, y_title: &str) -> Self {
        self.x_title = x_title.to_string();
        self.y_title = y_title.to_string();
        self
    }

    /// Cell index for `x`: 0 below range, `n_bins + 1` at or above the upper
    /// edge (NaN included).
    pub fn find_bin(&self, x: f64) -> usize {
        if x < self.x_min {
            0
        } else if !(x < self.x_max) {
            self.n_bins + 1
        } else {
            let pos = self.n_bins as f64 * (x - self.x_min) / (self.x_max - self.x_min);
            1 + (pos as usize).min(self.n_bins - 1)
        }
    }

    /// Fill with unit weight. Returns the cell index.
    pub fn fill(&mut self, x: f64) -> usize {
        let bin = self.find_bin(x);
        self.entries += 1.0;
        self.cells[bin] += 1.0;
        if let Some(sumw2) = self.sumw2.as_mut() {
            sumw2[bin] += 1.0;
        }
        if bin == 0 || bin > self.n_bins {
            return bin;
        }
        self.tsumw += 1.0;
        self.tsumw2 += 1.0;
        self.tsumwx += x;
        self.tsumwx2 += x * x;
        bin
    }

    /// Fill with weight `w`. Returns the cell index.
    pub fn fill_weighted(&mut self, x: f64, w: f64) -> usize {
        if self.sumw2.is_none() && w != 1.0 {
            self.enable_sumw2();
        }
        let bin = self.find_bin(x);
        self.entries += 1.0;
        self.cells[bin] += w as f32;
        if let Some(sumw2) = self.sumw2.as_mut() {
            sumw2[bin] += w * w;
        }
        if bin == 0 || bin > self.n_bins {
            return bin;
        }
        self.tsumw += w;
        self.tsumw2 += w * w;
        self.tsumwx += w * x;
        self.tsumwx2 += w * x * x;
        bin
    }

    /// Start tracking per-bin squared weights, seeded from current contents.
    pub fn enable_sumw2(&mut self) {
        if self.sumw2.is_none() {
            self.sumw2 = Some(self.cells.iter().map(|&c| c as f64).collect());
        }
    }

    /// Histogram name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Histogram title.
    pub fn title(&self) -> &str {
        &self.title
    }

    /// X-axis title.
    pub fn x_title(&self) -> &str {
        &self.x_title
    }

    /// Y-axis title.
    pub fn y_title(&self) -> &str {
        &self.y_title
    }

    /// Number of in-range bins.
    pub fn n_bins(&self) -> usize {
        self.n_bins
    }

    /// Lower edge of the range.
    pub fn x_min(&self) -> f64 {
        self.x_min
    }

    /// Upper edge of the range.
    pub fn x_max(&self) -> f64 {
        self.x_max
    }

    /// Width of every bin.
    pub fn bin_width(&self) -> f64 {
        (self.x_max - self.x_min) / self.n_bins as f64
    }

    /// Content of cell `i` (0 = underflow, `n_bins + 1` = overflow).
    pub fn bin_content(&self, i: usize) -> f32 {
        self.cells[i]
    }

    /// All cells including underflow and overflow.
    pub fn cells(&self) -> &[f32] {
        &self.cells
    }

    /// Per-cell sums of squared weights, when tracked.
    pub fn sumw2(&self) -> Option<&[f64]> {
        self.sumw2.as_deref()
    }

    /// Underflow content.
    pub fn underflow(&self) -> f32 {
        self.cells[0]
    }

    /// Overflow content.
    pub fn overflow(&self) -> f32 {
        self.cells[self.n_bins + 1]
    }

    /// Number of fills, in range or not.
    pub fn entries(&self) -> f64 {
        self.entries
    }

    /// Sum of in-range weights.
    pub fn sum_weights(&self) -> f64 {
        self.tsumw
    }

    /// Running statistics `(Σw, Σw², Σwx, Σwx²)` over in-range fills.
    pub fn stats(&self) -> [f64; 4] {
        [self.tsumw, self.tsumw2, self.tsumwx, self.tsumwx2]
    }

    /// Sum of in-range bin contents.
    pub fn integral(&self) -> f64 {
        self.cells[1..=self.n_bins].iter().map(|&c| c as f64).sum()
    }

    /// Weighted mean of in-range fills (0 if empty).
    pub fn mean(&self) -> f64 {
        if self.tsumw == 0.0 { 0.0 } else { self.tsumwx / self.tsumw }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn bins_and_flows() {
        let mut h = Hist1F::new("h", "", 40, 1.0, 2.0);
        assert_eq!(h.fill(0.99), 0);
        assert_eq!(h.fill(1.0), 1);
        assert_eq!(h.fill(1.024), 1);
        assert_eq!(h.fill(1.03), 2);
        assert_eq!(h.fill(1.999), 40);
        assert_eq!(h.fill(2.0), 41);
        assert_eq!(h.fill(f64::NAN), 41);

        assert_eq!(h.entries(), 7.0);
        assert_eq!(h.underflow(), 1.0);
        assert_eq!(h.overflow(), 2.0);
        assert_relative_eq!(h.integral(), 4.0);
        assert_relative_eq!(h.sum_weights(), 4.0);
        assert!(h.sumw2().is_none());
    }

    #[test]
    fn non_unit_weight_enables_sumw2() {
        let mut h = Hist1F::new("h", "", 10, 0.0, 1.0);
        h.fill(0.05);
        h.fill_weighted(0.05, 1.0);
        assert!(h.sumw2().is_none());

        h.fill_weighted(0.05, 0.5);
        let sumw2 = h.sumw2().unwrap();
        // 1 + 1 seeded from contents, then 0.25
        assert_relative_eq!(sumw2[1], 2.25);
        assert_relative_eq!(h.bin_content(1), 2.5f32);
        assert_eq!(h.entries(), 3.0);
    }

    #[test]
    fn out_of_range_fills_skip_statistics() {
        let mut h = Hist1F::new("h", "", 10, 0.0, 1.0);
        h.fill_weighted(-1.0, 3.0);
        h.fill_weighted(5.0, 2.0);
        h.fill_weighted(0.5, 2.0);

        assert_eq!(h.entries(), 3.0);
        let [sw, sw2, swx, swx2] = h.stats();
        assert_relative_eq!(sw, 2.0);
        assert_relative_eq!(sw2, 4.0);
        assert_relative_eq!(swx, 1.0);
        assert_relative_eq!(swx2, 0.5);
        assert_relative_eq!(h.mean(), 0.5);
        assert_relative_eq!(h.underflow(), 3.0f32);
        assert_relative_eq!(h.overflow(), 2.0f32);
    }

    #[test]
    fn weighted_sum_matches_total_weight() {
        let mut h = Hist1F::new("h", "", 50, 1.0, 2.0);
        let mut total = 0.0;
        for i in 0..200 {
            let x = 1.0 + (i as f64) / 200.0;
            let w = 0.5 + (i % 3) as f64 * 0.25;
            total += w;
            h.fill_weighted(x, w);
        }
        assert_relative_eq!(h.integral(), total, max_relative = 1e-6);
    }

    #[test]
    fn bin_width() {
        let h = Hist1F::new("h", "", 40, 1.0, 2.0).with_axis_titles("x", "y");
        assert_relative_eq!(h.bin_width(), 0.025);
        assert_eq!(h.x_title(), "x");
        assert_eq!(h.cells().len(), 42);
    }

    #[test]
    #[should_panic]
    fn zero_bins_panics() {
        let _ = Hist1F::new("h", "", 0, 0.0, 1.0);
    }
}
