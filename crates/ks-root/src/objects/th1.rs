//! TH1D and TH1F streamers.
//!
//! Layout:
//! ```text
//! TH1D (or TH1F)
//!   └─ TH1 (base)
//!        ├─ TNamed (name, title)
//!        ├─ TAttLine, TAttFill, TAttMarker
//!        ├─ fNcells (i32)
//!        ├─ fXaxis, fYaxis, fZaxis (TAxis)
//!        ├─ fBarOffset, fBarWidth, fEntries, fTsumw, fTsumw2, fTsumwx, fTsumwx2
//!        ├─ fMaximum, fMinimum, fNormFactor
//!        ├─ fContour, fSumw2 (TArrayD)
//!        ├─ fOption (TString), fFunctions (TList)
//!        └─ fBufferSize + fBuffer, fBinStatErrOpt, fStatOverflows
//!   └─ TArrayD / TArrayF (bin contents, under/overflow included)
//! ```

use crate::error::{Result, RootError};
use crate::hist1f::Hist1F;
use crate::histogram::Histogram;
use crate::objects::ttree::{write_att_fill, write_att_line_color, write_att_marker};
use crate::objects::write_empty_tlist;
use crate::rbuffer::RBuffer;
use crate::wbuffer::WBuffer;

/// Read a TH1D from decompressed object bytes.
pub fn read_th1d(data: &[u8]) -> Result<Histogram> {
    let mut r = RBuffer::new(data);
    r.read_version()?;
    let base = read_th1_base(&mut r)?;
    let n = read_array_len(&mut r, base.n_cells, "TH1D")?;
    let cells = r.read_array_f64(n)?;
    build_histogram(base, &cells)
}

/// Read a TH1F from decompressed object bytes.
pub fn read_th1f(data: &[u8]) -> Result<Histogram> {
    let mut r = RBuffer::new(data);
    r.read_version()?;
    let base = read_th1_base(&mut r)?;
    let n = read_array_len(&mut r, base.n_cells, "TH1F")?;
    let cells: Vec<f64> = r.read_array_f32(n)?.into_iter().map(f64::from).collect();
    build_histogram(base, &cells)
}

fn read_array_len(r: &mut RBuffer, n_cells: usize, class: &str) -> Result<usize> {
    let n = r.read_i32()?.max(0) as usize;
    if n != n_cells {
        return Err(RootError::Deserialization(format!(
            "{class} array size {n} != fNcells {n_cells}"
        )));
    }
    Ok(n)
}

/// Axis info extracted from TAxis.
struct AxisInfo {
    title: String,
    n_bins: usize,
    x_min: f64,
    x_max: f64,
    /// Variable-width bin edges (empty for uniform binning).
    bin_edges: Vec<f64>,
}

/// Fields of the TH1 base class the public type carries.
struct Th1Base {
    name: String,
    title: String,
    n_cells: usize,
    x_axis: AxisInfo,
    y_title: String,
    entries: f64,
    tsumw: f64,
    sumw2: Option<Vec<f64>>,
}

fn read_th1_base(r: &mut RBuffer) -> Result<Th1Base> {
    let (th1_ver, th1_end) = r.read_version()?;

    let (name, title) = r.read_tnamed()?;

    // TAttLine, TAttFill, TAttMarker
    r.skip_versioned()?;
    r.skip_versioned()?;
    r.skip_versioned()?;

    let n_cells = r.read_i32()?.max(0) as usize;

    let x_axis = read_taxis(r)?;
    let y_axis = read_taxis(r)?;
    r.skip_versioned()?; // fZaxis

    let _bar_offset = r.read_i16()?;
    let _bar_width = r.read_i16()?;
    let entries = r.read_f64()?;
    let tsumw = r.read_f64()?;
    let _tsumw2 = r.read_f64()?;
    let _tsumwx = r.read_f64()?;
    let _tsumwx2 = r.read_f64()?;
    if th1_ver >= 2 {
        let _max = r.read_f64()?;
        let _min = r.read_f64()?;
    }
    if th1_ver >= 3 {
        let _norm = r.read_f64()?;
    }

    let contour_n = r.read_i32()?.max(0) as usize;
    r.skip(contour_n * 8)?;

    let sumw2_n = r.read_i32()?.max(0) as usize;
    let sumw2 = if sumw2_n > 0 { Some(r.read_array_f64(sumw2_n)?) } else { None };

    let _option = r.read_string()?;
    r.skip_versioned()?; // fFunctions

    if th1_ver >= 4 {
        let buf_size = r.read_i32()?.max(0) as usize;
        // fBuffer: flag byte, then buf_size doubles when present
        if r.read_u8()? != 0 {
            r.skip(buf_size * 8)?;
        }
    }
    if th1_ver >= 7 {
        let _err_opt = r.read_i32()?;
    }
    if th1_ver >= 8 {
        let _stat_overflows = r.read_i32()?;
    }

    if let Some(end) = th1_end {
        r.set_pos(end);
    }

    Ok(Th1Base {
        name,
        title,
        n_cells,
        x_axis,
        y_title: y_axis.title,
        entries,
        tsumw,
        sumw2,
    })
}

fn read_taxis(r: &mut RBuffer) -> Result<AxisInfo> {
    let (_ver, axis_end) = r.read_version()?;
    let axis_end =
        axis_end.ok_or_else(|| RootError::Deserialization("TAxis missing byte count".into()))?;

    let (_name, title) = r.read_tnamed()?;
    r.skip_versioned()?; // TAttAxis

    let n_bins = r.read_i32()?.max(0) as usize;
    let x_min = r.read_f64()?;
    let x_max = r.read_f64()?;

    let xbins_n = r.read_i32()?.max(0) as usize;
    let bin_edges = if xbins_n > 0 { r.read_array_f64(xbins_n)? } else { Vec::new() };

    r.set_pos(axis_end);

    Ok(AxisInfo { title, n_bins, x_min, x_max, bin_edges })
}

fn build_histogram(base: Th1Base, cells: &[f64]) -> Result<Histogram> {
    let axis = &base.x_axis;
    let n_bins = axis.n_bins;
    if cells.len() != n_bins + 2 {
        return Err(RootError::Deserialization(format!(
            "{} cells for {} bins",
            cells.len(),
            n_bins
        )));
    }

    let sumw2 = base.sumw2.map(|sw2| {
        if sw2.len() == cells.len() { sw2[1..=n_bins].to_vec() } else { sw2 }
    });

    let bin_edges = if axis.bin_edges.len() == n_bins + 1 {
        axis.bin_edges.clone()
    } else {
        let width = (axis.x_max - axis.x_min) / n_bins as f64;
        (0..=n_bins).map(|i| axis.x_min + i as f64 * width).collect()
    };

    Ok(Histogram {
        name: base.name,
        title: base.title,
        x_title: axis.title.clone(),
        y_title: base.y_title,
        n_bins,
        x_min: axis.x_min,
        x_max: axis.x_max,
        bin_edges,
        bin_content: cells[1..=n_bins].to_vec(),
        sumw2,
        underflow: cells[0],
        overflow: cells[n_bins + 1],
        entries: base.entries,
        sum_weights: base.tsumw,
    })
}

// ── writing ────────────────────────────────────────────────────

/// Stream a `Hist1F` as a TH1F (class version 3, TH1 version 8).
pub fn write_th1f(w: &mut WBuffer, h: &Hist1F) {
    let th1f = w.write_version(3);
    let th1 = w.write_version(8);

    w.write_tnamed(h.name(), h.title());
    write_att_line_color(w, 602);
    write_att_fill(w, 0, 1001);
    write_att_marker(w);
    w.write_i32(h.cells().len() as i32); // fNcells

    write_taxis(w, "xaxis", h.x_title(), h.n_bins(), h.x_min(), h.x_max());
    write_taxis(w, "yaxis", h.y_title(), 1, 0.0, 1.0);
    write_taxis(w, "zaxis", "", 1, 0.0, 1.0);

    let [tsumw, tsumw2, tsumwx, tsumwx2] = h.stats();
    w.write_i16(0); // fBarOffset
    w.write_i16(1000); // fBarWidth
    w.write_f64(h.entries());
    w.write_f64(tsumw);
    w.write_f64(tsumw2);
    w.write_f64(tsumwx);
    w.write_f64(tsumwx2);
    w.write_f64(-1111.0); // fMaximum
    w.write_f64(-1111.0); // fMinimum
    w.write_f64(0.0); // fNormFactor
    w.write_tarray_f64(&[]); // fContour
    w.write_tarray_f64(h.sumw2().unwrap_or(&[]));
    w.write_string(""); // fOption
    write_empty_tlist(w, ""); // fFunctions
    w.write_i32(0); // fBufferSize
    w.write_u8(0); // fBuffer
    w.write_i32(0); // fBinStatErrOpt
    w.write_i32(2); // fStatOverflows (kNeutral)
    w.set_byte_count(th1);

    w.write_tarray_f32(h.cells());
    w.set_byte_count(th1f);
}

fn write_taxis(w: &mut WBuffer, name: &str, title: &str, n_bins: usize, lo: f64, hi: f64) {
    let c = w.write_version(10);
    w.write_tnamed(name, title);

    let att = w.write_version(4);
    w.write_i32(510); // fNdivisions
    w.write_i16(1); // fAxisColor
    w.write_i16(1); // fLabelColor
    w.write_i16(42); // fLabelFont
    w.write_f32(0.005); // fLabelOffset
    w.write_f32(0.035); // fLabelSize
    w.write_f32(0.03); // fTickLength
    w.write_f32(1.0); // fTitleOffset
    w.write_f32(0.035); // fTitleSize
    w.write_i16(1); // fTitleColor
    w.write_i16(42); // fTitleFont
    w.set_byte_count(att);

    w.write_i32(n_bins as i32);
    w.write_f64(lo);
    w.write_f64(hi);
    w.write_tarray_f64(&[]); // fXbins
    w.write_i32(0); // fFirst
    w.write_i32(0); // fLast
    w.write_u16(0); // fBits2
    w.write_u8(0); // fTimeDisplay
    w.write_string(""); // fTimeFormat
    w.write_null_pointer(); // fLabels
    w.write_null_pointer(); // fModLabs
    w.set_byte_count(c);
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn filled() -> Hist1F {
        let mut h = Hist1F::new("hist1", "Invariant Mass of K_{S}K_{S}", 40, 1.0, 2.0)
            .with_axis_titles("IM(K_{S}K_{S}) (GeV/c^{2})", "counts / 25 MeV/c^{2}");
        for i in 0..120 {
            let x = 0.9 + i as f64 * 0.01;
            h.fill_weighted(x, 0.5 + (i % 4) as f64 * 0.25);
        }
        h
    }

    #[test]
    fn th1f_round_trip() {
        let h = filled();
        let mut w = WBuffer::new();
        write_th1f(&mut w, &h);
        let back = read_th1f(w.as_slice()).unwrap();

        assert_eq!(back.name, "hist1");
        assert_eq!(back.title, "Invariant Mass of K_{S}K_{S}");
        assert_eq!(back.x_title, "IM(K_{S}K_{S}) (GeV/c^{2})");
        assert_eq!(back.y_title, "counts / 25 MeV/c^{2}");
        assert_eq!(back.n_bins, 40);
        assert_eq!(back.bin_edges.len(), 41);
        assert_relative_eq!(back.bin_edges[1], 1.025);
        assert_eq!(back.entries, 120.0);
        assert_relative_eq!(back.sum_weights, h.sum_weights());
        assert_relative_eq!(back.underflow, h.underflow() as f64);
        assert_relative_eq!(back.overflow, h.overflow() as f64);
        for (i, &c) in back.bin_content.iter().enumerate() {
            assert_eq!(c, h.bin_content(i + 1) as f64);
        }
        let sumw2 = back.sumw2.unwrap();
        assert_eq!(sumw2.len(), 40);
        assert_relative_eq!(sumw2[5], h.sumw2().unwrap()[6]);
    }

    #[test]
    fn unweighted_histogram_has_no_sumw2() {
        let mut h = Hist1F::new("hist2", "", 50, 1.0, 2.0);
        h.fill(1.5);
        let mut w = WBuffer::new();
        write_th1f(&mut w, &h);
        let back = read_th1f(w.as_slice()).unwrap();
        assert!(back.sumw2.is_none());
        assert_eq!(back.bin_content[25], 1.0);
    }

    #[test]
    fn th1d_reader_rejects_float_payload() {
        let h = filled();
        let mut w = WBuffer::new();
        write_th1f(&mut w, &h);
        // f32 cells are too short to be read as f64 cells
        assert!(read_th1d(w.as_slice()).is_err());
    }
}
