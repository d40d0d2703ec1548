//! Integration tests: entry-level reads, schema cloning and filling from a
//! tree on disk.

use approx::assert_relative_eq;
use ks_root::{
    Compression, HistogramSpec, LeafType, RootError, RootFile, RootWriter, TabularReader,
    TabularWriter, TreeReader, TreeWriter, fill_histograms,
};
use std::path::{Path, PathBuf};

/// `n` entries: `M_FinalState` spread over [1, 2), `Weight` cycling 0.5, 1, 1.5.
fn write_events(dir: &Path, n: usize, compression: Compression) -> PathBuf {
    let path = dir.join("events.root");
    let mut t = TreeWriter::new("kskstree", "");
    t.add_branch("M_FinalState", LeafType::F32).unwrap();
    t.add_branch("Weight", LeafType::F32).unwrap();
    t.add_branch("nTracks", LeafType::I16).unwrap();
    for i in 0..n {
        let m = 1.0 + (i as f64 + 0.5) / n as f64;
        let w = 0.5 * (1 + i % 3) as f64;
        t.append_values(&[m, w, (i % 5) as f64]).unwrap();
    }
    let mut out = RootWriter::recreate(&path).unwrap().with_compression(compression);
    out.write_tree(&t).unwrap();
    out.close().unwrap();
    path
}

#[test]
fn read_field_by_entry() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_events(dir.path(), 10, Compression::None);
    let f = RootFile::open(&path).unwrap();
    let tree = f.read_first_tree().unwrap();
    let reader = TreeReader::new(&f, &tree);

    assert_eq!(reader.entry_count(), 10);
    assert_relative_eq!(reader.read_field("M_FinalState", 0).unwrap(), 1.05, epsilon = 1e-6);
    assert_relative_eq!(reader.read_field("Weight", 4).unwrap(), 1.0);
    assert_eq!(reader.read_field("nTracks", 7).unwrap(), 2.0);

    assert!(matches!(
        reader.read_field("M_FinalState", 10),
        Err(RootError::EntryOutOfRange { index: 10, entries: 10 })
    ));
    assert!(matches!(reader.read_field("Mass", 0), Err(RootError::BranchNotFound(_))));
}

#[test]
fn column_matches_entry_reads() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_events(dir.path(), 20_000, Compression::Zlib(1));
    let f = RootFile::open(&path).unwrap();
    let tree = f.read_first_tree().unwrap();
    let reader = TreeReader::new(&f, &tree);

    let column = reader.column("Weight").unwrap();
    assert_eq!(column.len(), 20_000);
    for i in [0u64, 7999, 8000, 8001, 19_999] {
        assert_eq!(column[i as usize], reader.read_field("Weight", i).unwrap(), "entry {i}");
    }
}

#[test]
fn copy_prefix_preserves_bytes() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_events(dir.path(), 12_000, Compression::default());
    let f = RootFile::open(&path).unwrap();
    let tree = f.read_first_tree().unwrap();
    let reader = TreeReader::new(&f, &tree);

    let mut short = TreeWriter::clone_schema(&tree).unwrap();
    assert_eq!(short.name(), "kskstree");
    assert_eq!(short.entry_count(), 0);
    for i in 0..9000 {
        let fields = reader.read_entry(i).unwrap();
        let refs: Vec<&[u8]> = fields.iter().map(Vec::as_slice).collect();
        short.append_entry(&refs).unwrap();
    }

    let out_path = dir.path().join("events_short.root");
    let mut out = RootWriter::recreate(&out_path).unwrap();
    out.write_tree(&short).unwrap();
    out.close().unwrap();

    let g = RootFile::open(&out_path).unwrap();
    let copy = g.read_first_tree().unwrap();
    assert_eq!(copy.entries, 9000);
    for name in ["M_FinalState", "Weight", "nTracks"] {
        let orig = f.branch_reader(&tree, name).unwrap().read_prefix(9000).unwrap();
        let back = g.branch_reader(&copy, name).unwrap().read_raw().unwrap();
        assert_eq!(orig, back, "branch {name}");
    }
}

#[test]
fn prefix_read_skips_later_baskets() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_events(dir.path(), 20_000, Compression::None);
    let mut bytes = std::fs::read(&path).unwrap();

    let tree = RootFile::open(&path).unwrap().read_first_tree().unwrap();
    let mass = tree.branch("M_FinalState").unwrap();
    assert_eq!(mass.n_baskets, 3);
    // break the record length of the last basket
    let last = mass.basket_seek[2] as usize;
    bytes[last..last + 4].copy_from_slice(&u32::MAX.to_be_bytes());

    let f = RootFile::from_bytes(bytes, path).unwrap();
    let reader = f.branch_reader(&tree, "M_FinalState").unwrap();
    assert_eq!(reader.read_prefix(16_000).unwrap().len(), 16_000 * 4);
    assert!(reader.read_raw().is_err());

    let entries = TreeReader::new(&f, &tree);
    assert!(entries.read_entry(15_999).is_ok());
    assert!(entries.read_entry(16_000).is_err());
}

#[test]
fn hundred_uniform_entries_fill_four_histograms() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("uniform.root");
    let mut t = TreeWriter::new("kskstree", "");
    t.add_branch("M_FinalState", LeafType::F32).unwrap();
    t.add_branch("Weight", LeafType::F32).unwrap();
    for i in 0..100 {
        t.append_values(&[1.0 + i as f64 / 100.0, 1.0]).unwrap();
    }
    let mut out = RootWriter::recreate(&path).unwrap();
    out.write_tree(&t).unwrap();
    out.close().unwrap();

    let f = RootFile::open(&path).unwrap();
    let tree = f.read_first_tree().unwrap();
    let reader = TreeReader::new(&f, &tree);

    let spec = |name: &str, n_bins: usize, weight: Option<&str>| HistogramSpec {
        name: name.into(),
        title: String::new(),
        x_title: String::new(),
        y_title: String::new(),
        n_bins,
        x_min: 1.0,
        x_max: 2.0,
        variable: "M_FinalState".into(),
        weight: weight.map(Into::into),
    };
    let specs = [
        spec("hist1", 40, Some("Weight")),
        spec("hist2", 40, None),
        spec("hist3", 50, Some("Weight")),
        spec("hist4", 50, None),
    ];
    let hists = fill_histograms(&specs, &reader).unwrap();
    for h in &hists {
        assert_eq!(h.entries(), 100.0, "{}", h.name());
        assert_relative_eq!(h.integral(), 100.0);
        assert!(h.sumw2().is_none(), "unit weights never enable sumw2");
    }
}

#[test]
fn branch_shorter_than_tree_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_events(dir.path(), 10, Compression::None);
    let f = RootFile::open(&path).unwrap();
    let mut tree = f.read_first_tree().unwrap();
    let weight = tree.branches.iter_mut().find(|b| b.name == "Weight").unwrap();
    weight.entries = 5;
    let reader = TreeReader::new(&f, &tree);

    assert!(matches!(reader.column("Weight"), Err(RootError::Deserialization(_))));
    assert_eq!(reader.column("M_FinalState").unwrap().len(), 10);

    let spec = HistogramSpec {
        name: "h".into(),
        title: String::new(),
        x_title: String::new(),
        y_title: String::new(),
        n_bins: 10,
        x_min: 1.0,
        x_max: 2.0,
        variable: "M_FinalState".into(),
        weight: Some("Weight".into()),
    };
    assert!(matches!(fill_histograms(&[spec], &reader), Err(RootError::Deserialization(_))));
}
