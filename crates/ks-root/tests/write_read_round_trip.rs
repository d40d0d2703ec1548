//! Integration tests: files written by `RootWriter` read back through `RootFile`.

use approx::assert_relative_eq;
use ks_root::{Compression, Hist1F, LeafType, RootFile, RootWriter, TreeWriter};
use std::path::Path;

fn mass_hist(n_bins: usize, weighted: bool) -> Hist1F {
    let mut h = Hist1F::new("hist1", "Invariant Mass of K_{S}K_{S}", n_bins, 1.0, 2.0)
        .with_axis_titles("IM(K_{S}K_{S}) (GeV/c^{2})", "counts / 25 MeV/c^{2}");
    for i in 0..500 {
        let x = 0.9 + i as f64 * 0.0025;
        if weighted {
            h.fill_weighted(x, 0.5 + (i % 3) as f64 * 0.25);
        } else {
            h.fill(x);
        }
    }
    h
}

fn write_hist(path: &Path, h: &Hist1F, compression: Compression) {
    let mut w = RootWriter::recreate(path).expect("create output").with_compression(compression);
    w.write_hist1f(h).expect("write histogram");
    w.close().expect("close output");
}

#[test]
fn histogram_round_trip_uncompressed() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("h.root");
    let h = mass_hist(40, false);
    write_hist(&path, &h, Compression::None);

    let f = RootFile::open(&path).expect("open written file");
    let keys = f.list_keys().unwrap();
    assert_eq!(keys.len(), 1);
    assert_eq!(keys[0].class_name, "TH1F");

    let back = f.get_histogram("hist1").expect("read histogram");
    assert_eq!(back.n_bins, 40);
    assert_eq!(back.title, "Invariant Mass of K_{S}K_{S}");
    assert_eq!(back.x_title, "IM(K_{S}K_{S}) (GeV/c^{2})");
    assert_eq!(back.y_title, "counts / 25 MeV/c^{2}");
    assert_relative_eq!(back.x_min, 1.0);
    assert_relative_eq!(back.x_max, 2.0);
    assert_eq!(back.bin_edges.len(), 41);
    assert_relative_eq!(back.bin_edges[1], 1.025, epsilon = 1e-12);
    for i in 0..40 {
        assert_eq!(back.bin_content[i], h.bin_content(i + 1) as f64, "bin {i}");
    }
    assert_eq!(back.underflow, h.underflow() as f64);
    assert_eq!(back.overflow, h.overflow() as f64);
    assert_eq!(back.entries, 500.0);
    assert!(back.sumw2.is_none());
}

#[test]
fn weighted_histogram_round_trip_compressed() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("hw.root");
    let h = mass_hist(50, true);
    write_hist(&path, &h, Compression::Zlib(1));

    let f = RootFile::open(&path).unwrap();
    let back = f.get_histogram("hist1").unwrap();
    assert_eq!(back.n_bins, 50);
    assert_relative_eq!(back.integral(), h.integral(), epsilon = 1e-9);
    assert_relative_eq!(back.sum_weights, h.sum_weights(), epsilon = 1e-9);
    let sumw2 = back.sumw2.expect("weighted fill stores sumw2");
    let expected = h.sumw2().unwrap();
    for i in 0..50 {
        assert_relative_eq!(sumw2[i], expected[i + 1], epsilon = 1e-12);
    }
}

#[test]
fn histograms_keep_write_order() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("order.root");
    let mut w = RootWriter::recreate(&path).unwrap();
    for name in ["hist1", "hist2", "hist3", "hist4"] {
        w.write_hist1f(&Hist1F::new(name, "", 10, 1.0, 2.0)).unwrap();
    }
    w.close().unwrap();

    let f = RootFile::open(&path).unwrap();
    let names: Vec<String> = f.list_keys().unwrap().into_iter().map(|k| k.name).collect();
    assert_eq!(names, ["hist1", "hist2", "hist3", "hist4"]);
    assert_eq!(f.first_key().unwrap().name, "hist1");
}

fn sample_tree(n: usize) -> TreeWriter {
    let mut t = TreeWriter::new("kskstree", "K_{S}K_{S} events");
    t.add_branch("M_FinalState", LeafType::F32).unwrap();
    t.add_branch("Weight", LeafType::F32).unwrap();
    t.add_branch("run", LeafType::I32).unwrap();
    t.add_branch("event", LeafType::U64).unwrap();
    for i in 0..n {
        let m = 1.0 + (i % 100) as f64 / 100.0;
        t.append_values(&[m, 0.25 * (i % 4) as f64, 42.0, i as f64]).unwrap();
    }
    t
}

fn tree_round_trip(compression: Compression, n: usize) {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("t.root");
    let written = sample_tree(n);
    let mut w = RootWriter::recreate(&path).unwrap().with_compression(compression);
    w.write_tree(&written).unwrap();
    w.close().unwrap();

    let f = RootFile::open(&path).unwrap();
    let first = f.first_key().unwrap();
    assert_eq!((first.name.as_str(), first.class_name.as_str()), ("kskstree", "TTree"));

    let tree = f.read_first_tree().unwrap();
    assert_eq!(tree.name, "kskstree");
    assert_eq!(tree.title, "K_{S}K_{S} events");
    assert_eq!(tree.entries, n as u64);
    assert_eq!(tree.branch_names(), ["M_FinalState", "Weight", "run", "event"]);

    let types: Vec<LeafType> = tree.branches.iter().map(|b| b.scalar_type().unwrap()).collect();
    assert_eq!(types, [LeafType::F32, LeafType::F32, LeafType::I32, LeafType::U64]);

    for (i, b) in tree.branches.iter().enumerate() {
        let raw = f.branch_reader(&tree, &b.name).unwrap().read_raw().unwrap();
        assert_eq!(raw, written.column(i), "branch {}", b.name);
    }
    let event = f.branch_data(&tree, "event").unwrap();
    assert_eq!(event.last().copied(), n.checked_sub(1).map(|v| v as f64));
}

#[test]
fn tree_round_trip_uncompressed() {
    tree_round_trip(Compression::None, 1000);
}

#[test]
fn tree_round_trip_compressed_many_baskets() {
    // 20000 f32 entries do not fit one 32000-byte basket
    tree_round_trip(Compression::Zlib(6), 20_000);
}

#[test]
fn empty_tree_keeps_schema() {
    tree_round_trip(Compression::default(), 0);
}

#[test]
fn recreate_replaces_existing_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("again.root");
    std::fs::write(&path, b"not a root file at all").unwrap();

    write_hist(&path, &mass_hist(40, false), Compression::default());
    let first = std::fs::read(&path).unwrap();
    write_hist(&path, &mass_hist(40, false), Compression::default());
    let second = std::fs::read(&path).unwrap();
    assert_eq!(first, second, "rewrites are byte-identical");
    assert!(RootFile::open(&path).is_ok());
}
