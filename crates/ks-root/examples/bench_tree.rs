use std::time::Instant;

use ks_root::{
    Compression, HistogramSpec, LeafType, RootFile, RootWriter, TabularReader, TabularWriter,
    TreeReader, TreeWriter,
};

const ENTRIES: usize = 200_000;

fn main() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("bench_tree.root");

    // 1. Build and write a two-branch tree
    let t0 = Instant::now();
    let mut tree = TreeWriter::new("events", "benchmark");
    tree.add_branch("M_FinalState", LeafType::F32).unwrap();
    tree.add_branch("Weight", LeafType::F32).unwrap();
    for i in 0..ENTRIES {
        let m = 1.0 + (i % 1000) as f64 / 1000.0;
        let w = 0.5 + (i % 7) as f64 / 7.0;
        tree.append_values(&[m, w]).unwrap();
    }
    let mut out = RootWriter::recreate(&path).unwrap().with_compression(Compression::Zlib(1));
    out.write_tree(&tree).unwrap();
    out.close().unwrap();
    let t_write = t0.elapsed();

    // 2. Open + parse metadata
    let t1 = Instant::now();
    let file = RootFile::open(&path).unwrap();
    let tree = file.read_first_tree().unwrap();
    let t_open = t1.elapsed();

    // 3. Whole-column read (parallel basket decode)
    let t2 = Instant::now();
    let reader = TreeReader::new(&file, &tree);
    let mass = reader.column("M_FinalState").unwrap();
    let t_column = t2.elapsed();

    // 4. Entry-level copy of the first half
    let t3 = Instant::now();
    let mut short = TreeWriter::clone_schema(&tree).unwrap();
    for i in 0..(ENTRIES / 2) as u64 {
        let fields = reader.read_entry(i).unwrap();
        let refs: Vec<&[u8]> = fields.iter().map(Vec::as_slice).collect();
        short.append_entry(&refs).unwrap();
    }
    let t_copy = t3.elapsed();

    // 5. Histogram fill
    let spec = HistogramSpec {
        name: "mass".into(),
        title: String::new(),
        x_title: String::new(),
        y_title: String::new(),
        n_bins: 50,
        x_min: 1.0,
        x_max: 2.0,
        variable: "M_FinalState".into(),
        weight: Some("Weight".into()),
    };
    let t4 = Instant::now();
    let hists = ks_root::fill_histograms(&[spec], &reader).unwrap();
    let t_fill = t4.elapsed();

    println!("--- Timing ({ENTRIES} entries, 2 branches) ---");
    println!("Write (zlib-1):        {:>10.1}µs", t_write.as_nanos() as f64 / 1000.0);
    println!("Open + TTree parse:    {:>10.1}µs", t_open.as_nanos() as f64 / 1000.0);
    println!("Read 1 column:         {:>10.1}µs  ({} values)", t_column.as_nanos() as f64 / 1000.0, mass.len());
    println!("Entry copy (half):     {:>10.1}µs  ({} entries)", t_copy.as_nanos() as f64 / 1000.0, short.entry_count());
    println!("Histogram fill:        {:>10.1}µs", t_fill.as_nanos() as f64 / 1000.0);
    println!("\nIntegral: {}", hists[0].integral());
}
