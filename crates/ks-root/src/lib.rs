//! # ks-root
//!
//! Native ROOT file I/O for the kskit analysis tools.
//!
//! Reads TH1D/TH1F histograms and TTrees of flat scalar branches from
//! `.root` files without external ROOT libraries (zlib, LZ4, ZSTD and XZ
//! baskets), and writes TH1F histograms and flat TTrees back out.
//!
//! ## Example
//!
//! ```no_run
//! use ks_root::{Hist1F, RootFile, RootWriter, TabularReader, TreeReader};
//!
//! let f = RootFile::open("data.root").unwrap();
//! let tree = f.read_first_tree().unwrap();
//! let reader = TreeReader::new(&f, &tree);
//!
//! let mut h = Hist1F::new("mass", "Invariant mass", 40, 1.0, 2.0);
//! for m in reader.column("M_FinalState").unwrap() {
//!     h.fill(m);
//! }
//!
//! let mut out = RootWriter::recreate("data_hist.root").unwrap();
//! out.write_hist1f(&h).unwrap();
//! out.close().unwrap();
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod basket;
pub mod branch_reader;
pub mod compression;
pub mod directory;
pub mod error;
pub mod file;
pub mod filler;
pub mod hist1f;
pub mod histogram;
pub mod key;
pub mod objects;
pub mod rbuffer;
pub mod table;
pub mod tree;
pub mod wbuffer;
pub mod writer;

pub use branch_reader::BranchReader;
pub use compression::Compression;
pub use error::{Result, RootError};
pub use file::RootFile;
pub use filler::{HistogramSpec, fill_histograms};
pub use hist1f::Hist1F;
pub use histogram::Histogram;
pub use key::KeyInfo;
pub use table::{BranchSchema, TabularReader, TabularWriter, TreeReader, TreeWriter};
pub use tree::{BranchInfo, LeafType, Tree};
pub use writer::RootWriter;
