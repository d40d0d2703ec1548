//! ROOT object streamers: dispatch by class name.

mod th1;
mod ttree;

pub use th1::write_th1f;
pub use ttree::{BASKET_SIZE, BranchLayout, TreeLayout, read_ttree, write_ttree};

use crate::error::{Result, RootError};
use crate::histogram::Histogram;
use crate::wbuffer::WBuffer;

/// Read a histogram from a decompressed object payload, given its class name.
pub fn read_histogram(payload: &[u8], class_name: &str) -> Result<Histogram> {
    match class_name {
        "TH1D" => th1::read_th1d(payload),
        "TH1F" => th1::read_th1f(payload),
        _ => Err(RootError::UnsupportedClass(class_name.to_string())),
    }
}

/// Stream an empty `TList` (version 5) with the given name.
pub fn write_empty_tlist(w: &mut WBuffer, name: &str) {
    let c = w.write_version(5);
    w.write_tobject();
    w.write_string(name);
    w.write_i32(0); // nobjects
    w.set_byte_count(c);
}
