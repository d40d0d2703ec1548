mod axes_draw;
pub mod mass_scan;
