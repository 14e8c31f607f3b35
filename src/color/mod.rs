//! Colormaps and lookup tables.
//!
//! - [`Colormap`]: which colors to use (named ramp, color list, raw table)
//! - [`ColorLookupTable`]: a colormap laid out over fmin/fmid/fmax limits

mod colormap;
mod lut;

pub use colormap::{parse_color, Colormap, NamedRamp, Rgba};
pub use lut::{to_rgba8, ColorLookupTable, LutParams, LUT_SIZE};
