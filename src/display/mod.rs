mod pixel_buffer;

pub use pixel_buffer::{pack, unpack, BlitError, PixelBuffer, Rect, Rgba, Transform, TRANSPARENT};

/// Edge length of one map cell, tileset cell and physics icon
pub const TILE_SIZE: u32 = 16;

/// Spacing of the debug grid overlay
pub const GRID_SPACING: u32 = 160;
