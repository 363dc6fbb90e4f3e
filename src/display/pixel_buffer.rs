use thiserror::Error;

// ============================================================================
// Pixel Packing
// ============================================================================

/// One packed pixel, laid out as `0xRRGGBBAA` (alpha in the low byte)
pub type Rgba = u32;

/// Fully transparent black, the initial state of every fresh canvas
pub const TRANSPARENT: Rgba = 0;

/// Clearing this bit caps alpha at 127 (see `PixelBuffer::fade_alpha`)
const ALPHA_TOP_BIT: Rgba = 0x0000_0080;

#[inline]
pub fn pack(r: u8, g: u8, b: u8, a: u8) -> Rgba {
    (r as u32) << 24 | (g as u32) << 16 | (b as u32) << 8 | a as u32
}

#[inline]
pub fn unpack(p: Rgba) -> (u8, u8, u8, u8) {
    ((p >> 24) as u8, (p >> 16) as u8, (p >> 8) as u8, p as u8)
}

#[inline]
fn alpha(p: Rgba) -> u32 {
    p & 0xff
}

/// Divide by 255 for products of two bytes
/// Uses fast approximation: (x + 1 + (x >> 8)) >> 8 instead of x / 255
#[inline]
fn div255(x: u32) -> u32 {
    (x + 1 + (x >> 8)) >> 8
}

/// Straight-alpha "over": `src` composited on top of `dst`
#[inline]
fn over(src: Rgba, dst: Rgba) -> Rgba {
    let sa = alpha(src);
    if sa == 0 {
        return dst;
    }
    if sa == 255 {
        return src;
    }

    let dst_weight = div255(alpha(dst) * (255 - sa));
    let out_a = sa + dst_weight;
    let channel = |shift: u32| {
        let s = (src >> shift) & 0xff;
        let d = (dst >> shift) & 0xff;
        (s * sa + d * dst_weight + out_a / 2) / out_a
    };

    channel(24) << 24 | channel(16) << 16 | channel(8) << 8 | out_a
}

// ============================================================================
// Geometry
// ============================================================================

/// Axis-aligned source rectangle in pixel units
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl Rect {
    pub const fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Square cell `(col, row)` of a grid with `size`-pixel cells
    pub const fn cell(col: u32, row: u32, size: u32) -> Self {
        Self::new(col * size, row * size, size, size)
    }
}

/// Orientation applied to the source rectangle before compositing.
/// Mirroring happens first, then `quarter_turns` 90° turns
/// (`1` = clockwise, `-1` = counter-clockwise).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Transform {
    pub flip_h: bool,
    pub quarter_turns: i8,
}

impl Transform {
    pub const IDENTITY: Self = Self {
        flip_h: false,
        quarter_turns: 0,
    };

    pub const fn flipped() -> Self {
        Self {
            flip_h: true,
            quarter_turns: 0,
        }
    }

    pub const fn rotated(quarter_turns: i8) -> Self {
        Self {
            flip_h: false,
            quarter_turns,
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum BlitError {
    #[error(
        "source rect {rect:?} exceeds {width}x{height} source buffer"
    )]
    SourceOutOfBounds { rect: Rect, width: u32, height: u32 },

    #[error(
        "{width}x{height} region at ({x}, {y}) exceeds {dst_width}x{dst_height} destination"
    )]
    DestinationOutOfBounds {
        x: i32,
        y: i32,
        width: u32,
        height: u32,
        dst_width: u32,
        dst_height: u32,
    },

    #[error("unsupported rotation of {0} quarter turns")]
    UnsupportedRotation(i8),
}

// ============================================================================
// PixelBuffer
// ============================================================================

/// RGBA pixel buffer, one packed `Rgba` word per pixel.
/// Used for tileset and sprite atlases as well as every output layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PixelBuffer {
    pixels: Vec<Rgba>,
    width: u32,
    height: u32,
}

impl PixelBuffer {
    /// Create a fully transparent buffer
    pub fn with_size(width: u32, height: u32) -> Self {
        Self {
            pixels: vec![TRANSPARENT; (width * height) as usize],
            width,
            height,
        }
    }

    /// Wrap already-packed pixels; `None` if the length does not match
    pub fn from_pixels(width: u32, height: u32, pixels: Vec<Rgba>) -> Option<Self> {
        if pixels.len() == (width * height) as usize {
            Some(Self {
                pixels,
                width,
                height,
            })
        } else {
            None
        }
    }

    #[inline]
    pub fn width(&self) -> u32 {
        self.width
    }

    #[inline]
    pub fn height(&self) -> u32 {
        self.height
    }

    #[inline]
    pub fn pixels(&self) -> &[Rgba] {
        &self.pixels
    }

    #[inline]
    fn pixel_index(&self, x: u32, y: u32) -> usize {
        (y * self.width + x) as usize
    }

    /// Read a pixel (bounds checked)
    #[inline]
    pub fn get_pixel(&self, x: u32, y: u32) -> Option<Rgba> {
        if x < self.width && y < self.height {
            Some(self.pixels[self.pixel_index(x, y)])
        } else {
            None
        }
    }

    /// Overwrite a pixel without compositing (bounds checked)
    #[inline]
    pub fn set_pixel(&mut self, x: u32, y: u32, p: Rgba) {
        if x < self.width && y < self.height {
            let idx = self.pixel_index(x, y);
            self.pixels[idx] = p;
        }
    }

    pub fn fill(&mut self, p: Rgba) {
        self.pixels.fill(p);
    }

    // ========================================================================
    // Blitting
    // ========================================================================

    /// Composite the `rect` region of `src` onto this buffer with its top-left
    /// corner at `(dst_x, dst_y)`.
    ///
    /// The region is oriented by `transform` first; a quarter turn swaps the
    /// footprint to `rect.height x rect.width`. Pixels are combined with
    /// straight-alpha "over": zero alpha leaves the destination untouched,
    /// full alpha replaces it.
    ///
    /// Both rectangles must lie entirely inside their buffers.
    pub fn blit(
        &mut self,
        src: &PixelBuffer,
        rect: Rect,
        dst_x: i32,
        dst_y: i32,
        transform: Transform,
    ) -> Result<(), BlitError> {
        let turns = transform.quarter_turns;
        if !(-1..=1).contains(&turns) {
            return Err(BlitError::UnsupportedRotation(turns));
        }

        let Rect {
            x: sx0,
            y: sy0,
            width: w,
            height: h,
        } = rect;
        if sx0 + w > src.width || sy0 + h > src.height {
            return Err(BlitError::SourceOutOfBounds {
                rect,
                width: src.width,
                height: src.height,
            });
        }

        let (out_w, out_h) = if turns == 0 { (w, h) } else { (h, w) };
        let fits = dst_x >= 0
            && dst_y >= 0
            && dst_x as i64 + out_w as i64 <= self.width as i64
            && dst_y as i64 + out_h as i64 <= self.height as i64;
        if !fits {
            return Err(BlitError::DestinationOutOfBounds {
                x: dst_x,
                y: dst_y,
                width: out_w,
                height: out_h,
                dst_width: self.width,
                dst_height: self.height,
            });
        }

        for v in 0..out_h {
            for u in 0..out_w {
                // Output (u, v) -> mirrored-source (fx, fy)
                let (fx, fy) = match turns {
                    1 => (v, h - 1 - u),
                    -1 => (w - 1 - v, u),
                    _ => (u, v),
                };
                let lx = if transform.flip_h { w - 1 - fx } else { fx };

                let sp = src.pixels[src.pixel_index(sx0 + lx, sy0 + fy)];
                let di = self.pixel_index(dst_x as u32 + u, dst_y as u32 + v);
                self.pixels[di] = over(sp, self.pixels[di]);
            }
        }

        Ok(())
    }

    /// Composite all of `src`, untransformed, at `(dst_x, dst_y)`
    pub fn blit_full(&mut self, src: &PixelBuffer, dst_x: i32, dst_y: i32) -> Result<(), BlitError> {
        self.blit(
            src,
            Rect::new(0, 0, src.width, src.height),
            dst_x,
            dst_y,
            Transform::IDENTITY,
        )
    }

    // ========================================================================
    // Whole-buffer Transforms
    // ========================================================================

    /// Permanently halve the opacity ceiling by clearing the top alpha bit.
    /// RGB is left untouched.
    pub fn fade_alpha(&mut self) {
        for p in &mut self.pixels {
            *p &= !ALPHA_TOP_BIT;
        }
    }

    /// Replace R, G and B with their unweighted integer average; alpha unchanged
    pub fn grayscale(&mut self) {
        for p in &mut self.pixels {
            let (r, g, b, a) = unpack(*p);
            let gray = ((r as u32 + g as u32 + b as u32) / 3) as u8;
            *p = pack(gray, gray, gray, a);
        }
    }
}
