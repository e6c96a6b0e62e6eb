//! Integer pixel rectangles, canonical rectangles and render scales.
//!
//! Rectangles are half-open (`x1 <= x < x2`, `y1 <= y < y2`) and follow the
//! OFX convention: y grows upwards and row 0 of a buffer is `bounds.y1`.

use serde::{Deserialize, Serialize};

use crate::error::{OfxIoError, Result};

/// Axis-aligned rectangle in pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct RectI {
    pub x1: i32,
    pub y1: i32,
    pub x2: i32,
    pub y2: i32,
}

impl RectI {
    /// Create a new rectangle.
    #[inline]
    pub const fn new(x1: i32, y1: i32, x2: i32, y2: i32) -> Self {
        Self { x1, y1, x2, y2 }
    }

    /// Rectangle with its origin at (0, 0).
    #[inline]
    pub const fn from_size(width: i32, height: i32) -> Self {
        Self::new(0, 0, width, height)
    }

    #[inline]
    pub fn width(self) -> i32 {
        (self.x2 - self.x1).max(0)
    }

    #[inline]
    pub fn height(self) -> i32 {
        (self.y2 - self.y1).max(0)
    }

    /// Number of pixels covered.
    #[inline]
    pub fn area(self) -> usize {
        self.width() as usize * self.height() as usize
    }

    #[inline]
    pub fn is_empty(self) -> bool {
        self.x2 <= self.x1 || self.y2 <= self.y1
    }

    /// Check if a pixel is inside the rectangle.
    #[inline]
    pub fn contains_point(self, x: i32, y: i32) -> bool {
        x >= self.x1 && x < self.x2 && y >= self.y1 && y < self.y2
    }

    /// Check if `other` lies entirely inside this rectangle.
    pub fn contains(self, other: Self) -> bool {
        other.is_empty()
            || (other.x1 >= self.x1
                && other.x2 <= self.x2
                && other.y1 >= self.y1
                && other.y2 <= self.y2)
    }

    /// Compute intersection with another rectangle.
    pub fn intersect(self, other: Self) -> Option<Self> {
        let r = Self::new(
            self.x1.max(other.x1),
            self.y1.max(other.y1),
            self.x2.min(other.x2),
            self.y2.min(other.y2),
        );
        if r.is_empty() {
            None
        } else {
            Some(r)
        }
    }

    /// Bounding box of both rectangles. Empty rectangles are ignored.
    pub fn union(self, other: Self) -> Self {
        if self.is_empty() {
            return other;
        }
        if other.is_empty() {
            return self;
        }
        Self::new(
            self.x1.min(other.x1),
            self.y1.min(other.y1),
            self.x2.max(other.x2),
            self.y2.max(other.y2),
        )
    }

    /// Smallest rectangle at `level` that encloses this one once downscaled
    /// by `2^level`. Lower edges round down, upper edges round up.
    pub fn downscale_power_of_two_smallest_enclosing(self, level: u32) -> Self {
        if level == 0 {
            return self;
        }
        let level = level.min(30);
        let pot_minus1 = (1i32 << level) - 1;
        Self::new(
            self.x1 >> level,
            self.y1 >> level,
            (self.x2 + pot_minus1) >> level,
            (self.y2 + pot_minus1) >> level,
        )
    }

    /// Scale this rectangle up by `2^level`.
    pub fn upscale_power_of_two(self, level: u32) -> Self {
        if level == 0 {
            return self;
        }
        let pot = 1i32 << level.min(30);
        Self::new(
            self.x1 * pot,
            self.y1 * pot,
            self.x2 * pot,
            self.y2 * pot,
        )
    }

    /// Expand this window outwards to the tile grid anchored on `bounds`,
    /// then clamp to `bounds`.
    ///
    /// With `top_down` the vertical grid is anchored on `bounds.y2`, which is
    /// where the first row of a top-down file lives.
    pub fn round_to_tiles(
        self,
        bounds: Self,
        tile_width: i32,
        tile_height: i32,
        top_down: bool,
    ) -> Self {
        let mut r = self;
        if tile_width > 0 {
            r.x1 = bounds.x1 + (self.x1 - bounds.x1).div_euclid(tile_width) * tile_width;
            r.x2 = bounds.x1 + ceil_div(self.x2 - bounds.x1, tile_width) * tile_width;
        }
        if tile_height > 0 {
            if top_down {
                r.y2 = bounds.y2 - (bounds.y2 - self.y2).div_euclid(tile_height) * tile_height;
                r.y1 = bounds.y2 - ceil_div(bounds.y2 - self.y1, tile_height) * tile_height;
            } else {
                r.y1 = bounds.y1 + (self.y1 - bounds.y1).div_euclid(tile_height) * tile_height;
                r.y2 = bounds.y1 + ceil_div(self.y2 - bounds.y1, tile_height) * tile_height;
            }
        }
        Self::new(
            r.x1.max(bounds.x1),
            r.y1.max(bounds.y1),
            r.x2.min(bounds.x2),
            r.y2.min(bounds.y2),
        )
    }

    /// Convert to canonical coordinates.
    pub fn to_canonical(self, scale: RenderScale, pixel_aspect_ratio: f64) -> RectD {
        RectD::new(
            self.x1 as f64 * pixel_aspect_ratio / scale.x,
            self.y1 as f64 / scale.y,
            self.x2 as f64 * pixel_aspect_ratio / scale.x,
            self.y2 as f64 / scale.y,
        )
    }
}

#[inline]
fn ceil_div(a: i32, b: i32) -> i32 {
    -((-a).div_euclid(b))
}

/// Rectangle in canonical (resolution independent) coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct RectD {
    pub x1: f64,
    pub y1: f64,
    pub x2: f64,
    pub y2: f64,
}

impl RectD {
    #[inline]
    pub const fn new(x1: f64, y1: f64, x2: f64, y2: f64) -> Self {
        Self { x1, y1, x2, y2 }
    }

    #[inline]
    pub fn is_empty(self) -> bool {
        self.x2 <= self.x1 || self.y2 <= self.y1
    }

    /// Smallest pixel rectangle enclosing this canonical rectangle.
    pub fn to_pixel_enclosing(self, scale: RenderScale, pixel_aspect_ratio: f64) -> RectI {
        RectI::new(
            (self.x1 * scale.x / pixel_aspect_ratio).floor() as i32,
            (self.y1 * scale.y).floor() as i32,
            (self.x2 * scale.x / pixel_aspect_ratio).ceil() as i32,
            (self.y2 * scale.y).ceil() as i32,
        )
    }
}

/// Host render scale; `1.0` is full resolution.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RenderScale {
    pub x: f64,
    pub y: f64,
}

impl RenderScale {
    pub const FULL: Self = Self { x: 1.0, y: 1.0 };

    #[inline]
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Scale corresponding to a mip-map level.
    pub fn from_mipmap_level(level: u32) -> Self {
        let s = 1.0 / (1u64 << level.min(62)) as f64;
        Self::new(s, s)
    }

    #[inline]
    pub fn is_full(self) -> bool {
        self.x == 1.0 && self.y == 1.0
    }

    /// Mip-map level of the smaller scale component.
    ///
    /// Only exact negative powers of two are supported.
    pub fn mipmap_level(self) -> Result<u32> {
        mipmap_level_for_scale(self.x.min(self.y))
    }
}

impl Default for RenderScale {
    fn default() -> Self {
        Self::FULL
    }
}

/// `log2(1 / scale)` for a scale that is an exact power of two in (0, 1].
pub fn mipmap_level_for_scale(scale: f64) -> Result<u32> {
    if !(scale > 0.0 && scale <= 1.0) {
        return Err(OfxIoError::FormatMismatch(format!(
            "render scale {scale} is outside (0, 1]"
        )));
    }
    let level = (1.0 / scale).log2().round();
    let expected = 1.0 / 2f64.powi(level as i32);
    if (expected - scale).abs() > 1e-9 * expected.max(1e-300) {
        return Err(OfxIoError::FormatMismatch(format!(
            "render scale {scale} is not a negative power of two"
        )));
    }
    Ok(level as u32)
}
