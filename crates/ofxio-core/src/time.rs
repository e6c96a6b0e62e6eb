//! Time ranges and frame rates.
//!
//! OFX times are `f64` frame numbers; frame ranges over a sequence are
//! inclusive integer ranges.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Host time, in frames.
pub type OfxTime = f64;

/// Inclusive integer frame range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RangeI {
    pub min: i32,
    pub max: i32,
}

impl RangeI {
    /// Sentinel meaning "not computed yet".
    pub const UNSET: Self = Self {
        min: i32::MIN,
        max: i32::MAX,
    };

    #[inline]
    pub const fn new(min: i32, max: i32) -> Self {
        Self { min, max }
    }

    #[inline]
    pub fn is_unset(self) -> bool {
        self == Self::UNSET
    }

    /// Check if a time is within this range.
    #[inline]
    pub fn contains(self, t: f64) -> bool {
        t >= self.min as f64 && t <= self.max as f64
    }

    /// Number of frames.
    #[inline]
    pub fn len(self) -> i64 {
        self.max as i64 - self.min as i64 + 1
    }

    #[inline]
    pub fn is_empty(self) -> bool {
        self.max < self.min
    }

    /// Shift both ends by `offset`.
    pub fn offset(self, offset: i32) -> Self {
        Self::new(self.min.saturating_add(offset), self.max.saturating_add(offset))
    }
}

impl Default for RangeI {
    fn default() -> Self {
        Self::UNSET
    }
}

impl fmt::Display for RangeI {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {}]", self.min, self.max)
    }
}

/// Inclusive time range as reported to the host.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RangeD {
    pub min: f64,
    pub max: f64,
}

impl RangeD {
    #[inline]
    pub const fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }
}

impl From<RangeI> for RangeD {
    fn from(r: RangeI) -> Self {
        Self::new(r.min as f64, r.max as f64)
    }
}

/// Frame rate as a rational number (e.g., 24000/1001 for 23.976 fps).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FrameRate {
    pub numerator: u32,
    pub denominator: u32,
}

impl FrameRate {
    #[inline]
    pub const fn new(numerator: u32, denominator: u32) -> Self {
        Self {
            numerator,
            denominator,
        }
    }

    /// Closest common rate for a floating point value.
    pub fn from_fps_f64(fps: f64) -> Self {
        const NTSC: [(u32, f64); 3] = [(24000, 23.976), (30000, 29.97), (60000, 59.94)];
        for (num, approx) in NTSC {
            if (fps - approx).abs() < 0.005 {
                return Self::new(num, 1001);
            }
        }
        if (fps - fps.round()).abs() < 1e-6 {
            Self::new(fps.round() as u32, 1)
        } else {
            Self::new((fps * 1000.0).round() as u32, 1000)
        }
    }

    #[inline]
    pub fn to_fps_f64(self) -> f64 {
        self.numerator as f64 / self.denominator as f64
    }

    pub const FPS_23_976: Self = Self::new(24000, 1001);
    pub const FPS_24: Self = Self::new(24, 1);
    pub const FPS_25: Self = Self::new(25, 1);
    pub const FPS_29_97: Self = Self::new(30000, 1001);
    pub const FPS_30: Self = Self::new(30, 1);
}

impl Default for FrameRate {
    fn default() -> Self {
        Self::FPS_24
    }
}

impl fmt::Display for FrameRate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let fps = self.to_fps_f64();
        if (fps - fps.round()).abs() < 0.001 {
            write!(f, "{} fps", fps.round() as u32)
        } else {
            write!(f, "{:.3} fps", fps)
        }
    }
}
