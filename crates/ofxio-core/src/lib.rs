//! ofxio core - foundation types for the OpenFX reader/writer plugins
//!
//! This crate provides the types shared by every other ofxio crate:
//! - Pixel rectangles, render scales and mip-map level arithmetic
//! - Float image buffers, channel layouts and premultiplication states
//! - Frame ranges and frame rates
//! - The error taxonomy and the cooperative abort signal

pub mod abort;
pub mod error;
pub mod geometry;
pub mod pixel;
pub mod time;

pub use abort::AbortSignal;
pub use error::{OfxIoError, Result};
pub use geometry::{mipmap_level_for_scale, RectD, RectI, RenderScale};
pub use pixel::{BitDepth, ImageBuffer, ImageField, PixelComponents, Premultiplication};
pub use time::{FrameRate, OfxTime, RangeD, RangeI};

/// Limits shared by the sequence and render code.
pub mod limits {
    /// Maximum distance, in frames, searched for a replacement frame.
    pub const MAX_MISSING_FRAME_SEARCH: i64 = 100;

    /// Default memory budget of the scratch buffer pool.
    pub const SCRATCH_POOL_BUDGET: usize = 256 * 1024 * 1024; // 256 MB
}
