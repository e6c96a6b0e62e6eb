//! Pixel layouts and float image buffers in CPU memory.
//!
//! Every buffer handled by the pipeline is 32-bit float, interleaved, with
//! rows stored bottom-up starting at `bounds.y1`.

use serde::{Deserialize, Serialize};

use crate::error::{OfxIoError, Result};
use crate::geometry::RectI;

/// Channel layout of a plane.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum PixelComponents {
    None,
    Alpha,
    Rgb,
    #[default]
    Rgba,
    /// Two-channel motion vector / disparity layout.
    Xy,
    /// Arbitrary layer with the given channel count.
    Custom(u32),
}

impl PixelComponents {
    /// Number of interleaved channels.
    pub fn channel_count(self) -> usize {
        match self {
            Self::None => 0,
            Self::Alpha => 1,
            Self::Xy => 2,
            Self::Rgb => 3,
            Self::Rgba => 4,
            Self::Custom(n) => n as usize,
        }
    }

    /// Index of the alpha channel, if the layout has one.
    pub fn alpha_index(self) -> Option<usize> {
        match self {
            Self::Alpha => Some(0),
            Self::Rgba => Some(3),
            _ => None,
        }
    }

    /// Layout used for an arbitrary channel count.
    pub fn from_channel_count(n: usize) -> Self {
        match n {
            0 => Self::None,
            1 => Self::Alpha,
            2 => Self::Xy,
            3 => Self::Rgb,
            4 => Self::Rgba,
            n => Self::Custom(n as u32),
        }
    }

    /// The premultiplication state this layout imposes, if any.
    ///
    /// RGB is always opaque and alpha-only is always premultiplied; only
    /// RGBA carries a meaningful state.
    pub fn forced_premultiplication(self) -> Option<Premultiplication> {
        match self {
            Self::Rgba => None,
            Self::Alpha => Some(Premultiplication::PreMultiplied),
            _ => Some(Premultiplication::Opaque),
        }
    }
}

/// Premultiplication state of a buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Premultiplication {
    Opaque,
    #[default]
    PreMultiplied,
    UnPreMultiplied,
}

impl Premultiplication {
    /// Effective state for a buffer of the given layout.
    pub fn for_components(self, components: PixelComponents) -> Self {
        components.forced_premultiplication().unwrap_or(self)
    }
}

/// Bit depth of a host image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum BitDepth {
    Byte,
    Short,
    Half,
    #[default]
    Float,
}

/// Field order of a host image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ImageField {
    #[default]
    None,
    Both,
    Lower,
    Upper,
}

/// Interleaved float image covering `bounds`.
#[derive(Debug, Clone)]
pub struct ImageBuffer {
    data: Vec<f32>,
    bounds: RectI,
    components: PixelComponents,
    /// Floats per row.
    row_stride: usize,
}

impl ImageBuffer {
    /// Allocate a zero-filled buffer.
    ///
    /// Allocation failures are reported instead of aborting the process.
    pub fn new(bounds: RectI, components: PixelComponents) -> Result<Self> {
        Self::from_storage(Vec::new(), bounds, components)
    }

    /// Build a zero-filled buffer reusing `storage` for its allocation.
    pub fn from_storage(
        mut storage: Vec<f32>,
        bounds: RectI,
        components: PixelComponents,
    ) -> Result<Self> {
        let row_stride = bounds.width() as usize * components.channel_count();
        let len = row_stride * bounds.height() as usize;
        storage.clear();
        storage.try_reserve_exact(len).map_err(|e| {
            OfxIoError::OutOfMemory(format!(
                "{} x {} x {} float buffer: {}",
                bounds.width(),
                bounds.height(),
                components.channel_count(),
                e
            ))
        })?;
        storage.resize(len, 0.0);
        Ok(Self {
            data: storage,
            bounds,
            components,
            row_stride,
        })
    }

    /// Wrap existing interleaved data. `data.len()` must match the bounds.
    pub fn from_vec(data: Vec<f32>, bounds: RectI, components: PixelComponents) -> Result<Self> {
        let row_stride = bounds.width() as usize * components.channel_count();
        let expected = row_stride * bounds.height() as usize;
        if data.len() != expected {
            return Err(OfxIoError::FormatMismatch(format!(
                "buffer has {} floats, bounds need {}",
                data.len(),
                expected
            )));
        }
        Ok(Self {
            data,
            bounds,
            components,
            row_stride,
        })
    }

    #[inline]
    pub fn bounds(&self) -> RectI {
        self.bounds
    }

    #[inline]
    pub fn components(&self) -> PixelComponents {
        self.components
    }

    #[inline]
    pub fn channels(&self) -> usize {
        self.components.channel_count()
    }

    /// Floats per row.
    #[inline]
    pub fn row_stride(&self) -> usize {
        self.row_stride
    }

    /// Bytes per row, as reported to encoders.
    #[inline]
    pub fn row_bytes(&self) -> usize {
        self.row_stride * std::mem::size_of::<f32>()
    }

    #[inline]
    pub fn data(&self) -> &[f32] {
        &self.data
    }

    #[inline]
    pub fn data_mut(&mut self) -> &mut [f32] {
        &mut self.data
    }

    /// Give the allocation back, e.g. to a scratch pool.
    pub fn into_vec(self) -> Vec<f32> {
        self.data
    }

    /// Take the allocation out, leaving an empty buffer behind.
    pub fn take_storage(&mut self) -> Vec<f32> {
        self.bounds = RectI::default();
        self.row_stride = 0;
        std::mem::take(&mut self.data)
    }

    /// Offset of pixel (x, y) in `data`, or `None` outside the bounds.
    #[inline]
    pub fn offset(&self, x: i32, y: i32) -> Option<usize> {
        if !self.bounds.contains_point(x, y) {
            return None;
        }
        Some(
            (y - self.bounds.y1) as usize * self.row_stride
                + (x - self.bounds.x1) as usize * self.channels(),
        )
    }

    /// Get one pixel.
    #[inline]
    pub fn pixel(&self, x: i32, y: i32) -> Option<&[f32]> {
        let n = self.channels();
        self.offset(x, y).map(|o| &self.data[o..o + n])
    }

    /// Get one pixel mutably.
    #[inline]
    pub fn pixel_mut(&mut self, x: i32, y: i32) -> Option<&mut [f32]> {
        let n = self.channels();
        self.offset(x, y).map(move |o| &mut self.data[o..o + n])
    }

    /// Pixels `x1..x2` of row `y`. The span must lie inside the bounds.
    #[inline]
    pub fn row_span(&self, y: i32, x1: i32, x2: i32) -> &[f32] {
        let n = self.channels();
        let start = (y - self.bounds.y1) as usize * self.row_stride + (x1 - self.bounds.x1) as usize * n;
        &self.data[start..start + (x2 - x1) as usize * n]
    }

    /// Fill every pixel with `value`.
    pub fn fill(&mut self, value: f32) {
        self.data.fill(value);
    }
}
