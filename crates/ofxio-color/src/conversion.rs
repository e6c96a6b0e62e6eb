//! The colour conversion seam used by the reader and writer pipelines.

use std::sync::Arc;

use ofxio_core::{AbortSignal, ImageBuffer, RectI, Result};

use crate::cache::{global_cache, ProcessorCache, ProcessorKey};
use crate::color_space::ColorSpace;
use crate::processor::ColorProcessor;

/// A colour transform applied to decoded or fetched pixels.
///
/// Implementations operate on unpremultiplied data; callers take care of
/// the premultiplication state around `apply`.
pub trait ColorConversion: Send + Sync {
    fn is_identity(&self, time: f64) -> bool;

    /// Convert `window` of `buf` in place.
    fn apply(&self, time: f64, window: RectI, buf: &mut ImageBuffer, abort: &AbortSignal)
        -> Result<()>;
}

/// No conversion at all.
#[derive(Debug, Clone, Copy, Default)]
pub struct IdentityConversion;

impl ColorConversion for IdentityConversion {
    fn is_identity(&self, _time: f64) -> bool {
        true
    }

    fn apply(&self, _: f64, _: RectI, _: &mut ImageBuffer, _: &AbortSignal) -> Result<()> {
        Ok(())
    }
}

/// Conversion between two fixed colour spaces through the shared cache.
#[derive(Debug, Clone)]
pub struct ColorspaceConversion {
    key: ProcessorKey,
    processor: Arc<ColorProcessor>,
}

impl ColorspaceConversion {
    pub fn new(input: ColorSpace, output: ColorSpace, context: impl Into<String>) -> Self {
        Self::with_cache(global_cache(), input, output, context)
    }

    pub fn with_cache(
        cache: &ProcessorCache,
        input: ColorSpace,
        output: ColorSpace,
        context: impl Into<String>,
    ) -> Self {
        let key = ProcessorKey::new(input, output, context);
        let processor = cache.get_or_create(&key);
        Self { key, processor }
    }

    pub fn key(&self) -> &ProcessorKey {
        &self.key
    }

    /// The same conversion in the other direction, as used by writers.
    pub fn inverse(&self) -> Self {
        Self::new(self.key.output, self.key.input, self.key.context.clone())
    }
}

impl ColorConversion for ColorspaceConversion {
    fn is_identity(&self, _time: f64) -> bool {
        self.processor.is_identity()
    }

    fn apply(
        &self,
        _time: f64,
        window: RectI,
        buf: &mut ImageBuffer,
        abort: &AbortSignal,
    ) -> Result<()> {
        self.processor.apply(buf, window, abort)
    }
}
