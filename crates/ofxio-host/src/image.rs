//! Images fetched from host clips.

use ofxio_core::{
    BitDepth, ImageBuffer, ImageField, OfxTime, PixelComponents, Premultiplication, RangeD,
    RenderScale, Result,
};

/// Name of the default colour plane.
pub const COLOR_PLANE: &str = "Color";

/// A named plane with its channel layout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaneSpec {
    pub name: String,
    pub components: PixelComponents,
}

impl PlaneSpec {
    pub fn new(name: impl Into<String>, components: PixelComponents) -> Self {
        Self {
            name: name.into(),
            components,
        }
    }

    pub fn color(components: PixelComponents) -> Self {
        Self::new(COLOR_PLANE, components)
    }

    pub fn is_color(&self) -> bool {
        self.name == COLOR_PLANE
    }
}

/// One image handed over by the host for the duration of a render call.
///
/// Dropping it releases the host image.
#[derive(Debug)]
pub struct HostImage {
    pub buffer: ImageBuffer,
    pub render_scale: RenderScale,
    pub field: ImageField,
    pub premultiplication: Premultiplication,
    pub bit_depth: BitDepth,
    pub pixel_aspect_ratio: f64,
}

impl HostImage {
    /// A full-resolution float image with no field.
    pub fn new(buffer: ImageBuffer, premultiplication: Premultiplication) -> Self {
        Self {
            buffer,
            render_scale: RenderScale::FULL,
            field: ImageField::None,
            premultiplication,
            bit_depth: BitDepth::Float,
            pixel_aspect_ratio: 1.0,
        }
    }
}

/// Source clip accessor.
pub trait ImageSource: Send + Sync {
    /// Fetch `plane` of `view` at `time`. `Ok(None)` when the plane does
    /// not exist for that view.
    fn fetch_image(&self, time: OfxTime, view: usize, plane: &str) -> Result<Option<HostImage>>;

    /// Names of the views, in host order.
    fn view_names(&self) -> Vec<String> {
        vec!["Main".to_string()]
    }

    /// Planes available on the clip.
    fn planes(&self) -> Vec<PlaneSpec> {
        vec![PlaneSpec::color(PixelComponents::Rgba)]
    }

    /// Frame range of the connected input.
    fn frame_range(&self) -> RangeD;
}
