//! Host capabilities negotiated once when the plugin is described.

use ofxio_core::PixelComponents;
use serde::{Deserialize, Serialize};

/// What the host supports, passed explicitly to the components that need it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HostCapabilities {
    pub name: String,
    pub supports_rgba: bool,
    pub supports_rgb: bool,
    pub supports_alpha: bool,
    pub supports_xy: bool,
    /// Host renders at render scales other than 1.
    pub supports_render_scale: bool,
    pub supports_tiles: bool,
    /// Host can request planes other than the colour plane.
    pub supports_multi_planar: bool,
    pub supports_multi_view: bool,
    /// Host detects file sequences itself and animates the filename
    /// parameter per frame; the directory scan is skipped.
    pub provides_frame_detection: bool,
}

impl Default for HostCapabilities {
    fn default() -> Self {
        Self {
            name: "generic".to_string(),
            supports_rgba: true,
            supports_rgb: true,
            supports_alpha: true,
            supports_xy: false,
            supports_render_scale: true,
            supports_tiles: true,
            supports_multi_planar: false,
            supports_multi_view: false,
            provides_frame_detection: false,
        }
    }
}

impl HostCapabilities {
    /// A multi-planar, multi-view host that does its own sequence detection.
    pub fn multi_planar() -> Self {
        Self {
            name: "multi-planar".to_string(),
            supports_xy: true,
            supports_multi_planar: true,
            supports_multi_view: true,
            provides_frame_detection: true,
            ..Self::default()
        }
    }

    pub fn supports_components(&self, components: PixelComponents) -> bool {
        match components {
            PixelComponents::Rgba => self.supports_rgba,
            PixelComponents::Rgb => self.supports_rgb,
            PixelComponents::Alpha => self.supports_alpha,
            PixelComponents::Xy => self.supports_xy,
            PixelComponents::Custom(_) => self.supports_multi_planar,
            PixelComponents::None => false,
        }
    }

    /// Closest layout the host accepts for `wanted`.
    pub fn output_components(&self, wanted: PixelComponents) -> PixelComponents {
        if self.supports_components(wanted) {
            return wanted;
        }
        match wanted {
            PixelComponents::Rgb | PixelComponents::Alpha | PixelComponents::Xy
                if self.supports_rgba =>
            {
                PixelComponents::Rgba
            }
            PixelComponents::Rgba if self.supports_rgb => PixelComponents::Rgb,
            _ => PixelComponents::Rgba,
        }
    }
}
