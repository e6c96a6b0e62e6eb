//! The encode contract a file format implements.

use std::path::Path;

use ofxio_color::ColorSpace;
use ofxio_core::{ImageBuffer, OfxIoError, OfxTime, PixelComponents, Premultiplication, RectI, Result};

/// One encode call.
#[derive(Debug, Clone, Copy)]
pub struct EncodeRequest<'a> {
    pub filename: &'a Path,
    pub time: OfxTime,
    pub view_name: &'a str,
    /// Region of the buffers to write. Buffers cover exactly this window.
    pub window: RectI,
    pub pixel_aspect_ratio: f64,
    /// State of RGBA data handed to the encoder.
    pub premultiplication: Premultiplication,
}

/// Layout of one part of a multi-part file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartInfo {
    /// Unique part name: the view, the layer, or both.
    pub name: String,
    pub view_name: String,
    /// One name per channel, in buffer order.
    pub channel_names: Vec<String>,
    pub components: PixelComponents,
}

/// An open multi-part file. Dropping it without [`finish`](Self::finish)
/// abandons the file.
pub trait EncodeSession {
    /// Write part `index` of the list given to `begin_parts`.
    fn encode_part(&mut self, index: usize, buffer: &ImageBuffer) -> Result<()>;

    fn finish(self: Box<Self>) -> Result<()>;
}

/// Format specific part of a writer.
pub trait WriterBackend: Send + Sync {
    /// Short format name for logs.
    fn name(&self) -> &str;

    /// Layouts `encode` accepts.
    fn supports_components(&self, components: PixelComponents) -> bool {
        matches!(
            components,
            PixelComponents::Rgb | PixelComponents::Rgba | PixelComponents::Alpha
        )
    }

    /// Whether one file can hold several parts.
    fn supports_multi_part(&self) -> bool {
        false
    }

    /// Premultiplication the format stores, used as the default of the
    /// premultiplication parameter.
    fn expected_premultiplication(&self) -> Premultiplication {
        Premultiplication::UnPreMultiplied
    }

    /// Colour space files with this name are usually encoded in.
    fn guess_colorspace(&self, _filename: &Path) -> Option<ColorSpace> {
        None
    }

    /// Write one single-part file.
    fn encode(&self, request: &EncodeRequest<'_>, buffer: &ImageBuffer) -> Result<()>;

    /// Open a multi-part file holding `parts`.
    fn begin_parts<'s>(
        &'s self,
        _request: &EncodeRequest<'_>,
        _parts: &[PartInfo],
    ) -> Result<Box<dyn EncodeSession + 's>> {
        Err(OfxIoError::Configuration(format!(
            "the {} format cannot hold several parts",
            self.name()
        )))
    }
}

/// Channel names of a plane, as written in part headers.
pub fn channel_names(plane: &str, components: PixelComponents, is_color: bool) -> Vec<String> {
    let base: Vec<String> = match components {
        PixelComponents::Rgba => ["R", "G", "B", "A"].map(String::from).to_vec(),
        PixelComponents::Rgb => ["R", "G", "B"].map(String::from).to_vec(),
        PixelComponents::Alpha => vec!["A".to_string()],
        PixelComponents::Xy => ["X", "Y"].map(String::from).to_vec(),
        PixelComponents::Custom(n) => (0..n).map(|c| c.to_string()).collect(),
        PixelComponents::None => Vec::new(),
    };
    if is_color {
        base
    } else {
        base.into_iter().map(|c| format!("{plane}.{c}")).collect()
    }
}
