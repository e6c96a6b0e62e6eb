//! The decode contract a file format implements.
//!
//! The reader does the orchestration (time mapping, frame search, proxy
//! selection, premultiplication, colour, downscaling); a backend only knows
//! how to read its format.

use std::path::Path;

use ofxio_color::ColorSpace;
use ofxio_core::{ImageBuffer, OfxTime, PixelComponents, Premultiplication, RangeI, RectI, Result};

/// Geometry of one frame of a file.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameInfo {
    /// Data window in full resolution pixels.
    pub bounds: RectI,
    pub pixel_aspect_ratio: f64,
    /// Zero when the file is not tiled.
    pub tile_width: i32,
    pub tile_height: i32,
    /// Tiles are counted from the top of the image.
    pub tiles_top_down: bool,
}

impl FrameInfo {
    /// Untiled frame with square pixels.
    pub fn new(bounds: RectI) -> Self {
        Self {
            bounds,
            pixel_aspect_ratio: 1.0,
            tile_width: 0,
            tile_height: 0,
            tiles_top_down: false,
        }
    }

    pub fn is_tiled(&self) -> bool {
        self.tile_width > 0 && self.tile_height > 0
    }
}

/// One decode call.
#[derive(Debug, Clone, Copy)]
pub struct DecodeRequest<'a> {
    pub filename: &'a Path,
    /// Frame of the sequence, after missing-frame substitution.
    pub time: OfxTime,
    pub view: usize,
    pub plane: &'a str,
    /// Pixels to produce. Always inside the frame bounds.
    pub window: RectI,
}

/// Format specific part of a reader.
pub trait ReaderBackend: Send + Sync {
    /// Short format name for logs.
    fn name(&self) -> &str;

    /// Frame range of a file carrying its own timeline (a movie).
    /// `None` means the file is one frame of an image sequence.
    fn sequence_time_domain(&self, _filename: &Path) -> Result<Option<RangeI>> {
        Ok(None)
    }

    fn frame_info(&self, filename: &Path, time: OfxTime) -> Result<FrameInfo>;

    /// Layout `decode` produces for `plane`.
    fn plane_components(&self, filename: &Path, plane: &str) -> Result<PixelComponents>;

    /// Decode `request.window` into `dst`, whose layout is
    /// [`plane_components`](Self::plane_components). Pixels of `dst` outside
    /// the window are left as they are.
    fn decode(&self, request: &DecodeRequest<'_>, dst: &mut ImageBuffer) -> Result<()>;

    /// Premultiplication of the RGBA pixels `decode` produces.
    fn expected_premultiplication(&self) -> Premultiplication {
        Premultiplication::UnPreMultiplied
    }

    /// Best guess of what the file itself stores, used as the default of
    /// the premultiplication parameter.
    fn guess_premultiplication(&self, _filename: &Path) -> Result<Premultiplication> {
        Ok(self.expected_premultiplication())
    }

    /// Colour space the file is most likely encoded in.
    fn guess_colorspace(&self, _filename: &Path) -> Option<ColorSpace> {
        None
    }

    /// Native frame rate, for movies.
    fn frame_rate(&self, _filename: &Path) -> Option<f64> {
        None
    }

    /// Drop any decoded data the backend keeps around.
    fn purge_caches(&self) {}
}
