//! In-memory backend for unit tests.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};

use ofxio_core::{ImageBuffer, OfxIoError, OfxTime, PixelComponents, Premultiplication, RectI, Result};
use parking_lot::Mutex;

use crate::backend::{DecodeRequest, FrameInfo, ReaderBackend};

/// Value of channel `c` at `(x, y)` in every generated frame.
pub fn sample(x: i32, y: i32, c: usize) -> f32 {
    ((x * 7 + y * 13 + c as i32 * 3).rem_euclid(17)) as f32 / 16.0
}

/// Backend generating a deterministic pattern and counting decodes.
pub struct PatternBackend {
    pub bounds: RectI,
    pub components: PixelComponents,
    pub premultiplication: Premultiplication,
    /// Per-file bounds overriding `bounds`, for proxies.
    pub sizes: HashMap<PathBuf, RectI>,
    pub tile: (i32, i32),
    pub decodes: AtomicUsize,
    pub decoded: Mutex<Vec<(PathBuf, RectI)>>,
}

impl PatternBackend {
    pub fn new(bounds: RectI, components: PixelComponents) -> Self {
        Self {
            bounds,
            components,
            premultiplication: Premultiplication::UnPreMultiplied,
            sizes: HashMap::new(),
            tile: (0, 0),
            decodes: AtomicUsize::new(0),
            decoded: Mutex::new(Vec::new()),
        }
    }

    pub fn decode_count(&self) -> usize {
        self.decodes.load(Ordering::SeqCst)
    }

    fn bounds_of(&self, filename: &Path) -> RectI {
        self.sizes.get(filename).copied().unwrap_or(self.bounds)
    }
}

impl ReaderBackend for PatternBackend {
    fn name(&self) -> &str {
        "pattern"
    }

    fn frame_info(&self, filename: &Path, _time: OfxTime) -> Result<FrameInfo> {
        let mut info = FrameInfo::new(self.bounds_of(filename));
        info.tile_width = self.tile.0;
        info.tile_height = self.tile.1;
        Ok(info)
    }

    fn plane_components(&self, _filename: &Path, _plane: &str) -> Result<PixelComponents> {
        Ok(self.components)
    }

    fn decode(&self, request: &DecodeRequest<'_>, dst: &mut ImageBuffer) -> Result<()> {
        if dst.components() != self.components {
            return Err(OfxIoError::FormatMismatch("wrong decode layout".into()));
        }
        self.decodes.fetch_add(1, Ordering::SeqCst);
        self.decoded
            .lock()
            .push((request.filename.to_path_buf(), request.window));
        let w = request.window;
        for y in w.y1..w.y2 {
            for x in w.x1..w.x2 {
                if let Some(px) = dst.pixel_mut(x, y) {
                    for (c, v) in px.iter_mut().enumerate() {
                        *v = sample(x, y, c);
                    }
                }
            }
        }
        Ok(())
    }

    fn expected_premultiplication(&self) -> Premultiplication {
        self.premultiplication
    }
}
