//! Image file decoding through the `image` crate.

use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use image::ImageReader;
use ofxio_color::ColorSpace;
use ofxio_core::{ImageBuffer, OfxIoError, OfxTime, PixelComponents, Premultiplication, RectI, Result};
use ofxio_host::COLOR_PLANE;
use ofxio_reader::{DecodeRequest, FrameInfo, ReaderBackend};
use parking_lot::Mutex;
use tracing::{debug, trace};

use crate::error::MediaError;
use crate::format::default_colorspace;

/// A whole file as float pixels, rows stored top-down like the file.
#[derive(Debug)]
pub struct DecodedImage {
    pub width: u32,
    pub height: u32,
    pub components: PixelComponents,
    pixels: Vec<f32>,
}

impl DecodedImage {
    pub fn load(path: &Path) -> std::result::Result<Self, MediaError> {
        let img = ImageReader::open(path)?
            .with_guessed_format()?
            .decode()
            .map_err(|source| MediaError::Decode {
                path: path.to_path_buf(),
                source,
            })?;
        let (width, height) = (img.width(), img.height());
        let (components, pixels) = if img.color().has_alpha() {
            (PixelComponents::Rgba, img.to_rgba32f().into_raw())
        } else {
            (PixelComponents::Rgb, img.to_rgb32f().into_raw())
        };
        Ok(Self {
            width,
            height,
            components,
            pixels,
        })
    }

    pub fn bounds(&self) -> RectI {
        RectI::from_size(self.width as i32, self.height as i32)
    }

    /// Pixels `x1..x2` of row `y`, counting rows from the bottom.
    pub fn row(&self, y: i32, x1: i32, x2: i32) -> &[f32] {
        let n = self.components.channel_count();
        let file_row = (self.height as i32 - 1 - y) as usize;
        let start = (file_row * self.width as usize + x1 as usize) * n;
        &self.pixels[start..start + (x2 - x1) as usize * n]
    }

    fn byte_size(&self) -> usize {
        self.pixels.len() * std::mem::size_of::<f32>()
    }
}

/// Most recently used decoded files.
#[derive(Debug)]
struct DecodeCache {
    capacity: usize,
    entries: VecDeque<(PathBuf, Arc<DecodedImage>)>,
}

impl DecodeCache {
    fn get(&mut self, path: &Path) -> Option<Arc<DecodedImage>> {
        let i = self.entries.iter().position(|(p, _)| p == path)?;
        let entry = self.entries.remove(i)?;
        let image = entry.1.clone();
        self.entries.push_back(entry);
        Some(image)
    }

    fn insert(&mut self, path: PathBuf, image: Arc<DecodedImage>) {
        self.entries.retain(|(p, _)| *p != path);
        self.entries.push_back((path, image));
        while self.entries.len() > self.capacity {
            self.entries.pop_front();
        }
    }
}

/// Reader backend for still image files.
///
/// Each file is decoded once and kept until it falls out of a small
/// most-recently-used cache or the host purges caches, so the frame info
/// query and the following decode share one read.
#[derive(Debug)]
pub struct ImageFileReader {
    cache: Mutex<DecodeCache>,
    loads: AtomicUsize,
}

impl Default for ImageFileReader {
    fn default() -> Self {
        Self::with_capacity(4)
    }
}

impl ImageFileReader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Keep at most `capacity` decoded files.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            cache: Mutex::new(DecodeCache {
                capacity: capacity.max(1),
                entries: VecDeque::new(),
            }),
            loads: AtomicUsize::new(0),
        }
    }

    /// Number of times a file was actually read.
    pub fn load_count(&self) -> usize {
        self.loads.load(Ordering::Relaxed)
    }

    pub fn cached_files(&self) -> usize {
        self.cache.lock().entries.len()
    }

    /// The decoded file, from the cache when possible.
    pub fn image(&self, path: &Path) -> Result<Arc<DecodedImage>> {
        if let Some(image) = self.cache.lock().get(path) {
            return Ok(image);
        }
        // decode outside the lock so other files load concurrently
        let image = Arc::new(DecodedImage::load(path)?);
        self.loads.fetch_add(1, Ordering::Relaxed);
        debug!(
            file = %path.display(),
            width = image.width,
            height = image.height,
            bytes = image.byte_size(),
            "decoded"
        );
        self.cache.lock().insert(path.to_path_buf(), image.clone());
        Ok(image)
    }

    fn check_plane(plane: &str) -> Result<()> {
        if plane == COLOR_PLANE {
            Ok(())
        } else {
            Err(MediaError::UnsupportedPlane(plane.to_string()).into())
        }
    }
}

impl ReaderBackend for ImageFileReader {
    fn name(&self) -> &str {
        "image"
    }

    fn frame_info(&self, filename: &Path, _time: OfxTime) -> Result<FrameInfo> {
        Ok(FrameInfo::new(self.image(filename)?.bounds()))
    }

    fn plane_components(&self, filename: &Path, plane: &str) -> Result<PixelComponents> {
        Self::check_plane(plane)?;
        Ok(self.image(filename)?.components)
    }

    fn decode(&self, request: &DecodeRequest<'_>, dst: &mut ImageBuffer) -> Result<()> {
        Self::check_plane(request.plane)?;
        let image = self.image(request.filename)?;
        if dst.components() != image.components {
            return Err(OfxIoError::FormatMismatch(format!(
                "{} holds {:?} pixels, buffer is {:?}",
                request.filename.display(),
                image.components,
                dst.components()
            )));
        }
        let Some(window) = request.window.intersect(image.bounds()) else {
            return Ok(());
        };
        if !dst.bounds().contains(window) {
            return Err(OfxIoError::FormatMismatch(format!(
                "decode window {window:?} outside buffer {:?}",
                dst.bounds()
            )));
        }
        trace!(file = %request.filename.display(), ?window, "copy rows");
        for y in window.y1..window.y2 {
            let src = image.row(y, window.x1, window.x2);
            let start = dst
                .offset(window.x1, y)
                .ok_or_else(|| OfxIoError::Internal(format!("row {y} outside buffer")))?;
            dst.data_mut()[start..start + src.len()].copy_from_slice(src);
        }
        Ok(())
    }

    fn expected_premultiplication(&self) -> Premultiplication {
        Premultiplication::UnPreMultiplied
    }

    fn guess_premultiplication(&self, filename: &Path) -> Result<Premultiplication> {
        Ok(match self.image(filename)?.components {
            PixelComponents::Rgba => Premultiplication::UnPreMultiplied,
            _ => Premultiplication::Opaque,
        })
    }

    fn guess_colorspace(&self, filename: &Path) -> Option<ColorSpace> {
        default_colorspace(filename)
    }

    fn purge_caches(&self) {
        let mut cache = self.cache.lock();
        debug!(files = cache.entries.len(), "purging decoded images");
        cache.entries.clear();
    }
}
