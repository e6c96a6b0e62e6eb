//! Image file encoding through the `image` crate.

use std::path::{Path, PathBuf};

use image::{DynamicImage, ImageBuffer as Raster, ImageFormat, Luma, Rgb32FImage, Rgba32FImage};
use ofxio_color::ColorSpace;
use ofxio_core::{ImageBuffer, OfxIoError, PixelComponents, Premultiplication, Result};
use ofxio_writer::{EncodeRequest, EncodeSession, PartInfo, WriterBackend};
use tracing::{debug, info, warn};

use crate::error::MediaError;
use crate::format::{default_colorspace, format_of, is_float};

/// Writer backend for still image files.
///
/// Float formats receive the float pixels as they are; 16-bit capable
/// formats (PNG, TIFF) are written at 16 bits, everything else at 8.
/// Formats without alpha drop it. A multi-part write produces one file
/// per part, named with [`part_path`].
#[derive(Debug, Clone, Copy, Default)]
pub struct ImageFileWriter;

impl ImageFileWriter {
    pub fn new() -> Self {
        Self
    }

    fn write(&self, path: &Path, buffer: &ImageBuffer) -> Result<()> {
        let format = format_of(path)?;
        let image = for_format(to_dynamic(buffer)?, format);
        if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
            std::fs::create_dir_all(dir)?;
        }
        image
            .save_with_format(path, format)
            .map_err(|source| MediaError::Encode {
                path: path.to_path_buf(),
                source,
            })?;
        debug!(file = %path.display(), color = ?image.color(), "written");
        Ok(())
    }
}

/// File holding one part of a multi-part write: `shot.0001.png` with part
/// `left.depth` becomes `shot.0001.left.depth.png`.
pub fn part_path(filename: &Path, part: &str) -> PathBuf {
    let stem = filename
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let name = match filename.extension() {
        Some(ext) => format!("{stem}.{part}.{}", ext.to_string_lossy()),
        None => format!("{stem}.{part}"),
    };
    filename.with_file_name(name)
}

/// Float pixels, top row first.
fn to_dynamic(buffer: &ImageBuffer) -> Result<DynamicImage> {
    let bounds = buffer.bounds();
    let (width, height) = (bounds.width() as u32, bounds.height() as u32);
    let mut rows = Vec::with_capacity(buffer.data().len());
    for y in (bounds.y1..bounds.y2).rev() {
        rows.extend_from_slice(buffer.row_span(y, bounds.x1, bounds.x2));
    }
    let layout = buffer.components();
    let image = match layout {
        PixelComponents::Rgba => {
            Rgba32FImage::from_raw(width, height, rows).map(DynamicImage::ImageRgba32F)
        }
        PixelComponents::Rgb => {
            Rgb32FImage::from_raw(width, height, rows).map(DynamicImage::ImageRgb32F)
        }
        // the image crate has no float grey
        PixelComponents::Alpha => {
            let grey = rows
                .iter()
                .map(|v| (v.clamp(0.0, 1.0) * 65535.0).round() as u16)
                .collect();
            Raster::<Luma<u16>, Vec<u16>>::from_raw(width, height, grey)
                .map(DynamicImage::ImageLuma16)
        }
        other => return Err(MediaError::UnsupportedLayout(other).into()),
    };
    image.ok_or_else(|| {
        OfxIoError::Internal(format!("{width}x{height} {layout:?} buffer size mismatch"))
    })
}

/// Convert to a pixel type `format` can store.
fn for_format(image: DynamicImage, format: ImageFormat) -> DynamicImage {
    let alpha = image.color().has_alpha();
    let grey = matches!(image, DynamicImage::ImageLuma16(_));
    match format {
        ImageFormat::OpenExr if alpha => DynamicImage::ImageRgba32F(image.into_rgba32f()),
        f if is_float(f) => DynamicImage::ImageRgb32F(image.into_rgb32f()),
        ImageFormat::Png | ImageFormat::Tiff if grey => image,
        ImageFormat::Png | ImageFormat::Tiff if alpha => {
            DynamicImage::ImageRgba16(image.into_rgba16())
        }
        ImageFormat::Png | ImageFormat::Tiff => DynamicImage::ImageRgb16(image.into_rgb16()),
        ImageFormat::Jpeg if grey => DynamicImage::ImageLuma8(image.into_luma8()),
        ImageFormat::Jpeg => DynamicImage::ImageRgb8(image.into_rgb8()),
        _ if grey => DynamicImage::ImageLuma8(image.into_luma8()),
        _ if alpha => DynamicImage::ImageRgba8(image.into_rgba8()),
        _ => DynamicImage::ImageRgb8(image.into_rgb8()),
    }
}

impl WriterBackend for ImageFileWriter {
    fn name(&self) -> &str {
        "image"
    }

    fn supports_multi_part(&self) -> bool {
        true
    }

    fn expected_premultiplication(&self) -> Premultiplication {
        Premultiplication::UnPreMultiplied
    }

    fn guess_colorspace(&self, filename: &Path) -> Option<ColorSpace> {
        default_colorspace(filename)
    }

    fn encode(&self, request: &EncodeRequest<'_>, buffer: &ImageBuffer) -> Result<()> {
        if buffer.bounds() != request.window {
            warn!(
                bounds = ?buffer.bounds(),
                window = ?request.window,
                "buffer does not match the write window"
            );
        }
        self.write(request.filename, buffer)
    }

    fn begin_parts<'s>(
        &'s self,
        request: &EncodeRequest<'_>,
        parts: &[PartInfo],
    ) -> Result<Box<dyn EncodeSession + 's>> {
        format_of(request.filename)?;
        Ok(Box::new(PartFiles {
            writer: self,
            paths: parts
                .iter()
                .map(|p| part_path(request.filename, &p.name))
                .collect(),
            written: Vec::new(),
            finished: false,
        }))
    }
}

/// A multi-part write in progress. Files of an unfinished write are
/// removed.
struct PartFiles<'a> {
    writer: &'a ImageFileWriter,
    paths: Vec<PathBuf>,
    written: Vec<PathBuf>,
    finished: bool,
}

impl EncodeSession for PartFiles<'_> {
    fn encode_part(&mut self, index: usize, buffer: &ImageBuffer) -> Result<()> {
        let path = self
            .paths
            .get(index)
            .ok_or_else(|| OfxIoError::Internal(format!("no part {index}")))?;
        self.writer.write(path, buffer)?;
        self.written.push(path.clone());
        Ok(())
    }

    fn finish(mut self: Box<Self>) -> Result<()> {
        self.finished = true;
        info!(files = self.written.len(), "multi-part write done");
        Ok(())
    }
}

impl Drop for PartFiles<'_> {
    fn drop(&mut self) {
        if self.finished {
            return;
        }
        for path in &self.written {
            if let Err(e) = std::fs::remove_file(path) {
                warn!(file = %path.display(), "cannot remove partial output: {e}");
            }
        }
    }
}
