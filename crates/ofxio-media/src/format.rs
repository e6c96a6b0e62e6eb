//! What the file extension says about a file.

use std::path::Path;

use image::ImageFormat;
use ofxio_color::ColorSpace;

use crate::error::MediaError;

pub fn format_of(path: &Path) -> Result<ImageFormat, MediaError> {
    ImageFormat::from_path(path).map_err(|_| MediaError::UnknownFormat(path.to_path_buf()))
}

/// Whether `path` names a file these backends can read and write.
pub fn is_supported(path: &Path) -> bool {
    format_of(path).is_ok_and(|f| f.reading_enabled() && f.writing_enabled())
}

/// Colour space files of this kind are conventionally encoded in.
///
/// Float formats hold scene-linear data, display formats sRGB. TIFF can be
/// either, so no guess is made.
pub fn default_colorspace(path: &Path) -> Option<ColorSpace> {
    match format_of(path).ok()? {
        ImageFormat::OpenExr | ImageFormat::Hdr => Some(ColorSpace::Linear),
        ImageFormat::Tiff => None,
        _ => Some(ColorSpace::Srgb),
    }
}

/// Whether the format stores floats.
pub fn is_float(format: ImageFormat) -> bool {
    matches!(format, ImageFormat::OpenExr | ImageFormat::Hdr)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_colorspace() {
        assert_eq!(default_colorspace(Path::new("a.0001.png")), Some(ColorSpace::Srgb));
        assert_eq!(default_colorspace(Path::new("a.JPG")), Some(ColorSpace::Srgb));
        assert_eq!(default_colorspace(Path::new("a.exr")), Some(ColorSpace::Linear));
        assert_eq!(default_colorspace(Path::new("a.tif")), None);
        assert_eq!(default_colorspace(Path::new("a.mov")), None);
    }

    #[test]
    fn test_supported_extensions() {
        assert!(is_supported(Path::new("/shots/plate.####.exr")));
        assert!(is_supported(Path::new("out.png")));
        assert!(!is_supported(Path::new("notes.txt")));
    }
}
