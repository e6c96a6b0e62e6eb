//! ofxio media - file format backends for the generic reader and writer
//!
//! Still images (PNG, JPEG, TIFF, OpenEXR, HDR and the other formats the
//! `image` crate handles) are decoded to float RGB(A) and cached per file;
//! writing converts float buffers to the bit depth the format stores.

pub mod decoder;
pub mod encoder;
pub mod error;
pub mod format;

pub use decoder::{DecodedImage, ImageFileReader};
pub use encoder::{part_path, ImageFileWriter};
pub use error::MediaError;
pub use format::{default_colorspace, is_supported};
