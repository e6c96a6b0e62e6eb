//! Media backend errors.

use std::path::PathBuf;

use ofxio_core::{OfxIoError, PixelComponents};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum MediaError {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error("cannot decode {path}: {source}")]
    Decode {
        path: PathBuf,
        source: image::ImageError,
    },
    #[error("cannot encode {path}: {source}")]
    Encode {
        path: PathBuf,
        source: image::ImageError,
    },
    #[error("no image format for {0}")]
    UnknownFormat(PathBuf),
    #[error("image files hold no {0} plane")]
    UnsupportedPlane(String),
    #[error("image files cannot store {0:?} pixels")]
    UnsupportedLayout(PixelComponents),
}

impl From<MediaError> for OfxIoError {
    fn from(e: MediaError) -> Self {
        match e {
            MediaError::Io(e) => OfxIoError::Io(e),
            e @ MediaError::Decode { .. } => OfxIoError::Decoder(e.to_string()),
            e @ MediaError::Encode { .. } => OfxIoError::Encoder(e.to_string()),
            e => OfxIoError::FormatMismatch(e.to_string()),
        }
    }
}
