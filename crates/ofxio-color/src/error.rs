//! Colour subsystem errors.

use ofxio_core::{OfxIoError, PixelComponents};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ColorError {
    #[error("unsupported colour space: {0}")]
    UnsupportedSpace(String),
    #[error("cannot convert {0:?} pixels")]
    UnsupportedComponents(PixelComponents),
}

impl From<ColorError> for OfxIoError {
    fn from(e: ColorError) -> Self {
        OfxIoError::Color(e.to_string())
    }
}
