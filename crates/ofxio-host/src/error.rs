//! Parameter store errors.

use ofxio_core::OfxIoError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ParamError {
    #[error("parameter not found: {0}")]
    NotFound(String),
    #[error("parameter {name} is not of type {expected}")]
    TypeMismatch { name: String, expected: &'static str },
    #[error("invalid choice {index} for parameter {name}")]
    InvalidChoice { name: String, index: usize },
}

impl From<ParamError> for OfxIoError {
    fn from(e: ParamError) -> Self {
        OfxIoError::InvalidParameter(e.to_string())
    }
}
