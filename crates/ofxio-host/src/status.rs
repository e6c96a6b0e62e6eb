//! Status codes returned to the host.

use ofxio_core::{OfxIoError, Result};

/// Status reported at the host boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OfxStatus {
    Ok,
    Failed,
    ErrMemory,
    /// The host should apply its default behaviour.
    ReplyDefault,
}

impl OfxStatus {
    /// Numeric code of the OFX API.
    pub fn code(self) -> i32 {
        match self {
            Self::Ok => 0,
            Self::Failed => 1,
            Self::ErrMemory => 8,
            Self::ReplyDefault => 14,
        }
    }

    /// Map a plugin result to a status. Aborted renders report success.
    pub fn from_result<T>(result: &Result<T>) -> Self {
        match result {
            Ok(_) | Err(OfxIoError::Aborted) => Self::Ok,
            Err(OfxIoError::OutOfMemory(_)) => Self::ErrMemory,
            Err(_) => Self::Failed,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_result() {
        assert_eq!(OfxStatus::from_result(&Ok(())), OfxStatus::Ok);
        assert_eq!(
            OfxStatus::from_result::<()>(&Err(OfxIoError::Aborted)),
            OfxStatus::Ok
        );
        assert_eq!(
            OfxStatus::from_result::<()>(&Err(OfxIoError::OutOfMemory("x".into()))).code(),
            8
        );
        assert_eq!(
            OfxStatus::from_result::<()>(&Err(OfxIoError::OutOfRange)),
            OfxStatus::Failed
        );
    }
}
