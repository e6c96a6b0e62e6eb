//! Cooperative cancellation flag shared with the host.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::error::{OfxIoError, Result};

/// Abort signal checked periodically by pixel loops.
///
/// Clones share the same flag.
#[derive(Debug, Clone, Default)]
pub struct AbortSignal {
    flag: Arc<AtomicBool>,
}

impl AbortSignal {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation of every render sharing this signal.
    pub fn abort(&self) {
        self.flag.store(true, Ordering::Relaxed);
    }

    #[inline]
    pub fn is_aborted(&self) -> bool {
        self.flag.load(Ordering::Relaxed)
    }

    /// `Err(Aborted)` once cancellation was requested.
    #[inline]
    pub fn check(&self) -> Result<()> {
        if self.is_aborted() {
            Err(OfxIoError::Aborted)
        } else {
            Ok(())
        }
    }
}
