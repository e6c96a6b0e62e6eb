//! Persistent messages attached to an effect instance.

use parking_lot::Mutex;
use tracing::warn;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageLevel {
    Error,
    Warning,
    Message,
}

/// The message currently shown on the instance, if any.
///
/// Shared by concurrent render calls, so it sits behind a mutex.
#[derive(Debug, Default)]
pub struct PersistentMessage {
    current: Mutex<Option<(MessageLevel, String)>>,
}

impl PersistentMessage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_error(&self, text: impl Into<String>) {
        let text = text.into();
        warn!("persistent error: {}", text);
        *self.current.lock() = Some((MessageLevel::Error, text));
    }

    pub fn set_warning(&self, text: impl Into<String>) {
        *self.current.lock() = Some((MessageLevel::Warning, text.into()));
    }

    pub fn clear(&self) {
        *self.current.lock() = None;
    }

    pub fn get(&self) -> Option<(MessageLevel, String)> {
        self.current.lock().clone()
    }

    pub fn has_error(&self) -> bool {
        matches!(*self.current.lock(), Some((MessageLevel::Error, _)))
    }
}
