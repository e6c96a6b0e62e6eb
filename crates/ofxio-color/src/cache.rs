//! Process-wide cache of compiled colour processors.

use std::collections::HashMap;
use std::sync::{Arc, OnceLock};

use parking_lot::Mutex;
use tracing::debug;

use crate::color_space::ColorSpace;
use crate::processor::ColorProcessor;

/// Identifies one compiled transform.
///
/// `context` carries whatever else selects the transform, usually the file
/// the input colour space was guessed from, so that changing the file never
/// reuses a processor built for another one.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ProcessorKey {
    pub input: ColorSpace,
    pub output: ColorSpace,
    pub context: String,
}

impl ProcessorKey {
    pub fn new(input: ColorSpace, output: ColorSpace, context: impl Into<String>) -> Self {
        Self {
            input,
            output,
            context: context.into(),
        }
    }
}

/// Lazily-built processors shared between render threads.
#[derive(Debug, Default)]
pub struct ProcessorCache {
    entries: Mutex<HashMap<ProcessorKey, Arc<ColorProcessor>>>,
}

impl ProcessorCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_or_create(&self, key: &ProcessorKey) -> Arc<ColorProcessor> {
        let mut entries = self.entries.lock();
        if let Some(p) = entries.get(key) {
            return Arc::clone(p);
        }
        let processor = Arc::new(ColorProcessor::new(key.input, key.output));
        entries.insert(key.clone(), Arc::clone(&processor));
        processor
    }

    pub fn keys(&self) -> Vec<ProcessorKey> {
        self.entries.lock().keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop every cached processor. Processors still held by a render stay
    /// alive until it finishes.
    pub fn purge(&self) {
        let mut entries = self.entries.lock();
        debug!(count = entries.len(), "purging colour processor cache");
        entries.clear();
    }
}

/// The cache shared by every reader and writer instance in the process.
pub fn global_cache() -> &'static ProcessorCache {
    static CACHE: OnceLock<ProcessorCache> = OnceLock::new();
    CACHE.get_or_init(ProcessorCache::new)
}
