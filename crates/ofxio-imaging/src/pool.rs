//! Pool of scratch pixel buffers.
//!
//! Renders allocate decode, downscale and packing temporaries for every
//! call. The pool keeps released allocations, keyed by float count, so the
//! next render of the same size reuses them. Buffers are handed out as
//! [`ScratchBuffer`] guards that return their storage on drop, on every
//! exit path of the render.

use std::collections::HashMap;
use std::ops::{Deref, DerefMut};

use ofxio_core::limits::SCRATCH_POOL_BUDGET;
use ofxio_core::{ImageBuffer, PixelComponents, RectI, Result};
use parking_lot::Mutex;

#[derive(Debug, Default)]
struct PoolState {
    /// Free allocations keyed by their length in floats.
    free: HashMap<usize, Vec<Vec<f32>>>,
    /// Bytes held by free allocations.
    total_memory: usize,
}

/// Thread-safe pool of float buffers with a memory budget.
#[derive(Debug)]
pub struct ScratchPool {
    state: Mutex<PoolState>,
    max_memory: usize,
}

fn storage_bytes(storage: &Vec<f32>) -> usize {
    storage.capacity() * std::mem::size_of::<f32>()
}

impl ScratchPool {
    /// Create a pool keeping at most `max_memory` bytes of free buffers.
    pub fn new(max_memory: usize) -> Self {
        Self {
            state: Mutex::new(PoolState::default()),
            max_memory,
        }
    }

    /// Zero-filled buffer covering `bounds`, reusing a pooled allocation of
    /// the same size when there is one.
    pub fn acquire(&self, bounds: RectI, components: PixelComponents) -> Result<ScratchBuffer<'_>> {
        let len = bounds.area() * components.channel_count();
        let storage = {
            let mut state = self.state.lock();
            let reused = state.free.get_mut(&len).and_then(Vec::pop);
            if let Some(storage) = &reused {
                state.total_memory -= storage_bytes(storage);
            }
            reused
        };
        let buffer = ImageBuffer::from_storage(storage.unwrap_or_default(), bounds, components)?;
        Ok(ScratchBuffer { buffer, pool: self })
    }

    /// Keep `storage` for reuse unless that would exceed the budget.
    fn release(&self, storage: Vec<f32>) {
        let len = storage.len();
        let bytes = storage_bytes(&storage);
        if len == 0 {
            return;
        }
        let mut state = self.state.lock();
        if state.total_memory + bytes > self.max_memory {
            return; // dropped
        }
        state.total_memory += bytes;
        state.free.entry(len).or_default().push(storage);
    }

    /// Bytes held by free buffers.
    pub fn memory_usage(&self) -> usize {
        self.state.lock().total_memory
    }

    /// Number of free buffers.
    pub fn buffer_count(&self) -> usize {
        self.state.lock().free.values().map(Vec::len).sum()
    }

    /// Drop every free buffer.
    pub fn clear(&self) {
        let mut state = self.state.lock();
        state.free.clear();
        state.total_memory = 0;
    }

    /// Drop free buffers, largest first, until at most `target_memory`
    /// bytes are held.
    pub fn evict_to(&self, target_memory: usize) {
        let mut state = self.state.lock();
        while state.total_memory > target_memory {
            let Some(key) = state
                .free
                .iter()
                .filter(|(_, v)| !v.is_empty())
                .map(|(k, _)| *k)
                .max()
            else {
                break;
            };
            let mut freed = 0;
            if let Some(list) = state.free.get_mut(&key) {
                if let Some(storage) = list.pop() {
                    freed = storage_bytes(&storage);
                }
                if list.is_empty() {
                    state.free.remove(&key);
                }
            }
            state.total_memory -= freed;
        }
    }
}

impl Default for ScratchPool {
    fn default() -> Self {
        Self::new(SCRATCH_POOL_BUDGET)
    }
}

/// A pooled buffer, returned to its pool when dropped.
#[derive(Debug)]
pub struct ScratchBuffer<'a> {
    buffer: ImageBuffer,
    pool: &'a ScratchPool,
}

impl Deref for ScratchBuffer<'_> {
    type Target = ImageBuffer;

    fn deref(&self) -> &ImageBuffer {
        &self.buffer
    }
}

impl DerefMut for ScratchBuffer<'_> {
    fn deref_mut(&mut self) -> &mut ImageBuffer {
        &mut self.buffer
    }
}

impl Drop for ScratchBuffer<'_> {
    fn drop(&mut self) {
        self.pool.release(self.buffer.take_storage());
    }
}
