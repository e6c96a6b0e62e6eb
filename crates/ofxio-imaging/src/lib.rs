//! ofxio imaging - CPU pixel primitives for the render pipelines
//!
//! Every operation works on a window of an [`ofxio_core::ImageBuffer`] and
//! runs as a row-band parallel-for with cooperative cancellation.

pub mod copy;
pub mod interleave;
pub mod mipmap;
pub mod pack;
pub mod parallel;
pub mod pool;
pub mod premult;

pub use copy::{copy_window, fill_black};
pub use interleave::interleave_into;
pub use mipmap::{downscale, halve_window};
pub use pack::{pack_window, PackingPlan};
pub use parallel::{for_each_row, worker_count, ABORT_CHECK_ROWS};
pub use pool::{ScratchBuffer, ScratchPool};
pub use premult::{premultiply, premultiply_copy, unpremultiply, unpremultiply_copy};
