//! Row-band parallel-for over a window of an image.
//!
//! The rows of the window are split into contiguous bands of
//! `ceil(rows / workers)` rows, one band per worker. Workers only write the
//! rows they own, so no locking is needed. The abort signal is polled every
//! [`ABORT_CHECK_ROWS`] rows, between rows, so a row is either fully written
//! or untouched.

use ofxio_core::{AbortSignal, ImageBuffer, RectI, Result};
use rayon::prelude::*;

/// Rows processed between two abort checks.
pub const ABORT_CHECK_ROWS: usize = 16;

/// Number of row bands a window is split into.
pub fn worker_count() -> usize {
    num_cpus::get().max(1)
}

/// Call `f(y, span)` for every row `y` of `window ∩ dst.bounds()`, where
/// `span` holds the pixels `window.x1..window.x2` of that row.
pub fn for_each_row<F>(dst: &mut ImageBuffer, window: RectI, abort: &AbortSignal, f: F) -> Result<()>
where
    F: Fn(i32, &mut [f32]) + Send + Sync,
{
    let bounds = dst.bounds();
    let Some(window) = window.intersect(bounds) else {
        return Ok(());
    };
    let stride = dst.row_stride();
    let channels = dst.channels();
    if stride == 0 {
        return Ok(());
    }

    let span_start = (window.x1 - bounds.x1) as usize * channels;
    let span_end = (window.x2 - bounds.x1) as usize * channels;
    let first_row = (window.y1 - bounds.y1) as usize;
    let rows = window.height() as usize;
    let band = rows.div_ceil(worker_count()).max(1);

    let data = &mut dst.data_mut()[first_row * stride..(first_row + rows) * stride];
    data.par_chunks_mut(band * stride)
        .enumerate()
        .try_for_each(|(band_index, chunk)| {
            for (i, row) in chunk.chunks_mut(stride).enumerate() {
                if i % ABORT_CHECK_ROWS == 0 {
                    abort.check()?;
                }
                let y = window.y1 + (band_index * band + i) as i32;
                f(y, &mut row[span_start..span_end]);
            }
            Ok(())
        })
}
