//! Power-of-two downscaling with a 2x2 box filter.
//!
//! Each halving averages the source samples of a destination pixel that lie
//! inside the source rectangle, dividing by the number of samples actually
//! used. Odd-sized rectangles therefore do not darken at their edges.

use ofxio_core::{AbortSignal, ImageBuffer, OfxIoError, RectI, Result};
use tracing::trace;

use crate::copy::{check_same_layout, copy_window};
use crate::parallel::for_each_row;
use crate::pool::{ScratchBuffer, ScratchPool};

/// Halve the pixels of `src` inside `src_rect` into `dst_window` of `dst`.
///
/// Destination pixel `(x, y)` reads source pixels `(2x..2x+1, 2y..2y+1)`.
pub fn halve_window(
    src: &ImageBuffer,
    src_rect: RectI,
    dst: &mut ImageBuffer,
    dst_window: RectI,
    abort: &AbortSignal,
) -> Result<()> {
    check_same_layout(src, dst)?;
    let Some(dst_window) = dst_window.intersect(dst.bounds()) else {
        return Ok(());
    };
    let Some(sr) = src_rect.intersect(src.bounds()) else {
        return for_each_row(dst, dst_window, abort, |_, span| span.fill(0.0));
    };

    let n = src.channels();
    let sb = src.bounds();
    let stride = src.row_stride();
    let data = src.data();
    let index = |x: i32, y: i32| (y - sb.y1) as usize * stride + (x - sb.x1) as usize * n;

    for_each_row(dst, dst_window, abort, |y, span| {
        let sy = 2 * y;
        let pick_this_row = sy >= sr.y1 && sy < sr.y2;
        let pick_next_row = sy + 1 >= sr.y1 && sy + 1 < sr.y2;
        let sum_h = pick_this_row as usize + pick_next_row as usize;

        for (i, px) in span.chunks_exact_mut(n).enumerate() {
            let sx = 2 * (dst_window.x1 + i as i32);
            let pick_this_col = sx >= sr.x1 && sx < sr.x2;
            let pick_next_col = sx + 1 >= sr.x1 && sx + 1 < sr.x2;
            let sum_w = pick_this_col as usize + pick_next_col as usize;
            let sum = sum_w * sum_h;
            if sum == 0 {
                px.fill(0.0);
                continue;
            }

            let a = (pick_this_row && pick_this_col).then(|| index(sx, sy));
            let b = (pick_this_row && pick_next_col).then(|| index(sx + 1, sy));
            let c = (pick_next_row && pick_this_col).then(|| index(sx, sy + 1));
            let d = (pick_next_row && pick_next_col).then(|| index(sx + 1, sy + 1));
            for (k, out) in px.iter_mut().enumerate() {
                let mut acc = 0.0f32;
                for sample in [a, b, c, d].into_iter().flatten() {
                    acc += data[sample + k];
                }
                *out = acc / sum as f32;
            }
        }
    })
}

/// Downscale `src_window` of `src` by `2^levels` into `dst`.
///
/// Intermediate levels cover the smallest enclosing rectangle of the
/// previous one and come from `pool`; the last halving writes straight into
/// `dst`. With `levels == 0` the window is copied unchanged.
pub fn downscale(
    src: &ImageBuffer,
    src_window: RectI,
    levels: u32,
    dst: &mut ImageBuffer,
    pool: &ScratchPool,
    abort: &AbortSignal,
) -> Result<()> {
    if levels == 0 {
        return copy_window(src, dst, src_window, abort);
    }
    if levels > 30 {
        return Err(OfxIoError::FormatMismatch(format!(
            "cannot downscale by {levels} mip-map levels"
        )));
    }
    let Some(mut rect) = src_window.intersect(src.bounds()) else {
        let bounds = dst.bounds();
        return crate::copy::fill_black(dst, bounds, abort);
    };

    let mut level: Option<ScratchBuffer<'_>> = None;
    for _ in 1..levels {
        let next_rect = rect.downscale_power_of_two_smallest_enclosing(1);
        let mut next = pool.acquire(next_rect, src.components())?;
        let current: &ImageBuffer = level.as_deref().unwrap_or(src);
        halve_window(current, rect, &mut next, next_rect, abort)?;
        level = Some(next);
        rect = next_rect;
    }

    let current: &ImageBuffer = level.as_deref().unwrap_or(src);
    let final_rect = rect.downscale_power_of_two_smallest_enclosing(1);
    trace!(levels, ?src_window, ?final_rect, "downscale");
    halve_window(current, rect, dst, final_rect, abort)
}
