//! Interleaving several planes into one multi-channel buffer.

use ofxio_core::{AbortSignal, ImageBuffer, OfxIoError, RectI, Result};

use crate::copy::source_overlap;
use crate::parallel::for_each_row;

/// Copy every channel of `src` into channels
/// `channel_offset..channel_offset + src.channels()` of `dst`, inside
/// `window`. Pixels of the window outside `src` get zeros in those channels;
/// other channels of `dst` are left untouched.
pub fn interleave_into(
    src: &ImageBuffer,
    dst: &mut ImageBuffer,
    channel_offset: usize,
    window: RectI,
    abort: &AbortSignal,
) -> Result<()> {
    let src_n = src.channels();
    let dst_n = dst.channels();
    if src_n == 0 || channel_offset + src_n > dst_n {
        return Err(OfxIoError::FormatMismatch(format!(
            "cannot place {src_n} channels at offset {channel_offset} of a {dst_n}-channel buffer"
        )));
    }

    let x1 = window.x1.max(dst.bounds().x1);
    let src_bounds = src.bounds();
    for_each_row(dst, window, abort, |y, span| {
        let x2 = x1 + (span.len() / dst_n) as i32;
        let overlap = source_overlap(src_bounds, y, x1, x2);
        for (i, px) in span.chunks_exact_mut(dst_n).enumerate() {
            let x = x1 + i as i32;
            let slot = &mut px[channel_offset..channel_offset + src_n];
            match overlap {
                Some((ox1, ox2)) if x >= ox1 && x < ox2 => {
                    slot.copy_from_slice(src.row_span(y, x, x + 1));
                }
                _ => slot.fill(0.0),
            }
        }
    })
}
