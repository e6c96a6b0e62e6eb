//! Window copies between buffers of the same layout.

use ofxio_core::{AbortSignal, ImageBuffer, OfxIoError, RectI, Result};

use crate::parallel::for_each_row;

/// The part of row `y`, columns `x1..x2`, that `src` covers.
pub(crate) fn source_overlap(src: RectI, y: i32, x1: i32, x2: i32) -> Option<(i32, i32)> {
    if y < src.y1 || y >= src.y2 {
        return None;
    }
    let ox1 = x1.max(src.x1);
    let ox2 = x2.min(src.x2);
    (ox1 < ox2).then_some((ox1, ox2))
}

/// Fill `span` (row `y`, starting at column `x1`) from `src`, zeroing the
/// pixels `src` does not cover.
pub(crate) fn copy_row(src: &ImageBuffer, y: i32, x1: i32, span: &mut [f32]) {
    let n = src.channels();
    let x2 = x1 + (span.len() / n.max(1)) as i32;
    match source_overlap(src.bounds(), y, x1, x2) {
        Some((ox1, ox2)) => {
            let start = (ox1 - x1) as usize * n;
            let end = (ox2 - x1) as usize * n;
            span[..start].fill(0.0);
            span[start..end].copy_from_slice(src.row_span(y, ox1, ox2));
            span[end..].fill(0.0);
        }
        None => span.fill(0.0),
    }
}

pub(crate) fn check_same_layout(src: &ImageBuffer, dst: &ImageBuffer) -> Result<()> {
    if src.components() != dst.components() {
        return Err(OfxIoError::FormatMismatch(format!(
            "cannot copy {:?} pixels into a {:?} buffer",
            src.components(),
            dst.components()
        )));
    }
    Ok(())
}

/// Copy `window` from `src` to `dst`. Pixels of the window outside `src`
/// are zeroed.
pub fn copy_window(
    src: &ImageBuffer,
    dst: &mut ImageBuffer,
    window: RectI,
    abort: &AbortSignal,
) -> Result<()> {
    check_same_layout(src, dst)?;
    let x1 = window.x1.max(dst.bounds().x1);
    for_each_row(dst, window, abort, |y, span| copy_row(src, y, x1, span))
}

/// Zero `window` of `dst`: black and transparent.
pub fn fill_black(dst: &mut ImageBuffer, window: RectI, abort: &AbortSignal) -> Result<()> {
    for_each_row(dst, window, abort, |_, span| span.fill(0.0))
}
