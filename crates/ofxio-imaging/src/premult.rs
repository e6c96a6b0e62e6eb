//! Premultiplication conversions.
//!
//! Only RGBA buffers carry a premultiplication state that can change; every
//! function here leaves other layouts untouched (or plainly copies them).

use ofxio_core::{AbortSignal, ImageBuffer, PixelComponents, RectI, Result};

use crate::copy::{check_same_layout, copy_row};
use crate::parallel::for_each_row;

#[inline]
fn premultiply_span(span: &mut [f32]) {
    for px in span.chunks_exact_mut(4) {
        let a = px[3];
        px[0] *= a;
        px[1] *= a;
        px[2] *= a;
    }
}

/// Colour divided by alpha. Zero-alpha pixels are left as they are.
#[inline]
fn unpremultiply_span(span: &mut [f32]) {
    for px in span.chunks_exact_mut(4) {
        let a = px[3];
        if a != 0.0 {
            px[0] /= a;
            px[1] /= a;
            px[2] /= a;
        }
    }
}

/// Multiply colour by alpha inside `window`.
pub fn premultiply(buf: &mut ImageBuffer, window: RectI, abort: &AbortSignal) -> Result<()> {
    if buf.components() != PixelComponents::Rgba {
        return Ok(());
    }
    for_each_row(buf, window, abort, |_, span| premultiply_span(span))
}

/// Divide colour by alpha inside `window`.
pub fn unpremultiply(buf: &mut ImageBuffer, window: RectI, abort: &AbortSignal) -> Result<()> {
    if buf.components() != PixelComponents::Rgba {
        return Ok(());
    }
    for_each_row(buf, window, abort, |_, span| unpremultiply_span(span))
}

/// Copy `window` from `src` into `dst`, premultiplying on the way.
///
/// `src` is only read, so concurrent renders may share it.
pub fn premultiply_copy(
    src: &ImageBuffer,
    dst: &mut ImageBuffer,
    window: RectI,
    abort: &AbortSignal,
) -> Result<()> {
    check_same_layout(src, dst)?;
    let rgba = src.components() == PixelComponents::Rgba;
    let x1 = window.x1.max(dst.bounds().x1);
    for_each_row(dst, window, abort, |y, span| {
        copy_row(src, y, x1, span);
        if rgba {
            premultiply_span(span);
        }
    })
}

/// Copy `window` from `src` into `dst`, unpremultiplying on the way.
pub fn unpremultiply_copy(
    src: &ImageBuffer,
    dst: &mut ImageBuffer,
    window: RectI,
    abort: &AbortSignal,
) -> Result<()> {
    check_same_layout(src, dst)?;
    let rgba = src.components() == PixelComponents::Rgba;
    let x1 = window.x1.max(dst.bounds().x1);
    for_each_row(dst, window, abort, |y, span| {
        copy_row(src, y, x1, span);
        if rgba {
            unpremultiply_span(span);
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn rgba(pixels: &[[f32; 4]]) -> ImageBuffer {
        let data: Vec<f32> = pixels.iter().flatten().copied().collect();
        ImageBuffer::from_vec(data, RectI::from_size(pixels.len() as i32, 1), PixelComponents::Rgba)
            .unwrap()
    }

    #[test]
    fn test_premultiply() {
        let mut buf = rgba(&[[1.0, 0.5, 0.25, 0.5], [1.0, 1.0, 1.0, 0.0]]);
        let bounds = buf.bounds();
        premultiply(&mut buf, bounds, &AbortSignal::new()).unwrap();
        assert_eq!(buf.pixel(0, 0).unwrap(), &[0.5, 0.25, 0.125, 0.5]);
        assert_eq!(buf.pixel(1, 0).unwrap(), &[0.0, 0.0, 0.0, 0.0]);
    }

    #[test]
    fn test_unpremultiply_zero_alpha_is_defined() {
        let mut buf = rgba(&[[0.0, 0.0, 0.0, 0.0], [0.2, 0.1, 0.0, 0.5]]);
        let bounds = buf.bounds();
        unpremultiply(&mut buf, bounds, &AbortSignal::new()).unwrap();
        assert_eq!(buf.pixel(0, 0).unwrap(), &[0.0, 0.0, 0.0, 0.0]);
        assert_eq!(buf.pixel(1, 0).unwrap(), &[0.4, 0.2, 0.0, 0.5]);
        assert!(buf.data().iter().all(|v| v.is_finite()));
    }

    #[test]
    fn test_rgb_untouched() {
        let mut buf =
            ImageBuffer::from_vec(vec![0.5, 0.5, 0.5], RectI::from_size(1, 1), PixelComponents::Rgb)
                .unwrap();
        let bounds = buf.bounds();
        premultiply(&mut buf, bounds, &AbortSignal::new()).unwrap();
        assert_eq!(buf.data(), &[0.5, 0.5, 0.5]);
    }

    #[test]
    fn test_premultiply_copy_leaves_source() {
        let src = rgba(&[[1.0, 1.0, 1.0, 0.25]]);
        let mut dst = ImageBuffer::new(src.bounds(), PixelComponents::Rgba).unwrap();
        premultiply_copy(&src, &mut dst, src.bounds(), &AbortSignal::new()).unwrap();
        assert_eq!(dst.data(), &[0.25, 0.25, 0.25, 0.25]);
        assert_eq!(src.data(), &[1.0, 1.0, 1.0, 0.25]);
    }

    proptest! {
        #[test]
        fn prop_premultiply_undoes_unpremultiply(
            r in 0.0f32..1.0, g in 0.0f32..1.0, b in 0.0f32..1.0, a in 0.001f32..1.0
        ) {
            let x = [r * a, g * a, b * a, a];
            let mut buf = rgba(&[x]);
            let bounds = buf.bounds();
            let abort = AbortSignal::new();
            unpremultiply(&mut buf, bounds, &abort).unwrap();
            premultiply(&mut buf, bounds, &abort).unwrap();
            for (got, want) in buf.data().iter().zip(x.iter()) {
                prop_assert!((got - want).abs() <= 1e-5, "{} vs {}", got, want);
            }
        }
    }
}
