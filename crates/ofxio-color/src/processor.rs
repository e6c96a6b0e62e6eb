//! Compiled colour transforms applied to pixel windows.

use ofxio_core::{AbortSignal, ImageBuffer, PixelComponents, RectI, Result};
use ofxio_imaging::for_each_row;

use crate::color_space::{mat3_compose, mat3_mul, ColorSpace};
use crate::error::ColorError;
use crate::transfer::TransferFunction;

/// One step of a transform.
#[derive(Debug, Clone, PartialEq)]
pub enum ColorOp {
    Matrix([[f32; 3]; 3]),
    ToLinear(TransferFunction),
    FromLinear(TransferFunction),
}

/// Transform from one colour space to another.
///
/// Colour channels only; alpha and any extra channel pass through.
#[derive(Debug, Clone, PartialEq)]
pub struct ColorProcessor {
    pub input: ColorSpace,
    pub output: ColorSpace,
    ops: Vec<ColorOp>,
}

impl ColorProcessor {
    /// Decode the input curve, change primaries through XYZ in a single
    /// matrix, encode the output curve.
    pub fn new(input: ColorSpace, output: ColorSpace) -> Self {
        let mut ops = Vec::new();
        if input != output {
            let (tf_in, tf_out) = (input.transfer(), output.transfer());
            if !tf_in.is_linear() {
                ops.push(ColorOp::ToLinear(tf_in));
            }
            if !input.same_primaries(output) {
                ops.push(ColorOp::Matrix(mat3_compose(
                    &output.from_xyz_matrix(),
                    &input.to_xyz_matrix(),
                )));
            }
            if !tf_out.is_linear() {
                ops.push(ColorOp::FromLinear(tf_out));
            }
        }
        Self { input, output, ops }
    }

    pub fn ops(&self) -> &[ColorOp] {
        &self.ops
    }

    pub fn is_identity(&self) -> bool {
        self.ops.is_empty()
    }

    pub fn process_pixel(&self, mut rgb: [f32; 3]) -> [f32; 3] {
        for op in &self.ops {
            rgb = match op {
                ColorOp::Matrix(m) => mat3_mul(m, rgb),
                ColorOp::ToLinear(tf) => rgb.map(|v| tf.to_linear(v)),
                ColorOp::FromLinear(tf) => rgb.map(|v| tf.from_linear(v)),
            };
        }
        rgb
    }

    /// Transform the colour channels of `window` in place.
    pub fn apply(&self, buf: &mut ImageBuffer, window: RectI, abort: &AbortSignal) -> Result<()> {
        if self.is_identity() {
            return Ok(());
        }
        let n = match buf.components() {
            PixelComponents::Rgb => 3,
            PixelComponents::Rgba => 4,
            // nothing to convert in alpha-only or non-colour layers
            PixelComponents::Alpha | PixelComponents::Xy | PixelComponents::None => return Ok(()),
            other => return Err(ColorError::UnsupportedComponents(other).into()),
        };
        for_each_row(buf, window, abort, |_, span| {
            for px in span.chunks_exact_mut(n) {
                let out = self.process_pixel([px[0], px[1], px[2]]);
                px[..3].copy_from_slice(&out);
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_same_space_is_identity() {
        for s in ColorSpace::ALL {
            assert!(ColorProcessor::new(s, s).is_identity());
        }
        // shared curve, different primaries
        assert_eq!(
            ColorProcessor::new(ColorSpace::Rec709, ColorSpace::Rec2020).ops().len(),
            3
        );
    }

    #[test]
    fn test_srgb_to_linear_single_step() {
        let p = ColorProcessor::new(ColorSpace::Srgb, ColorSpace::Linear);
        assert_eq!(p.ops(), &[ColorOp::ToLinear(TransferFunction::Srgb)]);
        let out = p.process_pixel([0.5, 0.5, 0.5]);
        assert!((out[0] - 0.214).abs() < 1e-3);
    }

    #[test]
    fn test_round_trip_through_acescg() {
        let there = ColorProcessor::new(ColorSpace::Srgb, ColorSpace::AcesCg);
        let back = ColorProcessor::new(ColorSpace::AcesCg, ColorSpace::Srgb);
        let px = [0.5, 0.3, 0.8];
        let out = back.process_pixel(there.process_pixel(px));
        for (a, b) in out.iter().zip(px.iter()) {
            assert!((a - b).abs() < 1e-3);
        }
    }

    #[test]
    fn test_apply_leaves_alpha() {
        let mut buf = ImageBuffer::from_vec(
            vec![0.5, 0.5, 0.5, 0.25],
            RectI::from_size(1, 1),
            PixelComponents::Rgba,
        )
        .unwrap();
        let p = ColorProcessor::new(ColorSpace::Srgb, ColorSpace::Linear);
        let bounds = buf.bounds();
        p.apply(&mut buf, bounds, &AbortSignal::new()).unwrap();
        assert!((buf.data()[0] - 0.214).abs() < 1e-3);
        assert_eq!(buf.data()[3], 0.25);
    }

    #[test]
    fn test_custom_layers_rejected() {
        let mut buf = ImageBuffer::new(RectI::from_size(1, 1), PixelComponents::Custom(5)).unwrap();
        let p = ColorProcessor::new(ColorSpace::Srgb, ColorSpace::Linear);
        let bounds = buf.bounds();
        assert!(p.apply(&mut buf, bounds, &AbortSignal::new()).is_err());
    }
}
