//! Channel selection and reordering ("packing").
//!
//! A packing plan maps every destination channel to a source channel, or to
//! `-1` for a constant: 0 for colour, 1 for the alpha slot.

use ofxio_core::{AbortSignal, ImageBuffer, OfxIoError, PixelComponents, RectI, Result};
use smallvec::SmallVec;

use crate::copy::source_overlap;
use crate::parallel::for_each_row;

/// Destination channel `c` reads source channel `mapping[c]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackingPlan {
    mapping: SmallVec<[i32; 4]>,
    alpha_slot: Option<usize>,
}

impl PackingPlan {
    pub fn new(mapping: impl IntoIterator<Item = i32>, alpha_slot: Option<usize>) -> Self {
        Self {
            mapping: mapping.into_iter().collect(),
            alpha_slot,
        }
    }

    /// Plan copying every channel as is.
    pub fn identity(components: PixelComponents) -> Self {
        Self::new(
            (0..components.channel_count() as i32).collect::<SmallVec<[i32; 4]>>(),
            components.alpha_index(),
        )
    }

    /// Plan converting between two layouts.
    ///
    /// Missing alpha becomes opaque, missing colour becomes black. Alpha
    /// taken out of RGBA lands in the single channel of an alpha output.
    pub fn for_components(src: PixelComponents, dst: PixelComponents) -> Self {
        use PixelComponents as P;
        match (src, dst) {
            (s, d) if s == d => Self::identity(s),
            (P::Rgb, P::Rgba) => Self::new([0, 1, 2, -1], Some(3)),
            (P::Rgba, P::Rgb) => Self::new([0, 1, 2], None),
            (P::Alpha, P::Rgba) => Self::new([-1, -1, -1, 0], Some(3)),
            (P::Alpha, P::Rgb) => Self::new([-1, -1, -1], None),
            (P::Rgba, P::Alpha) => Self::new([3], Some(0)),
            (P::Rgb, P::Alpha) => Self::new([-1], Some(0)),
            (s, d) => {
                let src_n = s.channel_count() as i32;
                Self::new(
                    (0..d.channel_count() as i32)
                        .map(|c| if c < src_n { c } else { -1 })
                        .collect::<SmallVec<[i32; 4]>>(),
                    d.alpha_index(),
                )
            }
        }
    }

    /// Plan driven by the R, G, B, A "process channel" switches.
    ///
    /// The destination holds the enabled channels in order. A single-channel
    /// output takes alpha when it is enabled and the source has one,
    /// otherwise the first enabled colour channel.
    pub fn from_enabled_channels(
        src: PixelComponents,
        output: PixelComponents,
        enabled: [bool; 4],
    ) -> Result<Self> {
        let src_n = src.channel_count() as i32;
        match output {
            PixelComponents::Alpha => {
                let source = if src == PixelComponents::Alpha {
                    enabled.iter().any(|e| *e).then_some(0)
                } else if enabled[3] && src.alpha_index().is_some() {
                    Some(3)
                } else {
                    (0..3).find(|c| enabled[*c as usize] && *c < src_n)
                };
                match source {
                    Some(c) => Ok(Self::new([c], Some(0))),
                    None => Err(OfxIoError::Configuration(format!(
                        "no enabled channel of the {src:?} input can fill a single-channel output"
                    ))),
                }
            }
            PixelComponents::Rgb | PixelComponents::Rgba => {
                let max = output.channel_count();
                let mut mapping = SmallVec::<[i32; 4]>::new();
                let mut alpha_slot = None;
                for c in 0..max {
                    if !enabled[c] {
                        continue;
                    }
                    if c == 3 {
                        alpha_slot = Some(mapping.len());
                    }
                    let c = c as i32;
                    mapping.push(if c < src_n { c } else { -1 });
                }
                if mapping.is_empty() {
                    return Err(OfxIoError::Configuration(
                        "at least one channel must be enabled".into(),
                    ));
                }
                Ok(Self {
                    mapping,
                    alpha_slot,
                })
            }
            other => Ok(Self::for_components(src, other)),
        }
    }

    pub fn mapping(&self) -> &[i32] {
        &self.mapping
    }

    pub fn alpha_slot(&self) -> Option<usize> {
        self.alpha_slot
    }

    /// Number of destination channels.
    pub fn channel_count(&self) -> usize {
        self.mapping.len()
    }

    /// Layout of the packed buffer.
    pub fn output_components(&self) -> PixelComponents {
        match (self.mapping.len(), self.alpha_slot) {
            (3, None) => PixelComponents::Rgb,
            (4, Some(3)) => PixelComponents::Rgba,
            (1, _) => PixelComponents::Alpha,
            (2, None) => PixelComponents::Xy,
            (n, _) => PixelComponents::Custom(n as u32),
        }
    }

    pub fn is_identity(&self, src: PixelComponents) -> bool {
        self.mapping.len() == src.channel_count()
            && self.mapping.iter().enumerate().all(|(i, c)| *c == i as i32)
    }

    /// Constant written to destination channel `c` when unmapped.
    fn fill_value(&self, c: usize) -> f32 {
        if self.alpha_slot == Some(c) {
            1.0
        } else {
            0.0
        }
    }
}

/// Pack `window` of `src` into `dst` following `plan`. Pixels of the window
/// outside `src` become zero.
pub fn pack_window(
    src: &ImageBuffer,
    dst: &mut ImageBuffer,
    window: RectI,
    plan: &PackingPlan,
    abort: &AbortSignal,
) -> Result<()> {
    let src_n = src.channels();
    if src_n == 0 {
        return Err(OfxIoError::FormatMismatch("source has no channels".into()));
    }
    if dst.channels() != plan.channel_count() {
        return Err(OfxIoError::FormatMismatch(format!(
            "packing into {} channels, buffer has {}",
            plan.channel_count(),
            dst.channels()
        )));
    }
    if let Some(bad) = plan.mapping().iter().find(|c| **c >= src_n as i32) {
        return Err(OfxIoError::Configuration(format!(
            "channel {bad} does not exist in a {src_n}-channel source"
        )));
    }

    let dst_n = dst.channels();
    let x1 = window.x1.max(dst.bounds().x1);
    let src_bounds = src.bounds();
    for_each_row(dst, window, abort, |y, span| {
        span.fill(0.0);
        let x2 = x1 + (span.len() / dst_n.max(1)) as i32;
        let Some((ox1, ox2)) = source_overlap(src_bounds, y, x1, x2) else {
            return;
        };
        let src_row = src.row_span(y, ox1, ox2);
        let dst_part = &mut span[(ox1 - x1) as usize * dst_n..(ox2 - x1) as usize * dst_n];
        for (s, d) in src_row.chunks_exact(src_n).zip(dst_part.chunks_exact_mut(dst_n)) {
            for (c, out) in d.iter_mut().enumerate() {
                let m = plan.mapping[c];
                *out = if m < 0 { plan.fill_value(c) } else { s[m as usize] };
            }
        }
    })
}
