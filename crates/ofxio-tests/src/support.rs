//! Shared fixtures: a counting decoder and reader setup helpers.

use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use ofxio_core::{
    AbortSignal, ImageBuffer, OfxTime, PixelComponents, Premultiplication, RectI, RenderScale,
    Result,
};
use ofxio_host::{HostCapabilities, HostImage, MemoryFileSystem, OfxStatus, ParamValue, COLOR_PLANE};
use ofxio_reader::{
    names, DecodeRequest, FrameInfo, GenericReader, OutputPlane, ReaderBackend, RenderArgs,
};

/// Value of channel `c` at `(x, y)`. Alpha stays inside `[0.25, 1]`.
pub fn sample(x: i32, y: i32, c: usize) -> f32 {
    let v = ((x * 3 + y * 5 + c as i32 * 11).rem_euclid(19)) as f32 / 18.0;
    if c == 3 {
        0.25 + 0.75 * v
    } else {
        v
    }
}

/// RGBA decoder producing [`sample`] and counting its calls.
pub struct CountingBackend {
    pub bounds: RectI,
    pub premultiplication: Premultiplication,
    decodes: AtomicUsize,
}

impl CountingBackend {
    pub fn new(bounds: RectI) -> Self {
        Self {
            bounds,
            premultiplication: Premultiplication::UnPreMultiplied,
            decodes: AtomicUsize::new(0),
        }
    }

    pub fn decode_count(&self) -> usize {
        self.decodes.load(Ordering::SeqCst)
    }
}

impl ReaderBackend for CountingBackend {
    fn name(&self) -> &str {
        "counting"
    }

    fn frame_info(&self, _filename: &Path, _time: OfxTime) -> Result<FrameInfo> {
        Ok(FrameInfo::new(self.bounds))
    }

    fn plane_components(&self, _filename: &Path, _plane: &str) -> Result<PixelComponents> {
        Ok(PixelComponents::Rgba)
    }

    fn decode(&self, request: &DecodeRequest<'_>, dst: &mut ImageBuffer) -> Result<()> {
        self.decodes.fetch_add(1, Ordering::SeqCst);
        let w = request.window;
        for y in w.y1..w.y2 {
            for x in w.x1..w.x2 {
                if let Some(px) = dst.pixel_mut(x, y) {
                    for (c, v) in px.iter_mut().enumerate() {
                        *v = sample(x, y, c);
                    }
                }
            }
        }
        Ok(())
    }

    fn guess_premultiplication(&self, _filename: &Path) -> Result<Premultiplication> {
        Ok(self.premultiplication)
    }
}

/// A reader opened on `/shots/plate.NNNN.exr` for each of `frames`.
pub fn open_reader(backend: Arc<CountingBackend>, frames: &[i64]) -> GenericReader {
    let fs = Arc::new(MemoryFileSystem::with_files(
        frames.iter().map(|f| format!("/shots/plate.{f:04}.exr")),
    ));
    let mut reader = GenericReader::new(backend, fs, HostCapabilities::default());
    let first = frames.first().copied().unwrap_or(1);
    reader
        .set_param(
            names::FILENAME,
            ParamValue::String(format!("/shots/plate.{first:04}.exr")),
        )
        .unwrap();
    reader
}

/// Render the colour plane at full scale into a fresh RGBA image.
pub fn render_rgba(reader: &GenericReader, time: OfxTime, bounds: RectI) -> (OfxStatus, HostImage) {
    let mut image = HostImage::new(
        ImageBuffer::new(bounds, PixelComponents::Rgba).unwrap(),
        Premultiplication::Opaque,
    );
    let abort = AbortSignal::new();
    let args = RenderArgs {
        time,
        render_scale: RenderScale::FULL,
        render_window: bounds,
        view: 0,
        abort: &abort,
    };
    let status = reader.render(
        &args,
        &mut [OutputPlane {
            plane: COLOR_PLANE,
            image: &mut image,
        }],
    );
    (status, image)
}

pub fn assert_close(got: f32, want: f32, tolerance: f32, what: &str) {
    assert!(
        (got - want).abs() <= tolerance,
        "{what}: got {got}, want {want}"
    );
}
