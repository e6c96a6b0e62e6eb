//! A reader's output seen as an input clip, for chaining into a writer.

use ofxio_core::{
    AbortSignal, ImageBuffer, OfxIoError, OfxTime, RangeD, RenderScale, Result,
};
use ofxio_host::{HostImage, ImageSource, OfxStatus, COLOR_PLANE};

use crate::reader::GenericReader;
use crate::render::{OutputPlane, RenderArgs};

/// Renders whole frames of a reader at full resolution on demand.
pub struct ReaderClip<'a> {
    reader: &'a GenericReader,
    abort: AbortSignal,
}

impl<'a> ReaderClip<'a> {
    pub fn new(reader: &'a GenericReader) -> Self {
        Self::with_abort(reader, AbortSignal::new())
    }

    /// Renders stop once `abort` is raised.
    pub fn with_abort(reader: &'a GenericReader, abort: AbortSignal) -> Self {
        Self { reader, abort }
    }
}

impl ImageSource for ReaderClip<'_> {
    /// Only the colour plane exists. A black frame has no pixels and is
    /// reported as missing.
    fn fetch_image(&self, time: OfxTime, view: usize, plane: &str) -> Result<Option<HostImage>> {
        if plane != COLOR_PLANE {
            return Ok(None);
        }
        let prefs = self.reader.clip_preferences()?;
        let rod = self.reader.region_of_definition(time)?;
        if rod.is_empty() {
            return Ok(None);
        }
        let window = rod.to_pixel_enclosing(RenderScale::FULL, prefs.pixel_aspect_ratio);
        let mut image = HostImage::new(
            ImageBuffer::new(window, prefs.components)?,
            prefs.premultiplication,
        );
        image.pixel_aspect_ratio = prefs.pixel_aspect_ratio;

        let args = RenderArgs {
            time,
            render_scale: RenderScale::FULL,
            render_window: window,
            view,
            abort: &self.abort,
        };
        let status = self.reader.render(
            &args,
            &mut [OutputPlane {
                plane,
                image: &mut image,
            }],
        );
        match status {
            OfxStatus::Ok => {
                self.abort.check()?;
                Ok(Some(image))
            }
            _ => Err(OfxIoError::Decoder(
                self.reader
                    .message()
                    .get()
                    .map(|(_, text)| text)
                    .unwrap_or_else(|| format!("cannot render frame {time}")),
            )),
        }
    }

    fn frame_range(&self) -> RangeD {
        self.reader.time_domain()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use ofxio_core::{PixelComponents, Premultiplication, RectI};
    use ofxio_host::{HostCapabilities, MemoryFileSystem, ParamValue};
    use ofxio_sequence::BeforeAfterPolicy;

    use crate::settings::names;
    use crate::test_support::{sample, PatternBackend};

    fn reader(frames: &[&str]) -> GenericReader {
        let fs = Arc::new(MemoryFileSystem::with_files(frames.iter().copied()));
        let backend = PatternBackend::new(RectI::from_size(8, 4), PixelComponents::Rgba);
        let mut reader = GenericReader::new(Arc::new(backend), fs, HostCapabilities::default());
        reader
            .set_param(names::FILENAME, ParamValue::String(frames[0].into()))
            .unwrap();
        reader
    }

    #[test]
    fn test_fetch_renders_whole_frame() {
        let reader = reader(&["/shots/plate.0001.exr", "/shots/plate.0002.exr"]);
        let clip = ReaderClip::new(&reader);
        assert_eq!(clip.frame_range(), RangeD::new(1.0, 2.0));

        let image = clip.fetch_image(2.0, 0, COLOR_PLANE).unwrap().unwrap();
        assert_eq!(image.buffer.bounds(), RectI::from_size(8, 4));
        assert_eq!(image.premultiplication, Premultiplication::PreMultiplied);
        let a = sample(3, 1, 3);
        let px = image.buffer.pixel(3, 1).unwrap();
        assert!((px[0] - sample(3, 1, 0) * a).abs() < 1e-6);
        assert_eq!(px[3], a);

        assert!(clip.fetch_image(1.0, 0, "depth").unwrap().is_none());
    }

    #[test]
    fn test_out_of_range_is_an_error() {
        let mut reader = reader(&["/shots/plate.0001.exr", "/shots/plate.0002.exr"]);
        reader
            .set_param(
                names::AFTER,
                ParamValue::Choice(BeforeAfterPolicy::Error.choice_index()),
            )
            .unwrap();
        let clip = ReaderClip::new(&reader);
        let err = clip.fetch_image(40.0, 0, COLOR_PLANE).unwrap_err();
        assert!(matches!(err, OfxIoError::OutOfRange));
    }

    #[test]
    fn test_abort_stops_fetch() {
        let reader = reader(&["/shots/plate.0001.exr"]);
        let abort = AbortSignal::new();
        abort.abort();
        let clip = ReaderClip::with_abort(&reader, abort);
        assert!(matches!(
            clip.fetch_image(1.0, 0, COLOR_PLANE),
            Err(OfxIoError::Aborted)
        ));
    }
}
