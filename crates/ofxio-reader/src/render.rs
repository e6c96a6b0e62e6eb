//! The render pipeline of a reader.
//!
//! Per call: map the host time onto the sequence, find the file (or its
//! proxy), work out how many mip-map levels are left to compute, decode,
//! then convert colour, layout and premultiplication on the way to the
//! host buffer. When nothing has to change the decoder writes straight
//! into the output.

use std::path::Path;

use ofxio_color::{ColorConversion, ColorspaceConversion};
use ofxio_core::{
    AbortSignal, BitDepth, ImageBuffer, OfxIoError, OfxTime, PixelComponents, Premultiplication,
    RectI, RenderScale, Result,
};
use ofxio_host::{HostImage, OfxStatus, COLOR_PLANE};
use ofxio_imaging::{
    copy_window, downscale, fill_black, pack_window, premultiply_copy, unpremultiply, PackingPlan,
};
use ofxio_sequence::{FrameKind, LocatedFrame};
use tracing::{debug, trace};

use crate::backend::{DecodeRequest, FrameInfo};
use crate::reader::{output_premultiplication, GenericReader};

/// Arguments of one render call.
#[derive(Debug, Clone, Copy)]
pub struct RenderArgs<'a> {
    pub time: OfxTime,
    pub render_scale: RenderScale,
    /// Pixels to produce, at the render scale.
    pub render_window: RectI,
    pub view: usize,
    pub abort: &'a AbortSignal,
}

/// One host output image and the plane it should receive.
#[derive(Debug)]
pub struct OutputPlane<'a> {
    pub plane: &'a str,
    pub image: &'a mut HostImage,
}

/// The file a render call settled on.
struct ResolvedFrame<'a> {
    filename: &'a Path,
    time: OfxTime,
    /// Mip-map levels still to compute after decoding.
    levels: u32,
    /// Render window at the decoded resolution, inside the frame bounds.
    full_window: RectI,
    /// `full_window` grown to whole tiles.
    decode_window: RectI,
}

impl GenericReader {
    /// Render every output plane. Failures set the persistent message,
    /// except cancellation.
    pub fn render(&self, args: &RenderArgs<'_>, outputs: &mut [OutputPlane<'_>]) -> OfxStatus {
        let result = self.render_planes(args, outputs);
        match &result {
            Err(e) if e.is_reportable() => self.message.set_error(e.to_string()),
            Err(_) => debug!(time = args.time, "render aborted"),
            Ok(()) => {}
        }
        OfxStatus::from_result(&result)
    }

    fn render_planes(&self, args: &RenderArgs<'_>, outputs: &mut [OutputPlane<'_>]) -> Result<()> {
        for out in outputs.iter() {
            check_output(&*out.image, args)?;
        }
        args.abort.check()?;

        let Some(sequence_time) = self.resolve_time(args.time)? else {
            return fill_outputs_black(outputs, args);
        };

        let canonical = self.locate(sequence_time, false)?;
        match canonical.kind {
            FrameKind::Black => return fill_outputs_black(outputs, args),
            FrameKind::Failed => return Err(canonical.missing_error()),
            FrameKind::FullRes | FrameKind::Proxy => {}
        }

        let render_level = args.render_scale.mipmap_level()?;
        let proxy = &self.settings.proxy;
        let want_proxy = proxy.applies_at(render_level);
        let located = if want_proxy {
            self.locate(sequence_time, true)?
        } else {
            canonical.clone()
        };
        let use_proxy = match located.kind {
            FrameKind::Proxy if want_proxy => true,
            FrameKind::FullRes => false,
            FrameKind::Proxy => {
                return Err(OfxIoError::Internal(
                    "got a proxy file for a full resolution request".into(),
                ))
            }
            FrameKind::Black | FrameKind::Failed => return Err(located.missing_error()),
        };

        let levels = if use_proxy {
            let proxy_level = proxy.original_level();
            if proxy_level > render_level {
                return Err(OfxIoError::FormatMismatch(format!(
                    "proxy files at mip-map level {proxy_level} are smaller than the render at level {render_level}"
                )));
            }
            render_level - proxy_level
        } else {
            render_level
        };

        let Some(filename) = located.filename.as_deref() else {
            return Err(located.missing_error());
        };
        let time = located.frame as f64;
        let info = self.backend.frame_info(filename, time)?;
        if use_proxy {
            self.check_proxy_size(&canonical, &info, time)?;
        }

        let Some(full_window) = args
            .render_window
            .upscale_power_of_two(levels)
            .intersect(info.bounds)
        else {
            trace!("render window outside the frame");
            return fill_outputs_black(outputs, args);
        };
        let decode_window = tile_aligned(full_window, &info);
        debug!(
            file = %filename.display(),
            frame = located.frame,
            use_proxy,
            levels,
            ?decode_window,
            "render"
        );

        let frame = ResolvedFrame {
            filename,
            time,
            levels,
            full_window,
            decode_window,
        };
        let conversion = self.color_conversion();
        for out in outputs.iter_mut() {
            self.render_plane(args, &frame, &conversion, out)?;
        }
        Ok(())
    }

    /// The input to working space transform, shared by every frame of the
    /// sequence.
    pub(crate) fn color_conversion(&self) -> ColorspaceConversion {
        ColorspaceConversion::new(
            self.settings.input_colorspace,
            self.settings.output_colorspace,
            self.settings.filename.clone(),
        )
    }

    /// A proxy file must be the size its detected or entered scale says.
    fn check_proxy_size(
        &self,
        canonical: &LocatedFrame,
        proxy_info: &FrameInfo,
        time: OfxTime,
    ) -> Result<()> {
        let Some(full) = canonical.filename.as_deref() else {
            return Ok(());
        };
        let full_bounds = self.backend.frame_info(full, time)?.bounds;
        let expected = full_bounds
            .downscale_power_of_two_smallest_enclosing(self.settings.proxy.original_level());
        let got = proxy_info.bounds;
        let off_by = |a: i32, b: i32| (a - b).abs() > 1;
        if off_by(got.width(), expected.width()) || off_by(got.height(), expected.height()) {
            return Err(OfxIoError::FormatMismatch(format!(
                "proxy frame is {}x{}, expected {}x{}",
                got.width(),
                got.height(),
                expected.width(),
                expected.height()
            )));
        }
        Ok(())
    }

    fn render_plane(
        &self,
        args: &RenderArgs<'_>,
        frame: &ResolvedFrame<'_>,
        conversion: &ColorspaceConversion,
        out: &mut OutputPlane<'_>,
    ) -> Result<()> {
        let abort = args.abort;
        let requested = out.image.buffer.components();
        let native = self.backend.plane_components(frame.filename, out.plane)?;
        let decoded_premult = self
            .backend
            .expected_premultiplication()
            .for_components(native);
        let target = output_premultiplication(self.settings.premultiplication, requested);

        let convert = out.plane == COLOR_PLANE && !conversion.is_identity(args.time);

        let needs_premult = |state: Premultiplication| {
            requested == PixelComponents::Rgba
                && native == PixelComponents::Rgba
                && state == Premultiplication::UnPreMultiplied
                && target == Premultiplication::PreMultiplied
        };

        let request = DecodeRequest {
            filename: frame.filename,
            time: frame.time,
            view: args.view,
            plane: out.plane,
            window: frame.decode_window,
        };

        let direct = !needs_premult(decoded_premult)
            && !convert
            && frame.levels == 0
            && native == requested
            && frame.decode_window == frame.full_window;
        if direct {
            trace!("decoding into the output buffer");
            let dst = &mut out.image.buffer;
            if frame.full_window != args.render_window {
                fill_black(dst, args.render_window, abort)?;
            }
            self.backend.decode(&request, dst)?;
            out.image.premultiplication = target;
            return Ok(());
        }

        let mut decoded = self.pool.acquire(frame.decode_window, native)?;
        self.backend.decode(&request, &mut decoded)?;
        abort.check()?;

        // colour conversion works on unpremultiplied pixels
        let mut state = decoded_premult;
        if convert {
            if native == PixelComponents::Rgba && state == Premultiplication::PreMultiplied {
                unpremultiply(&mut decoded, frame.decode_window, abort)?;
                state = Premultiplication::UnPreMultiplied;
            }
            conversion.apply(args.time, frame.decode_window, &mut decoded, abort)?;
        }

        let packed;
        let stage: &ImageBuffer = if native == requested {
            &*decoded
        } else {
            let mut buf = self.pool.acquire(frame.decode_window, requested)?;
            let plan = PackingPlan::for_components(native, requested);
            pack_window(&decoded, &mut buf, frame.decode_window, &plan, abort)?;
            packed = buf;
            &*packed
        };

        let premultiply = needs_premult(state);
        let dst = &mut out.image.buffer;
        if frame.levels > 0 {
            let out_rect = frame
                .full_window
                .downscale_power_of_two_smallest_enclosing(frame.levels);
            if out_rect != args.render_window {
                fill_black(dst, args.render_window, abort)?;
            }
            if premultiply {
                // never premultiply in place in a buffer another render may read
                let mut small = self.pool.acquire(out_rect, requested)?;
                downscale(stage, frame.full_window, frame.levels, &mut small, &self.pool, abort)?;
                premultiply_copy(&small, dst, out_rect, abort)?;
            } else {
                downscale(stage, frame.full_window, frame.levels, dst, &self.pool, abort)?;
            }
        } else if premultiply {
            premultiply_copy(stage, dst, args.render_window, abort)?;
        } else {
            copy_window(stage, dst, args.render_window, abort)?;
        }
        out.image.premultiplication = target;
        Ok(())
    }
}

/// Grow `window` to the file's tile grid so tiled decoders get whole tiles.
fn tile_aligned(window: RectI, info: &FrameInfo) -> RectI {
    if info.is_tiled() {
        window.round_to_tiles(
            info.bounds,
            info.tile_width,
            info.tile_height,
            info.tiles_top_down,
        )
    } else {
        window
    }
}

fn check_output(image: &HostImage, args: &RenderArgs<'_>) -> Result<()> {
    if image.bit_depth != BitDepth::Float {
        return Err(OfxIoError::FormatMismatch(format!(
            "unsupported output bit depth {:?}",
            image.bit_depth
        )));
    }
    if image.render_scale != args.render_scale {
        return Err(OfxIoError::FormatMismatch(format!(
            "host gave an image at scale {:?} for a render at {:?}",
            image.render_scale, args.render_scale
        )));
    }
    if image.buffer.components() == PixelComponents::None {
        return Err(OfxIoError::FormatMismatch("output image has no channel".into()));
    }
    if !image.buffer.bounds().contains(args.render_window) {
        return Err(OfxIoError::FormatMismatch(format!(
            "render window {:?} is outside the output image {:?}",
            args.render_window,
            image.buffer.bounds()
        )));
    }
    Ok(())
}

fn fill_outputs_black(outputs: &mut [OutputPlane<'_>], args: &RenderArgs<'_>) -> Result<()> {
    for out in outputs.iter_mut() {
        fill_black(&mut out.image.buffer, args.render_window, args.abort)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use std::sync::Arc;

    use ofxio_color::ColorSpace;
    use ofxio_host::{HostCapabilities, MemoryFileSystem, ParamValue};
    use ofxio_sequence::{BeforeAfterPolicy, MissingFramePolicy};

    use crate::settings::names;
    use crate::test_support::{sample, PatternBackend};

    const W: i32 = 16;
    const H: i32 = 8;

    fn setup(backend: PatternBackend, frames: &[i64]) -> (GenericReader, Arc<PatternBackend>) {
        let fs = Arc::new(MemoryFileSystem::with_files(
            frames.iter().map(|f| format!("/shots/plate.{f:04}.exr")),
        ));
        let backend = Arc::new(backend);
        let mut reader = GenericReader::new(backend.clone(), fs, HostCapabilities::default());
        let first = frames.first().copied().unwrap_or(1);
        reader
            .set_param(
                names::FILENAME,
                ParamValue::String(format!("/shots/plate.{first:04}.exr")),
            )
            .unwrap();
        (reader, backend)
    }

    fn output(bounds: RectI, components: PixelComponents, scale: RenderScale) -> HostImage {
        let mut image = HostImage::new(
            ImageBuffer::new(bounds, components).unwrap(),
            Premultiplication::Opaque,
        );
        image.render_scale = scale;
        image
    }

    fn render(
        reader: &GenericReader,
        time: f64,
        scale: RenderScale,
        image: &mut HostImage,
    ) -> OfxStatus {
        let abort = AbortSignal::new();
        let args = RenderArgs {
            time,
            render_scale: scale,
            render_window: image.buffer.bounds(),
            view: 0,
            abort: &abort,
        };
        reader.render(&args, &mut [OutputPlane { plane: COLOR_PLANE, image }])
    }

    fn set_choice(reader: &mut GenericReader, name: &str, index: usize) {
        reader.set_param(name, ParamValue::Choice(index)).unwrap();
    }

    #[test]
    fn test_direct_decode_into_output() {
        let mut backend = PatternBackend::new(RectI::from_size(W, H), PixelComponents::Rgba);
        backend.premultiplication = Premultiplication::PreMultiplied;
        let (mut reader, backend) = setup(backend, &[1, 2, 3]);
        set_choice(&mut reader, names::PREMULT, 1);

        let mut image = output(RectI::from_size(W, H), PixelComponents::Rgba, RenderScale::FULL);
        assert_eq!(render(&reader, 2.0, RenderScale::FULL, &mut image), OfxStatus::Ok);
        assert_eq!(backend.decode_count(), 1);
        assert_eq!(image.buffer.pixel(5, 3).unwrap()[2], sample(5, 3, 2));
        assert_eq!(image.premultiplication, Premultiplication::PreMultiplied);
        // nothing went through the pool
        assert_eq!(reader.pool.buffer_count(), 0);
    }

    #[test]
    fn test_unpremultiplied_file_is_premultiplied() {
        let backend = PatternBackend::new(RectI::from_size(W, H), PixelComponents::Rgba);
        let (reader, _) = setup(backend, &[1]);
        assert_eq!(reader.settings().premultiplication, Premultiplication::UnPreMultiplied);

        let mut image = output(RectI::from_size(W, H), PixelComponents::Rgba, RenderScale::FULL);
        assert_eq!(render(&reader, 1.0, RenderScale::FULL, &mut image), OfxStatus::Ok);
        let px = image.buffer.pixel(3, 2).unwrap();
        let a = sample(3, 2, 3);
        assert!((px[0] - sample(3, 2, 0) * a).abs() < 1e-6);
        assert_eq!(px[3], a);
        assert_eq!(image.premultiplication, Premultiplication::PreMultiplied);
    }

    #[test]
    fn test_black_policy_never_decodes() {
        let backend = PatternBackend::new(RectI::from_size(W, H), PixelComponents::Rgba);
        let (mut reader, backend) = setup(backend, &[1, 2, 3]);
        set_choice(&mut reader, names::BEFORE, BeforeAfterPolicy::Black.choice_index());

        let mut image = output(RectI::from_size(W, H), PixelComponents::Rgba, RenderScale::FULL);
        image.buffer.fill(0.5);
        assert_eq!(render(&reader, -4.0, RenderScale::FULL, &mut image), OfxStatus::Ok);
        assert_eq!(backend.decode_count(), 0);
        assert!(image.buffer.data().iter().all(|v| *v == 0.0));
    }

    #[test]
    fn test_error_policy_reports_out_of_range() {
        let backend = PatternBackend::new(RectI::from_size(W, H), PixelComponents::Rgba);
        let (mut reader, backend) = setup(backend, &[1, 2, 3]);
        set_choice(&mut reader, names::AFTER, BeforeAfterPolicy::Error.choice_index());

        let mut image = output(RectI::from_size(W, H), PixelComponents::Rgba, RenderScale::FULL);
        assert_eq!(render(&reader, 9.0, RenderScale::FULL, &mut image), OfxStatus::Failed);
        assert_eq!(backend.decode_count(), 0);
        assert_eq!(reader.message().get().unwrap().1, "Out of frame range");
    }

    #[test]
    fn test_missing_frame_fails_with_message() {
        let backend = PatternBackend::new(RectI::from_size(W, H), PixelComponents::Rgba);
        let (reader, backend) = setup(backend, &[1, 3]);

        let mut image = output(RectI::from_size(W, H), PixelComponents::Rgba, RenderScale::FULL);
        assert_eq!(render(&reader, 2.0, RenderScale::FULL, &mut image), OfxStatus::Failed);
        assert_eq!(backend.decode_count(), 0);
        let (_, text) = reader.message().get().unwrap();
        assert_eq!(text, "Cannot load frame 2: /shots/plate.0002.exr");
    }

    #[test]
    fn test_missing_frame_previous_substitutes() {
        let backend = PatternBackend::new(RectI::from_size(W, H), PixelComponents::Rgba);
        let (mut reader, backend) = setup(backend, &[1, 3]);
        set_choice(
            &mut reader,
            names::MISSING_FRAME,
            MissingFramePolicy::Previous.choice_index(),
        );
        let mut image = output(RectI::from_size(W, H), PixelComponents::Rgba, RenderScale::FULL);
        assert_eq!(render(&reader, 2.0, RenderScale::FULL, &mut image), OfxStatus::Ok);
        let decoded = backend.decoded.lock();
        assert_eq!(decoded[0].0, PathBuf::from("/shots/plate.0001.exr"));
    }

    #[test]
    fn test_downscale_without_proxy() {
        let backend = PatternBackend::new(RectI::from_size(W, H), PixelComponents::Alpha);
        let (reader, backend) = setup(backend, &[1]);

        let half = RenderScale::from_mipmap_level(1);
        let mut image = output(RectI::from_size(W / 2, H / 2), PixelComponents::Alpha, half);
        assert_eq!(render(&reader, 1.0, half, &mut image), OfxStatus::Ok);
        assert_eq!(backend.decoded.lock()[0].1, RectI::from_size(W, H));
        let want = (sample(2, 2, 0) + sample(3, 2, 0) + sample(2, 3, 0) + sample(3, 3, 0)) / 4.0;
        assert!((image.buffer.pixel(1, 1).unwrap()[0] - want).abs() < 1e-6);
    }

    #[test]
    fn test_proxy_used_below_threshold() {
        let mut backend = PatternBackend::new(RectI::from_size(W, H), PixelComponents::Rgb);
        backend.sizes.insert(
            PathBuf::from("/proxy/plate.0001.exr"),
            RectI::from_size(W / 2, H / 2),
        );
        let fs = Arc::new(MemoryFileSystem::with_files([
            "/shots/plate.0001.exr",
            "/proxy/plate.0001.exr",
        ]));
        let backend = Arc::new(backend);
        let mut reader = GenericReader::new(backend.clone(), fs, HostCapabilities::default());
        reader
            .set_param(names::FILENAME, ParamValue::String("/shots/plate.0001.exr".into()))
            .unwrap();
        reader
            .set_param(names::PROXY_FILENAME, ParamValue::String("/proxy/plate.0001.exr".into()))
            .unwrap();
        assert_eq!(reader.settings().proxy.original_scale, [0.5, 0.5]);

        // full scale reads the full file
        let mut image = output(RectI::from_size(W, H), PixelComponents::Rgb, RenderScale::FULL);
        assert_eq!(render(&reader, 1.0, RenderScale::FULL, &mut image), OfxStatus::Ok);
        // a quarter scale reads the proxy and halves it once
        let quarter = RenderScale::from_mipmap_level(2);
        let mut image = output(RectI::from_size(W / 4, H / 4), PixelComponents::Rgb, quarter);
        assert_eq!(render(&reader, 1.0, quarter, &mut image), OfxStatus::Ok);

        let decoded = backend.decoded.lock();
        assert_eq!(decoded[0].0, PathBuf::from("/shots/plate.0001.exr"));
        assert_eq!(decoded[1].0, PathBuf::from("/proxy/plate.0001.exr"));
        assert_eq!(decoded[1].1, RectI::from_size(W / 2, H / 2));
    }

    #[test]
    fn test_undetected_proxy_scale_keeps_full_files() {
        let mut backend = PatternBackend::new(RectI::from_size(W, H), PixelComponents::Rgba);
        backend.sizes.insert(
            PathBuf::from("/px/plate.0002.exr"),
            RectI::from_size(W / 2, H / 2),
        );
        // no proxy for the first frame, so nothing to detect the scale from
        let fs = Arc::new(MemoryFileSystem::with_files([
            "/sh/plate.0001.exr",
            "/sh/plate.0002.exr",
            "/px/plate.0002.exr",
        ]));
        let backend = Arc::new(backend);
        let mut reader = GenericReader::new(backend.clone(), fs, HostCapabilities::default());
        reader
            .set_param(names::FILENAME, ParamValue::String("/sh/plate.0001.exr".into()))
            .unwrap();
        reader
            .set_param(names::PROXY_FILENAME, ParamValue::String("/px/plate.0001.exr".into()))
            .unwrap();
        assert_eq!(reader.settings().proxy.threshold, [1.0, 1.0]);
        assert!(!reader.settings().proxy.applies_at(0));

        let mut image = output(RectI::from_size(W, H), PixelComponents::Rgba, RenderScale::FULL);
        assert_eq!(render(&reader, 2.0, RenderScale::FULL, &mut image), OfxStatus::Ok);
        let half = RenderScale::from_mipmap_level(1);
        let mut small = output(RectI::from_size(W / 2, H / 2), PixelComponents::Rgba, half);
        assert_eq!(render(&reader, 2.0, half, &mut small), OfxStatus::Ok);

        let decoded = backend.decoded.lock();
        assert!(decoded.iter().all(|(f, _)| f == &PathBuf::from("/sh/plate.0002.exr")));
        let px = image.buffer.pixel(12, 6).unwrap();
        assert_eq!(px[3], sample(12, 6, 3));
    }

    #[test]
    fn test_proxy_of_unexpected_size_is_format_mismatch() {
        let mut backend = PatternBackend::new(RectI::from_size(W, H), PixelComponents::Rgba);
        backend.sizes.insert(
            PathBuf::from("/proxy/plate.0001.exr"),
            RectI::from_size(W / 4, H / 4),
        );
        let fs = Arc::new(MemoryFileSystem::with_files([
            "/shots/plate.0001.exr",
            "/proxy/plate.0001.exr",
        ]));
        let backend = Arc::new(backend);
        let mut reader = GenericReader::new(backend.clone(), fs, HostCapabilities::default());
        reader
            .set_param(names::FILENAME, ParamValue::String("/shots/plate.0001.exr".into()))
            .unwrap();
        reader
            .set_param(names::PROXY_FILENAME, ParamValue::String("/proxy/plate.0001.exr".into()))
            .unwrap();
        // the user claims half size proxies
        reader.set_param(names::CUSTOM_PROXY_SCALE, ParamValue::Bool(true)).unwrap();
        reader
            .set_param(names::ORIGINAL_PROXY_SCALE, ParamValue::Double2([0.5, 0.5]))
            .unwrap();
        reader
            .set_param(names::PROXY_THRESHOLD, ParamValue::Double2([0.5, 0.5]))
            .unwrap();
        assert!(reader.settings().proxy.applies_at(1));

        let half = RenderScale::from_mipmap_level(1);
        let mut image = output(RectI::from_size(W / 2, H / 2), PixelComponents::Rgba, half);
        assert_eq!(render(&reader, 1.0, half, &mut image), OfxStatus::Failed);
        assert!(reader.message().get().unwrap().1.starts_with("Format mismatch"));
        assert_eq!(backend.decode_count(), 0);
    }

    #[test]
    fn test_sequence_shares_one_colour_processor() {
        let backend = PatternBackend::new(RectI::from_size(W, H), PixelComponents::Rgba);
        let fs = Arc::new(MemoryFileSystem::with_files(
            (1..=6).map(|f| format!("/colour-cache/plate.{f:04}.exr")),
        ));
        let mut reader = GenericReader::new(Arc::new(backend), fs, HostCapabilities::default());
        reader
            .set_param(
                names::FILENAME,
                ParamValue::String("/colour-cache/plate.0001.exr".into()),
            )
            .unwrap();
        reader
            .set_param(names::INPUT_COLORSPACE, ParamValue::String("sRGB".into()))
            .unwrap();

        for t in 1..=6 {
            let mut image =
                output(RectI::from_size(W, H), PixelComponents::Rgba, RenderScale::FULL);
            assert_eq!(render(&reader, t as f64, RenderScale::FULL, &mut image), OfxStatus::Ok);
        }
        assert_eq!(
            reader.color_conversion().key().context,
            "/colour-cache/plate.0001.exr"
        );
        let entries = ofxio_color::global_cache()
            .keys()
            .into_iter()
            .filter(|k| k.context.starts_with("/colour-cache/"))
            .count();
        assert!(entries <= 1, "{entries} processors for one sequence");
    }

    #[test]
    fn test_non_power_of_two_scale_fails() {
        let backend = PatternBackend::new(RectI::from_size(W, H), PixelComponents::Rgba);
        let (reader, backend) = setup(backend, &[1]);
        let scale = RenderScale::new(0.3, 0.3);
        let mut image = output(RectI::from_size(4, 2), PixelComponents::Rgba, scale);
        assert_eq!(render(&reader, 1.0, scale, &mut image), OfxStatus::Failed);
        assert_eq!(backend.decode_count(), 0);
    }

    #[test]
    fn test_wrong_output_scale_is_format_mismatch() {
        let backend = PatternBackend::new(RectI::from_size(W, H), PixelComponents::Rgba);
        let (reader, _) = setup(backend, &[1]);
        let mut image = output(RectI::from_size(W, H), PixelComponents::Rgba, RenderScale::FULL);
        let half = RenderScale::from_mipmap_level(1);
        assert_eq!(render(&reader, 1.0, half, &mut image), OfxStatus::Failed);
        assert!(reader.message().get().unwrap().1.starts_with("Format mismatch"));
    }

    #[test]
    fn test_tiled_decode_window() {
        let mut backend = PatternBackend::new(RectI::from_size(W, H), PixelComponents::Rgba);
        backend.tile = (4, 4);
        backend.premultiplication = Premultiplication::PreMultiplied;
        let (mut reader, backend) = setup(backend, &[1]);
        set_choice(&mut reader, names::PREMULT, 1);

        let window = RectI::new(5, 1, 7, 3);
        let mut image = output(RectI::from_size(W, H), PixelComponents::Rgba, RenderScale::FULL);
        let abort = AbortSignal::new();
        let args = RenderArgs {
            time: 1.0,
            render_scale: RenderScale::FULL,
            render_window: window,
            view: 0,
            abort: &abort,
        };
        let mut outputs = [OutputPlane {
            plane: COLOR_PLANE,
            image: &mut image,
        }];
        let status = reader.render(&args, &mut outputs);
        assert_eq!(status, OfxStatus::Ok);
        assert_eq!(backend.decoded.lock()[0].1, RectI::new(4, 0, 8, 4));
        assert_eq!(image.buffer.pixel(6, 2).unwrap()[1], sample(6, 2, 1));
        // outside the window the output is untouched
        assert_eq!(image.buffer.pixel(4, 0).unwrap()[1], 0.0);
    }

    #[test]
    fn test_layout_remapped_to_request() {
        let backend = PatternBackend::new(RectI::from_size(W, H), PixelComponents::Rgb);
        let (reader, _) = setup(backend, &[1]);
        let mut image = output(RectI::from_size(W, H), PixelComponents::Rgba, RenderScale::FULL);
        assert_eq!(render(&reader, 1.0, RenderScale::FULL, &mut image), OfxStatus::Ok);
        let px = image.buffer.pixel(2, 2).unwrap();
        assert_eq!(px[0], sample(2, 2, 0));
        assert_eq!(px[3], 1.0);
    }

    #[test]
    fn test_colorspace_with_premultiplied_source() {
        let mut backend = PatternBackend::new(RectI::from_size(W, H), PixelComponents::Rgba);
        backend.premultiplication = Premultiplication::PreMultiplied;
        let (mut reader, _) = setup(backend, &[1]);
        set_choice(&mut reader, names::PREMULT, 1);
        reader
            .set_param(names::INPUT_COLORSPACE, ParamValue::String("sRGB".into()))
            .unwrap();

        let mut image = output(RectI::from_size(W, H), PixelComponents::Rgba, RenderScale::FULL);
        assert_eq!(render(&reader, 1.0, RenderScale::FULL, &mut image), OfxStatus::Ok);

        let processor = ofxio_color::ColorProcessor::new(ColorSpace::Srgb, ColorSpace::Linear);
        for (x, y) in [(1, 1), (7, 3), (12, 6)] {
            let a = sample(x, y, 3);
            let rgb = [sample(x, y, 0), sample(x, y, 1), sample(x, y, 2)];
            let want = if a > 0.0 {
                processor.process_pixel(rgb.map(|v| v / a)).map(|v| v * a)
            } else {
                processor.process_pixel(rgb).map(|v| v * a)
            };
            let px = image.buffer.pixel(x, y).unwrap();
            for c in 0..3 {
                assert!((px[c] - want[c]).abs() < 1e-5, "({x},{y}) channel {c}");
            }
            assert_eq!(px[3], a);
        }
    }

    #[test]
    fn test_aborted_render_is_silent() {
        let backend = PatternBackend::new(RectI::from_size(W, H), PixelComponents::Rgba);
        let (reader, backend) = setup(backend, &[1]);
        let mut image = output(RectI::from_size(W, H), PixelComponents::Rgba, RenderScale::FULL);
        let abort = AbortSignal::new();
        abort.abort();
        let args = RenderArgs {
            time: 1.0,
            render_scale: RenderScale::FULL,
            render_window: image.buffer.bounds(),
            view: 0,
            abort: &abort,
        };
        let mut outputs = [OutputPlane {
            plane: COLOR_PLANE,
            image: &mut image,
        }];
        let status = reader.render(&args, &mut outputs);
        assert_eq!(status, OfxStatus::Ok);
        assert_eq!(backend.decode_count(), 0);
        assert!(reader.message().get().is_none());
    }

    #[test]
    fn test_pool_buffers_returned() {
        let backend = PatternBackend::new(RectI::from_size(W, H), PixelComponents::Rgb);
        let (reader, _) = setup(backend, &[1]);
        let quarter = RenderScale::from_mipmap_level(2);
        let mut image = output(RectI::from_size(W / 4, H / 4), PixelComponents::Rgba, quarter);
        assert_eq!(render(&reader, 1.0, quarter, &mut image), OfxStatus::Ok);
        // decode, packing and one intermediate level all came back
        assert_eq!(reader.pool.buffer_count(), 3);
        reader.purge_caches();
        assert_eq!(reader.pool.buffer_count(), 0);
    }
}
