//! End-to-end walkthroughs of time mapping, frame search, downscaling and
//! the colour pipeline of the reader.

use std::path::Path;
use std::sync::Arc;

use ofxio_color::{ColorProcessor, ColorSpace};
use ofxio_core::{AbortSignal, ImageBuffer, PixelComponents, Premultiplication, RangeI, RectI};
use ofxio_host::{choice_of, MemoryFileSystem, OfxStatus, ParamValue};
use ofxio_imaging::{downscale, halve_window, ScratchPool};
use ofxio_reader::names;
use ofxio_reader::settings::PREMULT_CHOICES;
use ofxio_sequence::{
    BeforeAfterPolicy, FileSequence, FrameKind, FrameLocator, MissingFramePolicy,
    SequenceFilenames, SequencePattern, SequenceTime, TimeMapper,
};

use crate::support::{assert_close, open_reader, render_rgba, sample, CountingBackend};

#[test]
fn test_hold_clamps_both_ends() {
    let mapper = TimeMapper::new(RangeI::new(1, 100), 0)
        .with_policies(BeforeAfterPolicy::Hold, BeforeAfterPolicy::Hold);

    assert_eq!(mapper.sequence_time(150.0), SequenceTime::AfterSequence(100.0));
    assert_eq!(mapper.sequence_time(-5.0), SequenceTime::BeforeSequence(1.0));
    assert_eq!(mapper.sequence_time(42.0), SequenceTime::Within(42.0));
}

#[test]
fn test_hold_through_the_reader_decodes_the_last_frame() {
    let backend = Arc::new(CountingBackend::new(RectI::from_size(8, 4)));
    let reader = open_reader(backend.clone(), &(1..=100).collect::<Vec<_>>());
    assert_eq!(reader.time_domain().max, 100.0);

    let (status, image) = render_rgba(&reader, 150.0, RectI::from_size(8, 4));
    assert_eq!(status, OfxStatus::Ok);
    assert_eq!(backend.decode_count(), 1);
    assert!(image.buffer.pixel(2, 1).unwrap()[3] > 0.0);
}

#[test]
fn test_loop_before_the_first_frame() {
    let mapper = TimeMapper::new(RangeI::new(1, 10), 0)
        .with_policies(BeforeAfterPolicy::Loop, BeforeAfterPolicy::Hold);

    // offset from start is -4, truncated remainder -4, so 10 - 4
    assert_eq!(mapper.sequence_time(-3.0), SequenceTime::BeforeSequence(6.0));
}

#[test]
fn test_downscale_two_levels_matches_two_halvings() {
    let src_bounds = RectI::from_size(2048, 1536);
    let mut src = ImageBuffer::new(src_bounds, PixelComponents::Alpha).unwrap();
    for y in 0..1536 {
        for x in 0..2048 {
            src.pixel_mut(x, y).unwrap()[0] = ((x * 31 + y * 17) % 97) as f32 / 96.0;
        }
    }
    let abort = AbortSignal::new();
    let pool = ScratchPool::new(64 * 1024 * 1024);

    let quarter = src_bounds.downscale_power_of_two_smallest_enclosing(2);
    assert_eq!(quarter, RectI::from_size(512, 384));
    let mut direct = ImageBuffer::new(quarter, PixelComponents::Alpha).unwrap();
    downscale(&src, src_bounds, 2, &mut direct, &pool, &abort).unwrap();
    assert_eq!(direct.bounds().x2 - direct.bounds().x1, 512);
    assert_eq!(direct.bounds().y2 - direct.bounds().y1, 384);

    let half = RectI::from_size(1024, 768);
    let mut step1 = ImageBuffer::new(half, PixelComponents::Alpha).unwrap();
    halve_window(&src, src_bounds, &mut step1, half, &abort).unwrap();
    let mut step2 = ImageBuffer::new(quarter, PixelComponents::Alpha).unwrap();
    halve_window(&step1, half, &mut step2, quarter, &abort).unwrap();

    assert_eq!(direct.data(), step2.data());
}

#[test]
fn test_nearest_search_breaks_ties_forward() {
    let (pattern, _) = SequencePattern::parse(Path::new("/seq/shot.0001.exr")).unwrap();
    let fs = MemoryFileSystem::new();
    for f in [1, 3, 7] {
        fs.add(pattern.filename_for(f));
    }
    let names = SequenceFilenames {
        full: FileSequence::Pattern {
            pattern: pattern.clone(),
            frames: [1, 3, 7].into_iter().collect(),
        },
        proxy: None,
    };

    // offsets 0, +1, -1, +2: frames 5, 6, 4, 7
    let located = FrameLocator::new(&names, &fs, MissingFramePolicy::Nearest).locate(5.0, false);
    assert_eq!(located.kind, FrameKind::FullRes);
    assert_eq!(located.frame, 7);
    assert_eq!(located.filename, Some(pattern.filename_for(7)));
}

#[test]
fn test_premultiplied_source_is_converted_unpremultiplied() {
    let bounds = RectI::from_size(12, 6);
    let mut backend = CountingBackend::new(bounds);
    backend.premultiplication = Premultiplication::PreMultiplied;
    let mut reader = open_reader(Arc::new(backend), &[1]);
    reader
        .set_param(
            names::PREMULT,
            ParamValue::Choice(choice_of(&PREMULT_CHOICES, Premultiplication::PreMultiplied)),
        )
        .unwrap();
    reader
        .set_param(names::INPUT_COLORSPACE, ParamValue::String(ColorSpace::Srgb.name().into()))
        .unwrap();
    reader
        .set_param(names::OUTPUT_COLORSPACE, ParamValue::String(ColorSpace::Linear.name().into()))
        .unwrap();

    let (status, image) = render_rgba(&reader, 1.0, bounds);
    assert_eq!(status, OfxStatus::Ok);
    assert_eq!(image.premultiplication, Premultiplication::PreMultiplied);

    let processor = ColorProcessor::new(ColorSpace::Srgb, ColorSpace::Linear);
    for y in 0..6 {
        for x in 0..12 {
            let a = sample(x, y, 3);
            let straight = [sample(x, y, 0) / a, sample(x, y, 1) / a, sample(x, y, 2) / a];
            let want = processor.process_pixel(straight).map(|v| v * a);
            let px = image.buffer.pixel(x, y).unwrap();
            for c in 0..3 {
                assert_close(px[c], want[c], 1e-5, &format!("({x},{y}) channel {c}"));
            }
            assert_eq!(px[3], a);
        }
    }
}
