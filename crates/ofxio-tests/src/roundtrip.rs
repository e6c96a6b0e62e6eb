//! Files on disk through the reader, the writer and back.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use image::{Rgba, Rgba32FImage, RgbaImage};
use ofxio_core::{AbortSignal, RectI, RenderScale};
use ofxio_host::{HostCapabilities, OfxStatus, ParamValue, StdFileSystem};
use ofxio_media::{ImageFileReader, ImageFileWriter};
use ofxio_reader::{GenericReader, ReaderClip};
use ofxio_writer::{GenericWriter, WriteArgs};

use crate::support::assert_close;

const W: u32 = 9;
const H: u32 = 5;

fn png_pixel(frame: u32, x: u32, y: u32) -> Rgba<u8> {
    let alpha = if x < 4 { 255 } else { 128 };
    Rgba([
        ((x * 27 + frame * 5) % 256) as u8,
        ((y * 51 + frame) % 256) as u8,
        ((x * y * 13) % 256) as u8,
        alpha,
    ])
}

fn write_png_sequence(dir: &Path, frames: std::ops::RangeInclusive<u32>) -> PathBuf {
    for frame in frames.clone() {
        let img = RgbaImage::from_fn(W, H, |x, y| png_pixel(frame, x, y));
        img.save(dir.join(format!("plate.{frame:04}.png"))).unwrap();
    }
    dir.join(format!("plate.{:04}.png", frames.start()))
}

fn open_reader(path: &Path) -> GenericReader {
    let mut reader = GenericReader::new(
        Arc::new(ImageFileReader::new()),
        Arc::new(StdFileSystem),
        HostCapabilities::default(),
    );
    reader
        .set_param(
            ofxio_reader::names::FILENAME,
            ParamValue::String(path.display().to_string()),
        )
        .unwrap();
    reader
}

fn open_writer(pattern: &Path) -> GenericWriter {
    let mut writer =
        GenericWriter::new(Arc::new(ImageFileWriter::new()), HostCapabilities::default());
    writer
        .set_param(
            ofxio_writer::names::FILENAME,
            ParamValue::String(pattern.display().to_string()),
        )
        .unwrap();
    writer
}

fn frame_window(reader: &GenericReader, time: f64) -> RectI {
    let prefs = reader.clip_preferences().unwrap();
    reader
        .region_of_definition(time)
        .unwrap()
        .to_pixel_enclosing(RenderScale::FULL, prefs.pixel_aspect_ratio)
}

fn write_window(
    reader: &GenericReader,
    writer: &GenericWriter,
    time: f64,
    window: RectI,
) -> OfxStatus {
    let abort = AbortSignal::new();
    writer.render(&WriteArgs::new(time, window, &abort), &ReaderClip::new(reader))
}

fn write_frame(reader: &GenericReader, writer: &GenericWriter, time: f64) -> OfxStatus {
    write_window(reader, writer, time, frame_window(reader, time))
}

#[test]
fn test_png_sequence_survives_read_and_write() {
    let dir = tempfile::tempdir().unwrap();
    let first = write_png_sequence(dir.path(), 1..=3);

    let reader = open_reader(&first);
    let range = reader.time_domain();
    assert_eq!((range.min, range.max), (1.0, 3.0));

    let writer = open_writer(&dir.path().join("out/copy.####.png"));
    for frame in 1..=3 {
        assert_eq!(write_frame(&reader, &writer, frame as f64), OfxStatus::Ok);
    }

    for frame in 1..=3u32 {
        let written = writer.filename_at(frame as f64, "Main");
        assert!(written.ends_with(format!("copy.{frame:04}.png")), "{}", written.display());
        let back = image::open(&written).unwrap().to_rgba8();
        assert_eq!(back.dimensions(), (W, H));
        for (x, y, px) in back.enumerate_pixels() {
            let want = png_pixel(frame, x, y);
            for c in 0..4 {
                let diff = (px[c] as i32 - want[c] as i32).abs();
                assert!(diff <= 1, "frame {frame} ({x},{y}) channel {c}: {px:?} vs {want:?}");
            }
        }
    }
}

#[test]
fn test_exr_keeps_float_values() {
    let dir = tempfile::tempdir().unwrap();
    let src = dir.path().join("hdr.exr");
    let img = Rgba32FImage::from_fn(4, 3, |x, y| {
        Rgba([x as f32 * 2.5, y as f32 * 0.125, 7.25, if y == 0 { 0.5 } else { 1.0 }])
    });
    img.save(&src).unwrap();

    let reader = open_reader(&src);
    let range = reader.time_domain();
    assert_eq!((range.min, range.max), (1.0, 1.0));

    let out = dir.path().join("copy.exr");
    let writer = open_writer(&out);
    assert_eq!(write_frame(&reader, &writer, 1.0), OfxStatus::Ok);

    let back = image::open(&out).unwrap().to_rgba32f();
    for (x, y, px) in back.enumerate_pixels() {
        let want = img.get_pixel(x, y);
        for c in 0..4 {
            assert_close(px[c], want[c], 1e-5, &format!("({x},{y}) channel {c}"));
        }
    }
}

#[test]
fn test_file_removed_after_scan_reports_missing_frame() {
    let dir = tempfile::tempdir().unwrap();
    let first = write_png_sequence(dir.path(), 1..=3);
    let reader = open_reader(&first);
    let writer = open_writer(&dir.path().join("out.####.png"));

    let window = frame_window(&reader, 2.0);
    std::fs::remove_file(dir.path().join("plate.0002.png")).unwrap();
    assert!(reader.region_of_definition(2.0).is_err());

    assert_eq!(write_window(&reader, &writer, 2.0, window), OfxStatus::Failed);
    let (_, text) = writer.message().get().unwrap();
    assert!(text.contains("Cannot load frame 2"), "{text}");
    assert!(!writer.filename_at(2.0, "Main").exists());

    assert_eq!(write_frame(&reader, &writer, 3.0), OfxStatus::Ok);
}
