//! Guarantees that span the sequence crate and the reader.

use std::path::Path;
use std::sync::Arc;

use ofxio_core::{RangeI, RectI};
use ofxio_host::{MemoryFileSystem, OfxStatus, ParamValue};
use ofxio_reader::{names, GenericReader};
use ofxio_sequence::{
    BeforeAfterPolicy, FileSequence, FrameKind, FrameLocator, MissingFramePolicy,
    SequenceFilenames, SequencePattern, SequenceTime, TimeMapper,
};

use crate::support::{open_reader, render_rgba, CountingBackend};

fn reader_with_before(policy: BeforeAfterPolicy) -> (GenericReader, Arc<CountingBackend>) {
    let backend = Arc::new(CountingBackend::new(RectI::from_size(8, 8)));
    let mut reader = open_reader(backend.clone(), &[10, 11, 12]);
    reader
        .set_param(names::BEFORE, ParamValue::Choice(policy.choice_index()))
        .unwrap();
    (reader, backend)
}

#[test]
fn test_black_before_sequence_never_decodes() {
    let (reader, backend) = reader_with_before(BeforeAfterPolicy::Black);
    for t in [9.0, 0.0, -250.0] {
        let (status, image) = render_rgba(&reader, t, RectI::from_size(8, 8));
        assert_eq!(status, OfxStatus::Ok);
        assert!(image.buffer.data().iter().all(|v| *v == 0.0));
    }
    assert_eq!(backend.decode_count(), 0);
}

#[test]
fn test_error_before_sequence_never_decodes() {
    let (reader, backend) = reader_with_before(BeforeAfterPolicy::Error);
    let (status, _) = render_rgba(&reader, 3.0, RectI::from_size(8, 8));
    assert_eq!(status, OfxStatus::Failed);
    assert_eq!(backend.decode_count(), 0);
    assert!(reader.message().has_error());

    // the policy only covers times before the sequence
    let (status, _) = render_rgba(&reader, 11.0, RectI::from_size(8, 8));
    assert_eq!(status, OfxStatus::Ok);
    assert_eq!(backend.decode_count(), 1);
}

#[test]
fn test_mapper_black_and_error_skip_lookup() {
    let domain = RangeI::new(10, 12);
    let black = TimeMapper::new(domain, 0)
        .with_policies(BeforeAfterPolicy::Black, BeforeAfterPolicy::Error);
    assert_eq!(black.sequence_time(2.0), SequenceTime::Black);
    assert_eq!(black.sequence_time(20.0), SequenceTime::Error);
}

#[test]
fn test_nearest_search_gives_up_after_hundred_frames() {
    let (pattern, _) = SequencePattern::parse(Path::new("/seq/far.0001.exr")).unwrap();
    let fs = MemoryFileSystem::new();
    fs.add(pattern.filename_for(1000));
    let names = SequenceFilenames {
        full: FileSequence::Pattern {
            pattern,
            frames: [1000].into_iter().collect(),
        },
        proxy: None,
    };

    fs.reset_probe_count();
    let located = FrameLocator::new(&names, &fs, MissingFramePolicy::Nearest).locate(500.0, false);
    assert_eq!(located.kind, FrameKind::Failed);
    assert_eq!(located.frame, 500);
    assert!(fs.probe_count() <= 201, "{} probes", fs.probe_count());
    assert!(fs.probe_count() > 100);
}

#[test]
fn test_nearest_search_finds_frame_at_the_limit() {
    let (pattern, _) = SequencePattern::parse(Path::new("/seq/far.0001.exr")).unwrap();
    let fs = MemoryFileSystem::new();
    fs.add(pattern.filename_for(600));
    let names = SequenceFilenames {
        full: FileSequence::Pattern {
            pattern,
            frames: [600].into_iter().collect(),
        },
        proxy: None,
    };

    let located = FrameLocator::new(&names, &fs, MissingFramePolicy::Nearest).locate(500.0, false);
    assert_eq!(located.kind, FrameKind::FullRes);
    assert_eq!(located.frame, 600);
}
