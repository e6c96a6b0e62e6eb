//! ofxio sequence - from host time to a file on disk
//!
//! Implements the time side of the reader:
//! - Mapping host time to sequence time with before/after policies
//! - Missing-frame search and proxy substitution
//! - Detection of frame-numbered file sequences
//! - The user's first/last frame and time offset remapping

pub mod frame_locator;
pub mod frame_range;
pub mod pattern;
pub mod policy;
pub mod scanner;
pub mod time_mapper;

pub use frame_locator::{
    FrameFilenames, FrameKind, FrameLocator, LocatedFrame, ParamFilenames, SequenceFilenames,
};
pub use frame_range::{FrameRangeMapping, OriginalFrameRange};
pub use pattern::{expand_filename, has_frame_token, SequencePattern};
pub use policy::{BeforeAfterPolicy, FrameMode, MissingFramePolicy};
pub use scanner::{scan_sequence, FileSequence};
pub use time_mapper::{resolve_after, resolve_before, SequenceTime, TimeMapper};
