//! The user's remapping of the source frame range onto the timeline.

use ofxio_core::{RangeI, Result};
use serde::{Deserialize, Serialize};

use crate::policy::{BeforeAfterPolicy, FrameMode};
use crate::time_mapper::TimeMapper;

/// First/last frame and the offset moving them onto the timeline.
///
/// `starting_time == first_frame + time_offset` and
/// `first_frame <= last_frame` hold after every edit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrameRangeMapping {
    first_frame: i32,
    last_frame: i32,
    starting_time: i32,
    time_offset: i32,
    pub frame_mode: FrameMode,
}

impl FrameRangeMapping {
    /// Mapping showing `domain` at its own frame numbers.
    pub fn new(domain: RangeI) -> Self {
        Self {
            first_frame: domain.min,
            last_frame: domain.max.max(domain.min),
            starting_time: domain.min,
            time_offset: 0,
            frame_mode: FrameMode::StartingTime,
        }
    }

    pub fn first_frame(&self) -> i32 {
        self.first_frame
    }

    pub fn last_frame(&self) -> i32 {
        self.last_frame
    }

    pub fn starting_time(&self) -> i32 {
        self.starting_time
    }

    pub fn time_offset(&self) -> i32 {
        self.time_offset
    }

    /// Reset to a freshly detected sequence range.
    pub fn reset(&mut self, domain: RangeI) {
        let mode = self.frame_mode;
        *self = Self::new(domain);
        self.frame_mode = mode;
    }

    /// The first frame may not pass the last one. The offset is kept.
    pub fn set_first_frame(&mut self, first: i32) {
        self.first_frame = first.min(self.last_frame);
        self.starting_time = self.first_frame.saturating_add(self.time_offset);
    }

    pub fn set_last_frame(&mut self, last: i32) {
        self.last_frame = last.max(self.first_frame);
    }

    pub fn set_starting_time(&mut self, starting_time: i32) {
        self.starting_time = starting_time;
        self.time_offset = starting_time.saturating_sub(self.first_frame);
    }

    pub fn set_time_offset(&mut self, time_offset: i32) {
        self.time_offset = time_offset;
        self.starting_time = self.first_frame.saturating_add(time_offset);
    }

    /// Sequence range, before the offset.
    pub fn sequence_domain(&self) -> RangeI {
        RangeI::new(self.first_frame, self.last_frame)
    }

    /// Frames of the timeline the sequence occupies.
    pub fn time_domain(&self) -> RangeI {
        self.sequence_domain().offset(self.time_offset)
    }

    pub fn time_mapper(&self, before: BeforeAfterPolicy, after: BeforeAfterPolicy) -> TimeMapper {
        TimeMapper::new(self.sequence_domain(), self.time_offset).with_policies(before, after)
    }
}

impl Default for FrameRangeMapping {
    fn default() -> Self {
        Self::new(RangeI::new(1, 1))
    }
}

/// The frame range of the source as detected, computed on first use.
///
/// The range stays [`RangeI::UNSET`] until computed, and is recomputed when
/// the input file changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct OriginalFrameRange {
    range: RangeI,
    /// The user edited first/last frame by hand; a new file does not reset
    /// them.
    pub user_edited: bool,
}

impl OriginalFrameRange {
    pub fn new(range: RangeI) -> Self {
        Self {
            range,
            user_edited: false,
        }
    }

    pub fn get(&self) -> Option<RangeI> {
        (!self.range.is_unset()).then_some(self.range)
    }

    /// Cached range, computing it with `detect` the first time.
    pub fn get_or_detect(&mut self, detect: impl FnOnce() -> Result<RangeI>) -> Result<RangeI> {
        if self.range.is_unset() {
            let detected = detect()?;
            self.range = RangeI::new(detected.min, detected.max.max(detected.min));
        }
        Ok(self.range)
    }

    /// Forget the cached range.
    pub fn invalidate(&mut self) {
        self.range = RangeI::UNSET;
    }

    pub fn set(&mut self, range: RangeI) {
        self.range = range;
    }
}
