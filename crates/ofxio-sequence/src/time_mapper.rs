//! Mapping from host time to sequence time.
//!
//! The sequence time is the frame index inside the nominal source range,
//! after removing the user's time offset. Outside the range the before/after
//! policies decide which frame is shown, if any.
//!
//! All wrap arithmetic uses Rust's `/` and `%`, which truncate towards zero.

use ofxio_core::{OfxTime, RangeI};

use crate::policy::BeforeAfterPolicy;

/// Result of mapping a host time onto the sequence.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SequenceTime {
    Within(f64),
    /// Before the first frame; the value is the frame to show.
    BeforeSequence(f64),
    /// After the last frame; the value is the frame to show.
    AfterSequence(f64),
    /// Output must be black; nothing is decoded.
    Black,
    /// Output is an error; nothing is decoded.
    Error,
}

impl SequenceTime {
    /// The frame to load, if any.
    pub fn time(self) -> Option<f64> {
        match self {
            Self::Within(t) | Self::BeforeSequence(t) | Self::AfterSequence(t) => Some(t),
            Self::Black | Self::Error => None,
        }
    }
}

/// Resolve a time lying before `domain.min`.
pub fn resolve_before(domain: RangeI, t: f64, policy: BeforeAfterPolicy) -> SequenceTime {
    let min = domain.min as i64;
    let max = domain.max as i64;
    let mut offset_from_start = t.floor() as i64 - min;

    let frame = match policy {
        BeforeAfterPolicy::Hold => min,
        BeforeAfterPolicy::Loop => {
            offset_from_start %= max - min + 1;
            max + offset_from_start
        }
        BeforeAfterPolicy::Bounce => {
            let range = max - min;
            if range == 0 {
                min
            } else {
                let intervals = offset_from_start / range;
                offset_from_start %= range;
                if intervals % 2 == 0 {
                    min - offset_from_start
                } else {
                    max + offset_from_start
                }
            }
        }
        BeforeAfterPolicy::Black => return SequenceTime::Black,
        BeforeAfterPolicy::Error => return SequenceTime::Error,
    };
    SequenceTime::BeforeSequence(frame as f64)
}

/// Resolve a time lying after `domain.max`.
pub fn resolve_after(domain: RangeI, t: f64, policy: BeforeAfterPolicy) -> SequenceTime {
    let min = domain.min as i64;
    let max = domain.max as i64;
    let mut offset_from_start = t.floor() as i64 - min;

    let frame = match policy {
        BeforeAfterPolicy::Hold => max,
        BeforeAfterPolicy::Loop => {
            offset_from_start %= max - min + 1;
            min + offset_from_start
        }
        BeforeAfterPolicy::Bounce => {
            let range = max - min;
            // a single-frame sequence bounces on itself
            if range == 0 {
                min
            } else {
                let intervals = offset_from_start / range;
                offset_from_start %= range;
                if intervals % 2 == 0 {
                    min + offset_from_start
                } else {
                    max - offset_from_start
                }
            }
        }
        BeforeAfterPolicy::Black => return SequenceTime::Black,
        BeforeAfterPolicy::Error => return SequenceTime::Error,
    };
    SequenceTime::AfterSequence(frame as f64)
}

/// The user-facing remapping of a sequence onto the timeline.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimeMapper {
    /// `[firstFrame, lastFrame]`.
    pub domain: RangeI,
    pub time_offset: i32,
    pub before: BeforeAfterPolicy,
    pub after: BeforeAfterPolicy,
}

impl TimeMapper {
    pub fn new(domain: RangeI, time_offset: i32) -> Self {
        Self {
            domain,
            time_offset,
            before: BeforeAfterPolicy::Hold,
            after: BeforeAfterPolicy::Hold,
        }
    }

    pub fn with_policies(mut self, before: BeforeAfterPolicy, after: BeforeAfterPolicy) -> Self {
        self.before = before;
        self.after = after;
        self
    }

    /// Map host time `t` onto the sequence.
    pub fn sequence_time(&self, t: OfxTime) -> SequenceTime {
        let sequence_time = t - self.time_offset as f64;
        if sequence_time < self.domain.min as f64 {
            resolve_before(self.domain, sequence_time, self.before)
        } else if sequence_time > self.domain.max as f64 {
            resolve_after(self.domain, sequence_time, self.after)
        } else {
            SequenceTime::Within(sequence_time)
        }
    }
}
