//! Policies applied when the requested time falls outside the sequence or
//! the frame file is missing.

use serde::{Deserialize, Serialize};

/// What to do before the first / after the last frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum BeforeAfterPolicy {
    #[default]
    Hold,
    Loop,
    Bounce,
    Black,
    Error,
}

impl BeforeAfterPolicy {
    pub const ALL: [Self; 5] = [Self::Hold, Self::Loop, Self::Bounce, Self::Black, Self::Error];

    /// Index in the host choice parameter.
    pub fn choice_index(self) -> usize {
        Self::ALL.iter().position(|p| *p == self).unwrap_or(0)
    }

    pub fn from_choice_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }
}

/// What to do when the file for a frame does not exist.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum MissingFramePolicy {
    Previous,
    Next,
    Nearest,
    #[default]
    Error,
    Black,
}

impl MissingFramePolicy {
    pub const ALL: [Self; 5] = [Self::Previous, Self::Next, Self::Nearest, Self::Error, Self::Black];

    pub fn choice_index(self) -> usize {
        Self::ALL.iter().position(|p| *p == self).unwrap_or(3)
    }

    pub fn from_choice_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    /// Whether other frames are probed when the exact one is missing.
    pub fn searches(self) -> bool {
        matches!(self, Self::Previous | Self::Next | Self::Nearest)
    }
}

/// Which of starting time / time offset the user edits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum FrameMode {
    #[default]
    StartingTime,
    TimeOffset,
}

impl FrameMode {
    pub fn choice_index(self) -> usize {
        match self {
            Self::StartingTime => 0,
            Self::TimeOffset => 1,
        }
    }

    pub fn from_choice_index(index: usize) -> Option<Self> {
        match index {
            0 => Some(Self::StartingTime),
            1 => Some(Self::TimeOffset),
            _ => None,
        }
    }
}
