//! Detection of the frame sequence a single file belongs to.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use ofxio_core::{RangeI, Result};
use ofxio_host::FileSystem;
use tracing::debug;

use crate::pattern::SequencePattern;

/// The files a reader was pointed at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileSequence {
    /// A file without a frame number, shown at every frame.
    Still(PathBuf),
    /// A file whose name is only a frame number.
    SingleFrame { path: PathBuf, frame: i64 },
    /// Frame-numbered files sharing a pattern.
    Pattern {
        pattern: SequencePattern,
        frames: BTreeSet<i64>,
    },
}

impl FileSequence {
    /// File expected to hold `frame`. Existence is not checked.
    pub fn filename_at(&self, frame: i64) -> Option<PathBuf> {
        match self {
            Self::Still(path) => Some(path.clone()),
            Self::SingleFrame { path, frame: f } => (*f == frame).then(|| path.clone()),
            Self::Pattern { pattern, .. } => Some(pattern.filename_for(frame)),
        }
    }

    /// First and last frame present, `None` for an empty pattern.
    pub fn frame_range(&self) -> Option<RangeI> {
        match self {
            Self::Still(_) => Some(RangeI::new(1, 1)),
            Self::SingleFrame { frame, .. } => {
                let f = clamp_frame(*frame);
                Some(RangeI::new(f, f))
            }
            Self::Pattern { frames, .. } => {
                let first = frames.first()?;
                let last = frames.last()?;
                Some(RangeI::new(clamp_frame(*first), clamp_frame(*last)))
            }
        }
    }

    /// Number of files found.
    pub fn len(&self) -> usize {
        match self {
            Self::Still(_) | Self::SingleFrame { .. } => 1,
            Self::Pattern { frames, .. } => frames.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn clamp_frame(frame: i64) -> i32 {
    frame.clamp(i32::MIN as i64, i32::MAX as i64) as i32
}

/// Derive the sequence `path` belongs to by listing its directory.
///
/// Only the digit run right before the extension is a frame number. A name
/// made only of digits is a one-frame sequence with no pattern.
pub fn scan_sequence(fs: &dyn FileSystem, path: &Path) -> Result<FileSequence> {
    let Some((pattern, frame)) = SequencePattern::parse(path) else {
        debug!(path = %path.display(), "no frame number, still image");
        return Ok(FileSequence::Still(path.to_path_buf()));
    };
    if pattern.is_bare_number() {
        return Ok(FileSequence::SingleFrame {
            path: path.to_path_buf(),
            frame,
        });
    }

    let mut frames = BTreeSet::new();
    for name in fs.list_dir(&pattern.directory)? {
        if let Some(f) = pattern.frame_of(&name) {
            frames.insert(f);
        }
    }
    debug!(
        pattern = %pattern,
        frames = frames.len(),
        "scanned sequence"
    );
    Ok(FileSequence::Pattern { pattern, frames })
}
