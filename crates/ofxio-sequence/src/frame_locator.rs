//! Resolution of a sequence time to an existing file.
//!
//! When the file for the requested frame is missing, the missing-frame
//! policy decides whether neighbouring frames are probed. The search never
//! goes further than [`MAX_MISSING_FRAME_SEARCH`] frames away and never
//! below frame 0.

use std::path::{Path, PathBuf};

use ofxio_core::limits::MAX_MISSING_FRAME_SEARCH;
use ofxio_core::OfxIoError;
use ofxio_host::{FileSystem, ParamSet};
use tracing::debug;

use crate::policy::MissingFramePolicy;
use crate::scanner::FileSequence;

/// Source of the file name bound to each frame.
pub trait FrameFilenames: Send + Sync {
    /// Full resolution file for `frame`, `None` if no name is bound.
    fn filename_at(&self, frame: i64) -> Option<PathBuf>;

    /// Proxy file for `frame`, `None` if no proxy is configured.
    fn proxy_filename_at(&self, frame: i64) -> Option<PathBuf>;
}

/// File names read from (possibly animated) string parameters.
///
/// Hosts that detect sequences themselves animate the filename parameter
/// with one key per frame.
#[derive(Debug, Clone, Copy)]
pub struct ParamFilenames<'a> {
    pub params: &'a ParamSet,
    pub filename_param: &'a str,
    pub proxy_param: &'a str,
}

impl FrameFilenames for ParamFilenames<'_> {
    fn filename_at(&self, frame: i64) -> Option<PathBuf> {
        non_empty(self.params.get_string_at_time(self.filename_param, frame as f64))
    }

    fn proxy_filename_at(&self, frame: i64) -> Option<PathBuf> {
        non_empty(self.params.get_string_at_time(self.proxy_param, frame as f64))
    }
}

fn non_empty(name: Option<&str>) -> Option<PathBuf> {
    name.filter(|s| !s.is_empty()).map(PathBuf::from)
}

/// File names derived from a scanned sequence and its optional proxy.
#[derive(Debug, Clone)]
pub struct SequenceFilenames {
    pub full: FileSequence,
    pub proxy: Option<FileSequence>,
}

impl FrameFilenames for SequenceFilenames {
    fn filename_at(&self, frame: i64) -> Option<PathBuf> {
        self.full.filename_at(frame)
    }

    fn proxy_filename_at(&self, frame: i64) -> Option<PathBuf> {
        self.proxy.as_ref()?.filename_at(frame)
    }
}

/// Kind of file a lookup resolved to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameKind {
    FullRes,
    Proxy,
    /// No file; the output is black.
    Black,
    /// No file; the render fails.
    Failed,
}

/// Outcome of [`FrameLocator::locate`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocatedFrame {
    /// The file to decode, or the requested frame's name for errors.
    pub filename: Option<PathBuf>,
    /// Frame the file belongs to.
    pub frame: i64,
    pub kind: FrameKind,
}

impl LocatedFrame {
    pub fn is_found(&self) -> bool {
        matches!(self.kind, FrameKind::FullRes | FrameKind::Proxy)
    }

    /// The error reported for a failed lookup.
    pub fn missing_error(&self) -> OfxIoError {
        OfxIoError::MissingFrame {
            frame: self.frame,
            filename: self
                .filename
                .as_deref()
                .map(|p| p.display().to_string())
                .unwrap_or_default(),
        }
    }
}

/// Next offset probed by `policy` after `offset`.
pub fn next_offset(policy: MissingFramePolicy, sequence_frame: i64, offset: i64) -> i64 {
    match policy {
        MissingFramePolicy::Previous => offset - 1,
        MissingFramePolicy::Next => offset + 1,
        MissingFramePolicy::Nearest => {
            if offset <= 0 {
                -offset + 1
            } else if sequence_frame - offset >= 0 {
                -offset
            } else {
                offset + 1
            }
        }
        MissingFramePolicy::Error | MissingFramePolicy::Black => offset,
    }
}

/// Finds the file to load for a sequence time.
pub struct FrameLocator<'a> {
    filenames: &'a dyn FrameFilenames,
    fs: &'a dyn FileSystem,
    policy: MissingFramePolicy,
}

impl<'a> FrameLocator<'a> {
    pub fn new(
        filenames: &'a dyn FrameFilenames,
        fs: &'a dyn FileSystem,
        policy: MissingFramePolicy,
    ) -> Self {
        Self {
            filenames,
            fs,
            policy,
        }
    }

    fn is_good(&self, name: Option<&Path>) -> bool {
        name.is_some_and(|p| !p.as_os_str().is_empty() && self.fs.exists(p))
    }

    /// Resolve `sequence_time` to a file, substituting the proxy when
    /// `want_proxy` is set and the proxy file exists.
    pub fn locate(&self, sequence_time: f64, want_proxy: bool) -> LocatedFrame {
        let sequence_frame = (sequence_time + 0.5).floor() as i64;
        let mut offset = 0i64;
        let mut canonical = None;

        loop {
            let frame = sequence_frame + offset;
            let name = self.filenames.filename_at(frame);
            if offset == 0 {
                canonical = name.clone();
            }

            if self.is_good(name.as_deref()) {
                if want_proxy {
                    let proxy = self.filenames.proxy_filename_at(frame);
                    if self.is_good(proxy.as_deref()) {
                        return LocatedFrame {
                            filename: proxy,
                            frame,
                            kind: FrameKind::Proxy,
                        };
                    }
                }
                if offset != 0 {
                    debug!(requested = sequence_frame, found = frame, "substituted missing frame");
                }
                return LocatedFrame {
                    filename: name,
                    frame,
                    kind: FrameKind::FullRes,
                };
            }

            if !self.policy.searches() {
                break;
            }
            offset = next_offset(self.policy, sequence_frame, offset);
            if offset.abs() > MAX_MISSING_FRAME_SEARCH || sequence_frame + offset < 0 {
                break;
            }
        }

        let kind = if self.policy == MissingFramePolicy::Black {
            FrameKind::Black
        } else {
            FrameKind::Failed
        };
        LocatedFrame {
            filename: canonical,
            frame: sequence_frame,
            kind,
        }
    }
}
