//! Frame-numbered file names.
//!
//! A sequence file name is `<prefix><digits><suffix>`, where the digits run
//! immediately precedes the final extension separator and `suffix` is the
//! extension including its dot.

use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// The common part of every file in a frame sequence.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SequencePattern {
    pub directory: PathBuf,
    pub prefix: String,
    /// Minimum digit count. `1` means frame numbers are not zero-padded.
    pub padding: usize,
    /// Digit count of the file the pattern was parsed from, leading zeros
    /// included. Only used to display the pattern.
    #[serde(default)]
    pub width: usize,
    pub suffix: String,
}

impl SequencePattern {
    /// Split a file name into its pattern and frame number.
    ///
    /// Returns `None` when no digits immediately precede the extension.
    pub fn parse(path: &Path) -> Option<(Self, i64)> {
        let name = path.file_name()?.to_str()?;
        let (stem, suffix) = match name.rfind('.') {
            Some(dot) if dot > 0 => name.split_at(dot),
            _ => (name, ""),
        };
        let digits_start = stem
            .char_indices()
            .rev()
            .take_while(|(_, c)| c.is_ascii_digit())
            .last()
            .map(|(i, _)| i)?;
        let digits = &stem[digits_start..];
        let frame: i64 = digits.parse().ok()?;
        let padding = if digits.len() > 1 && digits.starts_with('0') {
            digits.len()
        } else {
            1
        };
        let pattern = Self {
            directory: path.parent().map(Path::to_path_buf).unwrap_or_default(),
            prefix: stem[..digits_start].to_string(),
            padding,
            width: digits.len(),
            suffix: suffix.to_string(),
        };
        Some((pattern, frame))
    }

    /// Path of the file holding `frame`.
    pub fn filename_for(&self, frame: i64) -> PathBuf {
        self.directory.join(format!(
            "{}{:0width$}{}",
            self.prefix,
            frame,
            self.suffix,
            width = self.padding
        ))
    }

    /// Frame number of `name` if it belongs to this sequence.
    pub fn frame_of(&self, name: &str) -> Option<i64> {
        let digits = name.strip_prefix(&self.prefix)?.strip_suffix(&self.suffix)?;
        if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        let padded_ok = if self.padding > 1 {
            digits.len() == self.padding || (digits.len() > self.padding && !digits.starts_with('0'))
        } else {
            digits == "0" || !digits.starts_with('0')
        };
        if !padded_ok {
            return None;
        }
        digits.parse().ok()
    }

    /// Whether the name carries no prefix, i.e. is made only of digits.
    pub fn is_bare_number(&self) -> bool {
        self.prefix.is_empty()
    }
}

impl fmt::Display for SequencePattern {
    /// `prefix####.ext`, with one `#` per digit of the parsed name.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let hashes = "#".repeat(self.width.max(self.padding));
        write!(f, "{}{}{}", self.prefix, hashes, self.suffix)
    }
}

/// Expand the per-frame and per-view tokens of an output file name.
///
/// - a run of `#` is the frame number zero-padded to the run length
/// - `%d` / `%0Nd` is the printf-style frame number
/// - `%v` is the first letter of the view name, lowercase
/// - `%V` is the view name
/// - `%%` is a literal `%`
pub fn expand_filename(pattern: &str, frame: i64, view: &str) -> String {
    let mut out = String::with_capacity(pattern.len() + 8);
    let mut chars = pattern.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '#' => {
                let mut width = 1;
                while chars.peek() == Some(&'#') {
                    chars.next();
                    width += 1;
                }
                out.push_str(&format!("{:0width$}", frame, width = width));
            }
            '%' => {
                let mut spec = String::new();
                while let Some(&d) = chars.peek() {
                    if d.is_ascii_digit() {
                        spec.push(d);
                        chars.next();
                    } else {
                        break;
                    }
                }
                match chars.peek().copied() {
                    Some('d') => {
                        chars.next();
                        let width = spec.parse::<usize>().unwrap_or(0);
                        if spec.starts_with('0') {
                            out.push_str(&format!("{:0width$}", frame, width = width));
                        } else {
                            out.push_str(&format!("{:width$}", frame, width = width));
                        }
                    }
                    Some('v') if spec.is_empty() => {
                        chars.next();
                        if let Some(first) = view.chars().next() {
                            out.extend(first.to_lowercase());
                        }
                    }
                    Some('V') if spec.is_empty() => {
                        chars.next();
                        out.push_str(view);
                    }
                    Some('%') if spec.is_empty() => {
                        chars.next();
                        out.push('%');
                    }
                    _ => {
                        out.push('%');
                        out.push_str(&spec);
                    }
                }
            }
            c => out.push(c),
        }
    }
    out
}

/// Whether `pattern` names a different file for every frame.
pub fn has_frame_token(pattern: &str) -> bool {
    if pattern.contains('#') {
        return true;
    }
    let bytes = pattern.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' {
            let mut j = i + 1;
            while j < bytes.len() && bytes[j].is_ascii_digit() {
                j += 1;
            }
            if j < bytes.len() && bytes[j] == b'd' {
                return true;
            }
            i = j;
        } else {
            i += 1;
        }
    }
    false
}
