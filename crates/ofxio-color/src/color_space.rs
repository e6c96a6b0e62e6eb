//! Colour spaces a file or the working space may be in.
#![allow(clippy::excessive_precision)]

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::ColorError;
use crate::transfer::TransferFunction;

/// Supported colour spaces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ColorSpace {
    /// Scene-linear Rec. 709 primaries.
    #[default]
    Linear,
    Srgb,
    Rec709,
    Rec2020,
    AcesCg,
    DciP3,
}

impl ColorSpace {
    pub const ALL: [Self; 6] = [
        Self::Linear,
        Self::Srgb,
        Self::Rec709,
        Self::Rec2020,
        Self::AcesCg,
        Self::DciP3,
    ];

    /// Name used in parameters and settings files.
    pub fn name(self) -> &'static str {
        match self {
            Self::Linear => "linear",
            Self::Srgb => "sRGB",
            Self::Rec709 => "rec709",
            Self::Rec2020 => "rec2020",
            Self::AcesCg => "ACEScg",
            Self::DciP3 => "DCI-P3",
        }
    }

    /// Parse a name, ignoring case.
    pub fn from_name(name: &str) -> Result<Self, ColorError> {
        Self::ALL
            .into_iter()
            .find(|s| s.name().eq_ignore_ascii_case(name))
            .ok_or_else(|| ColorError::UnsupportedSpace(name.to_string()))
    }

    /// Index in the host choice parameter.
    pub fn choice_index(self) -> usize {
        Self::ALL.iter().position(|s| *s == self).unwrap_or(0)
    }

    pub fn from_choice_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    /// Encoding curve of the space.
    pub fn transfer(self) -> TransferFunction {
        match self {
            Self::Linear | Self::AcesCg => TransferFunction::Linear,
            Self::Srgb => TransferFunction::Srgb,
            Self::Rec709 | Self::Rec2020 => TransferFunction::Rec709,
            Self::DciP3 => TransferFunction::Gamma(2.6),
        }
    }

    /// RGB to CIE XYZ.
    pub fn to_xyz_matrix(self) -> [[f32; 3]; 3] {
        match self {
            Self::Linear | Self::Srgb | Self::Rec709 => [
                [0.4124564, 0.3575761, 0.1804375],
                [0.2126729, 0.7151522, 0.0721750],
                [0.0193339, 0.1191920, 0.9503041],
            ],
            Self::Rec2020 => [
                [0.6369580, 0.1446169, 0.1688810],
                [0.2627002, 0.6779981, 0.0593017],
                [0.0000000, 0.0280727, 1.0609851],
            ],
            Self::AcesCg => [
                [0.6624542, 0.1340042, 0.1561877],
                [0.2722287, 0.6740818, 0.0536895],
                [-0.0055746, 0.0040607, 1.0103391],
            ],
            Self::DciP3 => [
                [0.4865709, 0.2656677, 0.1982173],
                [0.2289746, 0.6917385, 0.0792869],
                [0.0000000, 0.0451134, 1.0439444],
            ],
        }
    }

    /// CIE XYZ to RGB.
    pub fn from_xyz_matrix(self) -> [[f32; 3]; 3] {
        match self {
            Self::Linear | Self::Srgb | Self::Rec709 => [
                [3.2404542, -1.5371385, -0.4985314],
                [-0.9692660, 1.8760108, 0.0415560],
                [0.0556434, -0.2040259, 1.0572252],
            ],
            Self::Rec2020 => [
                [1.7166512, -0.3556708, -0.2533663],
                [-0.6666844, 1.6164812, 0.0157685],
                [0.0176399, -0.0427706, 0.9421031],
            ],
            Self::AcesCg => [
                [1.6410234, -0.3248033, -0.2364247],
                [-0.6636629, 1.6153316, 0.0167563],
                [0.0117219, -0.0082844, 0.9883949],
            ],
            Self::DciP3 => [
                [2.4934969, -0.9313836, -0.4027108],
                [-0.8294890, 1.7626641, 0.0236247],
                [0.0358458, -0.0761724, 0.9568845],
            ],
        }
    }

    /// Whether both spaces share primaries, so no matrix is needed.
    pub fn same_primaries(self, other: Self) -> bool {
        let group = |s: Self| match s {
            Self::Linear | Self::Srgb | Self::Rec709 => 0,
            Self::Rec2020 => 1,
            Self::AcesCg => 2,
            Self::DciP3 => 3,
        };
        group(self) == group(other)
    }
}

impl fmt::Display for ColorSpace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

pub(crate) fn mat3_mul(m: &[[f32; 3]; 3], v: [f32; 3]) -> [f32; 3] {
    [
        m[0][0] * v[0] + m[0][1] * v[1] + m[0][2] * v[2],
        m[1][0] * v[0] + m[1][1] * v[1] + m[1][2] * v[2],
        m[2][0] * v[0] + m[2][1] * v[1] + m[2][2] * v[2],
    ]
}

/// `a * b`.
pub(crate) fn mat3_compose(a: &[[f32; 3]; 3], b: &[[f32; 3]; 3]) -> [[f32; 3]; 3] {
    let mut out = [[0.0f32; 3]; 3];
    for (i, row) in out.iter_mut().enumerate() {
        for (j, v) in row.iter_mut().enumerate() {
            *v = (0..3).map(|k| a[i][k] * b[k][j]).sum();
        }
    }
    out
}
