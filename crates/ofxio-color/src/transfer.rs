//! Encoding curves between linear light and stored values.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum TransferFunction {
    Linear,
    Srgb,
    Rec709,
    /// Pure power law.
    Gamma(f32),
}

impl TransferFunction {
    /// Decode a stored value to linear light.
    pub fn to_linear(self, v: f32) -> f32 {
        match self {
            Self::Linear => v,
            Self::Srgb => {
                if v <= 0.04045 {
                    v / 12.92
                } else {
                    ((v + 0.055) / 1.055).powf(2.4)
                }
            }
            Self::Rec709 => {
                if v < 0.081 {
                    v / 4.5
                } else {
                    ((v + 0.099) / 1.099).powf(1.0 / 0.45)
                }
            }
            Self::Gamma(g) => {
                if v <= 0.0 {
                    0.0
                } else {
                    v.powf(g)
                }
            }
        }
    }

    /// Encode linear light.
    pub fn from_linear(self, v: f32) -> f32 {
        match self {
            Self::Linear => v,
            Self::Srgb => {
                if v <= 0.0031308 {
                    v * 12.92
                } else {
                    1.055 * v.powf(1.0 / 2.4) - 0.055
                }
            }
            Self::Rec709 => {
                if v < 0.018 {
                    v * 4.5
                } else {
                    1.099 * v.powf(0.45) - 0.099
                }
            }
            Self::Gamma(g) => {
                if v <= 0.0 || g == 0.0 {
                    0.0
                } else {
                    v.powf(1.0 / g)
                }
            }
        }
    }

    pub fn is_linear(self) -> bool {
        matches!(self, Self::Linear) || self == Self::Gamma(1.0)
    }
}
