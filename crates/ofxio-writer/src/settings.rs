//! Persisted state of a writer instance.

use ofxio_color::ColorSpace;
use ofxio_core::{OfxIoError, PixelComponents, Premultiplication, RangeD, Result};
use ofxio_host::{
    choice_of, from_choice, optional, ParamSet, ParamValue, SettingsFile, COLOR_PLANE,
};
use serde::{Deserialize, Serialize};

use crate::compositor::PartsSplitting;

/// Parameter names.
pub mod names {
    pub const FILENAME: &str = "filename";
    pub const OUTPUT_COMPONENTS: &str = "outputComponents";
    pub const PROCESS_R: &str = "processR";
    pub const PROCESS_G: &str = "processG";
    pub const PROCESS_B: &str = "processB";
    pub const PROCESS_A: &str = "processA";
    pub const PARTS_SPLITTING: &str = "partSplitting";
    pub const PREMULT: &str = "outputPremult";
    pub const INPUT_COLORSPACE: &str = "inputSpace";
    pub const OUTPUT_COLORSPACE: &str = "outputSpace";
    pub const FRAME_RANGE: &str = "frameRange";
    pub const FIRST_FRAME: &str = "firstFrame";
    pub const LAST_FRAME: &str = "lastFrame";
    pub const LAYERS: &str = "outputLayers";
    pub const VIEWS: &str = "viewsSelector";

    pub const PROCESS: [&str; 4] = [PROCESS_R, PROCESS_G, PROCESS_B, PROCESS_A];
}

/// Frames a writer renders.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum FrameRangeChoice {
    /// The frame range of the input.
    #[default]
    Union,
    /// The project's frame range.
    Project,
    /// `first_frame..=last_frame`.
    Manual,
}

impl FrameRangeChoice {
    pub const ALL: [Self; 3] = [Self::Union, Self::Project, Self::Manual];
}

/// Views a render writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ViewSelection {
    /// The view being rendered.
    #[default]
    Current,
    All,
}

impl ViewSelection {
    pub const ALL: [Self; 2] = [Self::Current, Self::All];
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WriterSettings {
    /// Output file name, with `#`, `%d`, `%v` and `%V` tokens.
    pub filename: String,
    pub output_components: PixelComponents,
    /// R, G, B, A "process channel" switches.
    pub process_channels: [bool; 4],
    pub parts_splitting: PartsSplitting,
    /// State of the RGBA data stored in the file.
    pub premultiplication: Premultiplication,
    /// Working space of the incoming images.
    pub input_colorspace: ColorSpace,
    /// Space the file is encoded in.
    pub output_colorspace: ColorSpace,
    pub frame_range: FrameRangeChoice,
    pub first_frame: i32,
    pub last_frame: i32,
    /// Planes to write, in order.
    pub layers: Vec<String>,
    pub views: ViewSelection,
}

impl Default for WriterSettings {
    fn default() -> Self {
        Self {
            filename: String::new(),
            output_components: PixelComponents::Rgba,
            process_channels: [true; 4],
            parts_splitting: PartsSplitting::SplitViewsAndLayers,
            premultiplication: Premultiplication::UnPreMultiplied,
            input_colorspace: ColorSpace::Linear,
            output_colorspace: ColorSpace::Linear,
            frame_range: FrameRangeChoice::Union,
            first_frame: 1,
            last_frame: 1,
            layers: vec![COLOR_PLANE.to_string()],
            views: ViewSelection::Current,
        }
    }
}

/// Choices of the premultiplication parameter.
pub const PREMULT_CHOICES: [Premultiplication; 3] = [
    Premultiplication::Opaque,
    Premultiplication::PreMultiplied,
    Premultiplication::UnPreMultiplied,
];

/// Choices of the output components parameter.
pub const COMPONENT_CHOICES: [PixelComponents; 3] = [
    PixelComponents::Rgba,
    PixelComponents::Rgb,
    PixelComponents::Alpha,
];

impl WriterSettings {
    /// Write every setting into `params`.
    pub fn to_params(&self, params: &mut ParamSet) {
        use names::*;
        params.set(FILENAME, ParamValue::String(self.filename.clone()));
        params.set(
            OUTPUT_COMPONENTS,
            ParamValue::Choice(choice_of(&COMPONENT_CHOICES, self.output_components)),
        );
        for (name, enabled) in PROCESS.iter().zip(self.process_channels) {
            params.set(name, ParamValue::Bool(enabled));
        }
        params.set(
            PARTS_SPLITTING,
            ParamValue::Choice(choice_of(&PartsSplitting::ALL, self.parts_splitting)),
        );
        params.set(
            PREMULT,
            ParamValue::Choice(choice_of(&PREMULT_CHOICES, self.premultiplication)),
        );
        params.set(
            INPUT_COLORSPACE,
            ParamValue::String(self.input_colorspace.name().to_string()),
        );
        params.set(
            OUTPUT_COLORSPACE,
            ParamValue::String(self.output_colorspace.name().to_string()),
        );
        params.set(
            FRAME_RANGE,
            ParamValue::Choice(choice_of(&FrameRangeChoice::ALL, self.frame_range)),
        );
        params.set(FIRST_FRAME, ParamValue::Int(self.first_frame));
        params.set(LAST_FRAME, ParamValue::Int(self.last_frame));
        params.set(LAYERS, ParamValue::String(self.layers.join(",")));
        params.set(VIEWS, ParamValue::Choice(choice_of(&ViewSelection::ALL, self.views)));
    }

    /// Read settings from `params`. Parameters that were never set keep
    /// their default.
    pub fn from_params(params: &ParamSet) -> Result<Self> {
        use names::*;
        let mut s = Self::default();

        if let Some(v) = optional(params.get_string(FILENAME))? {
            s.filename = v;
        }
        if let Some(i) = optional(params.get_choice(OUTPUT_COMPONENTS))? {
            s.output_components = from_choice(&COMPONENT_CHOICES, OUTPUT_COMPONENTS, i)?;
        }
        for (c, name) in PROCESS.iter().enumerate() {
            if let Some(v) = optional(params.get_bool(name))? {
                s.process_channels[c] = v;
            }
        }
        if let Some(i) = optional(params.get_choice(PARTS_SPLITTING))? {
            s.parts_splitting = from_choice(&PartsSplitting::ALL, PARTS_SPLITTING, i)?;
        }
        if let Some(i) = optional(params.get_choice(PREMULT))? {
            s.premultiplication = from_choice(&PREMULT_CHOICES, PREMULT, i)?;
        }
        if let Some(name) = optional(params.get_string(INPUT_COLORSPACE))? {
            s.input_colorspace = ColorSpace::from_name(&name)?;
        }
        if let Some(name) = optional(params.get_string(OUTPUT_COLORSPACE))? {
            s.output_colorspace = ColorSpace::from_name(&name)?;
        }
        if let Some(i) = optional(params.get_choice(FRAME_RANGE))? {
            s.frame_range = from_choice(&FrameRangeChoice::ALL, FRAME_RANGE, i)?;
        }
        if let Some(v) = optional(params.get_int(FIRST_FRAME))? {
            s.first_frame = v;
        }
        if let Some(v) = optional(params.get_int(LAST_FRAME))? {
            s.last_frame = v;
        }
        if let Some(v) = optional(params.get_string(LAYERS))? {
            s.layers = v
                .split(',')
                .map(str::trim)
                .filter(|l| !l.is_empty())
                .map(String::from)
                .collect();
        }
        if let Some(i) = optional(params.get_choice(VIEWS))? {
            s.views = from_choice(&ViewSelection::ALL, VIEWS, i)?;
        }

        s.validate()?;
        Ok(s)
    }

    pub fn validate(&self) -> Result<()> {
        if self.frame_range == FrameRangeChoice::Manual && self.first_frame > self.last_frame {
            return Err(OfxIoError::InvalidParameter(format!(
                "first frame {} is after last frame {}",
                self.first_frame, self.last_frame
            )));
        }
        if self.layers.is_empty() {
            return Err(OfxIoError::InvalidParameter("no layer to write".into()));
        }
        Ok(())
    }

    /// Frames to render given the input's and the project's ranges.
    pub fn frames(&self, input: RangeD, project: RangeD) -> RangeD {
        match self.frame_range {
            FrameRangeChoice::Union => input,
            FrameRangeChoice::Project => project,
            FrameRangeChoice::Manual => {
                RangeD::new(self.first_frame as f64, self.last_frame as f64)
            }
        }
    }

    pub fn to_file(&self) -> SettingsFile<Self> {
        SettingsFile::new(self.clone())
    }
}
