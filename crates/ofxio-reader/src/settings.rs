//! Persisted state of a reader instance.
//!
//! Settings live in the host parameter store while the instance exists and
//! can be saved as a versioned JSON file. Both directions go through the
//! parameter names in [`names`].

use ofxio_color::ColorSpace;
use ofxio_core::{OfxIoError, PixelComponents, Premultiplication, RangeI, Result};
use ofxio_host::{
    choice_of, from_choice, optional, ParamError, ParamSet, ParamValue, SettingsFile,
};
use ofxio_sequence::{
    BeforeAfterPolicy, FrameMode, FrameRangeMapping, MissingFramePolicy, OriginalFrameRange,
};
use serde::{Deserialize, Serialize};

/// Parameter names.
pub mod names {
    pub const FILENAME: &str = "filename";
    pub const PROXY_FILENAME: &str = "proxy";
    pub const PROXY_THRESHOLD: &str = "proxyThreshold";
    pub const ORIGINAL_PROXY_SCALE: &str = "originalProxyScale";
    pub const CUSTOM_PROXY_SCALE: &str = "customProxyScale";
    pub const FIRST_FRAME: &str = "firstFrame";
    pub const LAST_FRAME: &str = "lastFrame";
    pub const BEFORE: &str = "before";
    pub const AFTER: &str = "after";
    pub const MISSING_FRAME: &str = "onMissingFrame";
    pub const FRAME_MODE: &str = "frameMode";
    pub const STARTING_TIME: &str = "startingTime";
    pub const TIME_OFFSET: &str = "timeOffset";
    pub const ORIGINAL_FRAME_RANGE: &str = "originalFrameRange";
    pub const PREMULT: &str = "filePremult";
    pub const OUTPUT_COMPONENTS: &str = "outputComponents";
    pub const INPUT_COLORSPACE: &str = "inputSpace";
    pub const OUTPUT_COLORSPACE: &str = "outputSpace";
    pub const CUSTOM_FPS: &str = "customFps";
    pub const FRAME_RATE: &str = "frameRate";
    pub const TIME_DOMAIN_USER_EDITED: &str = "timeDomainUserEdited";
}

/// Proxy files and the render scale they are used from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProxyConfig {
    /// Proxy file of the first frame. Empty disables proxies.
    pub filename: String,
    /// Proxies are used at this render scale and below.
    pub threshold: [f64; 2],
    /// Scale of the proxy files relative to the full resolution ones.
    pub original_scale: [f64; 2],
    /// The scales were entered by the user instead of detected.
    pub custom_scale: bool,
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            filename: String::new(),
            threshold: [1.0, 1.0],
            original_scale: [1.0, 1.0],
            custom_scale: false,
        }
    }
}

impl ProxyConfig {
    pub fn is_enabled(&self) -> bool {
        !self.filename.is_empty()
    }

    /// Whether a render at `render_level` reads the proxy files. A detected
    /// threshold of full scale means detection never succeeded, which keeps
    /// proxies off; a user-entered one is taken as is.
    pub fn applies_at(&self, render_level: u32) -> bool {
        let threshold = self.threshold_level();
        self.is_enabled() && (self.custom_scale || threshold > 0) && render_level >= threshold
    }

    /// Mip-map level at which proxies start being used.
    pub fn threshold_level(&self) -> u32 {
        nearest_level(self.threshold[0].min(self.threshold[1]))
    }

    /// Mip-map level of the proxy files themselves.
    pub fn original_level(&self) -> u32 {
        nearest_level(self.original_scale[0].min(self.original_scale[1]))
    }
}

/// Closest mip-map level to a scale in (0, 1]. Proxy files are rarely an
/// exact power of two smaller (a 1001 pixel wide frame has a 500 pixel
/// proxy), so their scales are rounded.
fn nearest_level(scale: f64) -> u32 {
    if !(scale > 0.0) {
        return 0;
    }
    (1.0 / scale.min(1.0)).log2().round().clamp(0.0, 30.0) as u32
}

/// Everything a reader instance persists.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReaderSettings {
    pub filename: String,
    pub proxy: ProxyConfig,
    pub frame_range: FrameRangeMapping,
    pub before: BeforeAfterPolicy,
    pub after: BeforeAfterPolicy,
    pub missing_frame: MissingFramePolicy,
    pub original_range: OriginalFrameRange,
    /// What the file stores. Unpremultiplied files are premultiplied on
    /// output.
    pub premultiplication: Premultiplication,
    pub output_components: PixelComponents,
    pub input_colorspace: ColorSpace,
    pub output_colorspace: ColorSpace,
    pub custom_fps: bool,
    pub frame_rate: f64,
}

impl Default for ReaderSettings {
    fn default() -> Self {
        Self {
            filename: String::new(),
            proxy: ProxyConfig::default(),
            frame_range: FrameRangeMapping::default(),
            before: BeforeAfterPolicy::Hold,
            after: BeforeAfterPolicy::Hold,
            missing_frame: MissingFramePolicy::Error,
            original_range: OriginalFrameRange::default(),
            premultiplication: Premultiplication::PreMultiplied,
            output_components: PixelComponents::Rgba,
            input_colorspace: ColorSpace::Linear,
            output_colorspace: ColorSpace::Linear,
            custom_fps: false,
            frame_rate: 24.0,
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

fn policy_choice<T: Copy>(
    params: &ParamSet,
    name: &str,
    convert: fn(usize) -> Option<T>,
    default: T,
) -> Result<T> {
    match optional(params.get_choice(name))? {
        Some(index) => Ok(convert(index).ok_or(ParamError::InvalidChoice {
            name: name.to_string(),
            index,
        })?),
        None => Ok(default),
    }
}

impl ReaderSettings {
    /// Write every setting into `params`.
    pub fn to_params(&self, params: &mut ParamSet) {
        use names::*;
        params.set(FILENAME, ParamValue::String(self.filename.clone()));
        params.set(PROXY_FILENAME, ParamValue::String(self.proxy.filename.clone()));
        params.set(PROXY_THRESHOLD, ParamValue::Double2(self.proxy.threshold));
        params.set(ORIGINAL_PROXY_SCALE, ParamValue::Double2(self.proxy.original_scale));
        params.set(CUSTOM_PROXY_SCALE, ParamValue::Bool(self.proxy.custom_scale));

        let range = &self.frame_range;
        params.set(FIRST_FRAME, ParamValue::Int(range.first_frame()));
        params.set(LAST_FRAME, ParamValue::Int(range.last_frame()));
        params.set(STARTING_TIME, ParamValue::Int(range.starting_time()));
        params.set(TIME_OFFSET, ParamValue::Int(range.time_offset()));
        params.set(FRAME_MODE, ParamValue::Choice(range.frame_mode.choice_index()));

        params.set(BEFORE, ParamValue::Choice(self.before.choice_index()));
        params.set(AFTER, ParamValue::Choice(self.after.choice_index()));
        params.set(MISSING_FRAME, ParamValue::Choice(self.missing_frame.choice_index()));

        let original = self.original_range.get().unwrap_or(RangeI::UNSET);
        params.set(ORIGINAL_FRAME_RANGE, ParamValue::Int2([original.min, original.max]));
        params.set(
            TIME_DOMAIN_USER_EDITED,
            ParamValue::Bool(self.original_range.user_edited),
        );

        params.set(
            PREMULT,
            ParamValue::Choice(choice_of(&PREMULT_CHOICES, self.premultiplication)),
        );
        params.set(
            OUTPUT_COMPONENTS,
            ParamValue::Choice(choice_of(&COMPONENT_CHOICES, self.output_components)),
        );
        params.set(
            INPUT_COLORSPACE,
            ParamValue::String(self.input_colorspace.name().to_string()),
        );
        params.set(
            OUTPUT_COLORSPACE,
            ParamValue::String(self.output_colorspace.name().to_string()),
        );
        params.set(CUSTOM_FPS, ParamValue::Bool(self.custom_fps));
        params.set(FRAME_RATE, ParamValue::Double(self.frame_rate));
    }

    /// Read settings from `params`. Parameters that were never set keep
    /// their default.
    pub fn from_params(params: &ParamSet) -> Result<Self> {
        use names::*;
        let mut s = Self::default();

        if let Some(v) = optional(params.get_string(FILENAME))? {
            s.filename = v;
        }
        if let Some(v) = optional(params.get_string(PROXY_FILENAME))? {
            s.proxy.filename = v;
        }
        if let Some(v) = optional(params.get_double2(PROXY_THRESHOLD))? {
            s.proxy.threshold = v;
        }
        if let Some(v) = optional(params.get_double2(ORIGINAL_PROXY_SCALE))? {
            s.proxy.original_scale = v;
        }
        if let Some(v) = optional(params.get_bool(CUSTOM_PROXY_SCALE))? {
            s.proxy.custom_scale = v;
        }

        let first = optional(params.get_int(FIRST_FRAME))?.unwrap_or(1);
        let last = optional(params.get_int(LAST_FRAME))?.unwrap_or(first);
        let mut range = FrameRangeMapping::new(RangeI::new(first, last));
        if let Some(offset) = optional(params.get_int(TIME_OFFSET))? {
            range.set_time_offset(offset);
        } else if let Some(start) = optional(params.get_int(STARTING_TIME))? {
            range.set_starting_time(start);
        }
        range.frame_mode =
            policy_choice(params, FRAME_MODE, FrameMode::from_choice_index, FrameMode::StartingTime)?;
        s.frame_range = range;

        s.before = policy_choice(params, BEFORE, BeforeAfterPolicy::from_choice_index, s.before)?;
        s.after = policy_choice(params, AFTER, BeforeAfterPolicy::from_choice_index, s.after)?;
        s.missing_frame = policy_choice(
            params,
            MISSING_FRAME,
            MissingFramePolicy::from_choice_index,
            s.missing_frame,
        )?;

        if let Some([min, max]) = optional(params.get_int2(ORIGINAL_FRAME_RANGE))? {
            s.original_range.set(RangeI::new(min, max));
        }
        if let Some(v) = optional(params.get_bool(TIME_DOMAIN_USER_EDITED))? {
            s.original_range.user_edited = v;
        }

        if let Some(i) = optional(params.get_choice(PREMULT))? {
            s.premultiplication = from_choice(&PREMULT_CHOICES, PREMULT, i)?;
        }
        if let Some(i) = optional(params.get_choice(OUTPUT_COMPONENTS))? {
            s.output_components = from_choice(&COMPONENT_CHOICES, OUTPUT_COMPONENTS, i)?;
        }
        if let Some(name) = optional(params.get_string(INPUT_COLORSPACE))? {
            s.input_colorspace = ColorSpace::from_name(&name)?;
        }
        if let Some(name) = optional(params.get_string(OUTPUT_COLORSPACE))? {
            s.output_colorspace = ColorSpace::from_name(&name)?;
        }
        if let Some(v) = optional(params.get_bool(CUSTOM_FPS))? {
            s.custom_fps = v;
        }
        if let Some(v) = optional(params.get_double(FRAME_RATE))? {
            s.frame_rate = v;
        }

        s.validate()?;
        Ok(s)
    }

    /// Reject values no render could use.
    pub fn validate(&self) -> Result<()> {
        for (label, scale) in [
            ("proxy threshold", self.proxy.threshold),
            ("original proxy scale", self.proxy.original_scale),
        ] {
            if scale.iter().any(|s| !(*s > 0.0 && *s <= 1.0)) {
                return Err(OfxIoError::InvalidParameter(format!(
                    "{label} {:?} must be in (0, 1]",
                    scale
                )));
            }
        }
        if self.custom_fps && !(self.frame_rate > 0.0) {
            return Err(OfxIoError::InvalidParameter(format!(
                "frame rate {} must be positive",
                self.frame_rate
            )));
        }
        Ok(())
    }

    pub fn to_file(&self) -> SettingsFile<Self> {
        SettingsFile::new(self.clone())
    }
}
