//! Named parameter store.
//!
//! Mirrors the host's parameter suite: typed values addressed by name, an
//! optional per-frame value track for animated parameters, and the
//! secret/enabled flags used for conditional UI.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

use crate::error::ParamError;

/// Why a parameter changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeReason {
    UserEdit,
    PluginEdit,
    /// The host moved to another time.
    Time,
}

/// A parameter value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ParamValue {
    Int(i32),
    Int2([i32; 2]),
    Double(f64),
    Double2([f64; 2]),
    Bool(bool),
    Choice(usize),
    String(String),
}

impl ParamValue {
    fn type_name(&self) -> &'static str {
        match self {
            Self::Int(_) => "int",
            Self::Int2(_) => "int2",
            Self::Double(_) => "double",
            Self::Double2(_) => "double2",
            Self::Bool(_) => "bool",
            Self::Choice(_) => "choice",
            Self::String(_) => "string",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct ParamEntry {
    value: ParamValue,
    /// Per-frame values. Non-empty means the parameter is animated.
    keys: BTreeMap<i64, ParamValue>,
    secret: bool,
    enabled: bool,
}

impl ParamEntry {
    fn new(value: ParamValue) -> Self {
        Self {
            value,
            keys: BTreeMap::new(),
            secret: false,
            enabled: true,
        }
    }
}

/// A set of named parameters belonging to one effect instance.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ParamSet {
    params: HashMap<String, ParamEntry>,
}

macro_rules! typed_getter {
    ($name:ident, $variant:ident, $ty:ty, $label:literal) => {
        pub fn $name(&self, key: &str) -> Result<$ty, ParamError> {
            match self.get(key) {
                Some(ParamValue::$variant(v)) => Ok(v.clone()),
                Some(_) => Err(ParamError::TypeMismatch {
                    name: key.to_string(),
                    expected: $label,
                }),
                None => Err(ParamError::NotFound(key.to_string())),
            }
        }
    };
}

impl ParamSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the static value, keeping flags and keys.
    pub fn set(&mut self, key: &str, value: ParamValue) {
        match self.params.get_mut(key) {
            Some(entry) => entry.value = value,
            None => {
                self.params.insert(key.to_string(), ParamEntry::new(value));
            }
        }
    }

    pub fn get(&self, key: &str) -> Option<&ParamValue> {
        self.params.get(key).map(|e| &e.value)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.params.contains_key(key)
    }

    /// Set the value at one frame, making the parameter animated.
    pub fn set_at_time(&mut self, key: &str, frame: i64, value: ParamValue) {
        let entry = self
            .params
            .entry(key.to_string())
            .or_insert_with(|| ParamEntry::new(value.clone()));
        entry.keys.insert(frame, value);
    }

    /// Value at `time`.
    ///
    /// Animated parameters only answer for frames that carry a value; static
    /// parameters answer the same value at every time.
    pub fn get_at_time(&self, key: &str, time: f64) -> Option<&ParamValue> {
        let entry = self.params.get(key)?;
        if entry.keys.is_empty() {
            return Some(&entry.value);
        }
        entry.keys.get(&((time + 0.5).floor() as i64))
    }

    /// Frames carrying a value, for animated parameters.
    pub fn key_frames(&self, key: &str) -> Vec<i64> {
        self.params
            .get(key)
            .map(|e| e.keys.keys().copied().collect())
            .unwrap_or_default()
    }

    /// Remove every per-frame value.
    pub fn clear_keys(&mut self, key: &str) {
        if let Some(entry) = self.params.get_mut(key) {
            entry.keys.clear();
        }
    }

    typed_getter!(get_int, Int, i32, "int");
    typed_getter!(get_int2, Int2, [i32; 2], "int2");
    typed_getter!(get_double, Double, f64, "double");
    typed_getter!(get_double2, Double2, [f64; 2], "double2");
    typed_getter!(get_bool, Bool, bool, "bool");
    typed_getter!(get_choice, Choice, usize, "choice");
    typed_getter!(get_string, String, String, "string");

    /// String value at `time`; `None` when the frame has no value.
    pub fn get_string_at_time(&self, key: &str, time: f64) -> Option<&str> {
        match self.get_at_time(key, time) {
            Some(ParamValue::String(s)) => Some(s.as_str()),
            _ => None,
        }
    }

    /// Hide or show a parameter.
    pub fn set_secret(&mut self, key: &str, secret: bool) {
        if let Some(entry) = self.params.get_mut(key) {
            entry.secret = secret;
        }
    }

    pub fn is_secret(&self, key: &str) -> bool {
        self.params.get(key).map(|e| e.secret).unwrap_or(false)
    }

    pub fn set_enabled(&mut self, key: &str, enabled: bool) {
        if let Some(entry) = self.params.get_mut(key) {
            entry.enabled = enabled;
        }
    }

    pub fn is_enabled(&self, key: &str) -> bool {
        self.params.get(key).map(|e| e.enabled).unwrap_or(false)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.params.keys().map(|s| s.as_str())
    }

    /// Type of a stored value, for diagnostics.
    pub fn type_of(&self, key: &str) -> Option<&'static str> {
        self.get(key).map(ParamValue::type_name)
    }
}

/// Position of `value` in the options of a choice parameter.
pub fn choice_of<T: Copy + PartialEq>(choices: &[T], value: T) -> usize {
    choices.iter().position(|c| *c == value).unwrap_or(0)
}

/// Option `index` of a choice parameter.
pub fn from_choice<T: Copy>(choices: &[T], name: &str, index: usize) -> Result<T, ParamError> {
    choices.get(index).copied().ok_or(ParamError::InvalidChoice {
        name: name.to_string(),
        index,
    })
}

/// `Ok(None)` for a parameter that was never set.
pub fn optional<T>(value: Result<T, ParamError>) -> ofxio_core::Result<Option<T>> {
    match value {
        Ok(v) => Ok(Some(v)),
        Err(ParamError::NotFound(_)) => Ok(None),
        Err(e) => Err(e.into()),
    }
}
