//! Free-form rule settings.
//!
//! Each rule spec carries a [`Settings`] map. Rules read typed values with
//! defaults and validate them at construction, so a bad base or scale is
//! rejected before any variable is created.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::{Result, RosterError};

/// A single setting value.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SettingValue {
    /// Boolean flag.
    Bool(bool),
    /// Integer.
    Int(i64),
    /// Floating point.
    Float(f64),
}

impl From<bool> for SettingValue {
    fn from(v: bool) -> Self {
        SettingValue::Bool(v)
    }
}

impl From<i64> for SettingValue {
    fn from(v: i64) -> Self {
        SettingValue::Int(v)
    }
}

impl From<i32> for SettingValue {
    fn from(v: i32) -> Self {
        SettingValue::Int(i64::from(v))
    }
}

impl From<f64> for SettingValue {
    fn from(v: f64) -> Self {
        SettingValue::Float(v)
    }
}

/// Key → value settings map.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Settings(BTreeMap<String, SettingValue>);

impl Settings {
    /// Empty settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the settings with `key` set.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<SettingValue>) -> Self {
        self.insert(key, value);
        self
    }

    /// Sets `key`.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<SettingValue>) {
        self.0.insert(key.into(), value.into());
    }

    /// Raw value of `key`.
    pub fn get(&self, key: &str) -> Option<SettingValue> {
        self.0.get(key).copied()
    }

    /// Whether `key` is set.
    pub fn contains(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether there are no entries.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Overlays `other` on top of these settings.
    pub fn merged(mut self, other: &Settings) -> Self {
        for (k, v) in &other.0 {
            self.0.insert(k.clone(), *v);
        }
        self
    }

    /// Float value of `key` (integers widen), or `default` when unset.
    pub fn float(&self, rule: &str, key: &str, default: f64) -> Result<f64> {
        match self.get(key) {
            None => Ok(default),
            Some(SettingValue::Float(v)) => Ok(v),
            Some(SettingValue::Int(v)) => Ok(v as f64),
            Some(SettingValue::Bool(_)) => Err(invalid(rule, key, "expected a number, got a bool")),
        }
    }

    /// Integer value of `key` (whole floats narrow), or `default` when unset.
    pub fn int(&self, rule: &str, key: &str, default: i64) -> Result<i64> {
        match self.get(key) {
            None => Ok(default),
            Some(SettingValue::Int(v)) => Ok(v),
            Some(SettingValue::Float(v)) if v.fract() == 0.0 && v.is_finite() => Ok(v as i64),
            Some(SettingValue::Float(v)) => Err(invalid(rule, key, format!("expected an integer, got {v}"))),
            Some(SettingValue::Bool(_)) => Err(invalid(rule, key, "expected an integer, got a bool")),
        }
    }

    /// Boolean value of `key`, or `default` when unset.
    pub fn bool(&self, rule: &str, key: &str, default: bool) -> Result<bool> {
        match self.get(key) {
            None => Ok(default),
            Some(SettingValue::Bool(v)) => Ok(v),
            Some(other) => Err(invalid(rule, key, format!("expected a bool, got {other:?}"))),
        }
    }
}

/// Builds an [`RosterError::InvalidSetting`].
pub(crate) fn invalid(rule: &str, key: &str, reason: impl Into<String>) -> RosterError {
    RosterError::InvalidSetting {
        rule: rule.to_string(),
        key: key.to_string(),
        reason: reason.into(),
    }
}

/// Exponential growth factor: must exceed 1.0.
pub(crate) fn require_base(rule: &str, key: &str, value: f64) -> Result<f64> {
    if value > 1.0 && value.is_finite() {
        Ok(value)
    } else {
        Err(invalid(rule, key, format!("must be > 1.0, got {value}")))
    }
}

/// Multiplier: must be non-negative.
pub(crate) fn require_scale(rule: &str, key: &str, value: f64) -> Result<f64> {
    if value >= 0.0 && value.is_finite() {
        Ok(value)
    } else {
        Err(invalid(rule, key, format!("must be >= 0, got {value}")))
    }
}

/// Cap or count: must be at least `min`.
pub(crate) fn require_at_least(rule: &str, key: &str, value: i64, min: i64) -> Result<i64> {
    if value >= min {
        Ok(value)
    } else {
        Err(invalid(rule, key, format!("must be >= {min}, got {value}")))
    }
}
