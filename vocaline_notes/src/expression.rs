// Per-note expressions and the descriptor registry.
//
// An expression is a named per-note synthesis parameter (velocity, volume,
// gender, breathiness, ...). Its metadata lives in an
// `ExpressionDescriptor`, owned by the project and keyed by abbreviation in
// an `ExpressionRegistry`. Notes carry only the value plus an `overridden`
// mark set when the user edits it.
//
// Descriptors with a non-empty `flag` are forwarded to the resampler as a
// flag string: the flag followed by the truncated integer value, with no
// separator (see `Note::resampler_flags`). The format is write-only.
//
// The registry is a `BTreeMap`, so iteration, and therefore the flag string,
// follows key order.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Registry of descriptors keyed by abbreviation.
pub type ExpressionRegistry = BTreeMap<String, ExpressionDescriptor>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExpressionDescriptor {
    pub name: String,
    pub abbr: String,
    pub min: f32,
    pub max: f32,
    pub default_value: f32,
    /// Resampler flag character(s). Empty for expressions the resampler
    /// does not take as a flag.
    #[serde(default)]
    pub flag: String,
}

impl ExpressionDescriptor {
    pub fn new(name: &str, abbr: &str, min: f32, max: f32, default_value: f32, flag: &str) -> Self {
        ExpressionDescriptor {
            name: name.to_string(),
            abbr: abbr.to_string(),
            min,
            max,
            default_value,
            flag: flag.to_string(),
        }
    }

    /// Confine a value to this descriptor's range. An inverted range
    /// (`min > max`) pins every value to `max`.
    pub fn clamp(&self, value: f32) -> f32 {
        value.max(self.min).min(self.max)
    }

    /// Whether `min <= max` and the default lies inside the range.
    pub fn is_valid(&self) -> bool {
        self.min <= self.max && (self.min..=self.max).contains(&self.default_value)
    }
}

/// A per-note expression value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Expression {
    pub value: f32,
    /// Set when the user edited the value. Overridden expressions survive
    /// the removal of their descriptor from the registry.
    #[serde(default)]
    pub overridden: bool,
}

impl Expression {
    /// A fresh expression at the descriptor's default value.
    pub fn from_descriptor(descriptor: &ExpressionDescriptor) -> Self {
        Expression {
            value: descriptor.default_value,
            overridden: false,
        }
    }
}

/// The stock descriptors every project starts with.
pub fn default_registry() -> ExpressionRegistry {
    [
        ExpressionDescriptor::new("velocity", "vel", 0.0, 200.0, 100.0, ""),
        ExpressionDescriptor::new("volume", "vol", 0.0, 200.0, 100.0, ""),
        ExpressionDescriptor::new("attack", "atk", 0.0, 200.0, 100.0, ""),
        ExpressionDescriptor::new("decay", "dec", 0.0, 100.0, 0.0, ""),
        ExpressionDescriptor::new("gender", "gen", -100.0, 100.0, 0.0, "g"),
        ExpressionDescriptor::new("breathiness", "bre", 0.0, 100.0, 0.0, "B"),
        ExpressionDescriptor::new("lowpass", "lpf", 0.0, 100.0, 0.0, "H"),
    ]
    .into_iter()
    .map(|d| (d.abbr.clone(), d))
    .collect()
}
