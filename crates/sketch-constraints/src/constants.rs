//! User-facing named constants and their resolution into solver values.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use sketch_types::{ObjectId, Sketch};
use tracing::warn;

use crate::error::ConstraintError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConstantType {
    Number,
    Boolean,
}

/// A resolved constant, or the value an initializer computed from geometry.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Value {
    Number(f64),
    Flag(bool),
}

/// Computes a constant's initial value from the constraint's objects.
pub type Initializer = fn(&Sketch, &[ObjectId]) -> Result<Value, ConstraintError>;

/// Maps a parsed number into solver units (degrees to radians, ...).
pub type Transform = fn(f64) -> f64;

#[derive(Debug, Clone, Copy)]
pub struct ConstantDef {
    pub name: &'static str,
    pub ty: ConstantType,
    pub description: &'static str,
    /// Fixed at creation and not offered for editing.
    pub read_only: bool,
    pub initial: Initializer,
    pub transform: Option<Transform>,
}

/// A raw constant as stored on an instance and persisted in records.
///
/// Numbers are kept as text so user input round-trips exactly; bare JSON
/// numbers are tolerated on input. Text must parse as a whole number
/// literal: a trailing unit such as `"12mm"` resolves to NaN.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ConstantValue {
    Flag(bool),
    Number(f64),
    Text(String),
}

impl ConstantValue {
    fn parse_number(&self, name: &str) -> f64 {
        match self {
            ConstantValue::Number(n) => *n,
            ConstantValue::Text(s) => s.trim().parse::<f64>().unwrap_or_else(|_| {
                warn!(constant = name, raw = %s, "number constant is not numeric, resolving to NaN");
                f64::NAN
            }),
            ConstantValue::Flag(_) => {
                warn!(constant = name, "boolean given for a number constant, resolving to NaN");
                f64::NAN
            }
        }
    }

    fn parse_flag(&self) -> bool {
        match self {
            ConstantValue::Flag(b) => *b,
            ConstantValue::Text(s) => s == "true",
            ConstantValue::Number(n) => *n != 0.0,
        }
    }
}

impl From<&str> for ConstantValue {
    fn from(s: &str) -> Self {
        ConstantValue::Text(s.to_string())
    }
}

impl From<String> for ConstantValue {
    fn from(s: String) -> Self {
        ConstantValue::Text(s)
    }
}

impl From<bool> for ConstantValue {
    fn from(b: bool) -> Self {
        ConstantValue::Flag(b)
    }
}

/// Raw constants keyed by name.
pub type Constants = BTreeMap<String, ConstantValue>;

/// Constants parsed and transformed for use in residual builders.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResolvedConstants {
    values: BTreeMap<&'static str, Value>,
}

impl ResolvedConstants {
    /// Resolve every raw value that has a definition. Raw names without a
    /// definition are ignored.
    pub fn resolve(defs: &[ConstantDef], raw: &Constants) -> Self {
        let mut values = BTreeMap::new();
        for def in defs {
            let Some(v) = raw.get(def.name) else { continue };
            let value = match def.ty {
                ConstantType::Number => {
                    let n = v.parse_number(def.name);
                    Value::Number(def.transform.map_or(n, |f| f(n)))
                }
                ConstantType::Boolean => Value::Flag(v.parse_flag()),
            };
            values.insert(def.name, value);
        }
        for name in raw.keys() {
            if !defs.iter().any(|d| d.name == name) {
                warn!(constant = %name, "ignoring constant without a definition");
            }
        }
        Self { values }
    }

    pub fn get(&self, name: &str) -> Option<Value> {
        self.values.get(name).copied()
    }

    /// A number constant; NaN when absent so the residual visibly breaks.
    pub fn number(&self, name: &str) -> f64 {
        match self.values.get(name) {
            Some(Value::Number(n)) => *n,
            _ => {
                warn!(constant = name, "number constant is missing");
                f64::NAN
            }
        }
    }

    /// A boolean constant; false when absent.
    pub fn flag(&self, name: &str) -> bool {
        matches!(self.values.get(name), Some(Value::Flag(true)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn zero(_: &Sketch, _: &[ObjectId]) -> Result<Value, ConstraintError> {
        Ok(Value::Number(0.0))
    }

    fn no(_: &Sketch, _: &[ObjectId]) -> Result<Value, ConstraintError> {
        Ok(Value::Flag(false))
    }

    const DEFS: &[ConstantDef] = &[
        ConstantDef {
            name: "angle",
            ty: ConstantType::Number,
            description: "angle in degrees",
            read_only: false,
            initial: zero,
            transform: Some(f64::to_radians),
        },
        ConstantDef {
            name: "inverted",
            ty: ConstantType::Boolean,
            description: "flip side",
            read_only: false,
            initial: no,
            transform: None,
        },
    ];

    #[test]
    fn numbers_are_parsed_and_transformed() {
        let raw = Constants::from([("angle".to_string(), ConstantValue::from("180.00"))]);
        let r = ResolvedConstants::resolve(DEFS, &raw);
        assert_abs_diff_eq!(r.number("angle"), std::f64::consts::PI, epsilon = 1e-12);
    }

    #[test]
    fn bare_json_numbers_are_accepted() {
        let raw = Constants::from([("angle".to_string(), ConstantValue::Number(90.0))]);
        let r = ResolvedConstants::resolve(DEFS, &raw);
        assert_abs_diff_eq!(r.number("angle"), std::f64::consts::FRAC_PI_2, epsilon = 1e-12);
    }

    #[test]
    fn garbage_numbers_resolve_to_nan() {
        let raw = Constants::from([("angle".to_string(), ConstantValue::from("abc"))]);
        let r = ResolvedConstants::resolve(DEFS, &raw);
        assert!(r.number("angle").is_nan());
    }

    #[test]
    fn trailing_units_are_not_stripped() {
        let raw = Constants::from([("angle".to_string(), ConstantValue::from("12mm"))]);
        assert!(ResolvedConstants::resolve(DEFS, &raw).number("angle").is_nan());

        let raw = Constants::from([("angle".to_string(), ConstantValue::from(" 12 "))]);
        let r = ResolvedConstants::resolve(DEFS, &raw);
        assert_abs_diff_eq!(r.number("angle"), 12f64.to_radians(), epsilon = 1e-12);
    }

    #[test]
    fn missing_constants_have_defaults() {
        let r = ResolvedConstants::resolve(DEFS, &Constants::new());
        assert!(r.number("angle").is_nan());
        assert!(!r.flag("inverted"));
    }

    #[test]
    fn flags_accept_text_and_bool() {
        let raw = Constants::from([("inverted".to_string(), ConstantValue::from("true"))]);
        assert!(ResolvedConstants::resolve(DEFS, &raw).flag("inverted"));

        let raw = Constants::from([("inverted".to_string(), ConstantValue::from(true))]);
        assert!(ResolvedConstants::resolve(DEFS, &raw).flag("inverted"));

        let raw = Constants::from([("inverted".to_string(), ConstantValue::from("yes"))]);
        assert!(!ResolvedConstants::resolve(DEFS, &raw).flag("inverted"));
    }
}
