//! Constraint metadata and the keyword-to-metadata extractor.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::errors::{ConfigResult, ConfigurationError};

/// Numeric bound used by comparison and multiple-of constraints.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Bound {
    Int(i64),
    Float(f64),
}

impl From<i64> for Bound {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<i32> for Bound {
    fn from(value: i32) -> Self {
        Self::Int(i64::from(value))
    }
}

impl From<u32> for Bound {
    fn from(value: u32) -> Self {
        Self::Int(i64::from(value))
    }
}

impl From<f64> for Bound {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl fmt::Display for Bound {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(value) => write!(f, "{value}"),
            Self::Float(value) => write!(f, "{value:?}"),
        }
    }
}

/// Bag for constraint keys that have no dedicated metadata type.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct GeneralMetadata {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub allow_inf_nan: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_digits: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub decimal_places: Option<u32>,
}

impl GeneralMetadata {
    pub fn is_empty(&self) -> bool {
        self.pattern.is_none()
            && self.allow_inf_nan.is_none()
            && self.max_digits.is_none()
            && self.decimal_places.is_none()
    }
}

impl fmt::Display for GeneralMetadata {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut parts = Vec::new();
        if let Some(pattern) = &self.pattern {
            parts.push(format!("pattern: {pattern:?}"));
        }
        if let Some(allow) = self.allow_inf_nan {
            parts.push(format!("allow_inf_nan: {allow}"));
        }
        if let Some(digits) = self.max_digits {
            parts.push(format!("max_digits: {digits}"));
        }
        if let Some(places) = self.decimal_places {
            parts.push(format!("decimal_places: {places}"));
        }
        write!(f, "GeneralMetadata {{ {} }}", parts.join(", "))
    }
}

/// One entry of a field's ordered metadata list.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Metadata {
    Strict(bool),
    Gt(Bound),
    Ge(Bound),
    Lt(Bound),
    Le(Bound),
    MultipleOf(Bound),
    MinLen(usize),
    MaxLen(usize),
    General(GeneralMetadata),
    /// Opaque extension metadata carried through unchanged.
    Custom { name: String, value: Value },
}

impl Metadata {
    pub fn custom(name: impl Into<String>, value: Value) -> Self {
        Self::Custom {
            name: name.into(),
            value,
        }
    }
}

impl fmt::Display for Metadata {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Strict(strict) => write!(f, "Strict({strict})"),
            Self::Gt(bound) => write!(f, "Gt({bound})"),
            Self::Ge(bound) => write!(f, "Ge({bound})"),
            Self::Lt(bound) => write!(f, "Lt({bound})"),
            Self::Le(bound) => write!(f, "Le({bound})"),
            Self::MultipleOf(bound) => write!(f, "MultipleOf({bound})"),
            Self::MinLen(len) => write!(f, "MinLen({len})"),
            Self::MaxLen(len) => write!(f, "MaxLen({len})"),
            Self::General(general) => write!(f, "{general}"),
            Self::Custom { name, value } => write!(f, "{name}({value})"),
        }
    }
}

/// Constraint keywords accepted by the field builder. Unset keys emit nothing.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ConstraintKeywords {
    pub strict: Option<bool>,
    pub gt: Option<Bound>,
    pub ge: Option<Bound>,
    pub lt: Option<Bound>,
    pub le: Option<Bound>,
    pub multiple_of: Option<Bound>,
    pub min_length: Option<usize>,
    pub max_length: Option<usize>,
    pub pattern: Option<String>,
    pub allow_inf_nan: Option<bool>,
    pub max_digits: Option<u32>,
    pub decimal_places: Option<u32>,
}

/// Keys recognised by [`ConstraintKeywords::take_from_map`].
pub const CONSTRAINT_KEYS: &[&str] = &[
    "strict",
    "gt",
    "ge",
    "lt",
    "le",
    "multiple_of",
    "min_length",
    "max_length",
    "pattern",
    "allow_inf_nan",
    "max_digits",
    "decimal_places",
];

impl ConstraintKeywords {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Removes every recognised constraint key from `map`, leaving unrecognised keys behind.
    pub fn take_from_map(map: &mut Map<String, Value>) -> ConfigResult<Self> {
        let mut taken = Map::new();
        for key in CONSTRAINT_KEYS {
            if let Some(value) = map.remove(*key) {
                taken.insert((*key).to_string(), value);
            }
        }

        serde_json::from_value(Value::Object(taken)).map_err(|err| ConfigurationError::InvalidOption {
            option: "constraints".to_string(),
            reason: err.to_string(),
        })
    }
}

/// Converts constraint keywords into metadata, consuming each key it handles.
///
/// Dedicated wrappers come first in a fixed order; keys without a dedicated wrapper are
/// gathered into one trailing [`GeneralMetadata`] entry, emitted only when non-empty.
pub fn collect_metadata(keywords: &mut ConstraintKeywords) -> Vec<Metadata> {
    let mut metadata = Vec::new();

    if let Some(strict) = keywords.strict.take() {
        metadata.push(Metadata::Strict(strict));
    }
    if let Some(gt) = keywords.gt.take() {
        metadata.push(Metadata::Gt(gt));
    }
    if let Some(ge) = keywords.ge.take() {
        metadata.push(Metadata::Ge(ge));
    }
    if let Some(lt) = keywords.lt.take() {
        metadata.push(Metadata::Lt(lt));
    }
    if let Some(le) = keywords.le.take() {
        metadata.push(Metadata::Le(le));
    }
    if let Some(multiple_of) = keywords.multiple_of.take() {
        metadata.push(Metadata::MultipleOf(multiple_of));
    }
    if let Some(min_length) = keywords.min_length.take() {
        metadata.push(Metadata::MinLen(min_length));
    }
    if let Some(max_length) = keywords.max_length.take() {
        metadata.push(Metadata::MaxLen(max_length));
    }

    let general = GeneralMetadata {
        pattern: keywords.pattern.take(),
        allow_inf_nan: keywords.allow_inf_nan.take(),
        max_digits: keywords.max_digits.take(),
        decimal_places: keywords.decimal_places.take(),
    };
    if !general.is_empty() {
        metadata.push(Metadata::General(general));
    }

    metadata
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn dedicated_wrappers_precede_general_bag() {
        let mut keywords = ConstraintKeywords {
            pattern: Some("^x".to_string()),
            gt: Some(Bound::Int(5)),
            ..Default::default()
        };

        let metadata = collect_metadata(&mut keywords);
        assert_eq!(
            metadata,
            vec![
                Metadata::Gt(Bound::Int(5)),
                Metadata::General(GeneralMetadata {
                    pattern: Some("^x".to_string()),
                    ..Default::default()
                }),
            ]
        );
        assert!(keywords.is_empty());
    }

    #[test]
    fn unset_keywords_emit_nothing() {
        let mut keywords = ConstraintKeywords::default();
        assert!(collect_metadata(&mut keywords).is_empty());
    }

    #[test]
    fn take_from_map_leaves_unknown_keys() {
        let mut map = json!({"gt": 1, "max_length": 4, "pattern": null, "color": "red"})
            .as_object()
            .cloned()
            .unwrap();

        let keywords = ConstraintKeywords::take_from_map(&mut map).unwrap();
        assert_eq!(keywords.gt, Some(Bound::Int(1)));
        assert_eq!(keywords.max_length, Some(4));
        assert_eq!(keywords.pattern, None);
        assert_eq!(map.len(), 1);
        assert!(map.contains_key("color"));
    }

    #[test]
    fn take_from_map_rejects_wrong_shapes() {
        let mut map = json!({"min_length": "three"}).as_object().cloned().unwrap();
        let err = ConstraintKeywords::take_from_map(&mut map).unwrap_err();
        assert_eq!(err.code(), "invalid-option");
    }

    #[test]
    fn float_bounds_deserialize() {
        let mut map = json!({"le": 2.5}).as_object().cloned().unwrap();
        let keywords = ConstraintKeywords::take_from_map(&mut map).unwrap();
        assert_eq!(keywords.le, Some(Bound::Float(2.5)));
    }
}
