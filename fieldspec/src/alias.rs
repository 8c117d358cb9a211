//! Input aliasing: where a field's value may be looked up during validation.

use std::fmt;

use serde::Serialize;
use serde_json::Value;

use crate::errors::{ConfigResult, ConfigurationError};

/// One step into a nested structure: an object key or a list index.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(untagged)]
pub enum PathSegment {
    Key(String),
    Index(usize),
}

impl From<&str> for PathSegment {
    fn from(value: &str) -> Self {
        Self::Key(value.to_string())
    }
}

impl From<String> for PathSegment {
    fn from(value: String) -> Self {
        Self::Key(value)
    }
}

impl From<usize> for PathSegment {
    fn from(value: usize) -> Self {
        Self::Index(value)
    }
}

impl fmt::Display for PathSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Key(key) => write!(f, "{key:?}"),
            Self::Index(index) => write!(f, "{index}"),
        }
    }
}

/// Path into nested input, e.g. `AliasPath::new("names").then(0)` reads `input["names"][0]`.
///
/// The first segment is always a key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct AliasPath {
    pub path: Vec<PathSegment>,
}

impl AliasPath {
    pub fn new(first: impl Into<String>) -> Self {
        Self {
            path: vec![PathSegment::Key(first.into())],
        }
    }

    /// Appends one more segment.
    pub fn then(mut self, segment: impl Into<PathSegment>) -> Self {
        self.path.push(segment.into());
        self
    }

    pub fn convert_to_aliases(&self) -> Vec<PathSegment> {
        self.path.clone()
    }

    fn from_json(segments: &[Value]) -> Option<Self> {
        let (first, rest) = segments.split_first()?;
        let mut path = AliasPath::new(first.as_str()?);
        for segment in rest {
            path = match segment {
                Value::String(key) => path.then(key.as_str()),
                Value::Number(n) => path.then(usize::try_from(n.as_u64()?).ok()?),
                _ => return None,
            };
        }
        Some(path)
    }
}

impl fmt::Display for AliasPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("AliasPath([")?;
        for (index, segment) in self.path.iter().enumerate() {
            if index > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{segment}")?;
        }
        f.write_str("])")
    }
}

/// One acceptable source location inside an [`AliasChoices`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(untagged)]
pub enum AliasChoice {
    Name(String),
    Path(AliasPath),
}

impl From<&str> for AliasChoice {
    fn from(value: &str) -> Self {
        Self::Name(value.to_string())
    }
}

impl From<String> for AliasChoice {
    fn from(value: String) -> Self {
        Self::Name(value)
    }
}

impl From<AliasPath> for AliasChoice {
    fn from(value: AliasPath) -> Self {
        Self::Path(value)
    }
}

/// Ordered alternatives tried one after another during validation. Never empty.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct AliasChoices {
    pub choices: Vec<AliasChoice>,
}

impl AliasChoices {
    pub fn new(first: impl Into<AliasChoice>) -> Self {
        Self {
            choices: vec![first.into()],
        }
    }

    /// Adds another alternative after the existing ones.
    pub fn or(mut self, choice: impl Into<AliasChoice>) -> Self {
        self.choices.push(choice.into());
        self
    }

    /// Normalises every choice into a path; a bare name becomes a single-segment path.
    pub fn convert_to_aliases(&self) -> Vec<Vec<PathSegment>> {
        self.choices
            .iter()
            .map(|choice| match choice {
                AliasChoice::Name(name) => vec![PathSegment::Key(name.clone())],
                AliasChoice::Path(path) => path.convert_to_aliases(),
            })
            .collect()
    }
}

impl fmt::Display for AliasChoices {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("AliasChoices([")?;
        for (index, choice) in self.choices.iter().enumerate() {
            if index > 0 {
                f.write_str(", ")?;
            }
            match choice {
                AliasChoice::Name(name) => write!(f, "{name:?}")?,
                AliasChoice::Path(path) => write!(f, "{path}")?,
            }
        }
        f.write_str("])")
    }
}

/// Accepted shapes of `validation_alias`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(untagged)]
pub enum ValidationAlias {
    Name(String),
    Path(AliasPath),
    Choices(AliasChoices),
}

impl ValidationAlias {
    /// Reads a validation alias from keyword-map JSON.
    ///
    /// Accepts a string, a list of path segments (or `{"path": [...]}`), or
    /// `{"choices": [...]}` whose entries are strings or paths.
    pub fn from_json(value: &Value) -> ConfigResult<Self> {
        let parsed = match value {
            Value::String(name) => Some(Self::Name(name.clone())),
            Value::Array(segments) => AliasPath::from_json(segments).map(Self::Path),
            Value::Object(map) => {
                if let Some(Value::Array(segments)) = map.get("path") {
                    AliasPath::from_json(segments).map(Self::Path)
                } else if let Some(Value::Array(choices)) = map.get("choices") {
                    parse_choices(choices).map(Self::Choices)
                } else {
                    None
                }
            }
            _ => None,
        };

        parsed.ok_or_else(|| ConfigurationError::InvalidAliasType {
            found: json_kind(value).to_string(),
        })
    }

    pub fn as_name(&self) -> Option<&str> {
        match self {
            Self::Name(name) => Some(name),
            _ => None,
        }
    }
}

fn parse_choices(choices: &[Value]) -> Option<AliasChoices> {
    let mut parsed = choices.iter().map(|choice| match choice {
        Value::String(name) => Some(AliasChoice::Name(name.clone())),
        Value::Array(segments) => AliasPath::from_json(segments).map(AliasChoice::Path),
        Value::Object(map) => match map.get("path") {
            Some(Value::Array(segments)) => AliasPath::from_json(segments).map(AliasChoice::Path),
            _ => None,
        },
        _ => None,
    });

    let mut result = AliasChoices::new(parsed.next()??);
    for choice in parsed {
        result = result.or(choice?);
    }
    Some(result)
}

pub(crate) fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

impl From<&str> for ValidationAlias {
    fn from(value: &str) -> Self {
        Self::Name(value.to_string())
    }
}

impl From<String> for ValidationAlias {
    fn from(value: String) -> Self {
        Self::Name(value)
    }
}

impl From<AliasPath> for ValidationAlias {
    fn from(value: AliasPath) -> Self {
        Self::Path(value)
    }
}

impl From<AliasChoices> for ValidationAlias {
    fn from(value: AliasChoices) -> Self {
        Self::Choices(value)
    }
}

impl fmt::Display for ValidationAlias {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Name(name) => write!(f, "{name:?}"),
            Self::Path(path) => write!(f, "{path}"),
            Self::Choices(choices) => write!(f, "{choices}"),
        }
    }
}
