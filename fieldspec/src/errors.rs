use std::borrow::Cow;
use std::fmt;

use thiserror::Error;

/// Top-level error type returned while resolving field declarations.
///
/// Every variant is raised at construction time and none of them are retryable: the
/// declaration itself has to change.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigurationError {
    /// Both a default value and a default factory were supplied.
    #[error("cannot specify both default and default_factory")]
    ConflictingDefault,

    /// A field descriptor was embedded more than once, or an embedded descriptor already
    /// carries the default being supplied at the attribute.
    #[error("{message}")]
    DuplicateFieldDescriptor { message: Cow<'static, str> },

    /// The explicit `Field` call tried to set the annotation.
    #[error("\"annotation\" is not permitted as a Field keyword argument")]
    AnnotationNotPermitted,

    /// `validation_alias` was neither a string, an `AliasPath`, nor an `AliasChoices`.
    #[error("invalid `validation_alias` type (found {found}), it should be `str`, `AliasChoices`, or `AliasPath`")]
    InvalidAliasType { found: String },

    /// A keyword that no longer exists was used.
    #[error("`{option}` is removed, {hint}")]
    RemovedOption { option: &'static str, hint: &'static str },

    /// A computed field has neither a declared nor an explicit return type.
    #[error(
        "computed field `{name}` is missing return type annotation or specifying `return_type` \
         (e.g. `computed_field().return_type(...)`)"
    )]
    MissingReturnType { name: String },

    /// Annotation text could not be parsed.
    #[error("invalid annotation `{text}`: {reason}")]
    InvalidAnnotation { text: String, reason: String },

    /// A named default factory is not one of the built-in factories.
    #[error("unknown default factory `{name}`")]
    UnknownFactory { name: String },

    /// A keyword option carried a value of the wrong shape.
    #[error("invalid value for `{option}`: {reason}")]
    InvalidOption { option: String, reason: String },
}

impl ConfigurationError {
    pub(crate) fn duplicate(message: &'static str) -> Self {
        Self::DuplicateFieldDescriptor {
            message: Cow::Borrowed(message),
        }
    }

    /// Stable machine-readable code for this error.
    pub fn code(&self) -> &'static str {
        match self {
            Self::ConflictingDefault => "conflicting-default",
            Self::DuplicateFieldDescriptor { .. } => "duplicate-field",
            Self::AnnotationNotPermitted => "annotation-not-permitted",
            Self::InvalidAliasType { .. } => "invalid-alias-type",
            Self::RemovedOption { .. } => "removed-kwargs",
            Self::MissingReturnType { .. } => "model-field-missing-annotation",
            Self::InvalidAnnotation { .. } => "invalid-annotation",
            Self::UnknownFactory { .. } => "unknown-factory",
            Self::InvalidOption { .. } => "invalid-option",
        }
    }
}

/// Convenience alias for fallible descriptor construction.
pub type ConfigResult<T> = Result<T, ConfigurationError>;

/// Non-fatal notice that a legacy option was used and mapped onto its modern equivalent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeprecatedOption {
    pub option: Cow<'static, str>,
    pub message: Cow<'static, str>,
}

impl DeprecatedOption {
    pub fn new(option: impl Into<Cow<'static, str>>, message: impl Into<Cow<'static, str>>) -> Self {
        Self {
            option: option.into(),
            message: message.into(),
        }
    }

    /// Logs the deprecation through the `log` facade.
    pub(crate) fn emit(&self) {
        log::warn!("deprecated option `{}`: {}", self.option, self.message);
    }
}

impl fmt::Display for DeprecatedOption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}
