//! Computed fields: read-only derived members exposed during serialization.
//!
//! ```
//! use fieldspec::computed::{AccessorFn, ComputedField};
//! use fieldspec::TypeExpr;
//! use serde_json::json;
//!
//! let full_name = AccessorFn::new("full_name", |user| json!(format!("{} {}", user["first"], user["last"])))
//!     .doc("The user's full name.");
//!
//! let decorator = ComputedField::new().alias("fullName").return_type(TypeExpr::named("str")).into_decorator();
//! let info = decorator(full_name.into()).unwrap();
//! assert_eq!(info.alias_priority, Some(2));
//! assert_eq!(info.description.as_deref(), Some("The user's full name."));
//! ```

use std::fmt;
use std::sync::Arc;

use serde_json::Value;

use crate::errors::{ConfigResult, ConfigurationError};
use crate::fields::derive_alias_priority;
use crate::types::TypeExpr;

type GetterFn = dyn Fn(&Value) -> Value + Send + Sync;

/// A plain accessor function together with the reflection data the builder needs.
#[derive(Clone)]
pub struct AccessorFn {
    pub name: String,
    /// Documentation attached to the accessor, used as the default description.
    pub doc: Option<String>,
    /// Declared return type, if the accessor has one.
    pub return_type: Option<TypeExpr>,
    getter: Arc<GetterFn>,
}

impl AccessorFn {
    pub fn new<F>(name: impl Into<String>, getter: F) -> Self
    where
        F: Fn(&Value) -> Value + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            doc: None,
            return_type: None,
            getter: Arc::new(getter),
        }
    }

    pub fn doc(mut self, doc: impl Into<String>) -> Self {
        self.doc = Some(doc.into());
        self
    }

    pub fn returns(mut self, return_type: TypeExpr) -> Self {
        self.return_type = Some(return_type);
        self
    }

    pub fn call(&self, instance: &Value) -> Value {
        (self.getter)(instance)
    }
}

impl fmt::Debug for AccessorFn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AccessorFn")
            .field("name", &self.name)
            .field("doc", &self.doc)
            .field("return_type", &self.return_type)
            .finish_non_exhaustive()
    }
}

impl PartialEq for AccessorFn {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.getter, &other.getter)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PropertyKind {
    Property,
    CachedProperty,
}

/// Read-only property wrapping a getter.
#[derive(Debug, Clone, PartialEq)]
pub struct Property {
    pub kind: PropertyKind,
    pub fget: AccessorFn,
}

impl Property {
    pub fn new(fget: AccessorFn) -> Self {
        Self {
            kind: PropertyKind::Property,
            fget,
        }
    }

    pub fn cached(fget: AccessorFn) -> Self {
        Self {
            kind: PropertyKind::CachedProperty,
            fget,
        }
    }

    pub fn get(&self, instance: &Value) -> Value {
        self.fget.call(instance)
    }
}

/// What the computed-field builder may be applied to.
#[derive(Debug, Clone, PartialEq)]
pub enum Accessor {
    Function(AccessorFn),
    Property(Property),
}

impl Accessor {
    pub fn fget(&self) -> &AccessorFn {
        match self {
            Self::Function(fget) => fget,
            Self::Property(property) => &property.fget,
        }
    }

    /// Wraps a plain function as a property; properties are returned as they are.
    pub fn ensure_property(self) -> Property {
        match self {
            Self::Function(fget) => Property::new(fget),
            Self::Property(property) => property,
        }
    }
}

impl From<AccessorFn> for Accessor {
    fn from(value: AccessorFn) -> Self {
        Self::Function(value)
    }
}

impl From<Property> for Accessor {
    fn from(value: Property) -> Self {
        Self::Property(value)
    }
}

/// Descriptor of a computed field, paired with its (possibly wrapped) property.
#[derive(Debug, Clone, PartialEq)]
pub struct ComputedFieldInfo {
    pub wrapped_property: Property,
    pub return_type: TypeExpr,
    pub alias: Option<String>,
    pub alias_priority: Option<i32>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub repr: bool,
}

impl ComputedFieldInfo {
    pub const DECORATOR_REPR: &'static str = "@computed_field";

    pub fn name(&self) -> &str {
        &self.wrapped_property.fget.name
    }
}

impl fmt::Display for ComputedFieldInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}: {}", Self::DECORATOR_REPR, self.name(), self.return_type)?;
        if let Some(alias) = &self.alias {
            write!(f, " (alias {alias:?})")?;
        }
        Ok(())
    }
}

/// Configurable computed-field decorator.
#[derive(Debug, Clone, PartialEq)]
#[must_use]
pub struct ComputedField {
    return_type: Option<TypeExpr>,
    alias: Option<String>,
    alias_priority: Option<i32>,
    title: Option<String>,
    description: Option<String>,
    repr: bool,
}

impl Default for ComputedField {
    fn default() -> Self {
        Self {
            return_type: None,
            alias: None,
            alias_priority: None,
            title: None,
            description: None,
            repr: true,
        }
    }
}

impl ComputedField {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn return_type(mut self, return_type: TypeExpr) -> Self {
        self.return_type = Some(return_type);
        self
    }

    pub fn alias(mut self, alias: impl Into<String>) -> Self {
        self.alias = Some(alias.into());
        self
    }

    pub fn alias_priority(mut self, priority: i32) -> Self {
        self.alias_priority = Some(priority);
        self
    }

    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn repr(mut self, repr: bool) -> Self {
        self.repr = repr;
        self
    }

    /// Applies the configuration to `accessor`.
    ///
    /// Fails with [`ConfigurationError::MissingReturnType`] when neither an explicit return
    /// type nor the accessor's declared one is available.
    pub fn apply(self, accessor: impl Into<Accessor>) -> ConfigResult<ComputedFieldInfo> {
        let accessor = accessor.into();
        let fget = accessor.fget();
        log::trace!("applying computed field to `{}`", fget.name);

        let description = self.description.or_else(|| fget.doc.as_deref().map(cleandoc));
        let return_type = self
            .return_type
            .or_else(|| fget.return_type.clone())
            .ok_or_else(|| ConfigurationError::MissingReturnType {
                name: fget.name.clone(),
            })?;
        let alias_priority = derive_alias_priority(self.alias_priority, self.alias.is_some());

        Ok(ComputedFieldInfo {
            wrapped_property: accessor.ensure_property(),
            return_type,
            alias: self.alias,
            alias_priority,
            title: self.title,
            description,
            repr: self.repr,
        })
    }

    /// Returns the partially applied constructor, waiting for its accessor.
    pub fn into_decorator(self) -> impl FnOnce(Accessor) -> ConfigResult<ComputedFieldInfo> {
        move |accessor| self.apply(accessor)
    }
}

/// Applies a default-configured computed field directly to `accessor`.
pub fn computed_field(accessor: impl Into<Accessor>) -> ConfigResult<ComputedFieldInfo> {
    ComputedField::new().apply(accessor)
}

/// Normalises docstring indentation.
///
/// The first line is stripped, the common indentation of the remaining lines is removed,
/// and leading and trailing blank lines are dropped.
pub fn cleandoc(doc: &str) -> String {
    let lines: Vec<&str> = doc.lines().collect();
    let Some((first, rest)) = lines.split_first() else {
        return String::new();
    };

    let margin = rest
        .iter()
        .filter(|line| !line.trim().is_empty())
        .map(|line| line.len() - line.trim_start().len())
        .min()
        .unwrap_or(0);

    let mut cleaned = Vec::with_capacity(lines.len());
    cleaned.push(first.trim_start());
    for line in rest {
        cleaned.push(line.get(margin..).unwrap_or_else(|| line.trim_start()));
    }

    while cleaned.first().is_some_and(|line| line.trim().is_empty()) {
        cleaned.remove(0);
    }
    while cleaned.last().is_some_and(|line| line.trim().is_empty()) {
        cleaned.pop();
    }

    cleaned.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn answer() -> AccessorFn {
        AccessorFn::new("answer", |_| json!(42))
    }

    #[test]
    fn missing_return_type_is_rejected() {
        let err = computed_field(answer()).unwrap_err();
        assert_eq!(
            err,
            ConfigurationError::MissingReturnType {
                name: "answer".to_string()
            }
        );
        assert_eq!(err.code(), "model-field-missing-annotation");
    }

    #[test]
    fn explicit_return_type_is_enough() {
        let info = ComputedField::new()
            .return_type(TypeExpr::named("int"))
            .apply(answer())
            .unwrap();
        assert_eq!(info.return_type, TypeExpr::named("int"));
        assert_eq!(info.wrapped_property.kind, PropertyKind::Property);
        assert_eq!(info.wrapped_property.get(&json!({})), json!(42));
        assert_eq!(info.alias_priority, None);
        assert!(info.repr);
    }

    #[test]
    fn declared_return_type_and_doc_are_used() {
        let accessor = answer()
            .returns(TypeExpr::named("int"))
            .doc("\n    The answer.\n\n    Computed once.\n    ");
        let info = computed_field(Property::cached(accessor)).unwrap();
        assert_eq!(info.description.as_deref(), Some("The answer.\n\nComputed once."));
        assert_eq!(info.wrapped_property.kind, PropertyKind::CachedProperty);
        assert_eq!(info.to_string(), "@computed_field answer: int");
    }

    #[test]
    fn explicit_description_wins() {
        let accessor = answer().returns(TypeExpr::named("int")).doc("From the docstring.");
        let info = ComputedField::new().description("Explicit.").apply(accessor).unwrap();
        assert_eq!(info.description.as_deref(), Some("Explicit."));
    }

    #[test]
    fn alias_priority_is_derived() {
        let accessor = answer().returns(TypeExpr::named("int"));
        let info = ComputedField::new().alias("theAnswer").apply(accessor.clone()).unwrap();
        assert_eq!(info.alias_priority, Some(2));

        let info = ComputedField::new().alias_priority(1).apply(accessor).unwrap();
        assert_eq!(info.alias_priority, Some(1));
    }

    #[test]
    fn cleandoc_strips_common_indent() {
        assert_eq!(cleandoc("Summary.\n    Detail one.\n      Nested."), "Summary.\nDetail one.\n  Nested.");
        assert_eq!(cleandoc("   \n\n"), "");
        assert_eq!(cleandoc(""), "");
    }
}
