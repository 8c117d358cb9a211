//! The canonical field descriptor and its construction entry points.
//!
//! A model builder calls exactly one of the entry points per declared attribute:
//!
//! - [`FieldInfo::from_annotation`] for a bare annotation (`name: int`),
//! - [`FieldInfo::from_annotated_attribute`] for an annotation with a right-hand side
//!   (`name: int = 3`, `name: int = Field(...)`, or a dataclass-style field),
//! - [`FieldInfo::from_field`] for the explicit `Field(...)` call, normally reached through
//!   [`crate::field::Field`].
//!
//! Descriptors are value records. The only in-place mutation is
//! [`FieldInfo::apply_typevars_map`], which rewrites the annotation during generic
//! specialisation and must be exclusive to the descriptor's owner; clone first if a
//! descriptor is shared between specialisations.

use std::fmt;

use serde_json::{Map, Value};

use crate::alias::ValidationAlias;
use crate::annotation::{AnnotationArg, extract_metadata, split_annotation, unwrap_final};
use crate::constraints::{ConstraintKeywords, Metadata, collect_metadata};
use crate::dataclass::DataclassField;
use crate::errors::{ConfigResult, ConfigurationError, DeprecatedOption};
use crate::types::{Namespace, TypeExpr, TypevarsMap};
use crate::value::{DefaultFactory, DefaultInput};

/// Alias priority assigned when an alias is set without an explicit priority.
pub const DEFAULT_ALIAS_PRIORITY: i32 = 2;

/// Derives the alias priority: an explicit priority always wins, otherwise any alias implies
/// [`DEFAULT_ALIAS_PRIORITY`].
pub fn derive_alias_priority(explicit: Option<i32>, alias_is_set: bool) -> Option<i32> {
    explicit.or_else(|| alias_is_set.then_some(DEFAULT_ALIAS_PRIORITY))
}

/// Every option accepted by the primary initializer.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FieldParams {
    pub annotation: Option<TypeExpr>,
    pub default: DefaultInput,
    pub default_factory: Option<DefaultFactory>,
    pub alias: Option<String>,
    pub alias_priority: Option<i32>,
    pub validation_alias: Option<ValidationAlias>,
    pub serialization_alias: Option<String>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub examples: Option<Vec<Value>>,
    pub exclude: Option<bool>,
    pub include: Option<bool>,
    pub discriminator: Option<String>,
    pub json_schema_extra: Option<Map<String, Value>>,
    pub frozen: Option<bool>,
    pub is_final: Option<bool>,
    pub validate_default: Option<bool>,
    /// Defaults to `true` when unset.
    pub repr: Option<bool>,
    pub init_var: Option<bool>,
    pub kw_only: Option<bool>,
    pub constraints: ConstraintKeywords,
}

/// Right-hand side of an annotated attribute declaration.
#[derive(Debug, Clone, PartialEq)]
pub enum AttributeDefault {
    /// `name: T = Field(...)`
    Field(Box<FieldInfo>),
    /// A per-attribute declaration from the dataclass convention.
    Dataclass(DataclassField),
    /// `name: T = ...`
    Ellipsis,
    /// `name: T = value`
    Value(Value),
}

impl From<FieldInfo> for AttributeDefault {
    fn from(value: FieldInfo) -> Self {
        Self::Field(Box::new(value))
    }
}

impl From<DataclassField> for AttributeDefault {
    fn from(value: DataclassField) -> Self {
        Self::Dataclass(value)
    }
}

impl From<Value> for AttributeDefault {
    fn from(value: Value) -> Self {
        Self::Value(value)
    }
}

/// Canonical description of one model attribute.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldInfo {
    pub annotation: Option<TypeExpr>,
    pub default: Option<Value>,
    pub default_factory: Option<DefaultFactory>,
    pub alias: Option<String>,
    pub alias_priority: Option<i32>,
    pub validation_alias: Option<ValidationAlias>,
    pub serialization_alias: Option<String>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub examples: Option<Vec<Value>>,
    pub exclude: Option<bool>,
    pub include: Option<bool>,
    pub discriminator: Option<String>,
    pub json_schema_extra: Option<Map<String, Value>>,
    pub frozen: Option<bool>,
    pub is_final: Option<bool>,
    pub validate_default: Option<bool>,
    pub repr: bool,
    pub init_var: Option<bool>,
    pub kw_only: Option<bool>,
    pub metadata: Vec<Metadata>,
}

impl FieldInfo {
    /// Primary initializer. Prefer one of the entry points or [`crate::field::Field`].
    pub fn new(params: FieldParams) -> ConfigResult<Self> {
        let FieldParams {
            annotation,
            default,
            default_factory,
            alias,
            alias_priority,
            validation_alias,
            serialization_alias,
            title,
            description,
            examples,
            exclude,
            include,
            discriminator,
            json_schema_extra,
            frozen,
            is_final,
            validate_default,
            repr,
            init_var,
            kw_only,
            mut constraints,
        } = params;

        let (annotation, annotation_metadata, annotation_final) = extract_metadata(annotation)?;

        let default = default.into_value();
        if default.is_some() && default_factory.is_some() {
            return Err(ConfigurationError::ConflictingDefault);
        }

        let alias_is_set = alias.is_some() || validation_alias.is_some() || serialization_alias.is_some();
        let alias_priority = derive_alias_priority(alias_priority, alias_is_set);

        let mut metadata = collect_metadata(&mut constraints);
        metadata.extend(annotation_metadata);

        Ok(Self {
            annotation,
            default,
            default_factory,
            alias,
            alias_priority,
            validation_alias,
            serialization_alias,
            title,
            description,
            examples,
            exclude,
            include,
            discriminator,
            json_schema_extra,
            frozen,
            is_final: is_final.or_else(|| annotation_final.then_some(true)),
            validate_default,
            repr: repr.unwrap_or(true),
            init_var,
            kw_only,
            metadata,
        })
    }

    /// Entry point for the explicit `Field(...)` call. The annotation must come from the
    /// declaration site, so `params.annotation` is rejected.
    pub fn from_field(default: impl Into<DefaultInput>, mut params: FieldParams) -> ConfigResult<Self> {
        if params.annotation.is_some() {
            return Err(ConfigurationError::AnnotationNotPermitted);
        }
        params.default = default.into();
        Self::new(params)
    }

    /// Entry point for a bare annotation, e.g. `name: Annotated[int, Field(gt=1)]`.
    pub fn from_annotation(annotation: TypeExpr) -> ConfigResult<Self> {
        log::trace!("building field from annotation {annotation}");
        let split = split_annotation(annotation)?;

        if let Some(mut info) = split.field_info {
            info.annotation = Some(split.annotation);
            info.metadata.extend(split.metadata);
            info.is_final = Some(split.is_final || info.is_final.unwrap_or(false));
            return Ok(info);
        }

        let mut info = Self::new(FieldParams {
            annotation: Some(split.annotation),
            is_final: Some(split.is_final),
            ..FieldParams::default()
        })?;
        info.metadata.extend(split.metadata);
        Ok(info)
    }

    /// Entry point for an annotation with a right-hand side.
    pub fn from_annotated_attribute(annotation: TypeExpr, default: impl Into<AttributeDefault>) -> ConfigResult<Self> {
        Self::from_annotated_attribute_with_warnings(annotation, default).map(|(info, _)| info)
    }

    /// Same as [`FieldInfo::from_annotated_attribute`], also returning the deprecations raised
    /// while translating a dataclass-style declaration.
    pub fn from_annotated_attribute_with_warnings(
        annotation: TypeExpr,
        default: impl Into<AttributeDefault>,
    ) -> ConfigResult<(Self, Vec<DeprecatedOption>)> {
        let (annotation, outer_final) = unwrap_final(annotation);

        match default.into() {
            AttributeDefault::Field(info) => {
                log::trace!("merging explicit field into annotation {annotation}");
                let mut info = *info;
                let (annotation, metadata, inner_final) = extract_metadata(Some(annotation))?;
                info.annotation = annotation;
                info.metadata.extend(metadata);
                info.is_final = Some(outer_final || inner_final || info.is_final.unwrap_or(false));
                Ok((info, Vec::new()))
            }
            AttributeDefault::Dataclass(dc_field) => {
                log::trace!("translating dataclass field for annotation {annotation}");
                let (annotation, init_var) = match annotation {
                    TypeExpr::InitVar(None) => (TypeExpr::Any, true),
                    TypeExpr::InitVar(Some(inner)) => (*inner, true),
                    other => (other, false),
                };

                let kw_only = dc_field.kw_only;
                let (mut info, warnings) = Self::from_dataclass_field(dc_field)?;
                let (annotation, metadata, inner_final) = extract_metadata(Some(annotation))?;
                info.annotation = annotation;
                info.metadata.extend(metadata);
                info.is_final = Some(outer_final || inner_final || info.is_final.unwrap_or(false));
                info.init_var = Some(init_var);
                info.kw_only = kw_only;
                Ok((info, warnings))
            }
            AttributeDefault::Ellipsis => {
                Self::from_annotated_value(annotation, outer_final, DefaultInput::Ellipsis).map(|info| (info, Vec::new()))
            }
            AttributeDefault::Value(value) => {
                Self::from_annotated_value(annotation, outer_final, DefaultInput::Value(value))
                    .map(|info| (info, Vec::new()))
            }
        }
    }

    fn from_annotated_value(annotation: TypeExpr, outer_final: bool, default: DefaultInput) -> ConfigResult<Self> {
        let split = split_annotation(annotation)?;
        let is_final = outer_final || split.is_final;

        if let Some(mut info) = split.field_info {
            if !info.is_required() {
                return Err(ConfigurationError::duplicate(
                    "Default may not be specified twice on the same field",
                ));
            }
            info.default = default.into_value();
            info.annotation = Some(split.annotation);
            info.metadata.extend(split.metadata);
            info.is_final = Some(is_final || info.is_final.unwrap_or(false));
            return Ok(info);
        }

        let mut info = Self::new(FieldParams {
            annotation: Some(split.annotation),
            default,
            is_final: Some(is_final),
            ..FieldParams::default()
        })?;
        info.metadata.extend(split.metadata);
        Ok(info)
    }

    /// True when neither a default nor a default factory is set.
    pub fn is_required(&self) -> bool {
        self.default.is_none() && self.default_factory.is_none()
    }

    /// Returns the default value, or `None` when there is nothing to return.
    ///
    /// Without a factory this is a deep copy of `default`. With a factory, the factory is
    /// only invoked when `call_default_factory` is set; introspection never triggers it.
    pub fn get_default(&self, call_default_factory: bool) -> Option<Value> {
        match &self.default_factory {
            None => self.default.clone(),
            Some(factory) if call_default_factory => Some(factory.call()),
            Some(_) => None,
        }
    }

    /// Reassembles the annotation, wrapping it in an annotated composite when metadata exists.
    pub fn rebuild_annotation(&self) -> Option<TypeExpr> {
        if self.metadata.is_empty() {
            return self.annotation.clone();
        }

        let base = self.annotation.clone().unwrap_or(TypeExpr::Any);
        let extras = self.metadata.iter().cloned().map(AnnotationArg::Metadata).collect();
        Some(TypeExpr::annotated(base, extras))
    }

    /// Resolves deferred parts of the annotation against `namespace`, then substitutes type
    /// variables from `typevars_map`. Mutates the descriptor in place.
    pub fn apply_typevars_map(&mut self, typevars_map: Option<&TypevarsMap>, namespace: Option<&Namespace>) {
        let Some(annotation) = self.annotation.as_ref() else {
            return;
        };

        let evaluated = annotation.eval_lenient(namespace);
        self.annotation = Some(match typevars_map {
            Some(map) => evaluated.replace_types(map),
            None => evaluated,
        });
    }

    /// Attribute pairs shown by the `Display` representation.
    ///
    /// Attributes at their default value are skipped, as are aliases that merely repeat `alias`.
    pub fn repr_args(&self) -> Vec<(&'static str, String)> {
        let mut args = Vec::new();

        let annotation = self
            .annotation
            .as_ref()
            .map_or_else(|| "None".to_string(), ToString::to_string);
        args.push(("annotation", annotation));
        args.push(("required", self.is_required().to_string()));

        let mut push = |name: &'static str, value: Option<String>| {
            if let Some(value) = value {
                args.push((name, value));
            }
        };

        push("default", self.default.as_ref().map(Value::to_string));
        push("default_factory", self.default_factory.as_ref().map(ToString::to_string));
        push("alias", self.alias.as_ref().map(|alias| format!("{alias:?}")));
        push("alias_priority", self.alias_priority.map(|priority| priority.to_string()));
        push(
            "validation_alias",
            self.validation_alias
                .as_ref()
                .filter(|alias| alias.as_name() != self.alias.as_deref() || self.alias.is_none())
                .map(ToString::to_string),
        );
        push(
            "serialization_alias",
            self.serialization_alias
                .as_ref()
                .filter(|alias| Some(alias.as_str()) != self.alias.as_deref())
                .map(|alias| format!("{alias:?}")),
        );
        push("title", self.title.as_ref().map(|title| format!("{title:?}")));
        push("description", self.description.as_ref().map(|text| format!("{text:?}")));
        push("examples", self.examples.as_ref().map(|examples| Value::Array(examples.clone()).to_string()));
        push("exclude", self.exclude.map(|flag| flag.to_string()));
        push("include", self.include.map(|flag| flag.to_string()));
        push("discriminator", self.discriminator.as_ref().map(|name| format!("{name:?}")));
        push(
            "json_schema_extra",
            self.json_schema_extra.as_ref().map(|extra| Value::Object(extra.clone()).to_string()),
        );
        push("frozen", self.frozen.filter(|frozen| *frozen).map(|flag| flag.to_string()));
        push("validate_default", self.validate_default.map(|flag| flag.to_string()));
        push("repr", (!self.repr).then(|| false.to_string()));
        push("init_var", self.init_var.map(|flag| flag.to_string()));
        push("kw_only", self.kw_only.map(|flag| flag.to_string()));
        if !self.metadata.is_empty() {
            let items: Vec<String> = self.metadata.iter().map(ToString::to_string).collect();
            push("metadata", Some(format!("[{}]", items.join(", "))));
        }

        args
    }
}

impl fmt::Display for FieldInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("FieldInfo { ")?;
        for (index, (name, value)) in self.repr_args().iter().enumerate() {
            if index > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{name}: {value}")?;
        }
        f.write_str(" }")
    }
}
