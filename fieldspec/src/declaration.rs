//! Model declarations loaded from TOML.
//!
//! A declaration file describes one model: its type parameters, a namespace for deferred
//! annotations, and its fields, private attributes and computed fields. Each field entry is
//! routed to exactly one descriptor entry point depending on which right-hand side it declares.

use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use serde_json::{Map, Value};
use thiserror::Error;

use crate::annotation::AnnotationArg;
use crate::computed::{Accessor, AccessorFn, ComputedField, ComputedFieldInfo, Property};
use crate::constraints::{ConstraintKeywords, Metadata, collect_metadata};
use crate::dataclass::DataclassField;
use crate::errors::{ConfigResult, ConfigurationError, DeprecatedOption};
use crate::field::Field;
use crate::fields::{AttributeDefault, FieldInfo};
use crate::private_attr::{ModelPrivateAttr, PrivateAttr};
use crate::types::{Namespace, TypeExpr, TypevarsMap};
use crate::value::{DefaultFactory, DefaultInput};

#[derive(Debug, Error)]
pub enum DeclarationError {
    #[error("failed to read declaration file {}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("invalid declaration file")]
    Toml(#[from] toml::de::Error),

    /// One declared member could not be resolved.
    #[error("{kind} `{name}` is misconfigured")]
    Member {
        kind: &'static str,
        name: String,
        #[source]
        source: ConfigurationError,
    },
}

impl DeclarationError {
    fn member<'a>(kind: &'static str, name: &'a str) -> impl FnOnce(ConfigurationError) -> Self + 'a {
        move |source| Self::Member {
            kind,
            name: name.to_string(),
            source,
        }
    }

    /// The underlying configuration error, if this is one.
    pub fn configuration_error(&self) -> Option<&ConfigurationError> {
        match self {
            Self::Member { source, .. } => Some(source),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ModelDeclaration {
    pub name: String,
    /// Names resolved to type variables.
    #[serde(default)]
    pub type_params: Vec<String>,
    /// Extra names for resolving annotations, as annotation text.
    #[serde(default)]
    pub namespace: BTreeMap<String, String>,
    #[serde(default)]
    pub fields: BTreeMap<String, FieldDeclaration>,
    #[serde(default)]
    pub private: BTreeMap<String, PrivateDeclaration>,
    #[serde(default)]
    pub computed: BTreeMap<String, ComputedDeclaration>,
}

/// One `[fields.<name>]` table.
///
/// At most one right-hand side may be given: `default`, `required`, `field` or `dataclass`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FieldDeclaration {
    pub annotation: String,
    /// Wraps the annotation in `Final[...]`.
    #[serde(default, rename = "final")]
    pub is_final: bool,
    /// Wraps the annotation in `InitVar[...]`.
    #[serde(default)]
    pub init_var: bool,
    /// Annotated metadata, one table per entry. Constraint keys become constraint metadata,
    /// any other key is carried as custom metadata.
    #[serde(default)]
    pub metadata: Vec<Map<String, Value>>,
    /// Keyword options of a field descriptor embedded in the annotation.
    pub embedded: Option<Map<String, Value>>,
    pub default: Option<Value>,
    /// The explicit required marker.
    #[serde(default)]
    pub required: bool,
    /// Keyword options of an explicit `Field(...)` call; may carry its own `default`.
    pub field: Option<Map<String, Value>>,
    pub dataclass: Option<DataclassDeclaration>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DataclassDeclaration {
    pub default: Option<Value>,
    pub default_factory: Option<String>,
    pub repr: Option<bool>,
    pub kw_only: Option<bool>,
    #[serde(default)]
    pub metadata: Map<String, Value>,
}

impl DataclassDeclaration {
    fn into_dataclass_field(self) -> ConfigResult<DataclassField> {
        let mut dc_field = DataclassField {
            default: self.default,
            kw_only: self.kw_only,
            metadata: self.metadata,
            ..DataclassField::default()
        };
        if let Some(name) = self.default_factory {
            dc_field.default_factory = Some(DefaultFactory::builtin(&name)?);
        }
        if let Some(repr) = self.repr {
            dc_field.repr = repr;
        }
        Ok(dc_field)
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PrivateDeclaration {
    pub default: Option<Value>,
    pub default_factory: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ComputedDeclaration {
    /// Declared return type of the accessor.
    pub return_type: Option<String>,
    pub alias: Option<String>,
    pub alias_priority: Option<i32>,
    pub title: Option<String>,
    pub description: Option<String>,
    /// Accessor documentation, used when `description` is not given.
    pub doc: Option<String>,
    pub repr: Option<bool>,
    #[serde(default)]
    pub cached: bool,
}

/// A deprecation raised while resolving one field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldWarning {
    pub field: String,
    pub warning: DeprecatedOption,
}

/// A model whose members have all been turned into descriptors.
#[derive(Debug, Clone)]
pub struct ResolvedModel {
    pub name: String,
    pub namespace: Namespace,
    pub fields: Vec<(String, FieldInfo)>,
    pub private_attributes: Vec<(String, ModelPrivateAttr)>,
    pub computed_fields: Vec<ComputedFieldInfo>,
    pub warnings: Vec<FieldWarning>,
}

impl ResolvedModel {
    /// Returns a copy with every field annotation specialised by `typevars_map`.
    ///
    /// The descriptors are cloned before substitution, so `self` stays generic.
    pub fn specialize(&self, typevars_map: &TypevarsMap) -> ResolvedModel {
        let mut specialized = self.clone();
        for (name, info) in &mut specialized.fields {
            log::debug!("specialising field `{name}`");
            info.apply_typevars_map(Some(typevars_map), Some(&self.namespace));
        }
        specialized
    }

    pub fn field(&self, name: &str) -> Option<&FieldInfo> {
        self.fields
            .iter()
            .find_map(|(field_name, info)| (field_name == name).then_some(info))
    }
}

impl ModelDeclaration {
    pub fn from_toml_str(text: &str) -> Result<Self, DeclarationError> {
        Ok(toml::from_str(text)?)
    }

    pub fn from_path(path: &Path) -> Result<Self, DeclarationError> {
        let text = fs::read_to_string(path).map_err(|source| DeclarationError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    /// Namespace for annotation text: `[namespace]` entries plus the type parameters.
    pub fn build_namespace(&self) -> Result<Namespace, DeclarationError> {
        let mut namespace = Namespace::new();
        for (name, text) in &self.namespace {
            let parsed = TypeExpr::parse(text).map_err(DeclarationError::member("namespace entry", name))?;
            namespace.insert(name.clone(), parsed);
        }
        for param in &self.type_params {
            namespace.insert(param.clone(), TypeExpr::type_var(param.as_str()));
        }
        Ok(namespace)
    }

    /// Resolves every member, stopping at the first configuration error.
    pub fn resolve(self) -> Result<ResolvedModel, DeclarationError> {
        let namespace = self.build_namespace()?;
        log::debug!("resolving model `{}` ({} fields)", self.name, self.fields.len());

        let mut warnings = Vec::new();
        let mut fields = Vec::with_capacity(self.fields.len());
        for (name, declaration) in self.fields {
            let (info, field_warnings) =
                resolve_field(declaration, &namespace).map_err(DeclarationError::member("field", &name))?;
            warnings.extend(field_warnings.into_iter().map(|warning| FieldWarning {
                field: name.clone(),
                warning,
            }));
            fields.push((name, info));
        }

        let mut private_attributes = Vec::with_capacity(self.private.len());
        for (name, declaration) in self.private {
            let attr = resolve_private(declaration).map_err(DeclarationError::member("private attribute", &name))?;
            attr.set_name(&self.name, &name);
            private_attributes.push((name, attr));
        }

        let mut computed_fields = Vec::with_capacity(self.computed.len());
        for (name, declaration) in self.computed {
            let info = resolve_computed(&name, declaration, &namespace)
                .map_err(DeclarationError::member("computed field", &name))?;
            computed_fields.push(info);
        }

        Ok(ResolvedModel {
            name: self.name,
            namespace,
            fields,
            private_attributes,
            computed_fields,
            warnings,
        })
    }
}

fn resolve_field(
    declaration: FieldDeclaration,
    namespace: &Namespace,
) -> ConfigResult<(FieldInfo, Vec<DeprecatedOption>)> {
    let FieldDeclaration {
        annotation,
        is_final,
        init_var,
        metadata,
        embedded,
        default,
        required,
        field,
        dataclass,
    } = declaration;

    let mut warnings = Vec::new();
    let mut annotation = TypeExpr::parse(&annotation)?.resolve_names(namespace);

    let mut extras = Vec::new();
    for table in metadata {
        extras.extend(metadata_from_table(table)?.into_iter().map(AnnotationArg::Metadata));
    }
    if let Some(kwargs) = embedded {
        let (info, embedded_warnings) = field_from_kwargs(kwargs)?;
        warnings.extend(embedded_warnings);
        extras.push(AnnotationArg::from(info));
    }
    if !extras.is_empty() {
        annotation = TypeExpr::annotated(annotation, extras);
    }
    if init_var {
        annotation = TypeExpr::init_var_of(annotation);
    }
    if is_final {
        annotation = TypeExpr::final_of(annotation);
    }

    let info = match (default, required, field, dataclass) {
        (None, false, None, None) => FieldInfo::from_annotation(annotation)?,
        (Some(value), false, None, None) => FieldInfo::from_annotated_attribute(annotation, value)?,
        (None, true, None, None) => FieldInfo::from_annotated_attribute(annotation, AttributeDefault::Ellipsis)?,
        (None, false, Some(kwargs), None) => {
            let (explicit, field_warnings) = field_from_kwargs(kwargs)?;
            warnings.extend(field_warnings);
            FieldInfo::from_annotated_attribute(annotation, explicit)?
        }
        (None, false, None, Some(dataclass)) => {
            let (info, dataclass_warnings) =
                FieldInfo::from_annotated_attribute_with_warnings(annotation, dataclass.into_dataclass_field()?)?;
            warnings.extend(dataclass_warnings);
            info
        }
        _ => {
            return Err(ConfigurationError::InvalidOption {
                option: "default".to_string(),
                reason: "only one of `default`, `required`, `field` or `dataclass` may be given".to_string(),
            });
        }
    };

    Ok((info, warnings))
}

fn field_from_kwargs(mut kwargs: Map<String, Value>) -> ConfigResult<(FieldInfo, Vec<DeprecatedOption>)> {
    let default = kwargs.remove("default").map_or(DefaultInput::Undefined, DefaultInput::Value);
    Field::from_kwargs(default, kwargs)?.build_with_warnings()
}

fn metadata_from_table(mut table: Map<String, Value>) -> ConfigResult<Vec<Metadata>> {
    let mut keywords = ConstraintKeywords::take_from_map(&mut table)?;
    let mut metadata = collect_metadata(&mut keywords);
    metadata.extend(table.into_iter().map(|(name, value)| Metadata::custom(name, value)));
    Ok(metadata)
}

fn resolve_private(declaration: PrivateDeclaration) -> ConfigResult<ModelPrivateAttr> {
    let mut builder = PrivateAttr::new();
    if let Some(value) = declaration.default {
        builder = builder.default_value(value);
    }
    if let Some(name) = declaration.default_factory {
        builder = builder.default_factory(DefaultFactory::builtin(&name)?);
    }
    builder.build()
}

fn resolve_computed(
    name: &str,
    declaration: ComputedDeclaration,
    namespace: &Namespace,
) -> ConfigResult<ComputedFieldInfo> {
    let key = name.to_string();
    let mut accessor = AccessorFn::new(name, move |instance: &Value| {
        instance.get(&key).cloned().unwrap_or(Value::Null)
    });
    if let Some(doc) = declaration.doc {
        accessor = accessor.doc(doc);
    }
    if let Some(text) = declaration.return_type {
        accessor = accessor.returns(TypeExpr::parse(&text)?.resolve_names(namespace));
    }
    let accessor = if declaration.cached {
        Accessor::from(Property::cached(accessor))
    } else {
        Accessor::from(accessor)
    };

    let mut builder = ComputedField::new();
    if let Some(alias) = declaration.alias {
        builder = builder.alias(alias);
    }
    if let Some(priority) = declaration.alias_priority {
        builder = builder.alias_priority(priority);
    }
    if let Some(title) = declaration.title {
        builder = builder.title(title);
    }
    if let Some(description) = declaration.description {
        builder = builder.description(description);
    }
    if let Some(repr) = declaration.repr {
        builder = builder.repr(repr);
    }
    builder.apply(accessor)
}
