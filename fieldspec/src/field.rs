//! Public `Field(...)` builder and the legacy keyword shim in front of it.

use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use crate::alias::ValidationAlias;
use crate::constraints::{Bound, ConstraintKeywords};
use crate::errors::{ConfigResult, ConfigurationError, DeprecatedOption};
use crate::fields::{FieldInfo, FieldParams};
use crate::value::{DefaultFactory, DefaultInput};

/// Removed and deprecated keywords, accepted only so they can be rejected or migrated.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LegacyOptions {
    /// Removed: always fatal when set.
    pub const_value: Option<Value>,
    /// Deprecated alias of `min_length`.
    pub min_items: Option<usize>,
    /// Deprecated alias of `max_length`.
    pub max_items: Option<usize>,
    /// Removed: always fatal when set.
    pub unique_items: Option<bool>,
    /// Deprecated; `false` maps onto `frozen = true`.
    pub allow_mutation: Option<bool>,
    /// Removed in favour of `pattern`.
    pub regex: Option<String>,
    /// Unrecognised keywords. Folded into `json_schema_extra` with a warning.
    pub extra: Map<String, Value>,
}

impl LegacyOptions {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// Builder behind the public `Field(...)` call.
///
/// ```
/// use fieldspec::Field;
///
/// let info = Field::new().alias("userName").max_length(50).build().unwrap();
/// assert_eq!(info.serialization_alias.as_deref(), Some("userName"));
/// assert_eq!(info.alias_priority, Some(2));
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
#[must_use]
pub struct Field {
    default: DefaultInput,
    params: FieldParams,
    legacy: LegacyOptions,
}

macro_rules! string_options {
    ($($name:ident),* $(,)?) => {
        $(
            pub fn $name(mut self, value: impl Into<String>) -> Self {
                self.params.$name = Some(value.into());
                self
            }
        )*
    };
}

macro_rules! flag_options {
    ($($name:ident),* $(,)?) => {
        $(
            pub fn $name(mut self, value: bool) -> Self {
                self.params.$name = Some(value);
                self
            }
        )*
    };
}

macro_rules! bound_constraints {
    ($($name:ident),* $(,)?) => {
        $(
            pub fn $name(mut self, value: impl Into<Bound>) -> Self {
                self.params.constraints.$name = Some(value.into());
                self
            }
        )*
    };
}

impl Field {
    /// A field with no default, i.e. required unless a factory is added.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_default(value: impl Into<Value>) -> Self {
        Self {
            default: DefaultInput::Value(value.into()),
            ..Self::default()
        }
    }

    /// The explicit required marker (`Field(...)`).
    pub fn required() -> Self {
        Self {
            default: DefaultInput::Ellipsis,
            ..Self::default()
        }
    }

    /// Builds from an open keyword map, as found in dataclass metadata and declaration files.
    ///
    /// Known keys are consumed with `serde`; legacy keys land in [`LegacyOptions`] and anything
    /// left over becomes [`LegacyOptions::extra`]. `null` values count as unset.
    pub fn from_kwargs(default: impl Into<DefaultInput>, mut kwargs: Map<String, Value>) -> ConfigResult<Self> {
        if kwargs.contains_key("annotation") {
            return Err(ConfigurationError::AnnotationNotPermitted);
        }

        let default_factory = take_option::<String>(&mut kwargs, "default_factory")?
            .map(|name| DefaultFactory::builtin(&name))
            .transpose()?;
        let validation_alias = match kwargs.remove("validation_alias") {
            None | Some(Value::Null) => None,
            Some(value) => Some(ValidationAlias::from_json(&value)?),
        };

        let params = FieldParams {
            annotation: None,
            default: DefaultInput::Undefined,
            default_factory,
            alias: take_option(&mut kwargs, "alias")?,
            alias_priority: take_option(&mut kwargs, "alias_priority")?,
            validation_alias,
            serialization_alias: take_option(&mut kwargs, "serialization_alias")?,
            title: take_option(&mut kwargs, "title")?,
            description: take_option(&mut kwargs, "description")?,
            examples: take_option(&mut kwargs, "examples")?,
            exclude: take_option(&mut kwargs, "exclude")?,
            include: take_option(&mut kwargs, "include")?,
            discriminator: take_option(&mut kwargs, "discriminator")?,
            json_schema_extra: take_option(&mut kwargs, "json_schema_extra")?,
            frozen: take_option(&mut kwargs, "frozen")?,
            is_final: take_option(&mut kwargs, "final")?,
            validate_default: take_option(&mut kwargs, "validate_default")?,
            repr: take_option(&mut kwargs, "repr")?,
            init_var: take_option(&mut kwargs, "init_var")?,
            kw_only: take_option(&mut kwargs, "kw_only")?,
            constraints: ConstraintKeywords::take_from_map(&mut kwargs)?,
        };

        let legacy = LegacyOptions {
            const_value: kwargs.remove("const").filter(|value| !value.is_null()),
            min_items: take_option(&mut kwargs, "min_items")?,
            max_items: take_option(&mut kwargs, "max_items")?,
            unique_items: take_option(&mut kwargs, "unique_items")?,
            allow_mutation: take_option(&mut kwargs, "allow_mutation")?,
            regex: take_option(&mut kwargs, "regex")?,
            extra: kwargs,
        };

        Ok(Self {
            default: default.into(),
            params,
            legacy,
        })
    }

    pub fn default_factory(mut self, factory: DefaultFactory) -> Self {
        self.params.default_factory = Some(factory);
        self
    }

    pub fn alias_priority(mut self, priority: i32) -> Self {
        self.params.alias_priority = Some(priority);
        self
    }

    pub fn validation_alias(mut self, alias: impl Into<ValidationAlias>) -> Self {
        self.params.validation_alias = Some(alias.into());
        self
    }

    pub fn examples(mut self, examples: Vec<Value>) -> Self {
        self.params.examples = Some(examples);
        self
    }

    pub fn json_schema_extra(mut self, extra: Map<String, Value>) -> Self {
        self.params.json_schema_extra = Some(extra);
        self
    }

    pub fn repr(mut self, repr: bool) -> Self {
        self.params.repr = Some(repr);
        self
    }

    string_options!(alias, serialization_alias, title, description, discriminator);
    flag_options!(exclude, include, frozen, validate_default, init_var, kw_only);

    /// Marks the field as non-reassignable, like a `Final[...]` annotation.
    pub fn is_final(mut self, value: bool) -> Self {
        self.params.is_final = Some(value);
        self
    }
    bound_constraints!(gt, ge, lt, le, multiple_of);

    pub fn strict(mut self, strict: bool) -> Self {
        self.params.constraints.strict = Some(strict);
        self
    }

    pub fn min_length(mut self, len: usize) -> Self {
        self.params.constraints.min_length = Some(len);
        self
    }

    pub fn max_length(mut self, len: usize) -> Self {
        self.params.constraints.max_length = Some(len);
        self
    }

    pub fn pattern(mut self, pattern: impl Into<String>) -> Self {
        self.params.constraints.pattern = Some(pattern.into());
        self
    }

    pub fn allow_inf_nan(mut self, allow: bool) -> Self {
        self.params.constraints.allow_inf_nan = Some(allow);
        self
    }

    pub fn max_digits(mut self, digits: u32) -> Self {
        self.params.constraints.max_digits = Some(digits);
        self
    }

    pub fn decimal_places(mut self, places: u32) -> Self {
        self.params.constraints.decimal_places = Some(places);
        self
    }

    /// Replaces the legacy options wholesale.
    pub fn legacy(mut self, legacy: LegacyOptions) -> Self {
        self.legacy = legacy;
        self
    }

    /// Adds an unrecognised keyword. It ends up in `json_schema_extra`, with a deprecation warning.
    pub fn extra(mut self, key: impl Into<String>, value: Value) -> Self {
        self.legacy.extra.insert(key.into(), value);
        self
    }

    pub fn build(self) -> ConfigResult<FieldInfo> {
        self.build_with_warnings().map(|(info, _)| info)
    }

    /// Builds the descriptor and returns the deprecations that were encountered on the way.
    ///
    /// Every deprecation is also logged once through `log::warn!` when detected.
    pub fn build_with_warnings(self) -> ConfigResult<(FieldInfo, Vec<DeprecatedOption>)> {
        let Field {
            default,
            mut params,
            legacy,
        } = self;
        let LegacyOptions {
            const_value,
            min_items,
            max_items,
            unique_items,
            allow_mutation,
            regex,
            extra,
        } = legacy;

        let mut warnings = Vec::new();
        let mut warn = |warning: DeprecatedOption| {
            warning.emit();
            warnings.push(warning);
        };

        if const_value.is_some() {
            return Err(ConfigurationError::RemovedOption {
                option: "const",
                hint: "use `Literal` instead",
            });
        }

        if let Some(min_items) = min_items {
            warn(DeprecatedOption::new(
                "min_items",
                "`min_items` is deprecated and will be removed, use `min_length` instead",
            ));
            params.constraints.min_length.get_or_insert(min_items);
        }

        if let Some(max_items) = max_items {
            warn(DeprecatedOption::new(
                "max_items",
                "`max_items` is deprecated and will be removed, use `max_length` instead",
            ));
            params.constraints.max_length.get_or_insert(max_items);
        }

        if unique_items.is_some() {
            return Err(ConfigurationError::RemovedOption {
                option: "unique_items",
                hint: "use `Set` instead",
            });
        }

        if let Some(allow_mutation) = allow_mutation {
            warn(DeprecatedOption::new(
                "allow_mutation",
                "`allow_mutation` is deprecated and will be removed, use `frozen` instead",
            ));
            if !allow_mutation {
                params.frozen = Some(true);
            }
        }

        if regex.is_some() {
            return Err(ConfigurationError::RemovedOption {
                option: "regex",
                hint: "use `pattern` instead",
            });
        }

        if !extra.is_empty() {
            let keys: Vec<&str> = extra.keys().map(String::as_str).collect();
            warn(DeprecatedOption::new(
                "extra",
                format!(
                    "using extra keyword arguments on `Field` is deprecated and will be removed, \
                     use `json_schema_extra` instead (extra keys: {})",
                    keys.join(", ")
                ),
            ));
            if params.json_schema_extra.as_ref().is_none_or(Map::is_empty) {
                params.json_schema_extra = Some(extra);
            }
        }

        if params.serialization_alias.is_none() {
            params.serialization_alias = params.alias.clone();
        }
        if params.validation_alias.is_none() {
            params.validation_alias = params.alias.clone().map(ValidationAlias::Name);
        }

        log::debug!("building field from explicit call");
        let info = FieldInfo::from_field(default, params)?;
        Ok((info, warnings))
    }
}

fn take_option<T: DeserializeOwned>(kwargs: &mut Map<String, Value>, key: &str) -> ConfigResult<Option<T>> {
    match kwargs.remove(key) {
        None | Some(Value::Null) => Ok(None),
        Some(value) => serde_json::from_value(value)
            .map(Some)
            .map_err(|err| ConfigurationError::InvalidOption {
                option: key.to_string(),
                reason: err.to_string(),
            }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alias::AliasPath;
    use crate::constraints::Metadata;
    use serde_json::json;

    fn kwargs(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn alias_fills_the_other_aliases() {
        let info = Field::new().alias("x").build().unwrap();
        assert_eq!(info.validation_alias, Some(ValidationAlias::from("x")));
        assert_eq!(info.serialization_alias.as_deref(), Some("x"));
        assert_eq!(info.alias_priority, Some(2));
    }

    #[test]
    fn explicit_aliases_are_kept() {
        let info = Field::new()
            .alias("x")
            .validation_alias(AliasPath::new("data").then(0))
            .serialization_alias("out")
            .build()
            .unwrap();
        assert_eq!(info.validation_alias, Some(AliasPath::new("data").then(0).into()));
        assert_eq!(info.serialization_alias.as_deref(), Some("out"));
    }

    #[test]
    fn min_items_maps_onto_min_length() {
        let legacy = LegacyOptions {
            min_items: Some(3),
            ..Default::default()
        };
        let (info, warnings) = Field::new().legacy(legacy).build_with_warnings().unwrap();
        assert_eq!(info.metadata, vec![Metadata::MinLen(3)]);
        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0].option, "min_items");
    }

    #[test]
    fn min_length_wins_over_min_items() {
        let legacy = LegacyOptions {
            min_items: Some(3),
            ..Default::default()
        };
        let (info, warnings) = Field::new().min_length(5).legacy(legacy).build_with_warnings().unwrap();
        assert_eq!(info.metadata, vec![Metadata::MinLen(5)]);
        assert_eq!(warnings.len(), 1);
    }

    #[test]
    fn allow_mutation_false_freezes() {
        let info = Field::from_kwargs(DefaultInput::Undefined, kwargs(json!({"allow_mutation": false})))
            .unwrap()
            .build()
            .unwrap();
        assert_eq!(info.frozen, Some(true));

        let info = Field::from_kwargs(DefaultInput::Undefined, kwargs(json!({"allow_mutation": true})))
            .unwrap()
            .build()
            .unwrap();
        assert_eq!(info.frozen, None);
    }

    #[test]
    fn removed_options_are_fatal() {
        for (key, value) in [("const", json!(1)), ("unique_items", json!(true)), ("regex", json!("x"))] {
            let mut map = Map::new();
            map.insert(key.to_string(), value);
            let err = Field::from_kwargs(DefaultInput::Undefined, map).unwrap().build().unwrap_err();
            assert!(
                matches!(err, ConfigurationError::RemovedOption { option, .. } if option == key),
                "{key}: {err}"
            );
        }
    }

    #[test]
    fn unknown_keys_fold_into_schema_extra() {
        let (info, warnings) = Field::from_kwargs(json!(1), kwargs(json!({"color": "red"})))
            .unwrap()
            .build_with_warnings()
            .unwrap();
        assert_eq!(info.json_schema_extra, Some(kwargs(json!({"color": "red"}))));
        assert_eq!(info.default, Some(json!(1)));
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].message.contains("color"));
    }

    #[test]
    fn explicit_schema_extra_is_not_overwritten() {
        let (info, warnings) = Field::new()
            .json_schema_extra(kwargs(json!({"kept": true})))
            .extra("color", json!("red"))
            .build_with_warnings()
            .unwrap();
        assert_eq!(info.json_schema_extra, Some(kwargs(json!({"kept": true}))));
        assert_eq!(warnings.len(), 1);
    }

    #[test]
    fn kwargs_reject_annotation_and_bad_aliases() {
        let err = Field::from_kwargs(DefaultInput::Undefined, kwargs(json!({"annotation": "int"}))).unwrap_err();
        assert_eq!(err, ConfigurationError::AnnotationNotPermitted);

        let err = Field::from_kwargs(DefaultInput::Undefined, kwargs(json!({"validation_alias": 3}))).unwrap_err();
        assert_eq!(
            err,
            ConfigurationError::InvalidAliasType {
                found: "number".to_string()
            }
        );
    }

    #[test]
    fn kwargs_resolve_named_factories() {
        let info = Field::from_kwargs(DefaultInput::Undefined, kwargs(json!({"default_factory": "list"})))
            .unwrap()
            .build()
            .unwrap();
        assert!(!info.is_required());
        assert_eq!(info.get_default(true), Some(json!([])));

        let err = Field::from_kwargs(DefaultInput::Undefined, kwargs(json!({"default_factory": "today"}))).unwrap_err();
        assert_eq!(err.code(), "unknown-factory");
    }

    #[test]
    fn final_is_a_regular_option() {
        let (info, warnings) = Field::from_kwargs(DefaultInput::Undefined, kwargs(json!({"final": true})))
            .unwrap()
            .build_with_warnings()
            .unwrap();
        assert_eq!(info.is_final, Some(true));
        assert_eq!(info.json_schema_extra, None);
        assert!(warnings.is_empty());

        assert_eq!(Field::new().is_final(true).build().unwrap().is_final, Some(true));
    }

    #[test]
    fn empty_schema_extra_still_takes_extras() {
        let info = Field::new()
            .json_schema_extra(Map::new())
            .extra("color", json!("red"))
            .build()
            .unwrap();
        assert_eq!(info.json_schema_extra, Some(kwargs(json!({"color": "red"}))));
    }

    #[test]
    fn required_marker_means_no_default() {
        let info = Field::required().build().unwrap();
        assert!(info.is_required());
        let info = Field::with_default(json!("x")).build().unwrap();
        assert_eq!(info.default, Some(json!("x")));
    }
}
