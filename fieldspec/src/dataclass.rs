//! Per-attribute declarations from the dataclass convention.
//!
//! A [`DataclassField`] is what a dataclass-style `field(...)` call produces. It is never
//! used as a descriptor directly; [`FieldInfo::from_annotated_attribute`] translates it.

use serde_json::{Map, Value};

use crate::errors::{ConfigResult, DeprecatedOption};
use crate::field::Field;
use crate::fields::FieldInfo;
use crate::value::{DefaultFactory, DefaultInput};

#[derive(Debug, Clone, PartialEq)]
pub struct DataclassField {
    pub default: Option<Value>,
    pub default_factory: Option<DefaultFactory>,
    pub repr: bool,
    pub kw_only: Option<bool>,
    /// Keyword options forwarded to the field builder, e.g. `{"gt": 0, "alias": "n"}`.
    pub metadata: Map<String, Value>,
}

impl Default for DataclassField {
    fn default() -> Self {
        Self {
            default: None,
            default_factory: None,
            repr: true,
            kw_only: None,
            metadata: Map::new(),
        }
    }
}

impl DataclassField {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn default_value(mut self, value: Value) -> Self {
        self.default = Some(value);
        self
    }

    pub fn default_factory(mut self, factory: DefaultFactory) -> Self {
        self.default_factory = Some(factory);
        self
    }

    pub fn repr(mut self, repr: bool) -> Self {
        self.repr = repr;
        self
    }

    pub fn kw_only(mut self, kw_only: bool) -> Self {
        self.kw_only = Some(kw_only);
        self
    }

    pub fn metadata(mut self, key: impl Into<String>, value: Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }
}

impl FieldInfo {
    /// Runs the declaration's metadata through the field builder, so removed options stay
    /// fatal and unknown keys still warn.
    pub(crate) fn from_dataclass_field(dc_field: DataclassField) -> ConfigResult<(Self, Vec<DeprecatedOption>)> {
        let DataclassField {
            default,
            default_factory,
            repr,
            metadata,
            ..
        } = dc_field;

        let mut builder = Field::from_kwargs(DefaultInput::from(default), metadata)?.repr(repr);
        if let Some(factory) = default_factory {
            builder = builder.default_factory(factory);
        }
        builder.build_with_warnings()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constraints::{Bound, Metadata};
    use crate::errors::ConfigurationError;
    use crate::types::TypeExpr;
    use serde_json::json;

    #[test]
    fn translates_default_and_metadata() {
        let dc_field = DataclassField::new()
            .default_value(json!(1))
            .repr(false)
            .kw_only(true)
            .metadata("gt", json!(0))
            .metadata("alias", json!("n"));

        let info = FieldInfo::from_annotated_attribute(TypeExpr::named("int"), dc_field).unwrap();
        assert_eq!(info.default, Some(json!(1)));
        assert!(!info.repr);
        assert_eq!(info.kw_only, Some(true));
        assert_eq!(info.init_var, Some(false));
        assert_eq!(info.alias.as_deref(), Some("n"));
        assert_eq!(info.metadata, vec![Metadata::Gt(Bound::Int(0))]);
    }

    #[test]
    fn init_var_marker_is_unwrapped() {
        let info = FieldInfo::from_annotated_attribute(TypeExpr::InitVar(None), DataclassField::new()).unwrap();
        assert_eq!(info.annotation, Some(TypeExpr::Any));
        assert_eq!(info.init_var, Some(true));
        assert!(info.is_required());

        let info = FieldInfo::from_annotated_attribute(
            TypeExpr::init_var_of(TypeExpr::named("str")),
            DataclassField::new(),
        )
        .unwrap();
        assert_eq!(info.annotation, Some(TypeExpr::named("str")));
    }

    #[test]
    fn conflicting_default_is_rejected() {
        let dc_field = DataclassField::new()
            .default_value(json!([]))
            .default_factory(DefaultFactory::builtin("list").unwrap());
        let err = FieldInfo::from_annotated_attribute(TypeExpr::named("list"), dc_field).unwrap_err();
        assert_eq!(err, ConfigurationError::ConflictingDefault);
    }

    #[test]
    fn metadata_deprecations_are_returned() {
        let dc_field = DataclassField::new()
            .metadata("min_items", json!(1))
            .metadata("color", json!("red"));
        let (info, warnings) =
            FieldInfo::from_annotated_attribute_with_warnings(TypeExpr::named("list"), dc_field).unwrap();
        assert_eq!(info.metadata, vec![Metadata::MinLen(1)]);
        let options: Vec<&str> = warnings.iter().map(|warning| warning.option.as_ref()).collect();
        assert_eq!(options, vec!["min_items", "extra"]);
    }

    #[test]
    fn removed_metadata_keys_are_fatal() {
        let dc_field = DataclassField::new().metadata("regex", json!("^a"));
        let err = FieldInfo::from_annotated_attribute(TypeExpr::named("str"), dc_field).unwrap_err();
        assert!(matches!(err, ConfigurationError::RemovedOption { option: "regex", .. }));
    }
}
