use fieldspec::{ConfigurationError, DataclassField, DefaultInput, Field, FieldInfo, LegacyOptions, Metadata, TypeExpr};
use serde_json::{Map, Value, json};

fn kwargs(value: Value) -> Map<String, Value> {
    value.as_object().cloned().unwrap()
}

fn build(value: Value) -> Result<(FieldInfo, Vec<fieldspec::DeprecatedOption>), ConfigurationError> {
    Field::from_kwargs(DefaultInput::Undefined, kwargs(value))?.build_with_warnings()
}

#[test]
fn min_items_without_min_length() {
    let (info, warnings) = build(json!({"min_items": 3})).unwrap();
    assert_eq!(info.metadata, vec![Metadata::MinLen(3)]);
    assert_eq!(warnings.len(), 1);
}

#[test]
fn min_items_does_not_override_min_length() {
    let (info, warnings) = build(json!({"min_items": 3, "min_length": 5})).unwrap();
    assert_eq!(info.metadata, vec![Metadata::MinLen(5)]);
    assert_eq!(warnings.len(), 1);
}

#[test]
fn max_items_maps_onto_max_length() {
    let (info, warnings) = build(json!({"max_items": 9})).unwrap();
    assert_eq!(info.metadata, vec![Metadata::MaxLen(9)]);
    assert_eq!(warnings[0].option, "max_items");
}

#[test]
fn removed_options_fail() {
    let err = build(json!({"const": 1})).unwrap_err();
    assert!(matches!(err, ConfigurationError::RemovedOption { option: "const", .. }));

    let err = build(json!({"regex": "x"})).unwrap_err();
    assert!(matches!(err, ConfigurationError::RemovedOption { option: "regex", .. }));
    assert_eq!(err.to_string(), "`regex` is removed, use `pattern` instead");

    let err = build(json!({"unique_items": true})).unwrap_err();
    assert!(matches!(err, ConfigurationError::RemovedOption { option: "unique_items", .. }));
    assert_eq!(err.code(), "removed-kwargs");
}

#[test]
fn removed_options_fail_through_typed_legacy_struct() {
    let legacy = LegacyOptions {
        const_value: Some(json!("fixed")),
        ..Default::default()
    };
    let err = Field::new().legacy(legacy).build().unwrap_err();
    assert!(matches!(err, ConfigurationError::RemovedOption { option: "const", .. }));
}

#[test]
fn null_legacy_values_are_ignored() {
    let (info, warnings) = build(json!({"const": null, "regex": null, "min_items": null})).unwrap();
    assert!(warnings.is_empty());
    assert!(info.metadata.is_empty());
    assert!(info.json_schema_extra.is_none());
}

#[test]
fn allow_mutation_false_sets_frozen() {
    let (info, warnings) = build(json!({"allow_mutation": false})).unwrap();
    assert_eq!(info.frozen, Some(true));
    assert_eq!(warnings.len(), 1);
    assert_eq!(warnings[0].option, "allow_mutation");
}

#[test]
fn extras_fold_into_json_schema_extra() {
    let (info, warnings) = build(json!({"example_value": 7, "ui": {"widget": "slider"}})).unwrap();
    assert_eq!(
        info.json_schema_extra,
        Some(kwargs(json!({"example_value": 7, "ui": {"widget": "slider"}})))
    );
    assert_eq!(warnings.len(), 1);
    assert_eq!(warnings[0].option, "extra");
}

#[test]
fn invalid_validation_alias_is_rejected() {
    for value in [json!(1), json!(false), json!({"name": "x"})] {
        let err = build(json!({ "validation_alias": value })).unwrap_err();
        assert_eq!(err.code(), "invalid-alias-type");
    }
}

#[test]
fn validation_alias_shapes_are_accepted() {
    let (info, _) = build(json!({"validation_alias": {"choices": ["a", ["b", 0]]}})).unwrap();
    assert_eq!(
        info.validation_alias.map(|alias| alias.to_string()).as_deref(),
        Some(r#"AliasChoices(["a", AliasPath(["b", 0])])"#)
    );
    assert_eq!(info.alias_priority, Some(2));
    assert_eq!(info.serialization_alias, None);
}

#[test]
fn wrong_option_shape_is_invalid_option() {
    let err = build(json!({"frozen": "yes"})).unwrap_err();
    assert!(matches!(err, ConfigurationError::InvalidOption { ref option, .. } if option == "frozen"));
}

#[test]
fn dataclass_metadata_goes_through_the_shim() {
    let dc_field = DataclassField::new().metadata("max_items", json!(2)).metadata("unique_items", json!(true));
    let err = FieldInfo::from_annotated_attribute(TypeExpr::named("list"), dc_field).unwrap_err();
    assert!(matches!(err, ConfigurationError::RemovedOption { option: "unique_items", .. }));

    let dc_field = DataclassField::new().metadata("max_items", json!(2));
    let info = FieldInfo::from_annotated_attribute(TypeExpr::named("list"), dc_field).unwrap();
    assert_eq!(info.metadata, vec![Metadata::MaxLen(2)]);
}
