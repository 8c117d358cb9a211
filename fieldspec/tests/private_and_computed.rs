use std::sync::Mutex;

use fieldspec::computed::{AccessorFn, Property, PropertyKind, cleandoc};
use fieldspec::{
    ComputedField, ComputedFieldInfo, ConfigurationError, DefaultFactory, OwnerAttachable, PrivateAttr, PrivateValue,
    TypeExpr, computed_field,
};
use serde_json::{Value, json};

#[derive(Debug, Default)]
struct Registry {
    owners: Mutex<Vec<(String, String)>>,
}

impl OwnerAttachable for Registry {
    fn attach_to_owner(&self, owner: &str, name: &str) {
        self.owners.lock().unwrap().push((owner.to_string(), name.to_string()));
    }
}

impl PrivateValue for Registry {
    fn to_value(&self) -> Value {
        json!(self.owners.lock().unwrap().len())
    }

    fn as_owner_attachable(&self) -> Option<&dyn OwnerAttachable> {
        Some(self)
    }
}

#[test]
fn private_attr_rejects_both_defaults() {
    let err = PrivateAttr::new()
        .default_value(json!([]))
        .default_factory(DefaultFactory::builtin("list").unwrap())
        .build()
        .unwrap_err();
    assert_eq!(err, ConfigurationError::ConflictingDefault);
}

#[test]
fn private_attr_forwards_owner_hook() {
    let attr = PrivateAttr::new().default_value(Registry::default()).build().unwrap();
    attr.set_name("Session", "_registry");
    attr.set_name("Session", "_registry");
    assert_eq!(attr.get_default(), Some(json!(2)));
}

#[test]
fn private_attr_without_default_ignores_hook() {
    let attr = PrivateAttr::new()
        .default_factory(DefaultFactory::builtin("uuid4").unwrap())
        .build()
        .unwrap();
    attr.set_name("Session", "_id");
    let first = attr.get_default().unwrap();
    let second = attr.get_default().unwrap();
    assert_ne!(first, second);
}

#[test]
fn computed_field_needs_a_return_type() {
    let accessor = AccessorFn::new("area", |shape| json!(shape["w"].as_f64().unwrap_or(0.0) * 2.0));
    let err = computed_field(accessor.clone()).unwrap_err();
    assert!(matches!(err, ConfigurationError::MissingReturnType { ref name } if name == "area"));

    let info = ComputedField::new()
        .return_type(TypeExpr::named("float"))
        .apply(accessor)
        .unwrap();
    assert_eq!(info.return_type, TypeExpr::named("float"));
    assert_eq!(info.wrapped_property.get(&json!({"w": 2.5})), json!(5.0));
}

#[test]
fn decorator_form_matches_direct_form() {
    let accessor = AccessorFn::new("total", |_| json!(10)).returns(TypeExpr::named("int"));

    let direct = computed_field(accessor.clone()).unwrap();
    let decorator = ComputedField::new().into_decorator();
    let decorated = decorator(accessor.into()).unwrap();
    assert_eq!(direct, decorated);
    assert_eq!(ComputedFieldInfo::DECORATOR_REPR, "@computed_field");
}

#[test]
fn properties_are_kept_and_functions_wrapped() {
    let accessor = AccessorFn::new("slug", |_| json!("a-b")).returns(TypeExpr::named("str"));

    let wrapped = computed_field(accessor.clone()).unwrap();
    assert_eq!(wrapped.wrapped_property.kind, PropertyKind::Property);

    let cached = computed_field(Property::cached(accessor)).unwrap();
    assert_eq!(cached.wrapped_property.kind, PropertyKind::CachedProperty);
}

#[test]
fn computed_description_comes_from_doc() {
    let accessor = AccessorFn::new("slug", |_| json!("a-b"))
        .returns(TypeExpr::named("str"))
        .doc("URL-safe name.\n\n        Lowercase, dash separated.\n    ");
    let info = ComputedField::new().alias("urlSlug").apply(accessor).unwrap();
    assert_eq!(info.description.as_deref(), Some("URL-safe name.\n\nLowercase, dash separated."));
    assert_eq!(info.alias_priority, Some(2));
}

#[test]
fn cleandoc_handles_single_line() {
    assert_eq!(cleandoc("   Just one line.   "), "Just one line.   ");
}
