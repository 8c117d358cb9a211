//! Private model attributes: never validated, never part of the schema.

use std::fmt;
use std::sync::Arc;

use serde_json::Value;

use crate::errors::{ConfigResult, ConfigurationError};
use crate::value::DefaultFactory;

/// Capability of a default value that wants to know which owner attribute it was assigned to.
pub trait OwnerAttachable: Send + Sync {
    fn attach_to_owner(&self, owner: &str, name: &str);
}

/// A value usable as a private attribute default.
pub trait PrivateValue: fmt::Debug + Send + Sync {
    /// Snapshot of the value; `get_default` hands out a fresh copy every call.
    fn to_value(&self) -> Value;

    fn as_owner_attachable(&self) -> Option<&dyn OwnerAttachable> {
        None
    }
}

impl PrivateValue for Value {
    fn to_value(&self) -> Value {
        self.clone()
    }
}

/// Descriptor of a private attribute.
#[derive(Debug, Clone, Default)]
pub struct ModelPrivateAttr {
    pub default: Option<Arc<dyn PrivateValue>>,
    pub default_factory: Option<DefaultFactory>,
}

impl ModelPrivateAttr {
    /// Called when the owning type registers this attribute under `name`.
    ///
    /// The call is forwarded to the default when it is [`OwnerAttachable`].
    pub fn set_name(&self, owner: &str, name: &str) {
        let Some(default) = &self.default else {
            return;
        };
        if let Some(hook) = default.as_owner_attachable() {
            log::trace!("forwarding owner attach for `{owner}.{name}`");
            hook.attach_to_owner(owner, name);
        }
    }

    /// A copy of the default, or the factory's result when a factory is set.
    pub fn get_default(&self) -> Option<Value> {
        match &self.default_factory {
            Some(factory) => Some(factory.call()),
            None => self.default.as_ref().map(|default| default.to_value()),
        }
    }
}

impl PartialEq for ModelPrivateAttr {
    fn eq(&self, other: &Self) -> bool {
        let defaults_equal = match (&self.default, &other.default) {
            (None, None) => true,
            (Some(a), Some(b)) => Arc::ptr_eq(a, b) || a.to_value() == b.to_value(),
            _ => false,
        };
        defaults_equal && self.default_factory == other.default_factory
    }
}

/// Builder for [`ModelPrivateAttr`].
#[derive(Debug, Clone, Default)]
#[must_use]
pub struct PrivateAttr {
    default: Option<Arc<dyn PrivateValue>>,
    default_factory: Option<DefaultFactory>,
}

impl PrivateAttr {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn default_value(mut self, value: impl PrivateValue + 'static) -> Self {
        self.default = Some(Arc::new(value));
        self
    }

    pub fn default_factory(mut self, factory: DefaultFactory) -> Self {
        self.default_factory = Some(factory);
        self
    }

    pub fn build(self) -> ConfigResult<ModelPrivateAttr> {
        if self.default.is_some() && self.default_factory.is_some() {
            return Err(ConfigurationError::ConflictingDefault);
        }

        Ok(ModelPrivateAttr {
            default: self.default,
            default_factory: self.default_factory,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::Mutex;

    #[derive(Debug, Default)]
    struct Recorder {
        attached: Mutex<Vec<String>>,
    }

    impl OwnerAttachable for Recorder {
        fn attach_to_owner(&self, owner: &str, name: &str) {
            self.attached.lock().unwrap().push(format!("{owner}.{name}"));
        }
    }

    impl PrivateValue for Recorder {
        fn to_value(&self) -> Value {
            json!(self.attached.lock().unwrap().clone())
        }

        fn as_owner_attachable(&self) -> Option<&dyn OwnerAttachable> {
            Some(self)
        }
    }

    #[test]
    fn conflicting_default_is_rejected() {
        let err = PrivateAttr::new()
            .default_value(json!(1))
            .default_factory(DefaultFactory::builtin("dict").unwrap())
            .build()
            .unwrap_err();
        assert_eq!(err, ConfigurationError::ConflictingDefault);
    }

    #[test]
    fn get_default_copies_or_calls_factory() {
        let attr = PrivateAttr::new().default_value(json!({"a": 1})).build().unwrap();
        assert_eq!(attr.get_default(), Some(json!({"a": 1})));

        let attr = PrivateAttr::new()
            .default_factory(DefaultFactory::builtin("list").unwrap())
            .build()
            .unwrap();
        assert_eq!(attr.get_default(), Some(json!([])));

        assert_eq!(PrivateAttr::new().build().unwrap().get_default(), None);
    }

    #[test]
    fn set_name_forwards_to_attachable_default() {
        let attr = PrivateAttr::new().default_value(Recorder::default()).build().unwrap();
        attr.set_name("User", "_cache");
        assert_eq!(attr.get_default(), Some(json!(["User._cache"])));
    }

    #[test]
    fn set_name_ignores_plain_values() {
        let attr = PrivateAttr::new().default_value(json!(3)).build().unwrap();
        attr.set_name("User", "_count");
        assert_eq!(attr.get_default(), Some(json!(3)));
    }

    #[test]
    fn equality_compares_values() {
        let a = PrivateAttr::new().default_value(json!(1)).build().unwrap();
        let b = PrivateAttr::new().default_value(json!(1)).build().unwrap();
        let c = PrivateAttr::new().default_value(json!(2)).build().unwrap();
        assert_eq!(a, b);
        assert_ne!(a, c);
    }
}
