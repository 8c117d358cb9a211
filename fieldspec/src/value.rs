//! Default values and default factories.

use std::borrow::Cow;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use chrono::{SecondsFormat, Utc};
use once_cell::sync::Lazy;
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::errors::{ConfigResult, ConfigurationError};

type FactoryFn = dyn Fn() -> Value + Send + Sync;

/// Zero-argument producer of a default value.
///
/// Construction never calls the factory; it only runs when a caller explicitly asks for a
/// materialised default. Two factories are equal when they share the same closure.
#[derive(Clone)]
pub struct DefaultFactory {
    name: Cow<'static, str>,
    func: Arc<FactoryFn>,
}

impl DefaultFactory {
    pub fn new<F>(name: impl Into<Cow<'static, str>>, func: F) -> Self
    where
        F: Fn() -> Value + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            func: Arc::new(func),
        }
    }

    /// Looks up one of the built-in named factories (`list`, `dict`, `set`, `now`, `uuid4`, `nanoid`).
    pub fn builtin(name: &str) -> ConfigResult<Self> {
        BUILTIN_FACTORIES
            .get(name)
            .cloned()
            .ok_or_else(|| ConfigurationError::UnknownFactory { name: name.to_string() })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn call(&self) -> Value {
        log::trace!("calling default factory `{}`", self.name);
        (self.func)()
    }
}

impl fmt::Debug for DefaultFactory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("DefaultFactory").field(&self.name).finish()
    }
}

impl fmt::Display for DefaultFactory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

impl PartialEq for DefaultFactory {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.func, &other.func)
    }
}

static BUILTIN_FACTORIES: Lazy<HashMap<&'static str, DefaultFactory>> = Lazy::new(|| {
    fn entry<F>(name: &'static str, func: F) -> (&'static str, DefaultFactory)
    where
        F: Fn() -> Value + Send + Sync + 'static,
    {
        (name, DefaultFactory::new(name, func))
    }

    HashMap::from([
        entry("list", || Value::Array(Vec::new())),
        entry("set", || Value::Array(Vec::new())),
        entry("dict", || Value::Object(Map::new())),
        entry("now", || Value::String(Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true))),
        entry("uuid4", || Value::String(Uuid::new_v4().to_string())),
        entry("nanoid", || Value::String(nanoid::nanoid!())),
    ])
});

/// Raw default as written at a declaration site.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum DefaultInput {
    /// Nothing was written.
    #[default]
    Undefined,
    /// The explicit "required" marker (`...`).
    Ellipsis,
    Value(Value),
}

impl DefaultInput {
    /// Normalises to a stored default; both `Undefined` and `Ellipsis` mean "no default".
    pub fn into_value(self) -> Option<Value> {
        match self {
            Self::Value(value) => Some(value),
            Self::Undefined | Self::Ellipsis => None,
        }
    }
}

impl From<Value> for DefaultInput {
    fn from(value: Value) -> Self {
        Self::Value(value)
    }
}

impl From<Option<Value>> for DefaultInput {
    fn from(value: Option<Value>) -> Self {
        value.map_or(Self::Undefined, Self::Value)
    }
}
