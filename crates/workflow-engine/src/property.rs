//! # Properties and Configuration
//!
//! Handlers declare their settings as typed, named properties. A
//! `Configuration` is the ordered set of those properties.
//!
//! ## Invariants
//!
//! - Property names are unique within a configuration.
//! - `set_property` rejects unknown names and values whose type does not
//!   match the declared kind (an integer is accepted for a float property).
//! - `validate` fails while any required property is unset.
//!
//! `Configuration` is a shared handle: clones see the same properties, so a
//! caller can keep the handle returned by `Handler::configuration` and set
//! values after the handler has been moved into a processor.

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

/// Errors from configuration operations.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum PropertyError {
    #[error("No such property: {0}")]
    NoSuchProperty(String),

    #[error("Wrong property type for {name}: expected {expected}, found {found}")]
    WrongPropertyType {
        name: String,
        expected: PropertyKind,
        found: PropertyKind,
    },

    #[error("Property {0} is already declared")]
    DuplicateProperty(String),

    #[error("Missing required properties: {}", .0.join(", "))]
    MissingRequired(Vec<String>),

    #[error("Invalid value for {name}: {reason}")]
    InvalidValue { name: String, reason: String },
}

/// Declared type of a property.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PropertyKind {
    Bool,
    Int,
    Float,
    String,
    StringMap,
    StringList,
}

impl fmt::Display for PropertyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Bool => "bool",
            Self::Int => "int",
            Self::Float => "float",
            Self::String => "string",
            Self::StringMap => "map[string]string",
            Self::StringList => "[]string",
        };
        f.write_str(name)
    }
}

/// A property value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PropertyValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    StringMap(HashMap<String, String>),
    StringList(Vec<String>),
}

impl PropertyValue {
    /// The kind this value belongs to.
    #[must_use]
    pub fn kind(&self) -> PropertyKind {
        match self {
            Self::Bool(_) => PropertyKind::Bool,
            Self::Int(_) => PropertyKind::Int,
            Self::Float(_) => PropertyKind::Float,
            Self::String(_) => PropertyKind::String,
            Self::StringMap(_) => PropertyKind::StringMap,
            Self::StringList(_) => PropertyKind::StringList,
        }
    }

    /// Coerce into `kind`, or `None` if the types are incompatible.
    fn coerce(self, kind: PropertyKind) -> Option<Self> {
        match (self, kind) {
            (v, k) if v.kind() == k => Some(v),
            (Self::Int(i), PropertyKind::Float) => Some(Self::Float(i as f64)),
            _ => None,
        }
    }

    /// Convert a JSON value into a property of `kind`.
    fn from_json(value: &serde_json::Value, kind: PropertyKind) -> Option<Self> {
        use serde_json::Value;
        match (value, kind) {
            (Value::Bool(b), PropertyKind::Bool) => Some(Self::Bool(*b)),
            (Value::Number(n), PropertyKind::Int) => n.as_i64().map(Self::Int),
            (Value::Number(n), PropertyKind::Float) => n.as_f64().map(Self::Float),
            (Value::String(s), PropertyKind::String) => Some(Self::String(s.clone())),
            (Value::Object(map), PropertyKind::StringMap) => map
                .iter()
                .map(|(k, v)| v.as_str().map(|s| (k.clone(), s.to_string())))
                .collect::<Option<HashMap<_, _>>>()
                .map(Self::StringMap),
            (Value::Array(items), PropertyKind::StringList) => items
                .iter()
                .map(|v| v.as_str().map(str::to_string))
                .collect::<Option<Vec<_>>>()
                .map(Self::StringList),
            _ => None,
        }
    }

    fn json_kind(value: &serde_json::Value) -> PropertyKind {
        use serde_json::Value;
        match value {
            Value::Bool(_) => PropertyKind::Bool,
            Value::Number(n) if n.is_i64() => PropertyKind::Int,
            Value::Number(_) => PropertyKind::Float,
            Value::Object(_) => PropertyKind::StringMap,
            Value::Array(_) => PropertyKind::StringList,
            Value::String(_) | Value::Null => PropertyKind::String,
        }
    }
}

impl From<bool> for PropertyValue {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<i64> for PropertyValue {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<i32> for PropertyValue {
    fn from(v: i32) -> Self {
        Self::Int(i64::from(v))
    }
}

impl From<u32> for PropertyValue {
    fn from(v: u32) -> Self {
        Self::Int(i64::from(v))
    }
}

impl From<f64> for PropertyValue {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl From<&str> for PropertyValue {
    fn from(v: &str) -> Self {
        Self::String(v.to_string())
    }
}

impl From<String> for PropertyValue {
    fn from(v: String) -> Self {
        Self::String(v)
    }
}

impl From<HashMap<String, String>> for PropertyValue {
    fn from(v: HashMap<String, String>) -> Self {
        Self::StringMap(v)
    }
}

impl From<Vec<String>> for PropertyValue {
    fn from(v: Vec<String>) -> Self {
        Self::StringList(v)
    }
}

/// A named, typed setting.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Property {
    pub name: String,
    pub description: String,
    pub kind: PropertyKind,
    pub required: bool,
    pub value: Option<PropertyValue>,
}

/// Shared, ordered set of properties.
#[derive(Clone, Default)]
pub struct Configuration {
    properties: Arc<RwLock<Vec<Property>>>,
}

impl Configuration {
    /// Create an empty configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare an unset property.
    pub fn add_property(
        &self,
        name: &str,
        description: &str,
        kind: PropertyKind,
        required: bool,
    ) -> Result<(), PropertyError> {
        let mut properties = self.properties.write();
        if properties.iter().any(|p| p.name == name) {
            return Err(PropertyError::DuplicateProperty(name.to_string()));
        }
        properties.push(Property {
            name: name.to_string(),
            description: description.to_string(),
            kind,
            required,
            value: None,
        });
        Ok(())
    }

    /// Declare a property with a default value; its kind is the value's kind.
    pub fn add_property_with_default(
        &self,
        name: &str,
        description: &str,
        value: impl Into<PropertyValue>,
        required: bool,
    ) -> Result<(), PropertyError> {
        let value = value.into();
        self.add_property(name, description, value.kind(), required)?;
        self.set_property(name, value)
    }

    /// Set a declared property.
    pub fn set_property(
        &self,
        name: &str,
        value: impl Into<PropertyValue>,
    ) -> Result<(), PropertyError> {
        let value = value.into();
        let mut properties = self.properties.write();
        let property = properties
            .iter_mut()
            .find(|p| p.name == name)
            .ok_or_else(|| PropertyError::NoSuchProperty(name.to_string()))?;

        let found = value.kind();
        let value = value
            .coerce(property.kind)
            .ok_or_else(|| PropertyError::WrongPropertyType {
                name: name.to_string(),
                expected: property.kind,
                found,
            })?;
        property.value = Some(value);
        Ok(())
    }

    /// Set several properties from a JSON object, with the same checks as
    /// `set_property`. Stops at the first error.
    pub fn apply_json(&self, values: &serde_json::Value) -> Result<(), PropertyError> {
        let object = values.as_object().ok_or_else(|| PropertyError::InvalidValue {
            name: "<configuration>".to_string(),
            reason: "expected a JSON object".to_string(),
        })?;

        for (name, raw) in object {
            let kind = self
                .kind_of(name)
                .ok_or_else(|| PropertyError::NoSuchProperty(name.clone()))?;
            let value = PropertyValue::from_json(raw, kind).ok_or_else(|| {
                PropertyError::WrongPropertyType {
                    name: name.clone(),
                    expected: kind,
                    found: PropertyValue::json_kind(raw),
                }
            })?;
            self.set_property(name, value)?;
        }
        Ok(())
    }

    /// Check that every required property has a value.
    pub fn validate(&self) -> Result<(), PropertyError> {
        let missing: Vec<String> = self
            .properties
            .read()
            .iter()
            .filter(|p| p.required && p.value.is_none())
            .map(|p| p.name.clone())
            .collect();

        if missing.is_empty() {
            Ok(())
        } else {
            Err(PropertyError::MissingRequired(missing))
        }
    }

    /// Copy of a property.
    #[must_use]
    pub fn property(&self, name: &str) -> Option<Property> {
        self.properties.read().iter().find(|p| p.name == name).cloned()
    }

    /// Current value of a property.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<PropertyValue> {
        self.properties
            .read()
            .iter()
            .find(|p| p.name == name)
            .and_then(|p| p.value.clone())
    }

    fn kind_of(&self, name: &str) -> Option<PropertyKind> {
        self.properties
            .read()
            .iter()
            .find(|p| p.name == name)
            .map(|p| p.kind)
    }

    pub fn get_bool(&self, name: &str) -> Option<bool> {
        match self.get(name)? {
            PropertyValue::Bool(v) => Some(v),
            _ => None,
        }
    }

    pub fn get_int(&self, name: &str) -> Option<i64> {
        match self.get(name)? {
            PropertyValue::Int(v) => Some(v),
            _ => None,
        }
    }

    pub fn get_float(&self, name: &str) -> Option<f64> {
        match self.get(name)? {
            PropertyValue::Float(v) => Some(v),
            _ => None,
        }
    }

    pub fn get_string(&self, name: &str) -> Option<String> {
        match self.get(name)? {
            PropertyValue::String(v) => Some(v),
            _ => None,
        }
    }

    pub fn get_string_map(&self, name: &str) -> Option<HashMap<String, String>> {
        match self.get(name)? {
            PropertyValue::StringMap(v) => Some(v),
            _ => None,
        }
    }

    pub fn get_string_list(&self, name: &str) -> Option<Vec<String>> {
        match self.get(name)? {
            PropertyValue::StringList(v) => Some(v),
            _ => None,
        }
    }

    /// Property names in declaration order.
    #[must_use]
    pub fn names(&self) -> Vec<String> {
        self.properties.read().iter().map(|p| p.name.clone()).collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.properties.read().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.properties.read().is_empty()
    }
}

impl fmt::Debug for Configuration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.properties.read().iter()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn filter_config() -> Configuration {
        let cfg = Configuration::new();
        cfg.add_property("filters", "key to regex", PropertyKind::StringMap, true)
            .unwrap();
        cfg.add_property_with_default("strict", "all filters must match", false, false)
            .unwrap();
        cfg
    }

    #[test]
    fn test_missing_required() {
        let cfg = filter_config();
        assert_eq!(
            cfg.validate(),
            Err(PropertyError::MissingRequired(vec!["filters".to_string()]))
        );

        let filters = HashMap::from([("username".to_string(), "perbol".to_string())]);
        cfg.set_property("filters", filters).unwrap();
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn test_wrong_type() {
        let cfg = filter_config();
        assert_eq!(
            cfg.set_property("strict", 1),
            Err(PropertyError::WrongPropertyType {
                name: "strict".to_string(),
                expected: PropertyKind::Bool,
                found: PropertyKind::Int,
            })
        );
        assert_eq!(cfg.get_bool("strict"), Some(false));
    }

    #[test]
    fn test_no_such_property() {
        let cfg = filter_config();
        assert_eq!(
            cfg.set_property("ConfigThatDoesNotExist", true),
            Err(PropertyError::NoSuchProperty("ConfigThatDoesNotExist".to_string()))
        );
    }

    #[test]
    fn test_duplicate_property() {
        let cfg = filter_config();
        assert_eq!(
            cfg.add_property("strict", "", PropertyKind::Bool, false),
            Err(PropertyError::DuplicateProperty("strict".to_string()))
        );
    }

    #[test]
    fn test_int_coerced_to_float() {
        let cfg = Configuration::new();
        cfg.add_property("ratio", "", PropertyKind::Float, false).unwrap();
        cfg.set_property("ratio", 2).unwrap();
        assert_eq!(cfg.get_float("ratio"), Some(2.0));
    }

    #[test]
    fn test_clones_share_state() {
        let cfg = filter_config();
        let handle = cfg.clone();
        handle.set_property("strict", true).unwrap();
        assert_eq!(cfg.get_bool("strict"), Some(true));
    }

    #[test]
    fn test_apply_json() {
        let cfg = filter_config();
        cfg.apply_json(&json!({"filters": {"hello": "wor.*"}, "strict": true}))
            .unwrap();
        assert_eq!(cfg.get_string_map("filters").unwrap()["hello"], "wor.*");
        assert_eq!(cfg.get_bool("strict"), Some(true));

        assert!(matches!(
            cfg.apply_json(&json!({"strict": "yes"})),
            Err(PropertyError::WrongPropertyType { .. })
        ));
        assert!(matches!(
            cfg.apply_json(&json!({"unknown": 1})),
            Err(PropertyError::NoSuchProperty(_))
        ));
        assert!(matches!(
            cfg.apply_json(&json!([1, 2])),
            Err(PropertyError::InvalidValue { .. })
        ));
    }

    #[test]
    fn test_declaration_order() {
        let cfg = filter_config();
        assert_eq!(cfg.names(), vec!["filters", "strict"]);
        assert_eq!(cfg.len(), 2);
        assert!(cfg.property("filters").unwrap().required);
    }
}
