//! Resource - Representing resources and their state

use std::collections::HashMap;

/// Unique identifier for a resource
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ResourceId {
    /// Resource type (e.g., "sbercloud_networking_secgroup")
    pub resource_type: String,
    /// Resource name (identifier given by the caller)
    pub name: String,
}

impl ResourceId {
    pub fn new(resource_type: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            resource_type: resource_type.into(),
            name: name.into(),
        }
    }
}

impl std::fmt::Display for ResourceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}", self.resource_type, self.name)
    }
}

/// Attribute value of a resource
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    String(String),
    Int(i64),
    Bool(bool),
    List(Vec<Value>),
    Map(HashMap<String, Value>),
}

impl Value {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s.as_str()),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Int(n)
    }
}

/// Desired state declared by the caller
#[derive(Debug, Clone, PartialEq)]
pub struct Resource {
    pub id: ResourceId,
    pub attributes: HashMap<String, Value>,
}

impl Resource {
    pub fn new(resource_type: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: ResourceId::new(resource_type, name),
            attributes: HashMap::new(),
        }
    }

    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    /// Get a string attribute value
    pub fn get_string(&self, key: &str) -> Option<&str> {
        self.attributes.get(key).and_then(Value::as_str)
    }

    /// Get a boolean attribute value
    pub fn get_bool(&self, key: &str) -> Option<bool> {
        self.attributes.get(key).and_then(Value::as_bool)
    }

    /// Get a boolean attribute with a default value
    pub fn get_bool_or(&self, key: &str, default: bool) -> bool {
        self.get_bool(key).unwrap_or(default)
    }
}

/// Current state fetched from actual infrastructure
#[derive(Debug, Clone, PartialEq)]
pub struct State {
    pub id: ResourceId,
    /// Remote identifier assigned by the cloud (e.g., a security group UUID)
    pub identifier: Option<String>,
    pub attributes: HashMap<String, Value>,
    /// Whether this state exists
    pub exists: bool,
}

impl State {
    pub fn not_found(id: ResourceId) -> Self {
        Self {
            id,
            identifier: None,
            attributes: HashMap::new(),
            exists: false,
        }
    }

    pub fn existing(id: ResourceId, attributes: HashMap<String, Value>) -> Self {
        Self {
            id,
            identifier: None,
            attributes,
            exists: true,
        }
    }

    pub fn with_identifier(mut self, identifier: impl Into<String>) -> Self {
        self.identifier = Some(identifier.into());
        self
    }

    pub fn get_string(&self, key: &str) -> Option<&str> {
        self.attributes.get(key).and_then(Value::as_str)
    }
}

/// Resolution of an attribute that is both optional and computed
///
/// `Explicit` always wins over `Default`, which comes from provider-level
/// configuration. `Unset` lets the remote side decide.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Setting<T> {
    Unset,
    Default(T),
    Explicit(T),
}

impl<T> Setting<T> {
    pub fn resolve(explicit: Option<T>, default: Option<T>) -> Self {
        match (explicit, default) {
            (Some(v), _) => Setting::Explicit(v),
            (None, Some(v)) => Setting::Default(v),
            (None, None) => Setting::Unset,
        }
    }

    pub fn into_value(self) -> Option<T> {
        match self {
            Setting::Unset => None,
            Setting::Default(v) | Setting::Explicit(v) => Some(v),
        }
    }
}

impl Setting<String> {
    /// Resolve a string setting, treating empty strings as absent
    pub fn resolve_str(explicit: Option<&str>, default: Option<&str>) -> Self {
        let non_empty = |s: &str| (!s.is_empty()).then(|| s.to_string());
        Self::resolve(explicit.and_then(non_empty), default.and_then(non_empty))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explicit_setting_wins_over_default() {
        let s = Setting::resolve_str(Some("ep-1"), Some("ep-0"));
        assert_eq!(s, Setting::Explicit("ep-1".to_string()));
    }

    #[test]
    fn empty_explicit_falls_back_to_default() {
        let s = Setting::resolve_str(Some(""), Some("0"));
        assert_eq!(s, Setting::Default("0".to_string()));
    }

    #[test]
    fn nothing_configured_is_unset() {
        let s = Setting::<String>::resolve_str(None, None);
        assert_eq!(s, Setting::Unset);
        assert_eq!(s.into_value(), None);
    }

    #[test]
    fn resource_accessors() {
        let r = Resource::new("secgroup", "web")
            .with_attribute("name", "web")
            .with_attribute("delete_default_rules", true);
        assert_eq!(r.get_string("name"), Some("web"));
        assert!(r.get_bool_or("delete_default_rules", false));
        assert!(!r.get_bool_or("missing", false));
        assert_eq!(r.id.to_string(), "secgroup.web");
    }
}
