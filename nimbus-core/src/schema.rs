//! Schema - Define type schemas for resources
//!
//! Providers define schemas for each resource type. The schema carries the
//! attribute types plus the mutability flags the lifecycle relies on
//! (required, optional, computed, force-new, deprecated).

use std::collections::HashMap;
use std::fmt;

use crate::resource::Value;

/// Attribute type
#[derive(Debug, Clone)]
pub enum AttributeType {
    /// String
    String,
    /// Integer
    Int,
    /// Boolean
    Bool,
    /// Enum (list of allowed values)
    Enum(Vec<String>),
    /// Custom type (with validation function)
    Custom {
        name: String,
        base: Box<AttributeType>,
        validate: fn(&Value) -> Result<(), String>,
    },
    /// List
    List(Box<AttributeType>),
    /// Map
    Map(Box<AttributeType>),
    /// Nested object with a fixed set of attributes
    Struct(Vec<AttributeSchema>),
}

impl AttributeType {
    /// Check if a value conforms to this type
    pub fn validate(&self, value: &Value) -> Result<(), TypeError> {
        match (self, value) {
            (AttributeType::String, Value::String(_)) => Ok(()),
            (AttributeType::Int, Value::Int(_)) => Ok(()),
            (AttributeType::Bool, Value::Bool(_)) => Ok(()),

            (AttributeType::Enum(variants), Value::String(s)) => {
                if variants.iter().any(|v| v == s) {
                    Ok(())
                } else {
                    Err(TypeError::InvalidEnumVariant {
                        value: s.clone(),
                        expected: variants.clone(),
                    })
                }
            }

            (AttributeType::Custom { validate, .. }, v) => {
                validate(v).map_err(|msg| TypeError::ValidationFailed { message: msg })
            }

            (AttributeType::List(inner), Value::List(items)) => {
                for (i, item) in items.iter().enumerate() {
                    inner.validate(item).map_err(|e| TypeError::ListItemError {
                        index: i,
                        inner: Box::new(e),
                    })?;
                }
                Ok(())
            }

            (AttributeType::Map(inner), Value::Map(map)) => {
                for (k, v) in map {
                    inner.validate(v).map_err(|e| TypeError::MapValueError {
                        key: k.clone(),
                        inner: Box::new(e),
                    })?;
                }
                Ok(())
            }

            (AttributeType::Struct(fields), Value::Map(map)) => {
                for key in map.keys() {
                    if !fields.iter().any(|f| &f.name == key) {
                        return Err(TypeError::UnknownAttribute { name: key.clone() });
                    }
                }
                for field in fields {
                    if let Some(v) = map.get(&field.name) {
                        field
                            .attr_type
                            .validate(v)
                            .map_err(|e| TypeError::MapValueError {
                                key: field.name.clone(),
                                inner: Box::new(e),
                            })?;
                    }
                }
                Ok(())
            }

            _ => Err(TypeError::TypeMismatch {
                expected: self.type_name(),
                got: value.type_name(),
            }),
        }
    }

    /// Value an unset attribute of this type is equivalent to, if any
    pub fn zero_value(&self) -> Option<Value> {
        match self {
            AttributeType::String => Some(Value::String(String::new())),
            AttributeType::Int => Some(Value::Int(0)),
            AttributeType::Bool => Some(Value::Bool(false)),
            AttributeType::List(_) => Some(Value::List(Vec::new())),
            AttributeType::Map(_) => Some(Value::Map(HashMap::new())),
            AttributeType::Custom { base, .. } => base.zero_value(),
            AttributeType::Enum(_) | AttributeType::Struct(_) => None,
        }
    }

    fn type_name(&self) -> String {
        match self {
            AttributeType::String => "String".to_string(),
            AttributeType::Int => "Int".to_string(),
            AttributeType::Bool => "Bool".to_string(),
            AttributeType::Enum(variants) => format!("Enum({})", variants.join(" | ")),
            AttributeType::Custom { name, .. } => name.clone(),
            AttributeType::List(inner) => format!("List<{}>", inner.type_name()),
            AttributeType::Map(inner) => format!("Map<{}>", inner.type_name()),
            AttributeType::Struct(fields) => {
                let names: Vec<&str> = fields.iter().map(|f| f.name.as_str()).collect();
                format!("Struct{{{}}}", names.join(", "))
            }
        }
    }
}

impl fmt::Display for AttributeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.type_name())
    }
}

/// Type error
#[derive(Debug, Clone, thiserror::Error)]
pub enum TypeError {
    #[error("Type mismatch: expected {expected}, got {got}")]
    TypeMismatch { expected: String, got: String },

    #[error("Invalid enum variant '{value}', expected one of: {}", expected.join(", "))]
    InvalidEnumVariant {
        value: String,
        expected: Vec<String>,
    },

    #[error("Validation failed: {message}")]
    ValidationFailed { message: String },

    #[error("Required attribute '{name}' is missing")]
    MissingRequired { name: String },

    #[error("Unknown attribute '{name}'")]
    UnknownAttribute { name: String },

    #[error("Attribute '{name}' is computed and cannot be set")]
    ComputedOnly { name: String },

    #[error("List item at index {index}: {inner}")]
    ListItemError { index: usize, inner: Box<TypeError> },

    #[error("Map value for key '{key}': {inner}")]
    MapValueError { key: String, inner: Box<TypeError> },

    #[error("Attribute '{name}': {inner}")]
    AttributeError { name: String, inner: Box<TypeError> },
}

impl Value {
    fn type_name(&self) -> String {
        match self {
            Value::String(_) => "String".to_string(),
            Value::Int(_) => "Int".to_string(),
            Value::Bool(_) => "Bool".to_string(),
            Value::List(_) => "List".to_string(),
            Value::Map(_) => "Map".to_string(),
        }
    }
}

/// Attribute schema
#[derive(Debug, Clone)]
pub struct AttributeSchema {
    pub name: String,
    pub attr_type: AttributeType,
    pub required: bool,
    pub optional: bool,
    /// Value may be filled in by the provider when not set
    pub computed: bool,
    /// Changing this attribute replaces the resource
    pub force_new: bool,
    pub deprecated: Option<String>,
    pub description: Option<String>,
}

impl AttributeSchema {
    pub fn new(name: impl Into<String>, attr_type: AttributeType) -> Self {
        Self {
            name: name.into(),
            attr_type,
            required: false,
            optional: false,
            computed: false,
            force_new: false,
            deprecated: None,
            description: None,
        }
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn optional(mut self) -> Self {
        self.optional = true;
        self
    }

    pub fn computed(mut self) -> Self {
        self.computed = true;
        self
    }

    pub fn force_new(mut self) -> Self {
        self.force_new = true;
        self
    }

    pub fn deprecated(mut self, message: impl Into<String>) -> Self {
        self.deprecated = Some(message.into());
        self
    }

    pub fn with_description(mut self, desc: impl Into<String>) -> Self {
        self.description = Some(desc.into());
        self
    }

    /// Computed attributes the caller is not allowed to set
    pub fn is_computed_only(&self) -> bool {
        self.computed && !self.required && !self.optional
    }
}

/// Resource schema
#[derive(Debug, Clone)]
pub struct ResourceSchema {
    pub resource_type: String,
    pub attributes: HashMap<String, AttributeSchema>,
    pub description: Option<String>,
}

impl ResourceSchema {
    pub fn new(resource_type: impl Into<String>) -> Self {
        Self {
            resource_type: resource_type.into(),
            attributes: HashMap::new(),
            description: None,
        }
    }

    pub fn attribute(mut self, schema: AttributeSchema) -> Self {
        self.attributes.insert(schema.name.clone(), schema);
        self
    }

    pub fn with_description(mut self, desc: impl Into<String>) -> Self {
        self.description = Some(desc.into());
        self
    }

    /// Validate desired resource attributes
    pub fn validate(&self, attributes: &HashMap<String, Value>) -> Result<(), Vec<TypeError>> {
        let mut errors = Vec::new();

        for (name, schema) in &self.attributes {
            if schema.required && !attributes.contains_key(name) {
                errors.push(TypeError::MissingRequired { name: name.clone() });
            }
        }

        for (name, value) in attributes {
            // Lifecycle settings such as timeouts are not part of the schema
            if name.starts_with('_') || name == "timeouts" {
                continue;
            }
            match self.attributes.get(name) {
                Some(schema) if schema.is_computed_only() => {
                    errors.push(TypeError::ComputedOnly { name: name.clone() });
                }
                Some(schema) => {
                    if let Err(e) = schema.attr_type.validate(value) {
                        errors.push(TypeError::AttributeError {
                            name: name.clone(),
                            inner: Box::new(e),
                        });
                    }
                }
                None => errors.push(TypeError::UnknownAttribute { name: name.clone() }),
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    /// Force-new attributes whose desired value differs from the current one.
    /// An attribute absent from `current` compares against its type's zero value.
    pub fn replacement_attributes(
        &self,
        desired: &HashMap<String, Value>,
        current: &HashMap<String, Value>,
    ) -> Vec<String> {
        let mut names: Vec<String> = desired
            .iter()
            .filter(|(name, value)| {
                let Some(schema) = self.attributes.get(*name) else {
                    return false;
                };
                if !schema.force_new {
                    return false;
                }
                match current.get(*name) {
                    Some(existing) => existing != *value,
                    None => schema.attr_type.zero_value().as_ref() != Some(*value),
                }
            })
            .map(|(name, _)| name.clone())
            .collect();
        names.sort();
        names
    }

    /// Start collecting attribute values for a state read back from the remote side
    pub fn writer(&self) -> AttributeWriter<'_> {
        AttributeWriter {
            schema: self,
            attributes: HashMap::new(),
            errors: Vec::new(),
        }
    }
}

/// Collects attribute assignments, keeping every failure instead of stopping
/// at the first one.
pub struct AttributeWriter<'a> {
    schema: &'a ResourceSchema,
    attributes: HashMap<String, Value>,
    errors: Vec<TypeError>,
}

impl AttributeWriter<'_> {
    pub fn set(&mut self, name: &str, value: impl Into<Value>) -> &mut Self {
        let value = value.into();
        match self.schema.attributes.get(name) {
            Some(attr) => match attr.attr_type.validate(&value) {
                Ok(()) => {
                    self.attributes.insert(name.to_string(), value);
                }
                Err(e) => self.errors.push(TypeError::AttributeError {
                    name: name.to_string(),
                    inner: Box::new(e),
                }),
            },
            None => self.errors.push(TypeError::UnknownAttribute {
                name: name.to_string(),
            }),
        }
        self
    }

    /// Set only when a value is present
    pub fn set_opt(&mut self, name: &str, value: Option<Value>) -> &mut Self {
        if let Some(v) = value {
            self.set(name, v);
        }
        self
    }

    pub fn finish(self) -> Result<HashMap<String, Value>, Vec<TypeError>> {
        if self.errors.is_empty() {
            Ok(self.attributes)
        } else {
            Err(self.errors)
        }
    }
}

/// Helper functions for common types
pub mod types {
    use super::*;

    /// TCP/UDP port number; 0 means "unset" on most cloud APIs
    pub fn port_number() -> AttributeType {
        AttributeType::Custom {
            name: "PortNumber".to_string(),
            base: Box::new(AttributeType::Int),
            validate: |value| {
                if let Value::Int(n) = value {
                    if (0..=65535).contains(n) {
                        Ok(())
                    } else {
                        Err("Port number must be between 0 and 65535".to_string())
                    }
                } else {
                    Err("Expected integer".to_string())
                }
            },
        }
    }
}
