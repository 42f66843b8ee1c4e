//! Provider - Trait abstracting resource operations
//!
//! A Provider defines operations for a specific cloud.
//! It is responsible for converting lifecycle requests into actual API calls.

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use crate::resource::{Resource, ResourceId, State, Value};
use crate::schema::{ResourceSchema, TypeError};

/// Error type for Provider operations
#[derive(Debug)]
pub struct ProviderError {
    pub message: String,
    pub resource_id: Option<ResourceId>,
    /// Remote identifier of a resource left behind by a failed operation
    pub identifier: Option<String>,
    pub cause: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl std::fmt::Display for ProviderError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match (&self.resource_id, &self.identifier) {
            (Some(id), Some(identifier)) => write!(
                f,
                "[{}.{} ({})] {}",
                id.resource_type, id.name, identifier, self.message
            )?,
            (Some(id), None) => write!(f, "[{}.{}] {}", id.resource_type, id.name, self.message)?,
            (None, Some(identifier)) => write!(f, "({}) {}", identifier, self.message)?,
            (None, None) => write!(f, "{}", self.message)?,
        }
        if let Some(ref cause) = self.cause {
            write!(f, ": {}", cause)?;
        }
        Ok(())
    }
}

impl std::error::Error for ProviderError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.cause
            .as_ref()
            .map(|e| e.as_ref() as &dyn std::error::Error)
    }
}

impl ProviderError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            resource_id: None,
            identifier: None,
            cause: None,
        }
    }

    pub fn for_resource(mut self, id: ResourceId) -> Self {
        self.resource_id = Some(id);
        self
    }

    pub fn with_identifier(mut self, identifier: impl Into<String>) -> Self {
        self.identifier = Some(identifier.into());
        self
    }

    pub fn with_cause(mut self, cause: impl std::error::Error + Send + Sync + 'static) -> Self {
        self.cause = Some(Box::new(cause));
        self
    }

    /// Join several schema errors into one error
    pub fn from_type_errors(message: impl Into<String>, errors: Vec<TypeError>) -> Self {
        let details: Vec<String> = errors.iter().map(|e| format!("  * {}", e)).collect();
        Self::new(format!(
            "{} ({} error(s) occurred):\n{}",
            message.into(),
            errors.len(),
            details.join("\n")
        ))
    }
}

pub type ProviderResult<T> = Result<T, ProviderError>;

/// Return type for async operations
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Per-operation timeouts
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Timeouts {
    pub create: Option<Duration>,
    pub read: Option<Duration>,
    pub update: Option<Duration>,
    pub delete: Option<Duration>,
}

impl Timeouts {
    pub fn with_delete(mut self, timeout: Duration) -> Self {
        self.delete = Some(timeout);
        self
    }

    /// Parse a `timeouts` attribute (`{ delete = "20m" }`)
    ///
    /// Each entry is either a duration string or a number of seconds.
    pub fn from_value(value: Option<&Value>) -> ProviderResult<Self> {
        let map = match value {
            None => return Ok(Self::default()),
            Some(Value::Map(map)) => map,
            Some(_) => return Err(ProviderError::new("timeouts must be a map")),
        };

        let mut timeouts = Self::default();
        for (op, v) in map {
            let duration = match v {
                Value::String(s) => parse_duration(s)
                    .map_err(|e| ProviderError::new(format!("Invalid {} timeout: {}", op, e)))?,
                Value::Int(secs) if *secs >= 0 => Duration::from_secs(*secs as u64),
                _ => {
                    return Err(ProviderError::new(format!(
                        "Invalid {} timeout: expected duration string or seconds",
                        op
                    )));
                }
            };
            match op.as_str() {
                "create" => timeouts.create = Some(duration),
                "read" => timeouts.read = Some(duration),
                "update" => timeouts.update = Some(duration),
                "delete" => timeouts.delete = Some(duration),
                other => {
                    return Err(ProviderError::new(format!(
                        "Unknown timeout operation: {}",
                        other
                    )));
                }
            }
        }
        Ok(timeouts)
    }

    /// Fill unset entries from `defaults`
    pub fn or(self, defaults: &Timeouts) -> Self {
        Self {
            create: self.create.or(defaults.create),
            read: self.read.or(defaults.read),
            update: self.update.or(defaults.update),
            delete: self.delete.or(defaults.delete),
        }
    }
}

/// Parse durations such as "30s", "10m", "1h30m"
pub fn parse_duration(s: &str) -> Result<Duration, String> {
    humantime::parse_duration(s.trim()).map_err(|e| format!("invalid duration '{}': {}", s, e))
}

/// Definition of resource types that a Provider can handle
pub trait ResourceType: Send + Sync {
    /// Resource type name (e.g., "sbercloud_networking_secgroup")
    fn name(&self) -> &'static str;

    /// Attribute schema for this resource type
    fn schema(&self) -> ResourceSchema;

    /// Timeouts applied when the caller does not configure any
    fn default_timeouts(&self) -> Timeouts {
        Timeouts::default()
    }
}

/// Main Provider trait
///
/// Each cloud provider implements this trait.
/// All operations are async and involve side effects.
pub trait Provider: Send + Sync {
    /// Name of this Provider (e.g., "sbercloud")
    fn name(&self) -> &'static str;

    /// List of resource types this Provider can handle
    fn resource_types(&self) -> Vec<Box<dyn ResourceType>>;

    /// Refresh a resource from its last known state
    ///
    /// Returns `State::not_found()` if the resource no longer exists.
    fn read(&self, current: &State) -> BoxFuture<'_, ProviderResult<State>>;

    /// Create a resource
    ///
    /// Returns State with identifier set to the remote ID
    fn create(&self, resource: &Resource) -> BoxFuture<'_, ProviderResult<State>>;

    /// Update a resource in place
    fn update(&self, from: &State, to: &Resource) -> BoxFuture<'_, ProviderResult<State>>;

    /// Delete a resource
    ///
    /// Returns a state with the identifier cleared once removal is confirmed.
    fn delete(&self, current: &State, timeouts: &Timeouts)
    -> BoxFuture<'_, ProviderResult<State>>;

    /// Adopt an existing remote object by its identifier
    ///
    /// The default implementation passes the identifier through and reads
    /// the full state.
    fn import(&self, id: &ResourceId, identifier: &str) -> BoxFuture<'_, ProviderResult<State>> {
        let state = State::existing(id.clone(), Default::default()).with_identifier(identifier);
        Box::pin(async move { self.read(&state).await })
    }
}

/// Provider implementation for Box<dyn Provider>
/// This enables dynamic dispatch for Providers
impl Provider for Box<dyn Provider> {
    fn name(&self) -> &'static str {
        (**self).name()
    }

    fn resource_types(&self) -> Vec<Box<dyn ResourceType>> {
        (**self).resource_types()
    }

    fn read(&self, current: &State) -> BoxFuture<'_, ProviderResult<State>> {
        (**self).read(current)
    }

    fn create(&self, resource: &Resource) -> BoxFuture<'_, ProviderResult<State>> {
        (**self).create(resource)
    }

    fn update(&self, from: &State, to: &Resource) -> BoxFuture<'_, ProviderResult<State>> {
        (**self).update(from, to)
    }

    fn delete(
        &self,
        current: &State,
        timeouts: &Timeouts,
    ) -> BoxFuture<'_, ProviderResult<State>> {
        (**self).delete(current, timeouts)
    }

    fn import(&self, id: &ResourceId, identifier: &str) -> BoxFuture<'_, ProviderResult<State>> {
        (**self).import(id, identifier)
    }
}
