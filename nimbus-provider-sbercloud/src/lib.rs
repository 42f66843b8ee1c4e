//! Nimbus SberCloud Provider
//!
//! Manages networking security groups through the SberCloud VPC APIs.
//!
//! ## Module Structure
//!
//! - `config` - Provider settings (attributes, environment, JSON file)
//! - `client` - HTTP clients for the v1 and v2.0 security group APIs
//! - `provider` - SbercloudProvider implementation
//! - `resources` - Resource type definitions and default timeouts
//! - `schemas` - Resource schemas
//! - `secgroup` - Security group lifecycle handlers

pub mod client;
pub mod config;
pub mod provider;
pub mod resources;
pub mod schemas;
pub mod secgroup;

#[cfg(test)]
mod testing;

// Re-export main types
pub use client::{ApiError, Connector, HttpConnector, SecurityGroupApi};
pub use config::{ConfigError, ProviderConfig};
pub use provider::SbercloudProvider;

use nimbus_core::provider::{
    BoxFuture, Provider, ProviderError, ProviderResult, ResourceType, Timeouts,
};
use nimbus_core::resource::{Resource, ResourceId, State};

use resources::{SECGROUP, find_resource_type, resource_types};

fn unknown_type(id: &ResourceId) -> ProviderError {
    ProviderError::new(format!("Unknown resource type: {}", id.resource_type))
        .for_resource(id.clone())
}

// =============================================================================
// Provider Trait Implementation
// =============================================================================

impl Provider for SbercloudProvider {
    fn name(&self) -> &'static str {
        "sbercloud"
    }

    fn resource_types(&self) -> Vec<Box<dyn ResourceType>> {
        resource_types()
    }

    fn read(&self, current: &State) -> BoxFuture<'_, ProviderResult<State>> {
        let current = current.clone();
        Box::pin(async move {
            match current.id.resource_type.as_str() {
                SECGROUP => self.read_secgroup(&current).await,
                _ => Err(unknown_type(&current.id)),
            }
        })
    }

    fn create(&self, resource: &Resource) -> BoxFuture<'_, ProviderResult<State>> {
        let resource = resource.clone();
        Box::pin(async move {
            match resource.id.resource_type.as_str() {
                SECGROUP => self.create_secgroup(&resource).await,
                _ => Err(unknown_type(&resource.id)),
            }
        })
    }

    fn update(&self, from: &State, to: &Resource) -> BoxFuture<'_, ProviderResult<State>> {
        let from = from.clone();
        let to = to.clone();
        Box::pin(async move {
            match to.id.resource_type.as_str() {
                SECGROUP => self.update_secgroup(&from, &to).await,
                _ => Err(unknown_type(&to.id)),
            }
        })
    }

    fn delete(
        &self,
        current: &State,
        timeouts: &Timeouts,
    ) -> BoxFuture<'_, ProviderResult<State>> {
        let current = current.clone();
        let timeouts = timeouts.clone();
        Box::pin(async move {
            let Some(resource_type) = find_resource_type(&current.id.resource_type) else {
                return Err(unknown_type(&current.id));
            };
            let declared = Timeouts::from_value(current.attributes.get("timeouts"))
                .map_err(|e| e.for_resource(current.id.clone()))?;
            let timeouts = timeouts
                .or(&declared)
                .or(&resource_type.default_timeouts());
            match resource_type.name() {
                SECGROUP => self.delete_secgroup(&current, &timeouts).await,
                _ => Err(unknown_type(&current.id)),
            }
        })
    }

    fn import(&self, id: &ResourceId, identifier: &str) -> BoxFuture<'_, ProviderResult<State>> {
        let id = id.clone();
        let identifier = identifier.to_string();
        Box::pin(async move {
            match id.resource_type.as_str() {
                SECGROUP => self.import_secgroup(&id, &identifier).await,
                _ => Err(unknown_type(&id)),
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{FakeApi, FakeConnector};
    use nimbus_core::clock::{Clock, ManualClock};
    use std::sync::Arc;
    use std::time::Duration;

    fn provider() -> (SbercloudProvider, Arc<FakeApi>, Arc<ManualClock>) {
        let api = FakeApi::new();
        let clock = Arc::new(ManualClock::new());
        let provider = SbercloudProvider::with_connector(
            ProviderConfig::new("ru-moscow-1", "proj", "token"),
            FakeConnector::new(api.clone()),
        )
        .with_clock(clock.clone());
        (provider, api, clock)
    }

    #[tokio::test]
    async fn unknown_resource_type_is_rejected() {
        let (provider, api, _) = provider();
        let resource = Resource::new("sbercloud_vpc", "main").with_attribute("name", "main");

        let err = provider.create(&resource).await.unwrap_err();
        assert!(err.to_string().contains("Unknown resource type: sbercloud_vpc"));
        assert!(api.calls().is_empty());
    }

    #[tokio::test]
    async fn lifecycle_through_provider_trait() {
        let (provider, api, _) = provider();
        let boxed: Box<dyn Provider> = Box::new(provider);
        let resource = Resource::new(SECGROUP, "web").with_attribute("name", "web");

        let created = boxed.create(&resource).await.unwrap();
        let identifier = created.identifier.clone().unwrap();

        let imported = boxed
            .import(&ResourceId::new(SECGROUP, "adopted"), &identifier)
            .await
            .unwrap();
        assert_eq!(imported.get_string("name"), Some("web"));

        let deleted = boxed.delete(&created, &Timeouts::default()).await.unwrap();
        assert!(!deleted.exists);
        assert!(api.group(&identifier).is_none());
    }

    #[tokio::test]
    async fn delete_honours_timeouts_attribute() {
        let (provider, api, clock) = provider();
        let mut timeouts = std::collections::HashMap::new();
        timeouts.insert("delete".to_string(), nimbus_core::resource::Value::from("1m"));
        let resource = Resource::new(SECGROUP, "web")
            .with_attribute("name", "web")
            .with_attribute("timeouts", nimbus_core::resource::Value::Map(timeouts));
        let created = provider.create(&resource).await.unwrap();
        api.always_fail_delete(409);

        provider
            .delete(&created, &Timeouts::default())
            .await
            .unwrap_err();
        assert_eq!(clock.now(), Duration::from_secs(60));
    }

    #[tokio::test]
    async fn delete_uses_default_timeout_when_none_given() {
        let (provider, api, clock) = provider();
        let created = provider
            .create(&Resource::new(SECGROUP, "web").with_attribute("name", "web"))
            .await
            .unwrap();
        api.always_fail_delete(409);

        let err = provider
            .delete(&created, &Timeouts::default())
            .await
            .unwrap_err();
        assert!(err.to_string().contains("timeout"));
        assert_eq!(clock.now(), Duration::from_secs(600));
    }
}
