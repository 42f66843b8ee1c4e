//! SberCloud Provider implementation
//!
//! Holds the provider configuration, the client factory and the clock used by
//! polling loops. Resource handlers live in their own modules.

use std::collections::HashMap;
use std::sync::Arc;

use nimbus_core::clock::{Clock, TokioClock};
use nimbus_core::provider::ProviderResult;
use nimbus_core::resource::{ResourceId, Setting, Value};

use crate::client::{Connector, HttpConnector, SecurityGroupApi};
use crate::config::ProviderConfig;

/// SberCloud Provider
pub struct SbercloudProvider {
    pub(crate) config: ProviderConfig,
    connector: Arc<dyn Connector>,
    pub(crate) clock: Arc<dyn Clock>,
}

impl SbercloudProvider {
    /// Create a provider talking to the real API
    pub fn new(config: ProviderConfig) -> Self {
        let connector = Arc::new(HttpConnector::new(config.clone()));
        Self::with_connector(config, connector)
    }

    /// Create with a specific client factory (for testing)
    pub fn with_connector(config: ProviderConfig, connector: Arc<dyn Connector>) -> Self {
        Self {
            config,
            connector,
            clock: Arc::new(TokioClock::new()),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn config(&self) -> &ProviderConfig {
        &self.config
    }

    pub(crate) fn connect(
        &self,
        id: &ResourceId,
        region: &str,
    ) -> ProviderResult<Arc<dyn SecurityGroupApi>> {
        self.connector
            .connect(region)
            .map_err(|e| e.for_resource(id.clone()))
    }

    /// Region of a resource: its own `region` attribute, else the provider's
    pub(crate) fn region_for(&self, attributes: &HashMap<String, Value>) -> String {
        let explicit = attributes.get("region").and_then(Value::as_str);
        Setting::resolve_str(explicit, Some(&self.config.region))
            .into_value()
            .unwrap_or_else(|| self.config.region.clone())
    }

    /// Enterprise project of a resource: its own attribute, else the provider default
    pub(crate) fn enterprise_project_for(
        &self,
        attributes: &HashMap<String, Value>,
    ) -> Setting<String> {
        let explicit = attributes
            .get("enterprise_project_id")
            .and_then(Value::as_str);
        Setting::resolve_str(explicit, self.config.enterprise_project_id.as_deref())
    }
}
