//! Resource type definitions
//!
//! Maps resource type names to their schemas and default timeouts.

use std::time::Duration;

use nimbus_core::provider::{ResourceType, Timeouts};
use nimbus_core::schema::ResourceSchema;

use crate::schemas::secgroup::secgroup_schema;

/// Resource type name of the networking security group
pub const SECGROUP: &str = "sbercloud_networking_secgroup";

/// Default time allowed for a security group to disappear
pub const SECGROUP_DELETE_TIMEOUT: Duration = Duration::from_secs(10 * 60);

pub struct NetworkingSecGroupType;

impl ResourceType for NetworkingSecGroupType {
    fn name(&self) -> &'static str {
        SECGROUP
    }

    fn schema(&self) -> ResourceSchema {
        secgroup_schema()
    }

    fn default_timeouts(&self) -> Timeouts {
        Timeouts::default().with_delete(SECGROUP_DELETE_TIMEOUT)
    }
}

/// Returns all resource types supported by this provider
pub fn resource_types() -> Vec<Box<dyn ResourceType>> {
    vec![Box::new(NetworkingSecGroupType)]
}

/// Look up a resource type by name
pub fn find_resource_type(name: &str) -> Option<Box<dyn ResourceType>> {
    resource_types().into_iter().find(|t| t.name() == name)
}
