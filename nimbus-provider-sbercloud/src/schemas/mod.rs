//! SberCloud resource schema definitions

pub mod secgroup;

use nimbus_core::schema::ResourceSchema;

/// Returns all SberCloud schemas
pub fn all_schemas() -> Vec<ResourceSchema> {
    vec![secgroup::secgroup_schema()]
}
