//! Nimbus Core
//!
//! Core library for an infrastructure management tool: the resource model,
//! declarative schemas, the provider seam and the wait-for-state machinery
//! shared by every provider.

pub mod clock;
pub mod differ;
pub mod provider;
pub mod resource;
pub mod schema;
pub mod wait;
