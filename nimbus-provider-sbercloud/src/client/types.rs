//! Wire types of the security group APIs

use serde::{Deserialize, Deserializer, Serialize};

/// Treat an explicit `null` like a missing field
fn nullable<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Security group as returned by the v1 API
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SecurityGroup {
    pub id: String,
    #[serde(default, deserialize_with = "nullable")]
    pub name: String,
    #[serde(default, deserialize_with = "nullable")]
    pub description: String,
    #[serde(default, deserialize_with = "nullable")]
    pub vpc_id: String,
    #[serde(default, deserialize_with = "nullable")]
    pub enterprise_project_id: String,
    #[serde(
        default,
        rename = "security_group_rules",
        deserialize_with = "nullable"
    )]
    pub rules: Vec<SecurityGroupRule>,
}

/// Rule attached to a security group
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct SecurityGroupRule {
    pub id: String,
    #[serde(default, deserialize_with = "nullable")]
    pub description: String,
    #[serde(default, deserialize_with = "nullable")]
    pub security_group_id: String,
    #[serde(default, deserialize_with = "nullable")]
    pub direction: String,
    #[serde(default, deserialize_with = "nullable")]
    pub ethertype: String,
    #[serde(default, deserialize_with = "nullable")]
    pub protocol: String,
    #[serde(default, deserialize_with = "nullable")]
    pub port_range_min: i64,
    #[serde(default, deserialize_with = "nullable")]
    pub port_range_max: i64,
    #[serde(default, deserialize_with = "nullable")]
    pub remote_ip_prefix: String,
    #[serde(default, deserialize_with = "nullable")]
    pub remote_group_id: String,
    #[serde(default, deserialize_with = "nullable")]
    pub tenant_id: String,
}

/// Security group as returned by the v2.0 networking API
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct NetworkingSecGroup {
    pub id: String,
    #[serde(default, deserialize_with = "nullable")]
    pub name: String,
    #[serde(default, deserialize_with = "nullable")]
    pub description: String,
}

/// `{"security_group": ...}` envelope used by both API versions
#[derive(Debug, Serialize, Deserialize)]
pub struct Envelope<T> {
    pub security_group: T,
}

/// Body of a v1 create request. Only the name and enterprise project are
/// accepted at creation time.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CreateOpts {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enterprise_project_id: Option<String>,
}

/// Body of a v2.0 update request
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct UpdateOpts {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl UpdateOpts {
    pub fn description(description: impl Into<String>) -> Self {
        Self {
            name: None,
            description: Some(description.into()),
        }
    }

    /// An empty name is left out of the body
    pub fn name_and_description(name: impl Into<String>, description: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            name: (!name.is_empty()).then_some(name),
            description: Some(description.into()),
        }
    }
}
