//! sbercloud_networking_secgroup lifecycle
//!
//! Creation goes through the v1 API, which only accepts a name and an
//! enterprise project. The description is written afterwards through the v2.0
//! API. Deletion keeps retrying while the group is still referenced by other
//! resources, until it disappears or the delete timeout runs out.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use log::{debug, info, warn};

use nimbus_core::differ::has_changes;
use nimbus_core::provider::{BoxFuture, ProviderError, ProviderResult, Timeouts};
use nimbus_core::resource::{Resource, ResourceId, State, Value};
use nimbus_core::wait::{BoxError, StateChangeConf, StateRefresh};

use crate::client::{ApiError, SecurityGroupApi};
use crate::client::types::{CreateOpts, SecurityGroup, UpdateOpts};
use crate::provider::SbercloudProvider;
use crate::resources::SECGROUP_DELETE_TIMEOUT;
use crate::schemas::secgroup::secgroup_schema;

/// Wait before the first delete attempt
const DELETE_DELAY: Duration = Duration::from_secs(5);
/// Smallest interval between two delete attempts
const DELETE_MIN_TIMEOUT: Duration = Duration::from_secs(3);

/// Attributes that only exist in local state and survive a refresh
const LOCAL_ATTRIBUTES: [&str; 2] = ["delete_default_rules", "tenant_id"];
/// Lifecycle settings, kept in state outside the schema
const TIMEOUTS: &str = "timeouts";

/// Remote lifecycle of a group being deleted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SecGroupState {
    Active,
    Deleted,
}

impl fmt::Display for SecGroupState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SecGroupState::Active => write!(f, "ACTIVE"),
            SecGroupState::Deleted => write!(f, "DELETED"),
        }
    }
}

/// Each refresh checks the group still exists and asks for its deletion
struct SecGroupDeletePoller {
    api: Arc<dyn SecurityGroupApi>,
    identifier: String,
}

impl StateRefresh for SecGroupDeletePoller {
    type State = SecGroupState;

    fn refresh(&mut self) -> BoxFuture<'_, Result<SecGroupState, BoxError>> {
        Box::pin(async move {
            debug!("Attempting to delete Security Group {}", self.identifier);

            match self.api.get_security_group(&self.identifier).await {
                Ok(_) => {}
                Err(e) if e.is_not_found() => {
                    debug!("Successfully deleted Security Group {}", self.identifier);
                    return Ok(SecGroupState::Deleted);
                }
                Err(e) => return Err(e.into()),
            }

            match self.api.delete_security_group(&self.identifier).await {
                Ok(()) => Ok(SecGroupState::Active),
                Err(e) if e.is_not_found() => {
                    debug!("Successfully deleted Security Group {}", self.identifier);
                    Ok(SecGroupState::Deleted)
                }
                Err(e) if e.is_conflict() => {
                    warn!(
                        "Security Group {} is still in use, retrying delete: {}",
                        self.identifier, e
                    );
                    Ok(SecGroupState::Active)
                }
                Err(e) => Err(e.into()),
            }
        })
    }
}

/// Convert the remote rule list into `rules` attribute entries
pub fn flatten_rules(group: &SecurityGroup) -> Vec<Value> {
    group
        .rules
        .iter()
        .map(|rule| {
            let fields = [
                ("id", Value::from(rule.id.as_str())),
                ("direction", Value::from(rule.direction.as_str())),
                ("protocol", Value::from(rule.protocol.as_str())),
                ("ethertype", Value::from(rule.ethertype.as_str())),
                ("port_range_max", Value::Int(rule.port_range_max)),
                ("port_range_min", Value::Int(rule.port_range_min)),
                ("remote_ip_prefix", Value::from(rule.remote_ip_prefix.as_str())),
                ("remote_group_id", Value::from(rule.remote_group_id.as_str())),
                ("description", Value::from(rule.description.as_str())),
            ];
            Value::Map(
                fields
                    .into_iter()
                    .map(|(k, v)| (k.to_string(), v))
                    .collect(),
            )
        })
        .collect()
}

fn local_attributes(attributes: &HashMap<String, Value>) -> impl Iterator<Item = (String, Value)> {
    LOCAL_ATTRIBUTES
        .iter()
        .filter_map(|key| attributes.get(*key).map(|v| (key.to_string(), v.clone())))
}

impl SbercloudProvider {
    pub(crate) async fn create_secgroup(&self, resource: &Resource) -> ProviderResult<State> {
        let id = &resource.id;
        let region = self.region_for(&resource.attributes);
        let api = self.connect(id, &region)?;

        let name = resource
            .get_string("name")
            .ok_or_else(|| ProviderError::new("name is required").for_resource(id.clone()))?;
        let opts = CreateOpts {
            name: name.to_string(),
            enterprise_project_id: self.enterprise_project_for(&resource.attributes).into_value(),
        };
        debug!("Create SberCloud Security Group: {:?}", opts);

        let group = api.create_security_group(&opts).await.map_err(|e| {
            ProviderError::new("Error creating Security Group")
                .with_cause(e)
                .for_resource(id.clone())
        })?;
        let identifier = group.id.clone();
        info!("Security Group ID: {}", identifier);

        let failed = |message: String, cause: ApiError| {
            ProviderError::new(message)
                .with_cause(cause)
                .for_resource(id.clone())
                .with_identifier(identifier.clone())
        };

        let description = resource.get_string("description").unwrap_or_default();
        if !description.is_empty() {
            api.update_security_group(&identifier, &UpdateOpts::description(description))
                .await
                .map_err(|e| {
                    failed(
                        format!("Error updating description of security group {}", identifier),
                        e,
                    )
                })?;
        }

        if resource.get_bool_or("delete_default_rules", false) {
            for rule in &group.rules {
                debug!("Deleting default rule {} of Security Group {}", rule.id, identifier);
                api.delete_rule(&rule.id).await.map_err(|e| {
                    failed(
                        "There was a problem deleting a default security group rule".to_string(),
                        e,
                    )
                })?;
            }
        }

        let mut attributes: HashMap<String, Value> = local_attributes(&resource.attributes).collect();
        attributes.insert("region".to_string(), Value::from(region));
        if let Some(timeouts) = resource.attributes.get(TIMEOUTS) {
            attributes.insert(TIMEOUTS.to_string(), timeouts.clone());
        }
        let created = State::existing(id.clone(), attributes).with_identifier(identifier.clone());

        let state = self
            .read_secgroup(&created)
            .await
            .map_err(|e| e.with_identifier(identifier.clone()))?;
        if !state.exists {
            return Err(ProviderError::new("Security group disappeared right after creation")
                .for_resource(id.clone())
                .with_identifier(identifier));
        }
        Ok(state)
    }

    pub(crate) async fn read_secgroup(&self, current: &State) -> ProviderResult<State> {
        let id = &current.id;
        let Some(identifier) = current.identifier.as_deref() else {
            return Ok(State::not_found(id.clone()));
        };
        let region = self.region_for(&current.attributes);
        let api = self.connect(id, &region)?;

        let group = match api.get_security_group(identifier).await {
            Ok(group) => group,
            Err(e) if e.is_not_found() => {
                info!("Security Group {} not found, removing from state", identifier);
                return Ok(State::not_found(id.clone()));
            }
            Err(e) => {
                return Err(ProviderError::new("Error retrieving SberCloud Security group")
                    .with_cause(e)
                    .for_resource(id.clone())
                    .with_identifier(identifier));
            }
        };
        debug!("Retrieved Security Group {}: {:?}", identifier, group);

        let schema = secgroup_schema();
        let mut writer = schema.writer();
        writer
            .set("region", region)
            .set("name", group.name.as_str())
            .set("description", group.description.as_str())
            .set("enterprise_project_id", group.enterprise_project_id.as_str())
            .set("rules", Value::List(flatten_rules(&group)));
        for (key, value) in local_attributes(&current.attributes) {
            writer.set_opt(&key, Some(value));
        }

        let mut attributes = writer.finish().map_err(|errors| {
            ProviderError::from_type_errors("Error setting security group attributes", errors)
                .for_resource(id.clone())
                .with_identifier(identifier)
        })?;
        if let Some(timeouts) = current.attributes.get(TIMEOUTS) {
            attributes.insert(TIMEOUTS.to_string(), timeouts.clone());
        }

        Ok(State::existing(id.clone(), attributes).with_identifier(identifier))
    }

    pub(crate) async fn update_secgroup(&self, from: &State, to: &Resource) -> ProviderResult<State> {
        let id = &to.id;
        let identifier = from.identifier.as_deref().ok_or_else(|| {
            ProviderError::new("Cannot update a security group that has no identifier")
                .for_resource(id.clone())
        })?;

        let replace = secgroup_schema().replacement_attributes(&to.attributes, &from.attributes);
        if !replace.is_empty() {
            return Err(ProviderError::new(format!(
                "Changing {} requires replacing the security group",
                replace.join(", ")
            ))
            .for_resource(id.clone())
            .with_identifier(identifier));
        }

        let mut attributes = from.attributes.clone();
        attributes.extend(to.attributes.iter().map(|(k, v)| (k.clone(), v.clone())));
        let region = self.region_for(&attributes);
        let api = self.connect(id, &region)?;

        if has_changes(from, to, &["name", "description"]) {
            let name = to.get_string("name").or(from.get_string("name")).unwrap_or_default();
            let description = to
                .get_string("description")
                .or(from.get_string("description"))
                .unwrap_or_default();
            let opts = UpdateOpts::name_and_description(name, description);
            debug!("Updating Security Group {} with options: {:?}", identifier, opts);

            api.update_security_group(identifier, &opts).await.map_err(|e| {
                ProviderError::new("Error updating SberCloud SecGroup")
                    .with_cause(e)
                    .for_resource(id.clone())
                    .with_identifier(identifier)
            })?;
        }

        self.read_secgroup(&State::existing(id.clone(), attributes).with_identifier(identifier))
            .await
    }

    pub(crate) async fn delete_secgroup(
        &self,
        current: &State,
        timeouts: &Timeouts,
    ) -> ProviderResult<State> {
        let id = &current.id;
        let Some(identifier) = current.identifier.clone() else {
            return Ok(State::not_found(id.clone()));
        };
        let region = self.region_for(&current.attributes);
        let api = self.connect(id, &region)?;

        let timeout = timeouts.delete.unwrap_or(SECGROUP_DELETE_TIMEOUT);
        let conf = StateChangeConf::new(
            vec![SecGroupState::Active],
            vec![SecGroupState::Deleted],
            timeout,
        )
        .with_delay(DELETE_DELAY)
        .with_min_timeout(DELETE_MIN_TIMEOUT);

        let mut poller = SecGroupDeletePoller {
            api,
            identifier: identifier.clone(),
        };
        conf.wait_for_state(&mut poller, self.clock.as_ref())
            .await
            .map_err(|e| {
                ProviderError::new("Error deleting SberCloud Security Group")
                    .with_cause(e)
                    .for_resource(id.clone())
                    .with_identifier(identifier.clone())
            })?;

        info!("Security Group {} deleted", identifier);
        Ok(State::not_found(id.clone()))
    }

    /// Adopt an existing group; a missing group is an error
    pub(crate) async fn import_secgroup(
        &self,
        id: &ResourceId,
        identifier: &str,
    ) -> ProviderResult<State> {
        let state = State::existing(id.clone(), HashMap::new()).with_identifier(identifier);
        let state = self.read_secgroup(&state).await?;
        if !state.exists {
            return Err(ProviderError::new(format!(
                "Cannot import non-existent security group {}",
                identifier
            ))
            .for_resource(id.clone()));
        }
        Ok(state)
    }
}
