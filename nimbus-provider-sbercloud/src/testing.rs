//! In-memory security group API used by lifecycle tests

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use nimbus_core::provider::ProviderResult;

use crate::client::types::{
    CreateOpts, NetworkingSecGroup, SecurityGroup, SecurityGroupRule, UpdateOpts,
};
use crate::client::{ApiError, Connector, SecurityGroupApi};

#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    Create(CreateOpts),
    Get(String),
    Update(String, UpdateOpts),
    Delete(String),
    DeleteRule(String),
}

impl Call {
    pub fn is_write(&self) -> bool {
        !matches!(self, Call::Get(_))
    }
}

#[derive(Default)]
struct Inner {
    groups: HashMap<String, SecurityGroup>,
    calls: Vec<Call>,
    next_id: u32,
    /// Forced outcomes for the next get calls (`None` = answer normally)
    get_script: VecDeque<Option<u16>>,
    /// Forced outcomes for the next group deletes
    delete_script: VecDeque<Option<u16>>,
    /// Status returned by every group delete once the script is empty
    delete_always: Option<u16>,
    failing_rules: HashSet<String>,
}

#[derive(Default)]
pub struct FakeApi {
    inner: Mutex<Inner>,
}

impl FakeApi {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        self.inner.lock().unwrap()
    }

    pub fn insert_group(&self, group: SecurityGroup) {
        self.lock().groups.insert(group.id.clone(), group);
    }

    pub fn group(&self, id: &str) -> Option<SecurityGroup> {
        self.lock().groups.get(id).cloned()
    }

    pub fn calls(&self) -> Vec<Call> {
        self.lock().calls.clone()
    }

    pub fn writes(&self) -> Vec<Call> {
        self.calls().into_iter().filter(Call::is_write).collect()
    }

    pub fn script_gets(&self, outcomes: Vec<Option<u16>>) {
        self.lock().get_script.extend(outcomes);
    }

    pub fn script_deletes(&self, outcomes: Vec<Option<u16>>) {
        self.lock().delete_script.extend(outcomes);
    }

    pub fn always_fail_delete(&self, status: u16) {
        self.lock().delete_always = Some(status);
    }

    pub fn fail_rule(&self, rule_id: &str) {
        self.lock().failing_rules.insert(rule_id.to_string());
    }
}

fn default_rules(group_id: &str) -> Vec<SecurityGroupRule> {
    let rule = |n: u32, direction: &str, ethertype: &str, remote_group: &str| SecurityGroupRule {
        id: format!("{group_id}-rule-{n}"),
        security_group_id: group_id.to_string(),
        direction: direction.to_string(),
        ethertype: ethertype.to_string(),
        remote_group_id: remote_group.to_string(),
        ..Default::default()
    };
    vec![
        rule(1, "ingress", "IPv4", group_id),
        rule(2, "ingress", "IPv6", group_id),
        rule(3, "egress", "IPv4", ""),
        rule(4, "egress", "IPv6", ""),
    ]
}

#[async_trait]
impl SecurityGroupApi for FakeApi {
    async fn create_security_group(&self, opts: &CreateOpts) -> Result<SecurityGroup, ApiError> {
        let mut inner = self.lock();
        inner.calls.push(Call::Create(opts.clone()));
        inner.next_id += 1;
        let id = format!("sg-{}", inner.next_id);
        let group = SecurityGroup {
            id: id.clone(),
            name: opts.name.clone(),
            description: String::new(),
            vpc_id: String::new(),
            enterprise_project_id: opts.enterprise_project_id.clone().unwrap_or("0".to_string()),
            rules: default_rules(&id),
        };
        inner.groups.insert(id, group.clone());
        Ok(group)
    }

    async fn get_security_group(&self, id: &str) -> Result<SecurityGroup, ApiError> {
        let mut inner = self.lock();
        inner.calls.push(Call::Get(id.to_string()));
        if let Some(Some(status)) = inner.get_script.pop_front() {
            return Err(ApiError::from_status(status, "scripted"));
        }
        inner
            .groups
            .get(id)
            .cloned()
            .ok_or_else(|| ApiError::from_status(404, "security group not found"))
    }

    async fn delete_security_group(&self, id: &str) -> Result<(), ApiError> {
        let mut inner = self.lock();
        inner.calls.push(Call::Delete(id.to_string()));
        let forced = match inner.delete_script.pop_front() {
            Some(outcome) => outcome,
            None => inner.delete_always,
        };
        if let Some(status) = forced {
            return Err(ApiError::from_status(status, "scripted"));
        }
        match inner.groups.remove(id) {
            Some(_) => Ok(()),
            None => Err(ApiError::from_status(404, "security group not found")),
        }
    }

    async fn update_security_group(
        &self,
        id: &str,
        opts: &UpdateOpts,
    ) -> Result<NetworkingSecGroup, ApiError> {
        let mut inner = self.lock();
        inner.calls.push(Call::Update(id.to_string(), opts.clone()));
        let group = inner
            .groups
            .get_mut(id)
            .ok_or_else(|| ApiError::from_status(404, "security group not found"))?;
        if let Some(name) = opts.name.as_ref().filter(|n| !n.is_empty()) {
            group.name = name.clone();
        }
        if let Some(description) = &opts.description {
            group.description = description.clone();
        }
        Ok(NetworkingSecGroup {
            id: group.id.clone(),
            name: group.name.clone(),
            description: group.description.clone(),
        })
    }

    async fn delete_rule(&self, rule_id: &str) -> Result<(), ApiError> {
        let mut inner = self.lock();
        inner.calls.push(Call::DeleteRule(rule_id.to_string()));
        if inner.failing_rules.contains(rule_id) {
            return Err(ApiError::from_status(500, "rule delete failed"));
        }
        for group in inner.groups.values_mut() {
            if let Some(pos) = group.rules.iter().position(|r| r.id == rule_id) {
                group.rules.remove(pos);
                return Ok(());
            }
        }
        Err(ApiError::from_status(404, "rule not found"))
    }
}

/// Hands out the same [`FakeApi`] for every region and records the regions
pub struct FakeConnector {
    pub api: Arc<FakeApi>,
    regions: Mutex<Vec<String>>,
}

impl FakeConnector {
    pub fn new(api: Arc<FakeApi>) -> Arc<Self> {
        Arc::new(Self {
            api,
            regions: Mutex::new(Vec::new()),
        })
    }

    pub fn regions(&self) -> Vec<String> {
        self.regions.lock().unwrap().clone()
    }
}

impl Connector for FakeConnector {
    fn connect(&self, region: &str) -> ProviderResult<Arc<dyn SecurityGroupApi>> {
        self.regions.lock().unwrap().push(region.to_string());
        Ok(self.api.clone())
    }
}
