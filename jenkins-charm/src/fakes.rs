// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! In-memory stand-ins for the charm's external collaborators, used by the
//! test suite. Hooks run against these exactly as they would against the
//! real framework, service manager, and Jenkins API.

use crate::credentials::AdminCredential;
use crate::hook_env::{EnvError, HookEnv, StatusState};
use crate::node::{NodeError, NodeRegistry, SlaveNode};
use crate::plugins::{PluginError, PluginSource};
use crate::service::ServiceSupervisor;
use async_trait::async_trait;
use host_utils::ExecutionError;
use std::collections::BTreeMap;
use std::sync::Mutex;

#[derive(Clone, Debug, Default)]
struct FakeRelation {
    id: String,
    units: BTreeMap<String, BTreeMap<String, String>>,
}

/// A scripted hook environment. Relation data is set up in advance;
/// everything the hook publishes is recorded for assertions.
#[derive(Default)]
pub struct FakeHookEnv {
    remote_unit: Option<String>,
    private_address: String,
    public_address: String,
    current_relation: Option<String>,
    remote_settings: BTreeMap<String, String>,
    relations: BTreeMap<String, Vec<FakeRelation>>,
    published: Mutex<BTreeMap<String, BTreeMap<String, String>>>,
    opened_ports: Mutex<Vec<u16>>,
    statuses: Mutex<Vec<(StatusState, String)>>,
}

/// Key under which attributes published on the current relation (rather
/// than an explicit relation id) are recorded.
pub const LOCAL_RELATION: &str = "-";

impl FakeHookEnv {
    pub fn new() -> Self {
        Self {
            private_address: "10.0.0.1".to_string(),
            public_address: "203.0.113.1".to_string(),
            ..Default::default()
        }
    }

    pub fn with_remote_unit(mut self, unit: &str) -> Self {
        self.remote_unit = Some(unit.to_string());
        self
    }

    pub fn with_private_address(mut self, address: &str) -> Self {
        self.private_address = address.to_string();
        self
    }

    /// Name the relation the current event belongs to.
    pub fn with_current_relation(mut self, name: &str) -> Self {
        self.current_relation = Some(name.to_string());
        self
    }

    /// Attributes the remote unit of the current event has published.
    pub fn with_remote_settings(
        mut self,
        settings: &[(&str, &str)],
    ) -> Self {
        self.remote_settings = settings
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        self
    }

    /// Establish an (empty) relation with the given name and id.
    pub fn with_relation(mut self, name: &str, id: &str) -> Self {
        self.relation_mut(name, id);
        self
    }

    /// Establish a relation and place a unit with published attributes on
    /// its far side.
    pub fn with_relation_unit(
        mut self,
        name: &str,
        id: &str,
        unit: &str,
        settings: &[(&str, &str)],
    ) -> Self {
        let relation = self.relation_mut(name, id);
        relation.units.insert(
            unit.to_string(),
            settings
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        );
        self
    }

    fn relation_mut(&mut self, name: &str, id: &str) -> &mut FakeRelation {
        let relations = self.relations.entry(name.to_string()).or_default();
        if let Some(pos) = relations.iter().position(|r| r.id == id) {
            &mut relations[pos]
        } else {
            relations.push(FakeRelation {
                id: id.to_string(),
                units: BTreeMap::new(),
            });
            relations.last_mut().unwrap()
        }
    }

    fn find_relation(&self, relation_id: &str) -> Option<&FakeRelation> {
        self.relations
            .values()
            .flatten()
            .find(|relation| relation.id == relation_id)
    }

    /// Everything published so far, keyed by relation id
    /// ([`LOCAL_RELATION`] for the current relation).
    pub fn published(&self) -> BTreeMap<String, BTreeMap<String, String>> {
        self.published.lock().unwrap().clone()
    }

    pub fn published_local(&self) -> BTreeMap<String, String> {
        self.published_for(LOCAL_RELATION)
    }

    pub fn published_for(
        &self,
        relation_id: &str,
    ) -> BTreeMap<String, String> {
        self.published
            .lock()
            .unwrap()
            .get(relation_id)
            .cloned()
            .unwrap_or_default()
    }

    pub fn opened_ports(&self) -> Vec<u16> {
        self.opened_ports.lock().unwrap().clone()
    }

    pub fn statuses(&self) -> Vec<(StatusState, String)> {
        self.statuses.lock().unwrap().clone()
    }

    fn record(&self, key: &str, settings: &[(&str, &str)]) {
        let mut published = self.published.lock().unwrap();
        let entry = published.entry(key.to_string()).or_default();
        for (k, v) in settings {
            entry.insert(k.to_string(), v.to_string());
        }
    }
}

#[async_trait]
impl HookEnv for FakeHookEnv {
    async fn remote_settings(
        &self,
    ) -> Result<BTreeMap<String, String>, EnvError> {
        Ok(self.remote_settings.clone())
    }

    async fn remote_attr(
        &self,
        relation_id: &str,
        unit: &str,
        name: &str,
    ) -> Result<Option<String>, EnvError> {
        Ok(self
            .find_relation(relation_id)
            .and_then(|relation| relation.units.get(unit))
            .and_then(|settings| settings.get(name))
            .filter(|value| !value.is_empty())
            .cloned())
    }

    async fn set_local(
        &self,
        settings: &[(&str, &str)],
    ) -> Result<(), EnvError> {
        self.record(LOCAL_RELATION, settings);
        Ok(())
    }

    async fn set_for_relation(
        &self,
        relation_id: &str,
        settings: &[(&str, &str)],
    ) -> Result<(), EnvError> {
        self.record(relation_id, settings);
        Ok(())
    }

    async fn relation_ids(
        &self,
        relation_name: &str,
    ) -> Result<Vec<String>, EnvError> {
        Ok(self
            .relations
            .get(relation_name)
            .map(|relations| {
                relations.iter().map(|r| r.id.clone()).collect()
            })
            .unwrap_or_default())
    }

    async fn current_relation_ids(&self) -> Result<Vec<String>, EnvError> {
        let name = self
            .current_relation
            .as_deref()
            .ok_or(EnvError::MissingContext("a relation name"))?;
        self.relation_ids(name).await
    }

    async fn related_units(
        &self,
        relation_id: &str,
    ) -> Result<Vec<String>, EnvError> {
        Ok(self
            .find_relation(relation_id)
            .map(|relation| relation.units.keys().cloned().collect())
            .unwrap_or_default())
    }

    fn remote_unit(&self) -> Option<String> {
        self.remote_unit.clone()
    }

    async fn private_address(&self) -> Result<String, EnvError> {
        Ok(self.private_address.clone())
    }

    async fn public_address(&self) -> Result<String, EnvError> {
        Ok(self.public_address.clone())
    }

    async fn open_port(&self, port: u16) -> Result<(), EnvError> {
        self.opened_ports.lock().unwrap().push(port);
        Ok(())
    }

    async fn set_status(
        &self,
        state: StatusState,
        message: &str,
    ) -> Result<(), EnvError> {
        self.statuses.lock().unwrap().push((state, message.to_string()));
        Ok(())
    }
}

/// Records node registrations instead of talking to a Jenkins master.
#[derive(Default)]
pub struct FakeNodeRegistry {
    registered: Mutex<Vec<SlaveNode>>,
    deregistered: Mutex<Vec<String>>,
}

impl FakeNodeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn registered(&self) -> Vec<SlaveNode> {
        self.registered.lock().unwrap().clone()
    }

    pub fn deregistered(&self) -> Vec<String> {
        self.deregistered.lock().unwrap().clone()
    }
}

#[async_trait]
impl NodeRegistry for FakeNodeRegistry {
    async fn register(
        &self,
        node: &SlaveNode,
        _cred: &AdminCredential,
    ) -> Result<(), NodeError> {
        self.registered.lock().unwrap().push(node.clone());
        Ok(())
    }

    async fn deregister(
        &self,
        hostname: &str,
        _cred: &AdminCredential,
    ) -> Result<(), NodeError> {
        self.deregistered.lock().unwrap().push(hostname.to_string());
        Ok(())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ServiceAction {
    Start,
    Stop,
    Restart,
}

/// Records lifecycle calls instead of driving systemd.
#[derive(Default)]
pub struct FakeServiceSupervisor {
    actions: Mutex<Vec<ServiceAction>>,
}

impl FakeServiceSupervisor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn actions(&self) -> Vec<ServiceAction> {
        self.actions.lock().unwrap().clone()
    }
}

#[async_trait]
impl ServiceSupervisor for FakeServiceSupervisor {
    async fn start(&self) -> Result<(), ExecutionError> {
        self.actions.lock().unwrap().push(ServiceAction::Start);
        Ok(())
    }

    async fn stop(&self) -> Result<(), ExecutionError> {
        self.actions.lock().unwrap().push(ServiceAction::Stop);
        Ok(())
    }

    async fn restart(&self) -> Result<(), ExecutionError> {
        self.actions.lock().unwrap().push(ServiceAction::Restart);
        Ok(())
    }
}

/// Serves plugin archives from memory.
#[derive(Default)]
pub struct FakePluginSource {
    plugins: BTreeMap<String, Vec<u8>>,
}

impl FakePluginSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_plugin(mut self, name: &str, bytes: &[u8]) -> Self {
        self.plugins.insert(name.to_string(), bytes.to_vec());
        self
    }
}

#[async_trait]
impl PluginSource for FakePluginSource {
    async fn fetch(&self, plugin: &str) -> Result<Vec<u8>, PluginError> {
        self.plugins
            .get(plugin)
            .cloned()
            .ok_or_else(|| PluginError::NotAvailable(plugin.to_string()))
    }
}
