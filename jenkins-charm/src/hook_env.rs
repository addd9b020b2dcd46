// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Access to the orchestration framework from inside a hook.
//!
//! Every interaction with the framework (relation data, unit addresses,
//! opened ports, workload status) goes through the [`HookEnv`] trait. The
//! production implementation shells out to the hook tools the framework
//! puts on the PATH of a running hook; tests use
//! [`crate::fakes::FakeHookEnv`].

use async_trait::async_trait;
use host_utils::{execute_async, ExecutionError};
use serde::de::DeserializeOwned;
use slog_error_chain::SlogInlineError;
use std::collections::BTreeMap;
use tokio::process::Command;

#[derive(Debug, thiserror::Error, SlogInlineError)]
pub enum EnvError {
    #[error(transparent)]
    Exec(#[from] ExecutionError),
    #[error("failed to parse {tool} output")]
    Parse {
        tool: &'static str,
        #[source]
        err: serde_json::Error,
    },
    #[error("hook context is missing {0}")]
    MissingContext(&'static str),
}

/// Workload status reported back to the framework.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StatusState {
    Active,
    Blocked,
    Maintenance,
    Waiting,
}

impl StatusState {
    pub fn as_str(&self) -> &'static str {
        match self {
            StatusState::Active => "active",
            StatusState::Blocked => "blocked",
            StatusState::Maintenance => "maintenance",
            StatusState::Waiting => "waiting",
        }
    }
}

/// Node names derive from unit names; the framework's `/` separator is not
/// valid in a hostname.
pub fn unit_to_node_name(unit: &str) -> String {
    unit.replace('/', "-")
}

#[async_trait]
pub trait HookEnv: Send + Sync {
    /// Attributes published by the remote unit of the relation event being
    /// handled.
    async fn remote_settings(
        &self,
    ) -> Result<BTreeMap<String, String>, EnvError>;

    /// A single attribute published by `unit` on relation `relation_id`.
    /// `None` when the unit has not published it (or published it empty).
    async fn remote_attr(
        &self,
        relation_id: &str,
        unit: &str,
        name: &str,
    ) -> Result<Option<String>, EnvError>;

    /// Publish attributes on the relation the current event belongs to.
    async fn set_local(
        &self,
        settings: &[(&str, &str)],
    ) -> Result<(), EnvError>;

    /// Publish attributes on a specific relation.
    async fn set_for_relation(
        &self,
        relation_id: &str,
        settings: &[(&str, &str)],
    ) -> Result<(), EnvError>;

    /// Ids of all established relations with the given name.
    async fn relation_ids(
        &self,
        relation_name: &str,
    ) -> Result<Vec<String>, EnvError>;

    /// Ids of all relations with the same name as the current event's.
    async fn current_relation_ids(&self) -> Result<Vec<String>, EnvError>;

    /// Units on the far side of the given relation.
    async fn related_units(
        &self,
        relation_id: &str,
    ) -> Result<Vec<String>, EnvError>;

    /// The unit that triggered the current relation event, if any.
    fn remote_unit(&self) -> Option<String>;

    async fn private_address(&self) -> Result<String, EnvError>;

    async fn public_address(&self) -> Result<String, EnvError>;

    async fn open_port(&self, port: u16) -> Result<(), EnvError>;

    async fn set_status(
        &self,
        state: StatusState,
        message: &str,
    ) -> Result<(), EnvError>;
}

/// [`HookEnv`] backed by the framework's hook tools, which are only on the
/// PATH while a hook is executing.
pub struct HookToolEnv {
    relation_name: Option<String>,
    relation_id: Option<String>,
    remote_unit: Option<String>,
}

impl HookToolEnv {
    /// Capture the hook context the framework passes via the process
    /// environment.
    pub fn from_env() -> Self {
        Self {
            relation_name: std::env::var("JUJU_RELATION").ok(),
            relation_id: std::env::var("JUJU_RELATION_ID").ok(),
            remote_unit: std::env::var("JUJU_REMOTE_UNIT").ok(),
        }
    }

    fn relation_id(&self) -> Result<&str, EnvError> {
        self.relation_id
            .as_deref()
            .ok_or(EnvError::MissingContext("a relation id"))
    }
}

async fn tool_json<T: DeserializeOwned>(
    tool: &'static str,
    args: &[&str],
) -> Result<T, EnvError> {
    let mut cmd = Command::new(tool);
    cmd.arg("--format=json").args(args);
    let output = execute_async(&mut cmd).await?;
    serde_json::from_slice(&output.stdout)
        .map_err(|err| EnvError::Parse { tool, err })
}

async fn tool_run(
    tool: &'static str,
    args: &[&str],
) -> Result<(), EnvError> {
    let mut cmd = Command::new(tool);
    cmd.args(args);
    execute_async(&mut cmd).await?;
    Ok(())
}

fn value_to_string(value: serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s,
        other => other.to_string(),
    }
}

#[async_trait]
impl HookEnv for HookToolEnv {
    async fn remote_settings(
        &self,
    ) -> Result<BTreeMap<String, String>, EnvError> {
        let unit = self
            .remote_unit
            .as_deref()
            .ok_or(EnvError::MissingContext("a remote unit"))?;
        let raw: BTreeMap<String, serde_json::Value> =
            tool_json("relation-get", &["-", unit]).await?;
        Ok(raw.into_iter().map(|(k, v)| (k, value_to_string(v))).collect())
    }

    async fn remote_attr(
        &self,
        relation_id: &str,
        unit: &str,
        name: &str,
    ) -> Result<Option<String>, EnvError> {
        let mut cmd = Command::new("relation-get");
        cmd.args(["--format=json", "-r", relation_id, name, unit]);
        let output = execute_async(&mut cmd).await?;
        // An attribute the unit never published comes back as JSON null
        // (or nothing at all on older tool versions).
        if output.stdout.iter().all(u8::is_ascii_whitespace) {
            return Ok(None);
        }
        let value: Option<serde_json::Value> =
            serde_json::from_slice(&output.stdout)
                .map_err(|err| EnvError::Parse { tool: "relation-get", err })?;
        Ok(value.map(value_to_string).filter(|v| !v.is_empty()))
    }

    async fn set_local(
        &self,
        settings: &[(&str, &str)],
    ) -> Result<(), EnvError> {
        let relation_id = self.relation_id()?.to_string();
        self.set_for_relation(&relation_id, settings).await
    }

    async fn set_for_relation(
        &self,
        relation_id: &str,
        settings: &[(&str, &str)],
    ) -> Result<(), EnvError> {
        let assignments: Vec<String> = settings
            .iter()
            .map(|(key, value)| format!("{key}={value}"))
            .collect();
        let mut args = vec!["-r", relation_id];
        args.extend(assignments.iter().map(String::as_str));
        tool_run("relation-set", &args).await
    }

    async fn relation_ids(
        &self,
        relation_name: &str,
    ) -> Result<Vec<String>, EnvError> {
        tool_json("relation-ids", &[relation_name]).await
    }

    async fn current_relation_ids(&self) -> Result<Vec<String>, EnvError> {
        let name = self
            .relation_name
            .as_deref()
            .ok_or(EnvError::MissingContext("a relation name"))?;
        self.relation_ids(name).await
    }

    async fn related_units(
        &self,
        relation_id: &str,
    ) -> Result<Vec<String>, EnvError> {
        tool_json("relation-list", &["-r", relation_id]).await
    }

    fn remote_unit(&self) -> Option<String> {
        self.remote_unit.clone()
    }

    async fn private_address(&self) -> Result<String, EnvError> {
        tool_json("unit-get", &["private-address"]).await
    }

    async fn public_address(&self) -> Result<String, EnvError> {
        tool_json("unit-get", &["public-address"]).await
    }

    async fn open_port(&self, port: u16) -> Result<(), EnvError> {
        let spec = format!("{port}/tcp");
        tool_run("open-port", &[&spec]).await
    }

    async fn set_status(
        &self,
        state: StatusState,
        message: &str,
    ) -> Result<(), EnvError> {
        tool_run("status-set", &[state.as_str(), message]).await
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn unit_names_become_node_names() {
        assert_eq!(unit_to_node_name("jenkins-slave/0"), "jenkins-slave-0");
        assert_eq!(unit_to_node_name("builder"), "builder");
    }
}
