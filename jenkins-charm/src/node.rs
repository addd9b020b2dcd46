// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Registration of build-slave nodes with the Jenkins master.
//!
//! Nodes are registered through the master's remote API on localhost using
//! the admin credential. Registration happens while the service may still be
//! settling after a restart, so it is retried briefly; the operations are
//! idempotent.

use crate::credentials::AdminCredential;
use crate::paths::JENKINS_PORT;
use async_trait::async_trait;
use slog::{debug, info, warn, Logger};
use slog_error_chain::{InlineErrorChain, SlogInlineError};
use std::time::Duration;

/// A build slave as registered with the master. Nothing is stored locally;
/// the master's node list is the only record.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SlaveNode {
    pub hostname: String,
    pub executors: u32,
    pub labels: String,
}

#[derive(Debug, thiserror::Error, SlogInlineError)]
pub enum NodeError {
    #[error("request to the jenkins master failed")]
    Request(#[source] reqwest::Error),
    #[error("jenkins master returned {status} for {url}")]
    Status { url: String, status: reqwest::StatusCode },
}

/// The master's view of its build slaves.
#[async_trait]
pub trait NodeRegistry: Send + Sync {
    async fn register(
        &self,
        node: &SlaveNode,
        cred: &AdminCredential,
    ) -> Result<(), NodeError>;

    async fn deregister(
        &self,
        hostname: &str,
        cred: &AdminCredential,
    ) -> Result<(), NodeError>;
}

const NODE_TYPE: &str = "hudson.slaves.DumbSlave$DescriptorImpl";

/// Talks to the Jenkins master's remote API.
pub struct JenkinsClient {
    base_url: String,
    client: reqwest::Client,
    log: Logger,
}

impl JenkinsClient {
    /// A client for the master running on this host.
    pub fn new(log: Logger) -> Self {
        Self::for_base_url(log, format!("http://localhost:{JENKINS_PORT}"))
    }

    pub fn for_base_url(log: Logger, base_url: String) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client: reqwest::Client::new(),
            log,
        }
    }

    async fn node_exists(
        &self,
        hostname: &str,
        cred: &AdminCredential,
    ) -> Result<bool, NodeError> {
        let url = format!("{}/computer/{}/api/json", self.base_url, hostname);
        let response = self
            .client
            .get(&url)
            .basic_auth(&cred.username, Some(&cred.password))
            .send()
            .await
            .map_err(NodeError::Request)?;
        let status = response.status();
        if status.is_success() {
            Ok(true)
        } else if status == reqwest::StatusCode::NOT_FOUND {
            Ok(false)
        } else {
            Err(NodeError::Status { url, status })
        }
    }

    async fn create_node(
        &self,
        node: &SlaveNode,
        cred: &AdminCredential,
    ) -> Result<(), NodeError> {
        let payload = serde_json::json!({
            "name": node.hostname,
            "nodeDescription": node.hostname,
            "numExecutors": node.executors,
            "remoteFS": "/home/jenkins",
            "labelString": node.labels,
            "mode": "NORMAL",
            "type": NODE_TYPE,
            "retentionStrategy": {
                "stapler-class": "hudson.slaves.RetentionStrategy$Always"
            },
            "nodeProperties": { "stapler-class-bag": "true" },
            "launcher": { "stapler-class": "hudson.slaves.JNLPLauncher" },
        });
        let payload = payload.to_string();
        let url = format!("{}/computer/doCreateItem", self.base_url);
        let response = self
            .client
            .post(&url)
            .basic_auth(&cred.username, Some(&cred.password))
            .form(&[
                ("name", node.hostname.as_str()),
                ("type", NODE_TYPE),
                ("json", payload.as_str()),
            ])
            .send()
            .await
            .map_err(NodeError::Request)?;
        let status = response.status();
        if !status.is_success() && status != reqwest::StatusCode::FOUND {
            return Err(NodeError::Status { url, status });
        }
        Ok(())
    }

    async fn delete_node(
        &self,
        hostname: &str,
        cred: &AdminCredential,
    ) -> Result<(), NodeError> {
        let url =
            format!("{}/computer/{}/doDelete", self.base_url, hostname);
        let response = self
            .client
            .post(&url)
            .basic_auth(&cred.username, Some(&cred.password))
            .send()
            .await
            .map_err(NodeError::Request)?;
        let status = response.status();
        if !status.is_success() && status != reqwest::StatusCode::FOUND {
            return Err(NodeError::Status { url, status });
        }
        Ok(())
    }
}

/// Backoff policy for node registration: the master may still be coming
/// back up after a restart, so retry a couple of times over a few seconds.
fn registration_policy() -> backoff::ExponentialBackoff {
    backoff::ExponentialBackoff {
        initial_interval: Duration::from_secs(2),
        multiplier: 2.0,
        max_interval: Duration::from_secs(4),
        max_elapsed_time: Some(Duration::from_secs(10)),
        ..backoff::ExponentialBackoff::default()
    }
}

#[async_trait]
impl NodeRegistry for JenkinsClient {
    async fn register(
        &self,
        node: &SlaveNode,
        cred: &AdminCredential,
    ) -> Result<(), NodeError> {
        backoff::future::retry_notify(
            registration_policy(),
            || async move {
                if self
                    .node_exists(&node.hostname, cred)
                    .await
                    .map_err(into_backoff_error)?
                {
                    debug!(self.log, "node exists - not adding";
                        "hostname" => &node.hostname);
                    return Ok(());
                }

                info!(self.log, "adding node to jenkins master";
                    "hostname" => &node.hostname,
                    "executors" => node.executors,
                    "labels" => &node.labels);
                self.create_node(node, cred)
                    .await
                    .map_err(into_backoff_error)?;

                if !self
                    .node_exists(&node.hostname, cred)
                    .await
                    .map_err(into_backoff_error)?
                {
                    warn!(self.log, "failed to create node";
                        "hostname" => &node.hostname);
                }
                Ok(())
            },
            |error, delay| {
                warn!(self.log, "node registration failed, will retry";
                    "error" => %InlineErrorChain::new(&error),
                    "delay" => ?delay);
            },
        )
        .await
    }

    async fn deregister(
        &self,
        hostname: &str,
        cred: &AdminCredential,
    ) -> Result<(), NodeError> {
        if self.node_exists(hostname, cred).await? {
            debug!(self.log, "deleting node"; "hostname" => hostname);
            self.delete_node(hostname, cred).await
        } else {
            info!(self.log, "node does not exist - not deleting";
                "hostname" => hostname);
            Ok(())
        }
    }
}

// Communication errors are worth retrying while the master settles; an
// HTTP-level rejection will not get better on its own.
fn into_backoff_error(err: NodeError) -> backoff::Error<NodeError> {
    match err {
        NodeError::Request(_) => backoff::Error::transient(err),
        NodeError::Status { .. } => backoff::Error::Permanent(err),
    }
}
