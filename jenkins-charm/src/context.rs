// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Shared state handed to every hook handler.

use crate::config::Config;
use crate::hook_env::{HookEnv, HookToolEnv};
use crate::node::{JenkinsClient, NodeRegistry};
use crate::ownership::{Ownership, OwnershipError};
use crate::paths::{JenkinsHome, JENKINS_SERVICE};
use crate::plugins::{PluginError, PluginSource, SitePluginSource};
use crate::service::{ServiceSupervisor, SystemdSupervisor};
use slog::Logger;
use slog_error_chain::SlogInlineError;
use std::sync::Arc;

#[derive(Debug, thiserror::Error, SlogInlineError)]
pub enum ContextError {
    #[error(transparent)]
    Ownership(#[from] OwnershipError),
    #[error(transparent)]
    Plugins(#[from] PluginError),
}

/// The uid/gid pairs applied to files the charm renders: the service's own
/// account for plugins, and the config group for rendered XML.
#[derive(Clone, Copy, Debug)]
pub struct JenkinsOwners {
    pub service: Ownership,
    pub config: Ownership,
}

impl JenkinsOwners {
    pub fn lookup(config: &Config) -> Result<Self, OwnershipError> {
        Ok(Self {
            service: Ownership::lookup(
                &config.system_user,
                &config.system_group,
            )?,
            config: Ownership::lookup(
                &config.system_user,
                &config.config_group,
            )?,
        })
    }
}

/// Everything a hook handler needs: configuration, the home directory
/// layout, and handles on the external collaborators.
pub struct CharmContext {
    config: Config,
    home: JenkinsHome,
    log: Logger,
    env: Arc<dyn HookEnv>,
    nodes: Arc<dyn NodeRegistry>,
    service: Arc<dyn ServiceSupervisor>,
    plugins: Arc<dyn PluginSource>,
    owners: Option<JenkinsOwners>,
}

impl CharmContext {
    /// Build a context wired to the real collaborators. Only callable from
    /// a hook invocation running as root on the Jenkins host.
    pub fn new(config: Config, log: Logger) -> Result<Self, ContextError> {
        let owners = JenkinsOwners::lookup(&config)?;
        let plugins = SitePluginSource::new(
            &config.plugins_site,
            config.plugins_check_certificate,
        )?;
        let nodes = JenkinsClient::new(
            log.new(slog::o!("component" => "jenkins-client")),
        );
        let home = JenkinsHome::new(config.jenkins_home.clone());
        Ok(Self {
            config,
            home,
            log,
            env: Arc::new(HookToolEnv::from_env()),
            nodes: Arc::new(nodes),
            service: Arc::new(SystemdSupervisor::new(JENKINS_SERVICE)),
            plugins: Arc::new(plugins),
            owners: Some(owners),
        })
    }

    /// Build a context from explicit collaborators.
    pub fn with_collaborators(
        config: Config,
        log: Logger,
        env: Arc<dyn HookEnv>,
        nodes: Arc<dyn NodeRegistry>,
        service: Arc<dyn ServiceSupervisor>,
        plugins: Arc<dyn PluginSource>,
        owners: Option<JenkinsOwners>,
    ) -> Self {
        let home = JenkinsHome::new(config.jenkins_home.clone());
        Self { config, home, log, env, nodes, service, plugins, owners }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn home(&self) -> &JenkinsHome {
        &self.home
    }

    pub fn log(&self) -> &Logger {
        &self.log
    }

    pub fn env(&self) -> &dyn HookEnv {
        &*self.env
    }

    pub fn nodes(&self) -> &dyn NodeRegistry {
        &*self.nodes
    }

    pub fn service(&self) -> &dyn ServiceSupervisor {
        &*self.service
    }

    pub fn plugin_source(&self) -> &dyn PluginSource {
        &*self.plugins
    }

    /// Ownership for plugin archives.
    pub fn service_owner(&self) -> Option<&Ownership> {
        self.owners.as_ref().map(|o| &o.service)
    }

    /// Ownership for rendered configuration files.
    pub fn config_owner(&self) -> Option<&Ownership> {
        self.owners.as_ref().map(|o| &o.config)
    }
}
