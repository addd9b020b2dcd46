// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Interfaces for working with the charm's configuration.

use camino::{Utf8Path, Utf8PathBuf};
use serde::Deserialize;

/// Configuration for the charm, supplied by the operator as a TOML file.
#[derive(Clone, Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Name of the Jenkins admin account the charm manages.
    #[serde(default = "default_username")]
    pub username: String,
    /// Admin password. A random one is generated and persisted when unset.
    pub password: Option<String>,
    /// Space-separated list of plugins to install at configuration time.
    #[serde(default)]
    pub plugins: String,
    /// Base URL plugins are downloaded from.
    #[serde(default = "default_plugins_site")]
    pub plugins_site: String,
    /// Whether plugin downloads verify the site's TLS certificate.
    #[serde(default = "default_true")]
    pub plugins_check_certificate: bool,
    /// Delete installed plugins that are no longer listed.
    #[serde(default)]
    pub remove_unlisted_plugins: bool,
    /// Number of executor slots on the master itself.
    #[serde(default = "default_master_executors")]
    pub master_executors: u32,
    /// Admin account forwarded to extension subordinates.
    pub jenkins_admin_user: Option<String>,
    /// API token forwarded to extension subordinates.
    pub jenkins_token: Option<String>,
    /// Jenkins state directory.
    #[serde(default = "default_jenkins_home")]
    pub jenkins_home: Utf8PathBuf,
    /// System account Jenkins runs as.
    #[serde(default = "default_system_user")]
    pub system_user: String,
    /// Primary group of the Jenkins system account.
    #[serde(default = "default_system_user")]
    pub system_group: String,
    /// Group owning rendered configuration files.
    #[serde(default = "default_config_group")]
    pub config_group: String,
}

fn default_username() -> String {
    "admin".to_string()
}

fn default_plugins_site() -> String {
    "https://updates.jenkins-ci.org/latest".to_string()
}

fn default_true() -> bool {
    true
}

fn default_master_executors() -> u32 {
    1
}

fn default_jenkins_home() -> Utf8PathBuf {
    "/var/lib/jenkins".into()
}

fn default_system_user() -> String {
    "jenkins".to_string()
}

fn default_config_group() -> String {
    "nogroup".to_string()
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config from {path}: {err}")]
    Io {
        path: Utf8PathBuf,
        #[source]
        err: std::io::Error,
    },
    #[error("Failed to parse config from {path}: {err}")]
    Parse {
        path: Utf8PathBuf,
        #[source]
        err: toml::de::Error,
    },
}

impl Config {
    pub fn from_file(path: &Utf8Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)
            .map_err(|err| ConfigError::Io { path: path.into(), err })?;
        let config = toml::from_str(&contents)
            .map_err(|err| ConfigError::Parse { path: path.into(), err })?;
        Ok(config)
    }

    /// The configured plugin list, split into individual plugin names.
    pub fn plugin_list(&self) -> Vec<String> {
        self.plugins.split_whitespace().map(str::to_string).collect()
    }
}
