// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Plugin installation for the Jenkins master.
//!
//! Plugins arrive as `.hpi` archives fetched from a configured site and
//! dropped into the plugins directory; Jenkins picks them up at the next
//! service start. Plugins already on disk but absent from the requested
//! list are deleted only when the operator opted in.

use crate::ownership::{maybe_chown, Ownership, OwnershipError};
use crate::paths::JenkinsHome;
use async_trait::async_trait;
use camino::Utf8PathBuf;
use slog::{debug, info, Logger};
use slog_error_chain::SlogInlineError;
use std::collections::BTreeSet;
use std::io::Write;
use std::os::unix::fs::{OpenOptionsExt, PermissionsExt};

#[derive(Debug, thiserror::Error, SlogInlineError)]
pub enum PluginError {
    #[error("failed to build plugin download client")]
    Client(#[source] reqwest::Error),
    #[error("failed to fetch plugin from {url}")]
    Fetch {
        url: String,
        #[source]
        err: reqwest::Error,
    },
    #[error("plugin site returned {status} for {url}")]
    FetchStatus { url: String, status: reqwest::StatusCode },
    #[error("plugin not available: {0}")]
    NotAvailable(String),
    #[error("I/O error on {path}")]
    Io {
        path: Utf8PathBuf,
        #[source]
        err: std::io::Error,
    },
    #[error(transparent)]
    Ownership(#[from] OwnershipError),
}

/// Where plugin archives come from. Production downloads them from the
/// configured plugin site; tests supply canned bytes.
#[async_trait]
pub trait PluginSource: Send + Sync {
    async fn fetch(&self, plugin: &str) -> Result<Vec<u8>, PluginError>;
}

/// Downloads `.hpi` archives from a plugin site over HTTP(S).
pub struct SitePluginSource {
    base_url: String,
    client: reqwest::Client,
}

impl SitePluginSource {
    pub fn new(
        base_url: &str,
        check_certificate: bool,
    ) -> Result<Self, PluginError> {
        let client = reqwest::ClientBuilder::new()
            .danger_accept_invalid_certs(!check_certificate)
            .build()
            .map_err(PluginError::Client)?;
        Ok(Self { base_url: base_url.trim_end_matches('/').to_string(), client })
    }
}

#[async_trait]
impl PluginSource for SitePluginSource {
    async fn fetch(&self, plugin: &str) -> Result<Vec<u8>, PluginError> {
        let url = format!("{}/{}.hpi", self.base_url, plugin);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|err| PluginError::Fetch { url: url.clone(), err })?;
        let status = response.status();
        if !status.is_success() {
            return Err(PluginError::FetchStatus { url, status });
        }
        let bytes = response
            .bytes()
            .await
            .map_err(|err| PluginError::Fetch { url: url.clone(), err })?;
        Ok(bytes.to_vec())
    }
}

/// What a plugin installation run did.
#[derive(Debug, Default)]
pub struct PluginReport {
    pub installed: Vec<String>,
    pub already_present: Vec<String>,
    pub removed: Vec<String>,
    pub unlisted: Vec<String>,
}

impl PluginReport {
    /// Whether the run changed anything Jenkins would need a restart to
    /// pick up.
    pub fn changed(&self) -> bool {
        !self.installed.is_empty() || !self.removed.is_empty()
    }
}

/// Install `plugins` into the Jenkins plugins directory.
pub async fn install_plugins(
    log: &Logger,
    home: &JenkinsHome,
    source: &dyn PluginSource,
    plugins: &[String],
    remove_unlisted: bool,
    service_owner: Option<&Ownership>,
) -> Result<PluginReport, PluginError> {
    debug!(log, "installing plugins"; "plugins" => plugins.join(" "));

    let plugins_dir = home.plugins_dir();
    if !plugins_dir.is_dir() {
        std::fs::create_dir_all(&plugins_dir).map_err(|err| {
            PluginError::Io { path: plugins_dir.clone(), err }
        })?;
    }
    std::fs::set_permissions(
        &plugins_dir,
        std::fs::Permissions::from_mode(0o755),
    )
    .map_err(|err| PluginError::Io { path: plugins_dir.clone(), err })?;
    maybe_chown(service_owner, &plugins_dir)?;

    // Record what is on disk before this run so anything the requested list
    // does not account for can be reported afterwards.
    let mut unaccounted = installed_plugins(home)?;

    let mut report = PluginReport::default();
    for plugin in plugins {
        let path = home.plugin_file(plugin);
        if path.is_file() {
            debug!(log, "plugin already installed"; "plugin" => plugin);
            report.already_present.push(plugin.clone());
        } else {
            debug!(log, "installing plugin"; "plugin" => plugin);
            let bytes = source.fetch(plugin).await?;
            let mut fd = std::fs::OpenOptions::new()
                .write(true)
                .create(true)
                .truncate(true)
                .mode(0o744)
                .open(&path)
                .map_err(|err| PluginError::Io { path: path.clone(), err })?;
            fd.write_all(&bytes)
                .map_err(|err| PluginError::Io { path: path.clone(), err })?;
            maybe_chown(service_owner, &path)?;
            report.installed.push(plugin.clone());
        }
        unaccounted.remove(plugin);
    }

    for plugin in unaccounted {
        if remove_unlisted {
            let path = home.plugin_file(&plugin);
            info!(log, "deleting unlisted plugin"; "plugin" => &plugin);
            std::fs::remove_file(&path)
                .map_err(|err| PluginError::Io { path, err })?;
            report.removed.push(plugin);
        } else {
            report.unlisted.push(plugin);
        }
    }
    if !report.unlisted.is_empty() {
        info!(
            log,
            "unlisted plugins present; set remove_unlisted_plugins to clear \
             them away";
            "plugins" => report.unlisted.join(", "),
        );
    }

    Ok(report)
}

fn installed_plugins(
    home: &JenkinsHome,
) -> Result<BTreeSet<String>, PluginError> {
    let plugins_dir = home.plugins_dir();
    let mut found = BTreeSet::new();
    let entries = std::fs::read_dir(&plugins_dir)
        .map_err(|err| PluginError::Io { path: plugins_dir.clone(), err })?;
    for entry in entries {
        let entry = entry
            .map_err(|err| PluginError::Io { path: plugins_dir.clone(), err })?;
        let name = entry.file_name();
        let name = name.to_string_lossy();
        if let Some(stem) = name.strip_suffix(".hpi") {
            found.insert(stem.to_string());
        }
    }
    Ok(found)
}
