// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Layout of the Jenkins home directory.

use camino::{Utf8Path, Utf8PathBuf};

/// Port the Jenkins web UI listens on.
pub const JENKINS_PORT: u16 = 8080;

/// Port of the Gearman server embedded in a Zuul deployment.
pub const GEARMAN_PORT: u16 = 4730;

/// Name of the systemd unit running the Jenkins master.
pub const JENKINS_SERVICE: &str = "jenkins";

const PASSWORD_FILE: &str = ".admin_password";
const BOOTSTRAP_FLAG: &str = "config.bootstrapped";
const GEARMAN_CONFIG_FILE: &str =
    "hudson.plugins.gearman.GearmanPluginConfig.xml";

/// Derives the paths the charm touches underneath the Jenkins home
/// directory.
///
/// Everything the charm writes lives under this directory and is owned by
/// the Jenkins system user.
#[derive(Clone, Debug)]
pub struct JenkinsHome {
    root: Utf8PathBuf,
}

impl JenkinsHome {
    pub fn new(root: Utf8PathBuf) -> Self {
        Self { root }
    }

    pub fn root(&self) -> &Utf8Path {
        &self.root
    }

    /// Private file holding the admin user's plaintext password.
    pub fn password_file(&self) -> Utf8PathBuf {
        self.root.join(PASSWORD_FILE)
    }

    pub fn users_dir(&self) -> Utf8PathBuf {
        self.root.join("users")
    }

    pub fn user_dir(&self, username: &str) -> Utf8PathBuf {
        self.users_dir().join(username)
    }

    /// Per-user `config.xml` holding the salted password hash.
    pub fn user_config(&self, username: &str) -> Utf8PathBuf {
        self.user_dir(username).join("config.xml")
    }

    /// The master's top-level `config.xml`, rendered once at bootstrap.
    pub fn master_config(&self) -> Utf8PathBuf {
        self.root.join("config.xml")
    }

    /// Sentinel file recording that the master config was rendered.
    pub fn bootstrap_flag(&self) -> Utf8PathBuf {
        self.root.join(BOOTSTRAP_FLAG)
    }

    pub fn plugins_dir(&self) -> Utf8PathBuf {
        self.root.join("plugins")
    }

    pub fn plugin_file(&self, plugin: &str) -> Utf8PathBuf {
        self.plugins_dir().join(format!("{plugin}.hpi"))
    }

    /// Configuration snippet consumed by the Gearman plugin.
    pub fn gearman_config(&self) -> Utf8PathBuf {
        self.root.join(GEARMAN_CONFIG_FILE)
    }
}
