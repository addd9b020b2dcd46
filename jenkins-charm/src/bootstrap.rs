// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! One-time rendering of the master's `config.xml`.
//!
//! Administrators edit the live configuration through the Jenkins UI, so
//! the template is applied exactly once; a sentinel file records that the
//! bootstrap happened. Idempotence comes from the flag alone, not from the
//! rendering being safe to repeat.

use crate::ownership::{maybe_chown, Ownership, OwnershipError};
use crate::paths::JenkinsHome;
use camino::Utf8PathBuf;
use slog::{debug, Logger};
use slog_error_chain::SlogInlineError;

const MASTER_CONFIG_TEMPLATE: &str = r#"<?xml version='1.0' encoding='UTF-8'?>
<hudson>
  <disabledAdministrativeMonitors/>
  <version>1.0</version>
  <numExecutors>@MASTER_EXECUTORS@</numExecutors>
  <mode>NORMAL</mode>
  <useSecurity>true</useSecurity>
  <authorizationStrategy class="hudson.security.FullControlOnceLoggedInAuthorizationStrategy">
    <denyAnonymousReadAccess>true</denyAnonymousReadAccess>
  </authorizationStrategy>
  <securityRealm class="hudson.security.HudsonPrivateSecurityRealm">
    <disableSignup>true</disableSignup>
    <enableCaptcha>false</enableCaptcha>
  </securityRealm>
  <disableRememberMe>false</disableRememberMe>
  <projectNamingStrategy class="jenkins.model.ProjectNamingStrategy$DefaultProjectNamingStrategy"/>
  <workspaceDir>${ITEM_ROOTDIR}/workspace</workspaceDir>
  <buildsDir>${ITEM_ROOTDIR}/builds</buildsDir>
  <markupFormatter class="hudson.markup.EscapedMarkupFormatter"/>
  <jdks/>
  <viewsTabBar class="hudson.views.DefaultViewsTabBar"/>
  <myViewsTabBar class="hudson.views.DefaultMyViewsTabBar"/>
  <clouds/>
  <slaveAgentPort>0</slaveAgentPort>
  <label></label>
  <nodeProperties/>
  <globalNodeProperties/>
</hudson>
"#;

#[derive(Debug, thiserror::Error, SlogInlineError)]
pub enum BootstrapError {
    #[error("failed to write {path}")]
    Write {
        path: Utf8PathBuf,
        #[source]
        err: std::io::Error,
    },
    #[error(transparent)]
    Ownership(#[from] OwnershipError),
}

/// Render the master configuration unless the sentinel says it already
/// happened. Returns whether a render took place.
pub fn bootstrap_master_config(
    log: &Logger,
    home: &JenkinsHome,
    master_executors: u32,
    config_owner: Option<&Ownership>,
) -> Result<bool, BootstrapError> {
    let flag = home.bootstrap_flag();
    if flag.exists() {
        debug!(log, "master config already bootstrapped; leaving it alone";
            "flag" => %flag);
        return Ok(false);
    }

    debug!(log, "bootstrapping secure initial configuration");
    let dst = home.master_config();
    let rendered = MASTER_CONFIG_TEMPLATE
        .replace("@MASTER_EXECUTORS@", &master_executors.to_string());
    std::fs::write(&dst, rendered)
        .map_err(|err| BootstrapError::Write { path: dst.clone(), err })?;
    maybe_chown(config_owner, &dst)?;

    std::fs::write(&flag, "")
        .map_err(|err| BootstrapError::Write { path: flag.clone(), err })?;
    Ok(true)
}

#[cfg(test)]
mod test {
    use super::*;
    use camino_tempfile::Utf8TempDir;

    fn test_logger() -> Logger {
        Logger::root(slog::Discard, slog::o!())
    }

    #[test]
    fn renders_once_and_sets_the_flag() {
        let dir = Utf8TempDir::new().unwrap();
        let home = JenkinsHome::new(dir.path().to_owned());

        let rendered =
            bootstrap_master_config(&test_logger(), &home, 2, None).unwrap();
        assert!(rendered);
        assert!(home.bootstrap_flag().exists());

        let contents =
            std::fs::read_to_string(home.master_config()).unwrap();
        assert!(contents.contains("<numExecutors>2</numExecutors>"));
    }

    #[test]
    fn second_run_preserves_live_edits() {
        let dir = Utf8TempDir::new().unwrap();
        let home = JenkinsHome::new(dir.path().to_owned());

        assert!(
            bootstrap_master_config(&test_logger(), &home, 1, None).unwrap()
        );

        // Simulate an administrator editing the live config.
        std::fs::write(home.master_config(), "<hudson>edited</hudson>")
            .unwrap();

        let rendered =
            bootstrap_master_config(&test_logger(), &home, 1, None).unwrap();
        assert!(!rendered);
        assert_eq!(
            std::fs::read_to_string(home.master_config()).unwrap(),
            "<hudson>edited</hudson>"
        );
    }

    #[test]
    fn respects_a_preexisting_flag() {
        let dir = Utf8TempDir::new().unwrap();
        let home = JenkinsHome::new(dir.path().to_owned());
        std::fs::write(home.bootstrap_flag(), "").unwrap();

        let rendered =
            bootstrap_master_config(&test_logger(), &home, 1, None).unwrap();
        assert!(!rendered);
        assert!(!home.master_config().exists());
    }
}
