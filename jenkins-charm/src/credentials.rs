// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Provisioning of the Jenkins admin credential.
//!
//! The plaintext password lives in a root-only file under the Jenkins home;
//! Jenkins itself only ever sees the salted SHA-256 digest rendered into the
//! admin user's `config.xml`.

use crate::config::Config;
use crate::ownership::{maybe_chown, Ownership, OwnershipError};
use crate::paths::JenkinsHome;
use camino::Utf8PathBuf;
use rand::distributions::Alphanumeric;
use rand::Rng;
use sha2::{Digest, Sha256};
use slog::{debug, Logger};
use slog_error_chain::SlogInlineError;
use std::io::Write;
use std::os::unix::fs::{DirBuilderExt, OpenOptionsExt, PermissionsExt};

/// Length of a generated admin password.
const PASSWORD_LENGTH: usize = 15;

/// Length of the salt mixed into the persisted digest.
const SALT_LENGTH: usize = 6;

const USER_CONFIG_TEMPLATE: &str = r#"<?xml version='1.0' encoding='UTF-8'?>
<user>
  <fullName>@USERNAME@</fullName>
  <properties>
    <hudson.security.HudsonPrivateSecurityRealm_-Details>
      <passwordHash>@PASSWORD_HASH@</passwordHash>
    </hudson.security.HudsonPrivateSecurityRealm_-Details>
    <hudson.tasks.Mailer_-UserProperty>
      <emailAddress></emailAddress>
    </hudson.tasks.Mailer_-UserProperty>
  </properties>
</user>
"#;

#[derive(Debug, thiserror::Error, SlogInlineError)]
pub enum CredentialsError {
    #[error("failed to read {path}")]
    Read {
        path: Utf8PathBuf,
        #[source]
        err: std::io::Error,
    },
    #[error("failed to write {path}")]
    Write {
        path: Utf8PathBuf,
        #[source]
        err: std::io::Error,
    },
    #[error("failed to create directory {path}")]
    CreateDir {
        path: Utf8PathBuf,
        #[source]
        err: std::io::Error,
    },
    #[error(transparent)]
    Ownership(#[from] OwnershipError),
}

/// The admin account the charm manages, in the clear.
///
/// Handed to the node registry and to relation peers; never logged.
#[derive(Clone)]
pub struct AdminCredential {
    pub username: String,
    pub password: String,
}

impl AdminCredential {
    /// Resolve the credential for initial provisioning: the configured
    /// password wins, then a previously persisted one, then a freshly
    /// generated random password.
    pub fn resolve(
        config: &Config,
        home: &JenkinsHome,
    ) -> Result<Self, CredentialsError> {
        let password = match &config.password {
            Some(password) => password.clone(),
            None => {
                let path = home.password_file();
                if path.exists() {
                    read_trimmed(&path)?
                } else {
                    generate_password()
                }
            }
        };
        Ok(Self { username: config.username.clone(), password })
    }

    /// Retrieve the credential for use by relation handlers. Unlike
    /// [`AdminCredential::resolve`] this never generates a password; the
    /// install hook must have run first.
    pub fn retrieve(
        config: &Config,
        home: &JenkinsHome,
    ) -> Result<Self, CredentialsError> {
        let password = match &config.password {
            Some(password) => password.clone(),
            None => read_trimmed(&home.password_file())?,
        };
        Ok(Self { username: config.username.clone(), password })
    }
}

fn read_trimmed(path: &Utf8PathBuf) -> Result<String, CredentialsError> {
    let contents = std::fs::read_to_string(path)
        .map_err(|err| CredentialsError::Read { path: path.clone(), err })?;
    Ok(contents.trim().to_string())
}

fn generate_password() -> String {
    random_alphanumeric(PASSWORD_LENGTH)
}

fn generate_salt() -> String {
    random_alphanumeric(SALT_LENGTH)
}

fn random_alphanumeric(len: usize) -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(len)
        .map(char::from)
        .collect()
}

/// Compute the digest Jenkins' private security realm expects: the SHA-256
/// of `password{salt}`, stored as `salt:digest`.
pub fn salted_hash(password: &str, salt: &str) -> String {
    let digest = Sha256::digest(format!("{password}{{{salt}}}").as_bytes());
    format!("{}:{}", salt, hex::encode(digest))
}

/// Persist the plaintext password and render the admin user's `config.xml`.
///
/// The password file is created with mode 0600. The per-user directory is
/// created with mode 0700 when missing. Re-rendering the user config
/// overwrites any changes made through the Jenkins UI.
pub fn provision_admin_user(
    log: &Logger,
    home: &JenkinsHome,
    cred: &AdminCredential,
    config_owner: Option<&Ownership>,
) -> Result<(), CredentialsError> {
    debug!(log, "configuring the jenkins admin user";
        "username" => &cred.username);

    let password_file = home.password_file();
    let mut fd = std::fs::OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .mode(0o600)
        .open(&password_file)
        .map_err(|err| CredentialsError::Write {
            path: password_file.clone(),
            err,
        })?;
    fd.write_all(cred.password.as_bytes()).map_err(|err| {
        CredentialsError::Write { path: password_file.clone(), err }
    })?;
    // A file surviving from an earlier run keeps whatever mode it had;
    // clamp it every time.
    std::fs::set_permissions(
        &password_file,
        std::fs::Permissions::from_mode(0o600),
    )
    .map_err(|err| CredentialsError::Write {
        path: password_file.clone(),
        err,
    })?;

    let salty_password = salted_hash(&cred.password, &generate_salt());

    let user_dir = home.user_dir(&cred.username);
    if !user_dir.is_dir() {
        std::fs::DirBuilder::new()
            .recursive(true)
            .mode(0o700)
            .create(&user_dir)
            .map_err(|err| CredentialsError::CreateDir {
                path: user_dir.clone(),
                err,
            })?;
        maybe_chown(config_owner, &home.users_dir())?;
        maybe_chown(config_owner, &user_dir)?;
    }

    let user_config = home.user_config(&cred.username);
    let rendered = USER_CONFIG_TEMPLATE
        .replace("@USERNAME@", &cred.username)
        .replace("@PASSWORD_HASH@", &salty_password);
    std::fs::write(&user_config, rendered).map_err(|err| {
        CredentialsError::Write { path: user_config.clone(), err }
    })?;
    maybe_chown(config_owner, &user_config)?;

    debug!(log, "wrote admin user config"; "path" => %user_config);
    Ok(())
}

#[cfg(test)]
mod test {
    use super::*;
    use camino_tempfile::Utf8TempDir;
    use std::os::unix::fs::PermissionsExt;

    fn test_config(password: Option<&str>) -> Config {
        let toml = match password {
            Some(p) => format!("password = \"{p}\"\n"),
            None => String::new(),
        };
        toml::from_str(&toml).unwrap()
    }

    fn test_logger() -> Logger {
        Logger::root(slog::Discard, slog::o!())
    }

    #[test]
    fn salted_hash_is_deterministic() {
        assert_eq!(
            salted_hash("abc", "123456"),
            "123456:9afe7a1cb6c59a6562400dd53e31ebb0\
             8079563c789d5f70f15af1c85d62e9f9",
        );
        assert_eq!(salted_hash("abc", "123456"), salted_hash("abc", "123456"));
    }

    #[test]
    fn password_file_has_owner_only_permissions() {
        let dir = Utf8TempDir::new().unwrap();
        let home = JenkinsHome::new(dir.path().to_owned());
        let config = test_config(Some("swordfish"));

        let cred = AdminCredential::resolve(&config, &home).unwrap();
        provision_admin_user(&test_logger(), &home, &cred, None).unwrap();

        let path = home.password_file();
        let mode = std::fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "swordfish");
    }

    #[test]
    fn generated_password_is_persisted_and_reused() {
        let dir = Utf8TempDir::new().unwrap();
        let home = JenkinsHome::new(dir.path().to_owned());
        let config = test_config(None);

        let first = AdminCredential::resolve(&config, &home).unwrap();
        assert_eq!(first.password.len(), 15);
        assert!(first.password.chars().all(|c| c.is_ascii_alphanumeric()));
        provision_admin_user(&test_logger(), &home, &first, None).unwrap();

        // A second resolution picks up the persisted password rather than
        // generating a new one.
        let second = AdminCredential::resolve(&config, &home).unwrap();
        assert_eq!(first.password, second.password);

        let retrieved = AdminCredential::retrieve(&config, &home).unwrap();
        assert_eq!(retrieved.password, first.password);
    }

    #[test]
    fn configured_password_wins_over_persisted_one() {
        let dir = Utf8TempDir::new().unwrap();
        let home = JenkinsHome::new(dir.path().to_owned());
        std::fs::write(home.password_file(), "stale").unwrap();

        let config = test_config(Some("fresh"));
        let cred = AdminCredential::retrieve(&config, &home).unwrap();
        assert_eq!(cred.password, "fresh");
    }

    #[test]
    fn user_config_substitutes_credential_placeholders() {
        let dir = Utf8TempDir::new().unwrap();
        let home = JenkinsHome::new(dir.path().to_owned());
        let config = test_config(Some("abc"));

        let cred = AdminCredential::resolve(&config, &home).unwrap();
        provision_admin_user(&test_logger(), &home, &cred, None).unwrap();

        let rendered =
            std::fs::read_to_string(home.user_config("admin")).unwrap();
        assert!(rendered.contains("<fullName>admin</fullName>"));
        assert!(!rendered.contains('@'));
        // salt:digest, salt six alphanumeric characters, digest 64 hex.
        let hash = rendered
            .split("<passwordHash>")
            .nth(1)
            .and_then(|s| s.split("</passwordHash>").next())
            .unwrap();
        let (salt, digest) = hash.split_once(':').unwrap();
        assert_eq!(salt.len(), 6);
        assert_eq!(digest.len(), 64);
        assert_eq!(salted_hash("abc", salt), hash);

        let mode = std::fs::metadata(home.user_dir("admin"))
            .unwrap()
            .permissions()
            .mode();
        assert_eq!(mode & 0o777, 0o700);
    }

    #[test]
    fn retrieve_fails_before_provisioning() {
        let dir = Utf8TempDir::new().unwrap();
        let home = JenkinsHome::new(dir.path().to_owned());
        let config = test_config(None);
        match AdminCredential::retrieve(&config, &home) {
            Err(CredentialsError::Read { .. }) => (),
            _ => panic!("expected a read error"),
        }
    }
}
