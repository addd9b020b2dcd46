// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Ownership applied to the files the charm writes.
//!
//! Hook invocations run as root; everything rendered under the Jenkins home
//! must end up owned by the Jenkins system account or the service cannot
//! read it. Tests run unprivileged and skip ownership entirely by not
//! supplying an [`Ownership`].

use camino::{Utf8Path, Utf8PathBuf};
use slog_error_chain::SlogInlineError;
use uzers::{get_group_by_name, get_user_by_name};

#[derive(Debug, thiserror::Error, SlogInlineError)]
pub enum OwnershipError {
    #[error("no such user: {0}")]
    UnknownUser(String),
    #[error("no such group: {0}")]
    UnknownGroup(String),
    #[error("failed to change ownership of {path}")]
    Chown {
        path: Utf8PathBuf,
        #[source]
        err: std::io::Error,
    },
}

/// A uid/gid pair resolved from the configured account names.
#[derive(Clone, Copy, Debug)]
pub struct Ownership {
    pub uid: u32,
    pub gid: u32,
}

impl Ownership {
    pub fn lookup(user: &str, group: &str) -> Result<Self, OwnershipError> {
        let uid = get_user_by_name(user)
            .ok_or_else(|| OwnershipError::UnknownUser(user.to_string()))?
            .uid();
        let gid = get_group_by_name(group)
            .ok_or_else(|| OwnershipError::UnknownGroup(group.to_string()))?
            .gid();
        Ok(Self { uid, gid })
    }

    pub fn apply(&self, path: &Utf8Path) -> Result<(), OwnershipError> {
        std::os::unix::fs::chown(path, Some(self.uid), Some(self.gid))
            .map_err(|err| OwnershipError::Chown { path: path.into(), err })
    }
}

/// Applies `owner` to `path` when ownership is in effect for this run.
pub fn maybe_chown(
    owner: Option<&Ownership>,
    path: &Utf8Path,
) -> Result<(), OwnershipError> {
    match owner {
        Some(owner) => owner.apply(path),
        None => Ok(()),
    }
}
