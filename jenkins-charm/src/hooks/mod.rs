// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Hook dispatch.
//!
//! The framework invokes the charm with a hook name; the name maps onto a
//! closed [`HookEvent`] enum and from there to a handler function. A
//! handler either completes, reports that required relation data has not
//! arrived yet (the framework redelivers the event later), or fails the
//! invocation.

mod extension;
mod install;
mod master;
#[cfg(test)]
mod testutil;
mod website;
mod zuul;

use crate::bootstrap::BootstrapError;
use crate::context::CharmContext;
use crate::credentials::CredentialsError;
use crate::hook_env::EnvError;
use crate::node::NodeError;
use crate::ownership::OwnershipError;
use crate::plugins::PluginError;
use host_utils::ExecutionError;
use slog_error_chain::SlogInlineError;
use std::str::FromStr;

/// The lifecycle events this charm responds to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HookEvent {
    Install,
    MasterRelationJoined,
    MasterRelationChanged,
    MasterRelationDeparted,
    MasterRelationBroken,
    WebsiteRelationJoined,
    ExtensionRelationJoined,
    ExtensionRelationChanged,
    ZuulRelationJoined,
}

impl HookEvent {
    pub const ALL: [HookEvent; 9] = [
        HookEvent::Install,
        HookEvent::MasterRelationJoined,
        HookEvent::MasterRelationChanged,
        HookEvent::MasterRelationDeparted,
        HookEvent::MasterRelationBroken,
        HookEvent::WebsiteRelationJoined,
        HookEvent::ExtensionRelationJoined,
        HookEvent::ExtensionRelationChanged,
        HookEvent::ZuulRelationJoined,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            HookEvent::Install => "install",
            HookEvent::MasterRelationJoined => "master-relation-joined",
            HookEvent::MasterRelationChanged => "master-relation-changed",
            HookEvent::MasterRelationDeparted => "master-relation-departed",
            HookEvent::MasterRelationBroken => "master-relation-broken",
            HookEvent::WebsiteRelationJoined => "website-relation-joined",
            HookEvent::ExtensionRelationJoined => "extension-relation-joined",
            HookEvent::ExtensionRelationChanged => {
                "extension-relation-changed"
            }
            HookEvent::ZuulRelationJoined => "zuul-relation-joined",
        }
    }
}

impl std::fmt::Display for HookEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, thiserror::Error)]
#[error("not a hook this charm handles: {0}")]
pub struct UnknownHookError(String);

impl FromStr for HookEvent {
    type Err = UnknownHookError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        HookEvent::ALL
            .iter()
            .find(|event| event.name() == s)
            .copied()
            .ok_or_else(|| UnknownHookError(s.to_string()))
    }
}

/// How a handler left things.
#[derive(Debug, PartialEq, Eq)]
pub enum HookOutcome {
    Complete,
    /// Required relation attributes were absent. Benign: the framework
    /// redelivers the event once the peer publishes them.
    Pending { missing: Vec<&'static str> },
}

#[derive(Debug, thiserror::Error, SlogInlineError)]
pub enum HookError {
    #[error(transparent)]
    Env(#[from] EnvError),
    #[error(transparent)]
    Credentials(#[from] CredentialsError),
    #[error(transparent)]
    Bootstrap(#[from] BootstrapError),
    #[error(transparent)]
    Plugins(#[from] PluginError),
    #[error(transparent)]
    Node(#[from] NodeError),
    #[error(transparent)]
    Service(#[from] ExecutionError),
    #[error(transparent)]
    Ownership(#[from] OwnershipError),
    #[error("failed to write {path}")]
    Io {
        path: camino::Utf8PathBuf,
        #[source]
        err: std::io::Error,
    },
    #[error("relation attribute {name} has unusable value {value:?}")]
    InvalidAttribute { name: &'static str, value: String },
}

/// Run the handler for `event`.
pub async fn dispatch(
    event: HookEvent,
    ctx: &CharmContext,
) -> Result<HookOutcome, HookError> {
    match event {
        HookEvent::Install => install::configure(ctx).await,
        HookEvent::MasterRelationJoined => master::joined(ctx).await,
        HookEvent::MasterRelationChanged => master::changed(ctx).await,
        HookEvent::MasterRelationDeparted => master::departed(ctx).await,
        HookEvent::MasterRelationBroken => master::broken(ctx).await,
        HookEvent::WebsiteRelationJoined => website::joined(ctx).await,
        HookEvent::ExtensionRelationJoined => extension::joined(ctx).await,
        HookEvent::ExtensionRelationChanged => extension::changed(ctx).await,
        HookEvent::ZuulRelationJoined => zuul::joined(ctx).await,
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn hook_names_round_trip() {
        for event in HookEvent::ALL {
            assert_eq!(event.name().parse::<HookEvent>().unwrap(), event);
        }
    }

    #[test]
    fn unknown_hooks_are_rejected() {
        let err = "update-status".parse::<HookEvent>().unwrap_err();
        assert!(err.to_string().contains("update-status"));
    }
}
