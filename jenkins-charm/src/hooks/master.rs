// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Handlers for the relation carrying build slaves.

use super::{HookError, HookOutcome};
use crate::context::CharmContext;
use crate::credentials::AdminCredential;
use crate::hook_env::unit_to_node_name;
use crate::node::SlaveNode;
use crate::paths::JENKINS_PORT;
use slog::{debug, info};

const REQUIRED_SETTINGS: [&str; 3] = ["executors", "labels", "slavehost"];

pub(super) async fn joined(
    ctx: &CharmContext,
) -> Result<HookOutcome, HookError> {
    let url =
        format!("http://{}:{}", ctx.env().private_address().await?, JENKINS_PORT);
    debug!(ctx.log(), "publishing master url"; "url" => &url);
    ctx.env().set_local(&[("url", &url)]).await?;
    Ok(HookOutcome::Complete)
}

pub(super) async fn changed(
    ctx: &CharmContext,
) -> Result<HookOutcome, HookError> {
    let cred = AdminCredential::retrieve(ctx.config(), ctx.home())?;

    // Export the credentials first so the slave can download
    // slave-agent.jnlp from the master.
    ctx.env()
        .set_local(&[
            ("username", &cred.username),
            ("password", &cred.password),
        ])
        .await?;

    let settings = ctx.env().remote_settings().await?;
    let missing: Vec<&'static str> = REQUIRED_SETTINGS
        .into_iter()
        .filter(|name| !settings.contains_key(*name))
        .collect();
    if !missing.is_empty() {
        info!(ctx.log(),
            "not all required relation settings received yet - skipping";
            "missing" => missing.join(", "));
        return Ok(HookOutcome::Pending { missing });
    }

    let slavehost = settings["slavehost"].clone();
    if slavehost.is_empty() {
        info!(ctx.log(), "slave host not yet defined - skipping");
        return Ok(HookOutcome::Pending { missing: vec!["slavehost"] });
    }
    let executors: u32 = settings["executors"].parse().map_err(|_| {
        HookError::InvalidAttribute {
            name: "executors",
            value: settings["executors"].clone(),
        }
    })?;

    debug!(ctx.log(), "adding slave"; "slavehost" => &slavehost);
    // Slaves are registered with twice their advertised executor count.
    let node = SlaveNode {
        hostname: slavehost.clone(),
        executors: executors * 2,
        labels: settings["labels"].clone(),
    };
    ctx.nodes().register(&node, &cred).await?;
    debug!(ctx.log(), "slave node added"; "slavehost" => &slavehost);
    Ok(HookOutcome::Complete)
}

pub(super) async fn departed(
    ctx: &CharmContext,
) -> Result<HookOutcome, HookError> {
    // The slave's node name derives from its unit name, so the departing
    // unit tells us exactly which node to drop.
    let Some(unit) = ctx.env().remote_unit() else {
        info!(ctx.log(), "no departing unit in the hook context - skipping");
        return Ok(HookOutcome::Pending { missing: vec!["remote-unit"] });
    };
    let cred = AdminCredential::retrieve(ctx.config(), ctx.home())?;
    let slavehost = unit_to_node_name(&unit);
    debug!(ctx.log(), "deleting slave"; "slavehost" => &slavehost);
    ctx.nodes().deregister(&slavehost, &cred).await?;
    Ok(HookOutcome::Complete)
}

pub(super) async fn broken(
    ctx: &CharmContext,
) -> Result<HookOutcome, HookError> {
    let cred = AdminCredential::retrieve(ctx.config(), ctx.home())?;

    for relation_id in ctx.env().current_relation_ids().await? {
        for unit in ctx.env().related_units(&relation_id).await? {
            let node = unit_to_node_name(&unit);
            debug!(ctx.log(), "removing node from jenkins master";
                "node" => &node);
            ctx.nodes().deregister(&node, &cred).await?;
        }
    }
    Ok(HookOutcome::Complete)
}
