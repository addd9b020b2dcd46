// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Handler for the Zuul/Gearman job-distribution relation.

use super::{extension, HookError, HookOutcome};
use crate::context::CharmContext;
use crate::ownership::maybe_chown;
use crate::paths::GEARMAN_PORT;
use crate::plugins::install_plugins;
use slog::info;

/// Plugins the Gearman integration needs on the master.
const REQUIRED_PLUGINS: [&str; 6] = [
    "credentials",
    "ssh-credentials",
    "ssh-agent",
    "gearman-plugin",
    "git-client",
    "git",
];

const GEARMAN_CONFIG_TEMPLATE: &str = "\
<hudson.plugins.gearman.GearmanPluginConfig>
  <enablePlugin>true</enablePlugin>
  <host>@HOST@</host>
  <port>@PORT@</port>
</hudson.plugins.gearman.GearmanPluginConfig>
";

pub(super) async fn joined(
    ctx: &CharmContext,
) -> Result<HookOutcome, HookError> {
    info!(ctx.log(),
        "installing and configuring gearman plugin for zuul communication");

    let settings = ctx.env().remote_settings().await?;
    let Some(address) = settings
        .get("private-address")
        .filter(|address| !address.is_empty())
    else {
        info!(ctx.log(), "zuul unit has no address yet - skipping");
        return Ok(HookOutcome::Pending { missing: vec!["private-address"] });
    };

    let plugins: Vec<String> =
        REQUIRED_PLUGINS.iter().map(|p| p.to_string()).collect();
    install_plugins(
        ctx.log(),
        ctx.home(),
        ctx.plugin_source(),
        &plugins,
        ctx.config().remove_unlisted_plugins,
        ctx.service_owner(),
    )
    .await?;

    // Point the plugin at the remote Gearman server.
    let config_path = ctx.home().gearman_config();
    let rendered = GEARMAN_CONFIG_TEMPLATE
        .replace("@HOST@", address)
        .replace("@PORT@", &GEARMAN_PORT.to_string());
    std::fs::write(&config_path, rendered).map_err(|err| HookError::Io {
        path: config_path.clone(),
        err,
    })?;
    maybe_chown(ctx.config_owner(), &config_path)?;

    ctx.service().restart().await?;

    // Extension peers carry the zuul address too; refresh them now that it
    // changed.
    extension::joined(ctx).await
}
