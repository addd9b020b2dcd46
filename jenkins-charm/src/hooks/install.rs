// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Initial configuration of the Jenkins master.

use super::{HookError, HookOutcome};
use crate::bootstrap::bootstrap_master_config;
use crate::context::CharmContext;
use crate::credentials::{provision_admin_user, AdminCredential};
use crate::hook_env::StatusState;
use crate::paths::JENKINS_PORT;
use crate::plugins::install_plugins;
use slog::debug;

pub(super) async fn configure(
    ctx: &CharmContext,
) -> Result<HookOutcome, HookError> {
    let log = ctx.log();

    let cred = AdminCredential::resolve(ctx.config(), ctx.home())?;
    provision_admin_user(log, ctx.home(), &cred, ctx.config_owner())?;

    bootstrap_master_config(
        log,
        ctx.home(),
        ctx.config().master_executors,
        ctx.config_owner(),
    )?;

    // Plugins dropped in while the service runs would only confuse it; the
    // stop/start bracket also picks up the bootstrapped configuration.
    debug!(log, "stopping jenkins for plugin update(s)");
    ctx.service().stop().await?;
    install_plugins(
        log,
        ctx.home(),
        ctx.plugin_source(),
        &ctx.config().plugin_list(),
        ctx.config().remove_unlisted_plugins,
        ctx.service_owner(),
    )
    .await?;
    debug!(log, "starting jenkins to pick up configuration changes");
    ctx.service().start().await?;

    ctx.env().open_port(JENKINS_PORT).await?;
    let uri = format!(
        "http://{}:{}",
        ctx.env().public_address().await?,
        JENKINS_PORT
    );
    ctx.env()
        .set_status(StatusState::Active, &format!("Jenkins URI: {uri}"))
        .await?;
    Ok(HookOutcome::Complete)
}

#[cfg(test)]
mod test {
    use super::super::testutil::Harness;
    use super::*;
    use crate::fakes::{FakeHookEnv, FakePluginSource, ServiceAction};

    #[tokio::test]
    async fn configures_the_master_end_to_end() {
        let env = FakeHookEnv::new();
        let source = FakePluginSource::new()
            .with_plugin("git", b"git")
            .with_plugin("gearman-plugin", b"gearman");
        let harness = Harness::with_source_and_config(
            env,
            source,
            "plugins = \"git gearman-plugin\"\n",
        );

        let outcome = configure(&harness.ctx).await.unwrap();
        assert_eq!(outcome, HookOutcome::Complete);

        let home = harness.ctx.home();
        assert!(home.password_file().exists());
        assert!(home.user_config("admin").exists());
        assert!(home.bootstrap_flag().exists());
        assert!(home.plugin_file("git").exists());
        assert!(home.plugin_file("gearman-plugin").exists());

        assert_eq!(
            harness.service.actions(),
            vec![ServiceAction::Stop, ServiceAction::Start]
        );
        assert_eq!(harness.env.opened_ports(), vec![JENKINS_PORT]);
        let statuses = harness.env.statuses();
        assert_eq!(statuses.len(), 1);
        assert_eq!(statuses[0].0, StatusState::Active);
        assert!(statuses[0].1.contains("http://203.0.113.1:8080"));
    }

    #[tokio::test]
    async fn reconfiguring_preserves_the_bootstrapped_config() {
        let harness = Harness::new(FakeHookEnv::new());

        configure(&harness.ctx).await.unwrap();
        let home = harness.ctx.home();
        std::fs::write(home.master_config(), "<hudson>edited</hudson>")
            .unwrap();

        configure(&harness.ctx).await.unwrap();
        assert_eq!(
            std::fs::read_to_string(home.master_config()).unwrap(),
            "<hudson>edited</hudson>"
        );
    }
}
