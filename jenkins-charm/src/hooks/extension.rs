// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Handlers for the CI-extension subordinate relation.

use super::{HookError, HookOutcome};
use crate::context::CharmContext;
use crate::credentials::AdminCredential;
use crate::paths::JENKINS_PORT;
use crate::plugins::install_plugins;
use slog::{debug, info};

pub(super) async fn joined(
    ctx: &CharmContext,
) -> Result<HookOutcome, HookError> {
    debug!(ctx.log(), "updating extension relations with current data");

    // Fish the current zuul address out of any zuul relation we have.
    let mut zuul_address = None;
    for relation_id in ctx.env().relation_ids("zuul").await? {
        for unit in ctx.env().related_units(&relation_id).await? {
            if let Some(address) = ctx
                .env()
                .remote_attr(&relation_id, &unit, "private-address")
                .await?
            {
                zuul_address = Some(address);
            }
        }
    }

    let cred = AdminCredential::retrieve(ctx.config(), ctx.home())?;
    let url = format!(
        "http://{}:{}",
        ctx.env().private_address().await?,
        JENKINS_PORT
    );

    for relation_id in ctx.env().relation_ids("extension").await? {
        let mut settings: Vec<(&str, &str)> = vec![
            ("admin_username", &cred.username),
            ("admin_password", &cred.password),
            ("jenkins_url", &url),
        ];
        if let Some(user) = &ctx.config().jenkins_admin_user {
            settings.push(("jenkins-admin-user", user));
        }
        if let Some(token) = &ctx.config().jenkins_token {
            settings.push(("jenkins-token", token));
        }
        ctx.env().set_for_relation(&relation_id, &settings).await?;

        if let Some(address) = &zuul_address {
            ctx.env()
                .set_for_relation(&relation_id, &[("zuul_address", address)])
                .await?;
        }
    }
    Ok(HookOutcome::Complete)
}

pub(super) async fn changed(
    ctx: &CharmContext,
) -> Result<HookOutcome, HookError> {
    // Extension subordinates may ask the principal to install specific
    // plugins on their behalf.
    let settings = ctx.env().remote_settings().await?;
    let Some(required) = settings
        .get("required_plugins")
        .filter(|value| !value.trim().is_empty())
    else {
        return Ok(HookOutcome::Complete);
    };

    info!(ctx.log(), "installing plugins requested by extension subordinate";
        "plugins" => required);
    let plugins: Vec<String> =
        required.split_whitespace().map(str::to_string).collect();
    let report = install_plugins(
        ctx.log(),
        ctx.home(),
        ctx.plugin_source(),
        &plugins,
        ctx.config().remove_unlisted_plugins,
        ctx.service_owner(),
    )
    .await?;
    if report.changed() {
        ctx.service().restart().await?;
    }
    Ok(HookOutcome::Complete)
}

#[cfg(test)]
mod test {
    use super::super::testutil::Harness;
    use super::*;
    use crate::fakes::{FakeHookEnv, FakePluginSource, ServiceAction};

    #[tokio::test]
    async fn joined_publishes_credentials_to_every_extension_relation() {
        let env = FakeHookEnv::new()
            .with_private_address("10.1.1.1")
            .with_relation("extension", "extension:0")
            .with_relation("extension", "extension:1");
        let harness = Harness::with_config(
            env,
            "jenkins_admin_user = \"zuul\"\njenkins_token = \"tok3n\"\n",
        );

        let outcome = joined(&harness.ctx).await.unwrap();
        assert_eq!(outcome, HookOutcome::Complete);

        for relation_id in ["extension:0", "extension:1"] {
            let published = harness.env.published_for(relation_id);
            assert_eq!(published.get("admin_username").unwrap(), "admin");
            assert_eq!(published.get("admin_password").unwrap(), "sekrit");
            assert_eq!(
                published.get("jenkins_url").unwrap(),
                "http://10.1.1.1:8080"
            );
            assert_eq!(published.get("jenkins-admin-user").unwrap(), "zuul");
            assert_eq!(published.get("jenkins-token").unwrap(), "tok3n");
            assert!(!published.contains_key("zuul_address"));
        }
    }

    #[tokio::test]
    async fn joined_includes_zuul_address_when_a_zuul_unit_exists() {
        let env = FakeHookEnv::new()
            .with_relation("extension", "extension:0")
            .with_relation_unit(
                "zuul",
                "zuul:2",
                "zuul/0",
                &[("private-address", "10.4.4.4")],
            );
        let harness = Harness::new(env);

        joined(&harness.ctx).await.unwrap();
        assert_eq!(
            harness.env.published_for("extension:0").get("zuul_address"),
            Some(&"10.4.4.4".to_string())
        );
    }

    #[tokio::test]
    async fn joined_omits_zuul_address_when_the_unit_has_no_address() {
        let env = FakeHookEnv::new()
            .with_relation("extension", "extension:0")
            .with_relation_unit("zuul", "zuul:2", "zuul/0", &[]);
        let harness = Harness::new(env);

        joined(&harness.ctx).await.unwrap();
        let published = harness.env.published_for("extension:0");
        assert!(published.contains_key("admin_username"));
        assert!(!published.contains_key("zuul_address"));
    }

    #[tokio::test]
    async fn changed_installs_requested_plugins() {
        let env = FakeHookEnv::new()
            .with_remote_settings(&[("required_plugins", "git gearman-plugin")]);
        let source = FakePluginSource::new()
            .with_plugin("git", b"git")
            .with_plugin("gearman-plugin", b"gearman");
        let harness = Harness::with_source(env, source);

        let outcome = changed(&harness.ctx).await.unwrap();
        assert_eq!(outcome, HookOutcome::Complete);
        assert!(harness.ctx.home().plugin_file("git").exists());
        assert!(harness.ctx.home().plugin_file("gearman-plugin").exists());
        assert_eq!(harness.service.actions(), vec![ServiceAction::Restart]);
    }

    #[tokio::test]
    async fn changed_without_requests_does_nothing() {
        let harness = Harness::new(FakeHookEnv::new());

        let outcome = changed(&harness.ctx).await.unwrap();
        assert_eq!(outcome, HookOutcome::Complete);
        assert!(harness.service.actions().is_empty());
    }

    #[tokio::test]
    async fn changed_skips_the_restart_when_nothing_changed() {
        let env = FakeHookEnv::new()
            .with_remote_settings(&[("required_plugins", "git")]);
        let source = FakePluginSource::new().with_plugin("git", b"git");
        let harness = Harness::with_source(env, source);

        // Plugin already on disk: the run is a no-op.
        std::fs::create_dir_all(harness.ctx.home().plugins_dir()).unwrap();
        std::fs::write(harness.ctx.home().plugin_file("git"), b"git").unwrap();

        changed(&harness.ctx).await.unwrap();
        assert!(harness.service.actions().is_empty());
    }
}
