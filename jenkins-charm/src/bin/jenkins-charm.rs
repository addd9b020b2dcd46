// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Hook entrypoint for the Jenkins master charm.
//!
//! The framework symlinks every hook it delivers to this binary's `run`
//! subcommand; unrecognized hooks fail fast so a wiring mistake shows up
//! in the unit's logs rather than being silently ignored.

use anyhow::Context;
use camino::Utf8PathBuf;
use clap::{Parser, Subcommand};
use jenkins_charm::config::Config;
use jenkins_charm::context::CharmContext;
use jenkins_charm::hooks::{self, HookEvent, HookOutcome};
use slog::{info, Drain, Logger};

#[derive(Debug, Parser)]
#[command(
    name = "jenkins-charm",
    about = "Configures a Jenkins master in response to lifecycle events"
)]
struct JenkinsCharm {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run the handler for a hook fired by the framework.
    Run {
        /// Hook name, e.g. "master-relation-changed".
        hook: String,
        /// Path to the charm configuration.
        #[arg(
            short,
            long,
            default_value = "/etc/jenkins-charm/config.toml"
        )]
        config: Utf8PathBuf,
    },
    /// List the hooks this charm responds to.
    Hooks,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = JenkinsCharm::parse();
    match args.command {
        Command::Hooks => {
            for event in HookEvent::ALL {
                println!("{event}");
            }
            Ok(())
        }
        Command::Run { hook, config } => run_hook(&hook, &config).await,
    }
}

async fn run_hook(
    hook: &str,
    config_path: &Utf8PathBuf,
) -> anyhow::Result<()> {
    let event: HookEvent = hook.parse()?;
    let log = make_logger();

    let config = Config::from_file(config_path)
        .context("failed to load charm configuration")?;
    let ctx = CharmContext::new(config, log.clone())
        .context("failed to initialize the hook context")?;

    match hooks::dispatch(event, &ctx)
        .await
        .with_context(|| format!("hook {event} failed"))?
    {
        HookOutcome::Complete => {
            info!(log, "hook complete"; "hook" => %event);
        }
        HookOutcome::Pending { missing } => {
            info!(log, "relation data not ready; awaiting redelivery";
                "hook" => %event,
                "missing" => missing.join(", "));
        }
    }
    Ok(())
}

fn make_logger() -> Logger {
    let decorator = slog_term::TermDecorator::new().build();
    let drain = slog_term::FullFormat::new(decorator).build().fuse();
    let drain = slog_async::Async::new(drain).build().fuse();
    Logger::root(drain, slog::o!("component" => "jenkins-charm"))
}
