// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Drives a charm through a realistic sequence of hook invocations and
//! checks the state it accumulates along the way.

use camino_tempfile::Utf8TempDir;
use jenkins_charm::config::Config;
use jenkins_charm::context::CharmContext;
use jenkins_charm::fakes::{
    FakeHookEnv, FakeNodeRegistry, FakePluginSource, FakeServiceSupervisor,
    ServiceAction,
};
use jenkins_charm::hooks::{dispatch, HookEvent, HookOutcome};
use slog::Logger;
use std::sync::Arc;

struct Deployment {
    _dir: Utf8TempDir,
    env: Arc<FakeHookEnv>,
    nodes: Arc<FakeNodeRegistry>,
    service: Arc<FakeServiceSupervisor>,
    ctx: CharmContext,
}

fn deployment(env: FakeHookEnv) -> Deployment {
    let dir = Utf8TempDir::new().unwrap();
    let config: Config = toml::from_str(&format!(
        "jenkins_home = \"{}\"\nplugins = \"git\"\n",
        dir.path()
    ))
    .unwrap();

    let env = Arc::new(env);
    let nodes = Arc::new(FakeNodeRegistry::new());
    let service = Arc::new(FakeServiceSupervisor::new());
    let plugins = Arc::new(FakePluginSource::new().with_plugin("git", b"git"));
    let log = Logger::root(slog::Discard, slog::o!());
    let ctx = CharmContext::with_collaborators(
        config,
        log,
        env.clone(),
        nodes.clone(),
        service.clone(),
        plugins,
        None,
    );
    Deployment { _dir: dir, env, nodes, service, ctx }
}

#[tokio::test]
async fn install_then_wire_up_a_slave() {
    let env = FakeHookEnv::new()
        .with_private_address("10.0.0.2")
        .with_remote_settings(&[
            ("executors", "1"),
            ("labels", "amd64"),
            ("slavehost", "jenkins-slave-0"),
        ]);
    let d = deployment(env);

    // Day one: the install hook provisions everything.
    let outcome = dispatch(HookEvent::Install, &d.ctx).await.unwrap();
    assert_eq!(outcome, HookOutcome::Complete);
    let home = d.ctx.home();
    assert!(home.password_file().exists());
    assert!(home.bootstrap_flag().exists());
    assert!(home.plugin_file("git").exists());
    assert_eq!(
        d.service.actions(),
        vec![ServiceAction::Stop, ServiceAction::Start]
    );
    assert_eq!(d.env.opened_ports(), vec![8080]);

    // A slave relation forms.
    dispatch(HookEvent::MasterRelationJoined, &d.ctx).await.unwrap();
    assert_eq!(
        d.env.published_local().get("url").unwrap(),
        "http://10.0.0.2:8080"
    );

    let outcome =
        dispatch(HookEvent::MasterRelationChanged, &d.ctx).await.unwrap();
    assert_eq!(outcome, HookOutcome::Complete);

    // The password handed to the slave is the generated one the install
    // hook persisted.
    let persisted =
        std::fs::read_to_string(home.password_file()).unwrap();
    assert_eq!(
        d.env.published_local().get("password").unwrap(),
        persisted.trim()
    );

    let registered = d.nodes.registered();
    assert_eq!(registered.len(), 1);
    assert_eq!(registered[0].hostname, "jenkins-slave-0");
    assert_eq!(registered[0].executors, 2);
}

#[tokio::test]
async fn broken_relation_clears_all_registered_slaves() {
    let env = FakeHookEnv::new()
        .with_current_relation("master")
        .with_relation_unit("master", "master:0", "jenkins-slave/0", &[])
        .with_relation_unit("master", "master:0", "jenkins-slave/1", &[]);
    let d = deployment(env);

    dispatch(HookEvent::Install, &d.ctx).await.unwrap();
    let outcome =
        dispatch(HookEvent::MasterRelationBroken, &d.ctx).await.unwrap();
    assert_eq!(outcome, HookOutcome::Complete);

    let mut deregistered = d.nodes.deregistered();
    deregistered.sort();
    assert_eq!(deregistered, vec!["jenkins-slave-0", "jenkins-slave-1"]);
}

#[tokio::test]
async fn incomplete_slave_data_is_pending_not_fatal() {
    let env = FakeHookEnv::new()
        .with_remote_settings(&[("executors", "1"), ("slavehost", "host")]);
    let d = deployment(env);

    dispatch(HookEvent::Install, &d.ctx).await.unwrap();
    let outcome =
        dispatch(HookEvent::MasterRelationChanged, &d.ctx).await.unwrap();
    assert_eq!(outcome, HookOutcome::Pending { missing: vec!["labels"] });
    assert!(d.nodes.registered().is_empty());
}
