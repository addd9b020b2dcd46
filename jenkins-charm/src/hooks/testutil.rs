// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Harness for driving hook handlers against fake collaborators.

use crate::config::Config;
use crate::context::CharmContext;
use crate::fakes::{
    FakeHookEnv, FakeNodeRegistry, FakePluginSource, FakeServiceSupervisor,
};
use camino_tempfile::Utf8TempDir;
use slog::Logger;
use std::sync::Arc;

pub(crate) struct Harness {
    // Holds the temporary Jenkins home alive for the test's duration.
    _dir: Utf8TempDir,
    pub env: Arc<FakeHookEnv>,
    pub nodes: Arc<FakeNodeRegistry>,
    pub service: Arc<FakeServiceSupervisor>,
    pub ctx: CharmContext,
}

impl Harness {
    pub fn new(env: FakeHookEnv) -> Self {
        Self::with_source_and_config(env, FakePluginSource::new(), "")
    }

    pub fn with_config(env: FakeHookEnv, extra_config: &str) -> Self {
        Self::with_source_and_config(env, FakePluginSource::new(), extra_config)
    }

    pub fn with_source(env: FakeHookEnv, source: FakePluginSource) -> Self {
        Self::with_source_and_config(env, source, "")
    }

    pub fn with_source_and_config(
        env: FakeHookEnv,
        source: FakePluginSource,
        extra_config: &str,
    ) -> Self {
        let dir = Utf8TempDir::new().unwrap();
        let toml = format!(
            "jenkins_home = \"{}\"\npassword = \"sekrit\"\n{}",
            dir.path(),
            extra_config,
        );
        let config: Config = toml::from_str(&toml).unwrap();

        let env = Arc::new(env);
        let nodes = Arc::new(FakeNodeRegistry::new());
        let service = Arc::new(FakeServiceSupervisor::new());
        let log = Logger::root(slog::Discard, slog::o!());
        let ctx = CharmContext::with_collaborators(
            config,
            log,
            env.clone(),
            nodes.clone(),
            service.clone(),
            Arc::new(source),
            None,
        );
        Self { _dir: dir, env, nodes, service, ctx }
    }
}
