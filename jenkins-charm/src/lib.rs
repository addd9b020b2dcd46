// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Charm logic for a Jenkins master.
//!
//! The orchestration framework delivers lifecycle events ("hooks") to a
//! thin binary which dispatches into this crate. The charm provisions the
//! admin credential, bootstraps the master's XML configuration, installs
//! plugins, and exchanges connection metadata with build slaves, a website
//! reverse proxy, CI-extension subordinates, and a Zuul/Gearman job
//! distributor over the framework's key-value relation protocol.
//!
//! Nothing here is long-running: one hook invocation is one process, and
//! the framework serializes invocations. Every external touchpoint (the
//! hook tools, the service manager, the Jenkins remote API, the plugin
//! site) sits behind a trait so the handlers can be exercised hermetically;
//! see [`fakes`].

pub mod bootstrap;
pub mod config;
pub mod context;
pub mod credentials;
pub mod fakes;
pub mod hook_env;
pub mod hooks;
pub mod node;
pub mod ownership;
pub mod paths;
pub mod plugins;
pub mod service;
