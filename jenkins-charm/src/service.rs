// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Lifecycle control of the Jenkins service.

use async_trait::async_trait;
use host_utils::systemctl::Systemctl;
use host_utils::ExecutionError;

/// Thin wrapper over the service manager, behind a trait so hook tests can
/// observe lifecycle calls without a live systemd.
#[async_trait]
pub trait ServiceSupervisor: Send + Sync {
    async fn start(&self) -> Result<(), ExecutionError>;
    async fn stop(&self) -> Result<(), ExecutionError>;
    async fn restart(&self) -> Result<(), ExecutionError>;
}

pub struct SystemdSupervisor {
    unit: &'static str,
}

impl SystemdSupervisor {
    pub fn new(unit: &'static str) -> Self {
        Self { unit }
    }
}

#[async_trait]
impl ServiceSupervisor for SystemdSupervisor {
    async fn start(&self) -> Result<(), ExecutionError> {
        Systemctl::start(self.unit).await
    }

    async fn stop(&self) -> Result<(), ExecutionError> {
        Systemctl::stop(self.unit).await
    }

    async fn restart(&self) -> Result<(), ExecutionError> {
        Systemctl::restart(self.unit).await
    }
}
