// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Wrappers for controlling systemd units.

use crate::{execute_async, ExecutionError, SYSTEMCTL};
use tokio::process::Command;

pub struct Systemctl {}

impl Systemctl {
    pub async fn start(unit: &str) -> Result<(), ExecutionError> {
        let mut cmd = Command::new(SYSTEMCTL);
        execute_async(cmd.args(["start", unit])).await?;
        Ok(())
    }

    pub async fn stop(unit: &str) -> Result<(), ExecutionError> {
        let mut cmd = Command::new(SYSTEMCTL);
        execute_async(cmd.args(["stop", unit])).await?;
        Ok(())
    }

    pub async fn restart(unit: &str) -> Result<(), ExecutionError> {
        let mut cmd = Command::new(SYSTEMCTL);
        execute_async(cmd.args(["restart", unit])).await?;
        Ok(())
    }
}
