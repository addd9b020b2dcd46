// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Handler for the reverse-proxy relation.

use super::{HookError, HookOutcome};
use crate::context::CharmContext;
use crate::paths::JENKINS_PORT;
use slog::debug;

pub(super) async fn joined(
    ctx: &CharmContext,
) -> Result<HookOutcome, HookError> {
    let hostname = ctx.env().private_address().await?;
    debug!(ctx.log(), "publishing website address";
        "hostname" => &hostname, "port" => JENKINS_PORT);
    let port = JENKINS_PORT.to_string();
    ctx.env()
        .set_local(&[("port", &port), ("hostname", &hostname)])
        .await?;
    Ok(HookOutcome::Complete)
}

#[cfg(test)]
mod test {
    use super::super::testutil::Harness;
    use super::*;
    use crate::fakes::FakeHookEnv;

    #[tokio::test]
    async fn joined_publishes_port_and_hostname() {
        let env = FakeHookEnv::new().with_private_address("10.9.8.7");
        let harness = Harness::new(env);

        let outcome = joined(&harness.ctx).await.unwrap();
        assert_eq!(outcome, HookOutcome::Complete);

        let published = harness.env.published_local();
        assert_eq!(published.get("port").unwrap(), "8080");
        assert_eq!(published.get("hostname").unwrap(), "10.9.8.7");
    }
}
