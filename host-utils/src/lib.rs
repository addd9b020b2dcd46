// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Wrappers around host commands run by the charm: the service manager and
//! the orchestration framework's hook tools.

pub mod systemctl;

pub const SYSTEMCTL: &str = "/usr/bin/systemctl";

#[derive(Debug)]
pub struct CommandFailureInfo {
    command: String,
    status: std::process::ExitStatus,
    pub stdout: String,
    pub stderr: String,
}

impl std::fmt::Display for CommandFailureInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(
            f,
            "Command [{}] executed and failed with status: {}",
            self.command, self.status
        )?;
        write!(f, "  stdout: {}", self.stdout)?;
        write!(f, "  stderr: {}", self.stderr)
    }
}

#[derive(thiserror::Error, Debug)]
pub enum ExecutionError {
    #[error("Failed to start execution of [{command}]: {err}")]
    ExecutionStart { command: String, err: std::io::Error },

    #[error("{0}")]
    CommandFailure(Box<CommandFailureInfo>),
}

fn command_to_string(command: &std::process::Command) -> String {
    std::iter::once(command.get_program())
        .chain(command.get_args())
        .map(|s| s.to_string_lossy().into())
        .collect::<Vec<String>>()
        .join(" ")
}

pub fn output_to_exec_error(
    command: &std::process::Command,
    output: &std::process::Output,
) -> ExecutionError {
    ExecutionError::CommandFailure(Box::new(CommandFailureInfo {
        command: command_to_string(command),
        status: output.status,
        stdout: String::from_utf8_lossy(&output.stdout).to_string(),
        stderr: String::from_utf8_lossy(&output.stderr).to_string(),
    }))
}

// Helper function for starting the process and checking the
// exit code result.
pub fn execute(
    command: &mut std::process::Command,
) -> Result<std::process::Output, ExecutionError> {
    let output =
        command.output().map_err(|err| ExecutionError::ExecutionStart {
            command: command_to_string(command),
            err,
        })?;

    if !output.status.success() {
        return Err(output_to_exec_error(command, &output));
    }

    Ok(output)
}

pub async fn execute_async(
    command: &mut tokio::process::Command,
) -> Result<std::process::Output, ExecutionError> {
    let output = command.output().await.map_err(|err| {
        ExecutionError::ExecutionStart {
            command: command_to_string(command.as_std()),
            err,
        }
    })?;

    if !output.status.success() {
        return Err(output_to_exec_error(command.as_std(), &output));
    }

    Ok(output)
}

#[cfg(test)]
mod test {
    use super::*;

    #[tokio::test]
    async fn execute_captures_stdout() {
        let mut cmd = tokio::process::Command::new("echo");
        cmd.arg("hello");
        let output = execute_async(&mut cmd).await.unwrap();
        assert_eq!(String::from_utf8_lossy(&output.stdout).trim(), "hello");
    }

    #[tokio::test]
    async fn execute_reports_failing_command() {
        let mut cmd = tokio::process::Command::new("false");
        let err = execute_async(&mut cmd).await.unwrap_err();
        match err {
            ExecutionError::CommandFailure(info) => {
                assert!(!info.status.success());
            }
            other => panic!("unexpected error: {}", other),
        }
    }
}
