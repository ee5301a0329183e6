//! Hook execution
//!
//! The scheduler only sees [`HookExecutor`]; what a hook actually does is
//! opaque to it. [`CommandExecutor`] runs `Executable` hooks as child
//! processes.

use super::Hook;
use async_trait::async_trait;
use std::process::Stdio;
use std::time::Duration;
use thiserror::Error;
use tokio::process::Command;

/// A hook run that did not succeed. Recorded in the hook's state, never fatal
/// for the rest of the batch.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum HookExecutionError {
    #[error("failed to start {program}: {message}")]
    Spawn { program: String, message: String },

    #[error("exited with status {}", describe_code(.code))]
    ExitStatus { code: Option<i32> },

    #[error("timed out after {timeout:?}")]
    Timeout { timeout: Duration },
}

fn describe_code(code: &Option<i32>) -> String {
    match code {
        Some(code) => code.to_string(),
        None => "unknown (killed by signal)".to_string(),
    }
}

#[async_trait]
pub trait HookExecutor: Send + Sync {
    async fn execute(&self, hook: &Hook) -> Result<(), HookExecutionError>;
}

/// Runs the hook program with its arguments. stdout and stderr are logged
/// line by line under the hook's name.
#[derive(Debug, Default, Clone, Copy)]
pub struct CommandExecutor;

#[async_trait]
impl HookExecutor for CommandExecutor {
    async fn execute(&self, hook: &Hook) -> Result<(), HookExecutionError> {
        let program = hook.program.display().to_string();
        tracing::info!(hook = %hook.name, "Running {} {}", program, hook.arguments.join(" "));

        let child = Command::new(&hook.program)
            .args(&hook.arguments)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| HookExecutionError::Spawn {
                program: program.clone(),
                message: e.to_string(),
            })?;

        // Dropping the future on timeout drops the child, which kills it.
        let output = match tokio::time::timeout(hook.timeout, child.wait_with_output()).await {
            Ok(Ok(output)) => output,
            Ok(Err(e)) => {
                return Err(HookExecutionError::Spawn {
                    program,
                    message: e.to_string(),
                })
            }
            Err(_) => {
                tracing::warn!(hook = %hook.name, "Killed after {:?}", hook.timeout);
                return Err(HookExecutionError::Timeout {
                    timeout: hook.timeout,
                });
            }
        };

        for line in String::from_utf8_lossy(&output.stdout).lines() {
            tracing::info!(hook = %hook.name, "{}", line);
        }
        for line in String::from_utf8_lossy(&output.stderr).lines() {
            tracing::warn!(hook = %hook.name, "{}", line);
        }

        if output.status.success() {
            Ok(())
        } else {
            Err(HookExecutionError::ExitStatus {
                code: output.status.code(),
            })
        }
    }
}
