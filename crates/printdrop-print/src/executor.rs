// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// External command execution.
//
// The executor is the only place that spawns processes.  It reports what the
// process did (exit code, captured output) and leaves the interpretation to
// the caller: the printer directory treats failures as "no data", the
// dispatcher turns them into failed jobs.

use std::process::Stdio;

use async_trait::async_trait;
use tracing::{debug, info, instrument};

use crate::command::CommandSpec;

/// What a finished process reported.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    /// Exit code, or `None` if the process was killed by a signal.
    pub exit_code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    /// A zero-exit output with the given stdout.
    pub fn ok(stdout: impl Into<String>) -> Self {
        Self {
            exit_code: Some(0),
            stdout: stdout.into(),
            stderr: String::new(),
        }
    }

    /// A failed output with the given exit code and stderr.
    pub fn failed(exit_code: i32, stderr: impl Into<String>) -> Self {
        Self {
            exit_code: Some(exit_code),
            stdout: String::new(),
            stderr: stderr.into(),
        }
    }

    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }

    /// Best available one-line description of why the process failed.
    pub fn failure_detail(&self) -> String {
        let exit = match self.exit_code {
            Some(code) => format!("exit status {code}"),
            None => "terminated by signal".to_owned(),
        };
        let output = [self.stderr.trim(), self.stdout.trim()]
            .into_iter()
            .find(|s| !s.is_empty());
        match output {
            Some(text) => format!("{exit}: {text}"),
            None => exit,
        }
    }
}

/// Runs external commands.
///
/// Errors are launch failures (program missing, permission denied); a
/// process that starts and exits non-zero is a successful `run` with a
/// failing [`CommandOutput`].
#[async_trait]
pub trait CommandExecutor: Send + Sync {
    async fn run(&self, spec: &CommandSpec) -> std::io::Result<CommandOutput>;
}

/// Executes commands on the host with `tokio::process`.
///
/// No timeout is applied: a print command that never returns keeps its own
/// job in `printing` without affecting any other request.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemExecutor;

#[async_trait]
impl CommandExecutor for SystemExecutor {
    #[instrument(skip_all, fields(program = %spec.program))]
    async fn run(&self, spec: &CommandSpec) -> std::io::Result<CommandOutput> {
        debug!(command = %spec, "spawning");
        let output = tokio::process::Command::new(&spec.program)
            .args(&spec.args)
            .envs(spec.env.iter().map(|(k, v)| (k.as_str(), v.as_str())))
            .stdin(Stdio::null())
            .output()
            .await?;

        let result = CommandOutput {
            exit_code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        };
        debug!(exit_code = ?result.exit_code, "process finished");
        Ok(result)
    }
}

/// Logs commands instead of running them and reports success.
///
/// Lets the server run on hosts without a print subsystem.
#[derive(Debug, Clone, Copy, Default)]
pub struct DryRunExecutor;

#[async_trait]
impl CommandExecutor for DryRunExecutor {
    async fn run(&self, spec: &CommandSpec) -> std::io::Result<CommandOutput> {
        info!(command = %spec, "dry run: command not executed");
        Ok(CommandOutput::ok(""))
    }
}
