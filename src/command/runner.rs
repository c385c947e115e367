use super::spec::CommandSpec;
use crate::policy::ExecutionPolicy;
use crate::util::truncate_string;
use anyhow::{Context, Result};
use std::path::Path;
use std::process::{Command, ExitStatus, Stdio};

/// Exit code reported when a spec carries no command at all.
pub const NO_COMMAND_CODE: i32 = -1010;
/// Exit code reported when the program could not be started.
pub const LAUNCH_FAILED_CODE: i32 = -101;

const LOG_EXCERPT_BYTES: usize = 2048;

/// Raw outcome of one finished process.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ProcessOutput {
    pub code: i32,
    pub stdout: String,
    pub stderr: String,
}

/// Process boundary. The runner only ever talks to the OS through this.
pub trait ProcessLauncher {
    /// Run `argv` to completion, draining both output streams. `Err` means the
    /// process never started.
    fn launch(&self, argv: &[String], cwd: Option<&Path>) -> Result<ProcessOutput>;
}

/// Launches real processes, resolving the program on `PATH` first.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemLauncher;

impl ProcessLauncher for SystemLauncher {
    fn launch(&self, argv: &[String], cwd: Option<&Path>) -> Result<ProcessOutput> {
        let (program, args) = argv
            .split_first()
            .context("launch called with an empty argv")?;
        let resolved =
            which::which(program).with_context(|| format!("resolve program `{program}`"))?;
        let mut command = Command::new(resolved);
        command
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        if let Some(cwd) = cwd {
            command.current_dir(cwd);
        }
        let output = command
            .output()
            .with_context(|| format!("spawn `{program}`"))?;
        Ok(ProcessOutput {
            code: exit_code(output.status),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}

#[cfg(unix)]
fn exit_code(status: ExitStatus) -> i32 {
    use std::os::unix::process::ExitStatusExt;
    match (status.code(), status.signal()) {
        (Some(code), _) => code,
        (None, Some(signal)) => 128 + signal,
        (None, None) => -1,
    }
}

#[cfg(not(unix))]
fn exit_code(status: ExitStatus) -> i32 {
    status.code().unwrap_or(-1)
}

/// Captured result of one command invocation. Never mutated after creation.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CommandResult {
    pub output: String,
    pub error: String,
    pub code: i32,
}

impl CommandResult {
    pub fn no_command() -> Self {
        Self {
            output: String::new(),
            error: "no command supplied".to_string(),
            code: NO_COMMAND_CODE,
        }
    }

    pub fn launch_failed(err: &anyhow::Error) -> Self {
        Self {
            output: String::new(),
            error: format!("{err:#}"),
            code: LAUNCH_FAILED_CODE,
        }
    }

    /// Success means exit code 0 and nothing on stderr.
    pub fn is_success(&self) -> bool {
        self.code == 0 && self.error.is_empty()
    }
}

impl From<ProcessOutput> for CommandResult {
    fn from(output: ProcessOutput) -> Self {
        Self {
            output: output.stdout,
            error: output.stderr,
            code: output.code,
        }
    }
}

/// Synchronous command runner.
#[derive(Debug, Clone)]
pub struct CommandRunner<L = SystemLauncher> {
    launcher: L,
    policy: ExecutionPolicy,
}

impl CommandRunner<SystemLauncher> {
    pub fn system(policy: ExecutionPolicy) -> Self {
        Self::new(SystemLauncher, policy)
    }
}

impl<L: ProcessLauncher> CommandRunner<L> {
    pub fn new(launcher: L, policy: ExecutionPolicy) -> Self {
        Self { launcher, policy }
    }

    pub fn policy(&self) -> ExecutionPolicy {
        self.policy
    }

    /// Run once and emit one status record.
    pub fn run(&self, spec: &CommandSpec) -> CommandResult {
        self.run_inner(spec, false)
    }

    /// Run once without the per-call record; the caller reports.
    pub fn run_quiet(&self, spec: &CommandSpec) -> CommandResult {
        self.run_inner(spec, true)
    }

    fn run_inner(&self, spec: &CommandSpec, quiet: bool) -> CommandResult {
        let argv = spec.argv();
        if argv.is_empty() {
            if !quiet {
                tracing::warn!(id = %spec.id, code = NO_COMMAND_CODE, "command warning: no command");
            }
            return CommandResult::no_command();
        }
        let text = spec.text();

        if self.policy.is_print_only() {
            if !quiet {
                tracing::info!(id = %spec.id, command = %text, "print-only: not executed");
            }
            return CommandResult::default();
        }

        let result = match self.launcher.launch(&argv, spec.cwd.as_deref()) {
            Ok(output) => CommandResult::from(output),
            Err(err) => CommandResult::launch_failed(&err),
        };

        if !quiet {
            if result.is_success() {
                tracing::info!(id = %spec.id, command = %text, code = result.code, "command ok");
            } else {
                tracing::warn!(
                    id = %spec.id,
                    command = %text,
                    code = result.code,
                    stderr = %truncate_string(result.error.trim(), LOG_EXCERPT_BYTES),
                    "command warning"
                );
            }
        }
        if self.policy.verbose && !result.output.is_empty() {
            tracing::debug!(
                id = %spec.id,
                stdout = %truncate_string(result.output.trim(), LOG_EXCERPT_BYTES),
                "command output"
            );
        }
        result
    }
}

#[cfg(test)]
#[path = "runner_tests.rs"]
mod tests;
