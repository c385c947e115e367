//! Moves a dropped request object into the local user directory.
use crate::command::{CommandId, CommandRegistry, ProcessLauncher, Sequencer, WorkflowContext};
use crate::config::EnvConfig;
use crate::report::FailureReport;
use crate::sentinels::S3_OBJECT_NOT_FOUND;
use std::path::PathBuf;

const INTAKE_IDS: &[CommandId] = &[CommandId::S3FileExists, CommandId::S3MoveFile];

/// Local path of the request for `key`. Prefers the object in storage and
/// falls back to a copy already in the user directory.
pub(super) fn fetch_request<L: ProcessLauncher>(
    env: &EnvConfig,
    sequencer: &Sequencer<'_, L>,
    key: &str,
    print_only: bool,
) -> Result<PathBuf, FailureReport> {
    let local = env
        .user_dir()
        .map_err(|err| FailureReport::error("request intake", err))?
        .join(key);
    let ctx = WorkflowContext::new(env).with_object_key(key);
    let registry = CommandRegistry::build(&ctx, INTAKE_IDS)
        .map_err(|err| FailureReport::error("request intake", err))?;

    if print_only {
        sequencer.run_batch_by_ids(&registry, INTAKE_IDS);
        return Ok(local);
    }

    let head = sequencer.run_batch_by_ids(&registry, &[CommandId::S3FileExists]);
    let exists = match head.step(CommandId::S3FileExists) {
        Some(step) if step.result.code == 0 => true,
        Some(step) => {
            if !S3_OBJECT_NOT_FOUND.matches(step.result.code, &step.result.error) {
                tracing::warn!(key, stderr = %step.result.error.trim(), "object lookup failed");
            }
            false
        }
        None => false,
    };

    if exists {
        let moved = sequencer.run_batch_by_ids(&registry, &[CommandId::S3MoveFile]);
        return match moved.step(CommandId::S3MoveFile) {
            Some(step) if step.result.code == 0 => Ok(local),
            Some(step) => Err(FailureReport::step("move request object", step)),
            None => Err(FailureReport::message(
                "move request object",
                "move command did not run",
            )),
        };
    }
    if local.is_file() {
        tracing::info!(path = %local.display(), "object not in storage; using local copy");
        return Ok(local);
    }
    Err(FailureReport::message(
        "request intake",
        format!(
            "request {key} not found in object storage or at {}",
            local.display()
        ),
    ))
}
