//! Provisioning workflow: prepare the repository working copy, locate and
//! validate the subject, reconcile the identity backends, stage a party
//! fragment and push the change.
mod fragment;
mod identity;
mod intake;

use crate::command::{
    fragment_relative_path, BatchResult, CommandId, CommandRegistry, CommandRunner,
    ProcessLauncher, Sequencer, WorkflowContext,
};
use crate::config::{ConfigError, EnvConfig, RequestConfig, SubjectAction, SubjectDescriptor};
use crate::report::FailureReport;
use identity::{identity_ids, IdentityOps};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

pub use identity::{LedgerOutcome, Lookup};

const PREPARE_IDS: &[CommandId] = &[
    CommandId::SysRemoveGitDir,
    CommandId::GitCloneRepo,
    CommandId::GitCheckoutBranch,
];

const FINALIZE_IDS: &[CommandId] = &[
    CommandId::GitAddChanges,
    CommandId::GitCommitChanges,
    CommandId::GitPushChanges,
];

/// Skippable workflow stages, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, clap::ValueEnum)]
pub enum Stage {
    PrepareRepo,
    LocateSubject,
    Identity,
    Fragment,
    Finalize,
}

#[derive(Debug, Clone, Default)]
pub struct WorkflowOutcome {
    pub success: bool,
    pub subject: Option<SubjectDescriptor>,
    pub uuid: Option<String>,
    pub ledger: Option<LedgerOutcome>,
    pub fragment: Option<PathBuf>,
    pub stages_run: Vec<Stage>,
    pub failures: Vec<FailureReport>,
}

impl WorkflowOutcome {
    fn record(&mut self, report: FailureReport) {
        report.emit();
        self.failures.push(report);
    }

    fn abort(mut self, report: FailureReport) -> Self {
        self.record(report);
        self.success = false;
        self
    }
}

/// Steps that exited non-zero or never resolved. Git and the CA client
/// write progress to stderr, so these stages judge exit codes only.
fn first_hard_failure(context: &str, batch: &BatchResult) -> Option<FailureReport> {
    if batch.all_succeeded() {
        return None;
    }
    if let Some(step) = batch.first_failure().filter(|step| step.result.code == 0) {
        tracing::debug!(
            step = step.index,
            command = %step.command_text,
            stderr = %step.result.error.trim(),
            "stderr output on a clean exit"
        );
    }
    if let Some(err) = batch.unresolved.first() {
        return Some(FailureReport::error(context, err.clone()));
    }
    batch
        .steps
        .iter()
        .find(|step| step.result.code != 0)
        .map(|step| FailureReport::step(context, step))
}

pub struct ProvisioningWorkflow<'e, L> {
    env: &'e EnvConfig,
    runner: CommandRunner<L>,
    skip: BTreeSet<Stage>,
}

impl<'e, L: ProcessLauncher> ProvisioningWorkflow<'e, L> {
    pub fn new(env: &'e EnvConfig, runner: CommandRunner<L>) -> Self {
        Self {
            env,
            runner,
            skip: BTreeSet::new(),
        }
    }

    pub fn skipping(mut self, stages: impl IntoIterator<Item = Stage>) -> Self {
        self.skip.extend(stages);
        self
    }

    fn enabled(&self, stage: Stage) -> bool {
        !self.skip.contains(&stage)
    }

    fn print_only(&self) -> bool {
        self.runner.policy().is_print_only()
    }

    /// Pull the request object out of storage, then run the workflow on it.
    pub fn process_s3_file(&self, key: &str) -> WorkflowOutcome {
        let sequencer = Sequencer::new(&self.runner);
        match intake::fetch_request(self.env, &sequencer, key, self.print_only()) {
            Ok(path) => self.process_request_file(&path),
            Err(report) => WorkflowOutcome::default().abort(report),
        }
    }

    pub fn process_request_file(&self, path: &Path) -> WorkflowOutcome {
        if self.print_only() && !path.is_file() {
            println!("# request {} not present locally", path.display());
            return WorkflowOutcome {
                success: true,
                ..WorkflowOutcome::default()
            };
        }
        match RequestConfig::load(path) {
            Ok(request) => self.run(&request),
            Err(err) => WorkflowOutcome::default().abort(FailureReport::error("load request", err)),
        }
    }

    pub fn run(&self, request: &RequestConfig) -> WorkflowOutcome {
        let mut outcome = WorkflowOutcome::default();
        let sequencer = Sequencer::new(&self.runner);
        let base = WorkflowContext::new(self.env).with_request(request);
        tracing::info!(
            branch = %request.branch_name,
            file = %request.file,
            issue = %request.issue_number,
            "workflow start"
        );

        if self.enabled(Stage::PrepareRepo) {
            if let Err(report) = self.prepare_repo(&sequencer, &base) {
                return outcome.abort(report);
            }
            outcome.stages_run.push(Stage::PrepareRepo);
        }

        if self.enabled(Stage::LocateSubject) {
            match self.locate_subject(request) {
                Ok(subject) => outcome.subject = subject,
                Err(report) => return outcome.abort(report),
            }
            outcome.stages_run.push(Stage::LocateSubject);
        }

        if let Some(subject) = outcome.subject.clone() {
            let ctx = base.with_subject(&subject);
            if self.enabled(Stage::Identity) {
                self.reconcile_identity(&sequencer, &ctx, &subject, &mut outcome);
                outcome.stages_run.push(Stage::Identity);
            }
            if self.enabled(Stage::Fragment) {
                self.stage_fragment(request, &subject, &mut outcome);
                outcome.stages_run.push(Stage::Fragment);
            }
        }

        if self.enabled(Stage::Finalize) {
            if self.print_only() || outcome.fragment.is_some() {
                let ctx = match &outcome.subject {
                    Some(subject) => base.with_subject(subject),
                    None => base,
                };
                if let Err(report) = self.finalize(&sequencer, &ctx) {
                    outcome.record(report);
                }
                outcome.stages_run.push(Stage::Finalize);
            } else {
                tracing::info!("no fragment staged; nothing to commit");
            }
        }

        outcome.success = outcome.failures.is_empty();
        tracing::info!(
            success = outcome.success,
            uuid = outcome.uuid.as_deref().unwrap_or("-"),
            ledger = outcome.ledger.map_or("-", LedgerOutcome::as_str),
            fragment = ?outcome.fragment,
            stages = ?outcome.stages_run,
            failures = outcome.failures.len(),
            "workflow done"
        );
        outcome
    }

    fn prepare_repo(
        &self,
        sequencer: &Sequencer<'_, L>,
        ctx: &WorkflowContext<'_>,
    ) -> Result<(), FailureReport> {
        let registry = CommandRegistry::build(ctx, PREPARE_IDS)
            .map_err(|err| FailureReport::error("prepare repository", err))?;
        let batch = sequencer.run_batch_by_ids(&registry, PREPARE_IDS);
        match first_hard_failure("prepare repository", &batch) {
            Some(report) => Err(report),
            None => Ok(()),
        }
    }

    /// The subject descriptor lives in the checked-out repository at the
    /// request's `file` path.
    fn locate_subject(
        &self,
        request: &RequestConfig,
    ) -> Result<Option<SubjectDescriptor>, FailureReport> {
        let repo_dir = self
            .env
            .git_repo_dir()
            .map_err(|err| FailureReport::error("locate subject", err))?;
        let path = repo_dir.join(&request.file);
        if !path.is_file() {
            if self.print_only() {
                println!(
                    "# subject {} not checked out yet; identity steps depend on it",
                    path.display()
                );
                return Ok(None);
            }
            return Err(FailureReport::error(
                "locate subject",
                ConfigError::MissingFile(path),
            ));
        }
        let subject = SubjectDescriptor::load(&path).map_err(|err| {
            if !err.missing_fields().is_empty() {
                tracing::warn!(missing = ?err.missing_fields(), path = %path.display(), "subject descriptor incomplete");
            }
            FailureReport::error("validate subject", err)
        })?;
        tracing::info!(
            username = %subject.username,
            role = %subject.role,
            action = subject.action.as_str(),
            "subject loaded"
        );
        Ok(Some(subject))
    }

    fn reconcile_identity(
        &self,
        sequencer: &Sequencer<'_, L>,
        ctx: &WorkflowContext<'_>,
        subject: &SubjectDescriptor,
        outcome: &mut WorkflowOutcome,
    ) {
        let ids = identity_ids(subject);
        let registry = match CommandRegistry::build(ctx, &ids) {
            Ok(registry) => registry,
            Err(err) => {
                outcome.record(FailureReport::error("identity commands", err));
                return;
            }
        };
        if self.print_only() {
            for &id in &ids {
                if let Ok(spec) = registry.get(id) {
                    println!("{}", spec.text());
                }
            }
            return;
        }

        let ops = IdentityOps::new(&registry, sequencer);
        let access = subject.role.ledger_access();
        match subject.action {
            SubjectAction::Create => {
                match ops.ensure_idp_identity() {
                    Ok(uuid) => outcome.uuid = Some(uuid),
                    Err(report) => outcome.record(report),
                }
                match ops.ensure_ledger_identity(access) {
                    Ok(ledger) => outcome.ledger = Some(ledger),
                    Err(report) => outcome.record(report),
                }
            }
            SubjectAction::Delete => {
                match ops.remove_idp_identity() {
                    Ok(uuid) => outcome.uuid = uuid,
                    Err(report) => outcome.record(report),
                }
                match ops.remove_ledger_identity(access) {
                    Ok(ledger) => outcome.ledger = Some(ledger),
                    Err(report) => outcome.record(report),
                }
            }
        }
    }

    fn stage_fragment(
        &self,
        request: &RequestConfig,
        subject: &SubjectDescriptor,
        outcome: &mut WorkflowOutcome,
    ) {
        let rel_path = fragment_relative_path(self.env, request);
        if self.print_only() {
            println!("# write party fragment {rel_path}");
            return;
        }
        let Some(uuid) = outcome.uuid.clone() else {
            tracing::warn!(username = %subject.username, "no subject identifier; fragment skipped");
            return;
        };
        let repo_dir = match self.env.git_repo_dir() {
            Ok(dir) => dir,
            Err(err) => {
                outcome.record(FailureReport::error("write fragment", err));
                return;
            }
        };
        let text = match subject.action {
            SubjectAction::Create => fragment::party_insert(subject, &uuid),
            SubjectAction::Delete => fragment::party_remove(subject, &uuid),
        };
        match fragment::write_fragment(&repo_dir, &rel_path, &text) {
            Ok(path) => {
                tracing::info!(path = %path.display(), "party fragment written");
                outcome.fragment = Some(path);
            }
            Err(err) => outcome.record(FailureReport::message("write fragment", format!("{err:#}"))),
        }
    }

    fn finalize(
        &self,
        sequencer: &Sequencer<'_, L>,
        ctx: &WorkflowContext<'_>,
    ) -> Result<(), FailureReport> {
        let registry = CommandRegistry::build(ctx, FINALIZE_IDS)
            .map_err(|err| FailureReport::error("finalize", err))?;
        let batch = sequencer.run_batch_by_ids(&registry, FINALIZE_IDS);
        match first_hard_failure("finalize", &batch) {
            Some(report) => Err(report),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
#[path = "workflow_tests.rs"]
mod tests;
