use super::*;
use crate::command::fake::{fail, ok, FakeLauncher};
use crate::command::registry::WorkflowContext;
use crate::config::{EnvConfig, KeyValues, RequestConfig};
use crate::policy::ExecutionPolicy;
use anyhow::anyhow;
use std::path::Path;

fn upper(stdout: &str) -> anyhow::Result<String> {
    Ok(stdout.trim().to_uppercase())
}

fn reject(_: &str) -> anyhow::Result<String> {
    Err(anyhow!("no identifier in output"))
}

fn spec(word: &str) -> CommandSpec {
    CommandSpec::new(CommandId::GitPushChanges, "echo").arg(word)
}

#[test]
fn failed_step_keeps_index_and_batch_continues() {
    let launcher = FakeLauncher::new();
    launcher
        .respond(&["one"], ok("one"))
        .respond(&["two"], fail(1, "boom"))
        .respond(&["three"], ok("three"));
    let runner = CommandRunner::new(launcher.clone(), ExecutionPolicy::execute());
    let batch = Sequencer::new(&runner).run_batch(vec![
        BatchStep::from(spec("one").with_extractor(upper)),
        BatchStep::from(spec("two").with_extractor(upper)),
        BatchStep::from(spec("three").with_extractor(upper)),
    ]);

    let indices: Vec<usize> = batch.steps.iter().map(|step| step.index).collect();
    assert_eq!(indices, vec![0, 1, 2]);
    assert_eq!(batch.special, vec!["ONE", "THREE"]);
    assert_eq!(batch.first_failure().map(|step| step.index), Some(1));
    assert!(!batch.all_succeeded());
    assert_eq!(launcher.calls().len(), 3);
}

#[test]
fn extractor_error_is_recorded_on_its_step() {
    let launcher = FakeLauncher::new();
    let runner = CommandRunner::new(launcher.clone(), ExecutionPolicy::execute());
    let batch = Sequencer::new(&runner).run_batch(vec![
        BatchStep::from(spec("a").with_extractor(reject)),
        BatchStep::from(spec("b")),
    ]);
    assert!(batch.special.is_empty());
    assert_eq!(
        batch.steps[0].extract_error.as_deref(),
        Some("no identifier in output")
    );
    assert!(batch.steps[1].is_success());
    assert_eq!(launcher.calls().len(), 2);
}

#[test]
fn unresolved_ids_are_reported_and_skipped() {
    let env = EnvConfig::from_yaml(
        "env:\n  git:\n    repo-dir: /srv/repo\n",
        Path::new("env.yaml"),
    )
    .unwrap();
    let request = RequestConfig::from_key_values(
        &KeyValues::parse("branch_name: fix-1\nfile: users/a.yaml\nissue_number: 7\n"),
        "req",
    )
    .unwrap();
    let ctx = WorkflowContext::new(&env).with_request(&request);
    let ids = [
        CommandId::SysRemoveGitDir,
        CommandId::GitCloneRepo,
        CommandId::GitPushChanges,
    ];
    let registry = CommandRegistry::resolve(&ctx, &ids);
    let launcher = FakeLauncher::new();
    let runner = CommandRunner::new(launcher.clone(), ExecutionPolicy::execute());
    let batch = Sequencer::new(&runner).run_batch_by_ids(&registry, &ids);

    assert_eq!(batch.unresolved.len(), 1);
    assert_eq!(batch.unresolved[0].id(), CommandId::GitCloneRepo);
    let ran: Vec<CommandId> = batch.steps.iter().map(|step| step.id).collect();
    assert_eq!(ran, vec![CommandId::SysRemoveGitDir, CommandId::GitPushChanges]);
    assert!(!batch.all_succeeded());
}

#[test]
fn print_only_batch_runs_nothing() {
    let launcher = FakeLauncher::new();
    let runner = CommandRunner::new(launcher.clone(), ExecutionPolicy::print_only());
    let batch = Sequencer::new(&runner).run_batch(vec![BatchStep::from(spec("x"))]);
    assert_eq!(batch, BatchResult::default());
    assert!(launcher.calls().is_empty());
}
