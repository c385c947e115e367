use super::registry::{CommandRegistry, RegistryError};
use super::runner::{CommandResult, CommandRunner, ProcessLauncher};
use super::spec::{CommandId, CommandSpec, Extractor};

/// One batch element: a spec, optionally post-processed on success.
#[derive(Debug, Clone)]
pub struct BatchStep {
    pub spec: CommandSpec,
    pub extractor: Option<Extractor>,
}

impl From<CommandSpec> for BatchStep {
    /// Uses the spec's own extractor, if it carries one.
    fn from(spec: CommandSpec) -> Self {
        let extractor = spec.extractor;
        Self { spec, extractor }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepRecord {
    pub index: usize,
    pub id: CommandId,
    pub command_text: String,
    pub result: CommandResult,
    /// Set when the extractor ran and failed.
    pub extract_error: Option<String>,
}

impl StepRecord {
    pub fn is_success(&self) -> bool {
        self.result.is_success() && self.extract_error.is_none()
    }
}

/// Per-step results in input order plus extractor output from successful
/// steps. Failed steps keep their index.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchResult {
    pub steps: Vec<StepRecord>,
    pub special: Vec<String>,
    pub unresolved: Vec<RegistryError>,
}

impl BatchResult {
    pub fn all_succeeded(&self) -> bool {
        self.unresolved.is_empty() && self.steps.iter().all(StepRecord::is_success)
    }

    pub fn step(&self, id: CommandId) -> Option<&StepRecord> {
        self.steps.iter().find(|step| step.id == id)
    }

    pub fn first_failure(&self) -> Option<&StepRecord> {
        self.steps.iter().find(|step| !step.is_success())
    }
}

/// Runs steps strictly in order and never stops on its own; callers decide
/// what a failed step means.
#[derive(Debug)]
pub struct Sequencer<'r, L> {
    runner: &'r CommandRunner<L>,
}

impl<'r, L: ProcessLauncher> Sequencer<'r, L> {
    pub fn new(runner: &'r CommandRunner<L>) -> Self {
        Self { runner }
    }

    pub fn run_batch(&self, steps: Vec<BatchStep>) -> BatchResult {
        let policy = self.runner.policy();
        if policy.is_print_only() {
            for step in &steps {
                println!("{}", step.spec.text());
            }
            return BatchResult::default();
        }
        if policy.verbose {
            for (index, step) in steps.iter().enumerate() {
                tracing::debug!(index, command = %step.spec.text(), "batch step");
            }
        }

        let mut batch = BatchResult::default();
        for (index, step) in steps.into_iter().enumerate() {
            let result = self.runner.run(&step.spec);
            let mut extract_error = None;
            if result.is_success() {
                if let Some(extractor) = step.extractor {
                    match extractor(&result.output) {
                        Ok(value) => batch.special.push(value),
                        Err(err) => {
                            tracing::warn!(
                                id = %step.spec.id,
                                error = %format!("{err:#}"),
                                "output extraction failed"
                            );
                            extract_error = Some(format!("{err:#}"));
                        }
                    }
                }
            }
            batch.steps.push(StepRecord {
                index,
                id: step.spec.id,
                command_text: step.spec.text(),
                result,
                extract_error,
            });
        }
        batch
    }

    /// Resolve ids against the registry, then run the ones that resolved.
    pub fn run_batch_by_ids(&self, registry: &CommandRegistry, ids: &[CommandId]) -> BatchResult {
        let mut steps = Vec::with_capacity(ids.len());
        let mut unresolved = Vec::new();
        for &id in ids {
            match registry.get(id) {
                Ok(spec) => steps.push(BatchStep::from(spec.clone())),
                Err(err) => {
                    tracing::error!(id = %err.id(), error = %err, "command not resolvable");
                    unresolved.push(err);
                }
            }
        }
        let mut batch = self.run_batch(steps);
        batch.unresolved = unresolved;
        batch
    }
}

#[cfg(test)]
#[path = "batch_tests.rs"]
mod tests;
