//! Command layer: symbolic operation ids, the registry that turns them into
//! concrete argv lists, the synchronous runner and the batch sequencer.
mod batch;
pub mod extract;
#[cfg(test)]
pub(crate) mod fake;
mod registry;
mod runner;
mod spec;

pub use batch::{BatchResult, BatchStep, Sequencer, StepRecord};
pub use registry::{fragment_relative_path, CommandRegistry, WorkflowContext};
#[cfg(test)]
pub use runner::ProcessOutput;
pub use runner::{CommandResult, CommandRunner, ProcessLauncher};
pub use spec::{CommandId, CommandSpec};
