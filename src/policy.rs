//! Per-run execution policy.
//!
//! Built once from CLI flags and handed by value to every component, so a
//! workflow run never consults process-wide state to decide whether it may
//! mutate anything.

/// Whether commands are executed or only printed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExecMode {
    /// Log what would run; launch nothing.
    PrintOnly,
    #[default]
    Execute,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ExecutionPolicy {
    pub mode: ExecMode,
    /// Emit verbose diagnostics (batch listings, raw outputs).
    pub verbose: bool,
}

impl ExecutionPolicy {
    pub fn new(mode: ExecMode, verbose: bool) -> Self {
        Self { mode, verbose }
    }

    pub fn execute() -> Self {
        Self::new(ExecMode::Execute, false)
    }

    pub fn print_only() -> Self {
        Self::new(ExecMode::PrintOnly, false)
    }

    pub fn is_print_only(&self) -> bool {
        matches!(self.mode, ExecMode::PrintOnly)
    }
}
