//! Scripted process launcher for unit tests.
use super::runner::{ProcessLauncher, ProcessOutput};
use anyhow::{anyhow, Result};
use std::cell::RefCell;
use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::rc::Rc;

type Hook = Rc<dyn Fn(&[String])>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Call {
    pub argv: Vec<String>,
    pub cwd: Option<PathBuf>,
}

struct Rule {
    tokens: Vec<String>,
    outputs: VecDeque<Result<ProcessOutput, String>>,
    hook: Option<Hook>,
}

impl Rule {
    fn matches(&self, argv: &[String]) -> bool {
        self.tokens.iter().all(|token| argv.contains(token))
    }

    fn next(&mut self) -> Result<ProcessOutput, String> {
        if self.outputs.len() > 1 {
            if let Some(output) = self.outputs.pop_front() {
                return output;
            }
        }
        self.outputs
            .front()
            .cloned()
            .unwrap_or_else(|| Ok(ProcessOutput::default()))
    }
}

#[derive(Default)]
struct State {
    calls: Vec<Call>,
    rules: Vec<Rule>,
}

/// Rules match when every token appears as a whole argv element; the first
/// matching rule wins. Queued outputs are consumed in order and the last one
/// repeats. Unmatched commands succeed with empty output.
#[derive(Clone, Default)]
pub(crate) struct FakeLauncher {
    state: Rc<RefCell<State>>,
}

pub(crate) fn ok(stdout: &str) -> ProcessOutput {
    ProcessOutput {
        code: 0,
        stdout: stdout.to_string(),
        stderr: String::new(),
    }
}

pub(crate) fn fail(code: i32, stderr: &str) -> ProcessOutput {
    ProcessOutput {
        code,
        stdout: String::new(),
        stderr: stderr.to_string(),
    }
}

impl FakeLauncher {
    pub fn new() -> Self {
        Self::default()
    }

    fn rule_mut<R>(&self, tokens: &[&str], edit: impl FnOnce(&mut Rule) -> R) -> R {
        let tokens: Vec<String> = tokens.iter().map(|t| t.to_string()).collect();
        let mut state = self.state.borrow_mut();
        let index = match state.rules.iter().position(|rule| rule.tokens == tokens) {
            Some(index) => index,
            None => {
                state.rules.push(Rule {
                    tokens,
                    outputs: VecDeque::new(),
                    hook: None,
                });
                state.rules.len() - 1
            }
        };
        edit(&mut state.rules[index])
    }

    pub fn respond(&self, tokens: &[&str], output: ProcessOutput) -> &Self {
        self.rule_mut(tokens, |rule| rule.outputs.push_back(Ok(output)));
        self
    }

    pub fn refuse(&self, tokens: &[&str], message: &str) -> &Self {
        let message = message.to_string();
        self.rule_mut(tokens, |rule| rule.outputs.push_back(Err(message)));
        self
    }

    pub fn on_launch(&self, tokens: &[&str], hook: impl Fn(&[String]) + 'static) -> &Self {
        let hook: Hook = Rc::new(hook);
        self.rule_mut(tokens, |rule| rule.hook = Some(hook));
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.state.borrow().calls.clone()
    }

    pub fn count(&self, tokens: &[&str]) -> usize {
        self.calls()
            .iter()
            .filter(|call| tokens.iter().all(|t| call.argv.iter().any(|a| a == t)))
            .count()
    }

    /// Index of the first call containing every token.
    pub fn position(&self, tokens: &[&str]) -> Option<usize> {
        self.calls()
            .iter()
            .position(|call| tokens.iter().all(|t| call.argv.iter().any(|a| a == t)))
    }
}

impl ProcessLauncher for FakeLauncher {
    fn launch(&self, argv: &[String], cwd: Option<&Path>) -> Result<ProcessOutput> {
        let (outcome, hook) = {
            let mut state = self.state.borrow_mut();
            state.calls.push(Call {
                argv: argv.to_vec(),
                cwd: cwd.map(Path::to_path_buf),
            });
            match state.rules.iter_mut().find(|rule| rule.matches(argv)) {
                Some(rule) => (rule.next(), rule.hook.clone()),
                None => (Ok(ProcessOutput::default()), None),
            }
        };
        if let Some(hook) = hook {
            hook(argv);
        }
        outcome.map_err(|message| anyhow!(message))
    }
}
