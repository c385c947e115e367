//! Scripted remote channel for unit tests.
use super::dispatch::{
    ChannelError, JobHandle, JobRequest, PollError, PollReport, PollStatus, RemoteChannel,
};
use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::rc::Rc;

#[derive(Default)]
struct State {
    submissions: RefCell<Vec<JobRequest>>,
    polls: Cell<u32>,
    script: RefCell<VecDeque<Result<PollReport, PollError>>>,
}

/// Polls pop the script in order; once it is empty every poll reports
/// in-progress.
#[derive(Clone, Default)]
pub(crate) struct ScriptedChannel {
    state: Rc<State>,
}

pub(crate) fn report(status: PollStatus, stdout: &str) -> Result<PollReport, PollError> {
    Ok(PollReport {
        status,
        stdout: stdout.to_string(),
        exit_info: String::new(),
    })
}

impl ScriptedChannel {
    pub fn new(script: Vec<Result<PollReport, PollError>>) -> Self {
        let channel = Self::default();
        channel.state.script.borrow_mut().extend(script);
        channel
    }

    pub fn submissions(&self) -> Vec<JobRequest> {
        self.state.submissions.borrow().clone()
    }

    pub fn polls(&self) -> u32 {
        self.state.polls.get()
    }
}

impl RemoteChannel for ScriptedChannel {
    fn submit(&self, request: &JobRequest) -> Result<JobHandle, ChannelError> {
        let mut submissions = self.state.submissions.borrow_mut();
        submissions.push(request.clone());
        Ok(JobHandle(format!("job-{}", submissions.len())))
    }

    fn poll(&self, _handle: &JobHandle, _target: &str) -> Result<PollReport, PollError> {
        self.state.polls.set(self.state.polls.get() + 1);
        self.state
            .script
            .borrow_mut()
            .pop_front()
            .unwrap_or_else(|| report(PollStatus::InProgress, ""))
    }
}
