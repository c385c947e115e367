use crate::config::EnvConfig;
use std::fmt;
use std::thread;
use std::time::{Duration, SystemTime};
use thiserror::Error;

/// One command to run on the remote execution target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobRequest {
    pub target: String,
    pub command: String,
    pub working_dir: String,
    pub timeout_seconds: u64,
    pub document: String,
}

/// Opaque token assigned by the channel at submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobHandle(pub String);

impl fmt::Display for JobHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollStatus {
    InProgress,
    Success,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollReport {
    pub status: PollStatus,
    pub stdout: String,
    pub exit_info: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PollError {
    /// The channel has not indexed the job yet.
    #[error("job handle not yet visible")]
    NotYetVisible,
    #[error("poll failed: {0}")]
    Other(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChannelError {
    #[error("remote submission failed: {0}")]
    Submit(String),
    #[error("malformed channel response: {0}")]
    Malformed(String),
}

/// Asynchronous command channel: fire-and-forget submit, separate status
/// query.
pub trait RemoteChannel {
    fn submit(&self, request: &JobRequest) -> Result<JobHandle, ChannelError>;
    fn poll(&self, handle: &JobHandle, target: &str) -> Result<PollReport, PollError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobState {
    Submitted,
    Polling,
    Succeeded,
    Failed,
    TimedOut,
}

impl JobState {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            JobState::Succeeded | JobState::Failed | JobState::TimedOut
        )
    }
}

/// A submitted job and everything observed about it. Only the dispatcher's
/// poll loop mutates it.
#[derive(Debug, Clone)]
pub struct RemoteJob {
    pub handle: JobHandle,
    pub target: String,
    pub submitted_at: SystemTime,
    pub attempts: u32,
    pub state: JobState,
    pub output: String,
    pub exit_info: String,
    /// One entry per observed event: submission, each non-terminal poll and
    /// the terminal outcome.
    pub transitions: Vec<JobState>,
}

impl RemoteJob {
    fn submitted(handle: JobHandle, target: &str) -> Self {
        Self {
            handle,
            target: target.to_string(),
            submitted_at: SystemTime::now(),
            attempts: 0,
            state: JobState::Submitted,
            output: String::new(),
            exit_info: String::new(),
            transitions: vec![JobState::Submitted],
        }
    }

    fn enter(&mut self, state: JobState) {
        self.state = state;
        self.transitions.push(state);
    }

    pub fn succeeded(&self) -> bool {
        self.state == JobState::Succeeded
    }

    pub fn timed_out(&self) -> bool {
        self.state == JobState::TimedOut
    }
}

/// Submits a job and polls it to a terminal state within a hard attempt
/// bound.
#[derive(Debug)]
pub struct Dispatcher<C> {
    channel: C,
    max_attempts: u32,
    delay: Duration,
}

impl<C: RemoteChannel> Dispatcher<C> {
    pub fn new(channel: C, max_attempts: u32, delay: Duration) -> Self {
        Self {
            channel,
            max_attempts,
            delay,
        }
    }

    pub fn from_env(channel: C, env: &EnvConfig) -> Self {
        Self::new(channel, env.max_poll_attempts(), env.poll_delay())
    }

    pub fn dispatch(&self, request: &JobRequest) -> Result<RemoteJob, ChannelError> {
        let handle = self.channel.submit(request)?;
        tracing::info!(handle = %handle, target = %request.target, "remote job submitted");
        let mut job = RemoteJob::submitted(handle, &request.target);
        job.state = JobState::Polling;
        self.poll_to_completion(&mut job);
        Ok(job)
    }

    fn poll_to_completion(&self, job: &mut RemoteJob) {
        while job.attempts < self.max_attempts {
            job.attempts += 1;
            match self.channel.poll(&job.handle, &job.target) {
                Ok(report) => {
                    job.output = report.stdout;
                    job.exit_info = report.exit_info;
                    match report.status {
                        PollStatus::InProgress => job.enter(JobState::Polling),
                        PollStatus::Success => {
                            job.enter(JobState::Succeeded);
                            break;
                        }
                        PollStatus::Failed => {
                            job.enter(JobState::Failed);
                            break;
                        }
                    }
                }
                Err(PollError::NotYetVisible) => {
                    tracing::debug!(handle = %job.handle, attempt = job.attempts, "job not yet visible");
                    job.enter(JobState::Polling);
                }
                Err(PollError::Other(message)) => {
                    job.exit_info = message;
                    job.enter(JobState::Failed);
                    break;
                }
            }
            if job.attempts < self.max_attempts && !self.delay.is_zero() {
                thread::sleep(self.delay);
            }
        }
        if !job.state.is_terminal() {
            job.enter(JobState::TimedOut);
        }

        tracing::debug!(handle = %job.handle, transitions = ?job.transitions, "remote job transitions");
        let elapsed_ms = job
            .submitted_at
            .elapsed()
            .map(|elapsed| elapsed.as_millis())
            .unwrap_or_default();
        if job.succeeded() {
            tracing::info!(handle = %job.handle, attempts = job.attempts, elapsed_ms, "remote job succeeded");
            tracing::debug!(handle = %job.handle, stdout = %job.output, "remote job output");
        } else if job.timed_out() {
            tracing::error!(
                handle = %job.handle,
                attempts = job.attempts,
                elapsed_ms,
                "remote job still running after poll limit"
            );
        } else {
            tracing::error!(
                handle = %job.handle,
                attempts = job.attempts,
                exit = %job.exit_info,
                stdout = %job.output,
                "remote job failed"
            );
        }
    }
}

#[cfg(test)]
#[path = "dispatch_tests.rs"]
mod tests;
