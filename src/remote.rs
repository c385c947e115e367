//! Remote execution: the asynchronous job dispatcher, its AWS SSM channel and
//! the object-storage trigger that feeds it.
mod dispatch;
#[cfg(test)]
mod fake;
mod ssm;
mod trigger;

pub use dispatch::{
    ChannelError, Dispatcher, JobHandle, JobRequest, JobState, PollError, PollReport, PollStatus,
    RemoteChannel, RemoteJob,
};
pub use ssm::AwsSsmChannel;
pub use trigger::{EventKind, StorageEvent, TriggerHandler, TriggerOutcome};
