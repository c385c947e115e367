use super::*;
use crate::remote::fake::{report, ScriptedChannel};

fn request() -> JobRequest {
    JobRequest {
        target: "i-0123".to_string(),
        command: "runuser -l ec2-user -c 'bops process-s3-file -k req-001.yaml'".to_string(),
        working_dir: "/srv/blossom".to_string(),
        timeout_seconds: 99,
        document: "AWS-RunShellScript".to_string(),
    }
}

#[test]
fn not_yet_visible_is_tolerated_until_success() {
    let channel = ScriptedChannel::new(vec![
        Err(PollError::NotYetVisible),
        Err(PollError::NotYetVisible),
        Err(PollError::NotYetVisible),
        report(PollStatus::Success, "provisioned aort\n"),
    ]);
    let dispatcher = Dispatcher::new(channel.clone(), 10, Duration::ZERO);
    let job = dispatcher.dispatch(&request()).unwrap();

    assert_eq!(
        job.transitions,
        vec![
            JobState::Submitted,
            JobState::Polling,
            JobState::Polling,
            JobState::Polling,
            JobState::Succeeded
        ]
    );
    assert!(job.succeeded());
    assert_eq!(job.output, "provisioned aort\n");
    assert_eq!(job.attempts, 4);
    assert_eq!(channel.submissions().len(), 1);
}

#[test]
fn output_comes_from_the_final_poll_only() {
    let channel = ScriptedChannel::new(vec![
        report(PollStatus::InProgress, "partial"),
        report(PollStatus::Failed, "final"),
    ]);
    let job = Dispatcher::new(channel, 10, Duration::ZERO)
        .dispatch(&request())
        .unwrap();
    assert_eq!(job.state, JobState::Failed);
    assert_eq!(job.output, "final");
}

#[test]
fn never_terminal_job_stops_at_attempt_bound() {
    let channel = ScriptedChannel::new(vec![report(PollStatus::InProgress, "still going")]);
    let job = Dispatcher::new(channel.clone(), 5, Duration::ZERO)
        .dispatch(&request())
        .unwrap();
    assert!(job.timed_out());
    assert_eq!(job.attempts, 5);
    assert_eq!(channel.polls(), 5);
    assert_eq!(job.transitions.last(), Some(&JobState::TimedOut));
    assert_eq!(job.output, "");
}

#[test]
fn unexpected_poll_error_fails_the_job() {
    let channel = ScriptedChannel::new(vec![Err(PollError::Other("AccessDenied".to_string()))]);
    let job = Dispatcher::new(channel.clone(), 5, Duration::ZERO)
        .dispatch(&request())
        .unwrap();
    assert_eq!(job.state, JobState::Failed);
    assert_eq!(job.exit_info, "AccessDenied");
    assert_eq!(channel.polls(), 1);
}
