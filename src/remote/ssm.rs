//! Remote channel backed by the AWS CLI's Systems Manager commands.
use super::dispatch::{
    ChannelError, JobHandle, JobRequest, PollError, PollReport, PollStatus, RemoteChannel,
};
use crate::command::{CommandId, CommandRunner, CommandSpec, ProcessLauncher};
use crate::sentinels::SSM_INVOCATION_NOT_VISIBLE;
use serde::Deserialize;
use serde_json::json;

#[derive(Debug, Deserialize)]
struct SendCommandResponse {
    #[serde(rename = "Command")]
    command: SentCommand,
}

#[derive(Debug, Deserialize)]
struct SentCommand {
    #[serde(rename = "CommandId")]
    command_id: String,
}

#[derive(Debug, Deserialize)]
struct InvocationResponse {
    #[serde(rename = "Status", default)]
    status: String,
    #[serde(rename = "StandardOutputContent", default)]
    stdout: String,
    #[serde(rename = "StandardErrorContent", default)]
    stderr: String,
    #[serde(rename = "ResponseCode", default)]
    response_code: i64,
}

fn poll_status(raw: &str) -> PollStatus {
    match raw {
        "Pending" | "InProgress" | "Delayed" | "Cancelling" => PollStatus::InProgress,
        "Success" => PollStatus::Success,
        _ => PollStatus::Failed,
    }
}

#[derive(Debug, Clone)]
pub struct AwsSsmChannel<L> {
    runner: CommandRunner<L>,
}

impl<L: ProcessLauncher> AwsSsmChannel<L> {
    pub fn new(runner: CommandRunner<L>) -> Self {
        Self { runner }
    }

    fn send_command_spec(request: &JobRequest) -> CommandSpec {
        let parameters = json!({
            "commands": [request.command],
            "workingDirectory": [request.working_dir],
            "executionTimeout": [request.timeout_seconds.to_string()],
        });
        CommandSpec::new(CommandId::SsmSendCommand, "aws")
            .args(["ssm", "send-command"])
            .flag("--instance-ids", request.target.as_str())
            .flag("--document-name", request.document.as_str())
            .flag("--timeout-seconds", request.timeout_seconds.to_string())
            .flag("--parameters", parameters.to_string())
            .flag("--output", "json")
    }

    fn invocation_spec(handle: &JobHandle, target: &str) -> CommandSpec {
        CommandSpec::new(CommandId::SsmGetInvocation, "aws")
            .args(["ssm", "get-command-invocation"])
            .flag("--command-id", handle.0.as_str())
            .flag("--instance-id", target)
            .flag("--output", "json")
    }
}

impl<L: ProcessLauncher> RemoteChannel for AwsSsmChannel<L> {
    fn submit(&self, request: &JobRequest) -> Result<JobHandle, ChannelError> {
        let result = self.runner.run_quiet(&Self::send_command_spec(request));
        if result.code != 0 {
            return Err(ChannelError::Submit(format!(
                "exit {}: {}",
                result.code,
                result.error.trim()
            )));
        }
        let response: SendCommandResponse = serde_json::from_str(&result.output)
            .map_err(|err| ChannelError::Malformed(format!("send-command: {err}")))?;
        Ok(JobHandle(response.command.command_id))
    }

    fn poll(&self, handle: &JobHandle, target: &str) -> Result<PollReport, PollError> {
        let result = self.runner.run_quiet(&Self::invocation_spec(handle, target));
        if result.code != 0 {
            if SSM_INVOCATION_NOT_VISIBLE.matches(result.code, &result.error) {
                return Err(PollError::NotYetVisible);
            }
            return Err(PollError::Other(result.error.trim().to_string()));
        }
        let response: InvocationResponse = serde_json::from_str(&result.output)
            .map_err(|err| PollError::Other(format!("get-command-invocation: {err}")))?;
        let status = poll_status(&response.status);
        let exit_info = if response.stderr.trim().is_empty() {
            format!("{} (code {})", response.status, response.response_code)
        } else {
            format!(
                "{} (code {}): {}",
                response.status,
                response.response_code,
                response.stderr.trim()
            )
        };
        Ok(PollReport {
            status,
            stdout: response.stdout,
            exit_info,
        })
    }
}
