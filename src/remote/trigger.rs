use super::dispatch::{Dispatcher, JobRequest, RemoteChannel, RemoteJob};
use crate::command::{CommandId, CommandResult, CommandRunner, CommandSpec, ProcessLauncher};
use crate::config::{EnvConfig, KeyValues};
use crate::sentinels::S3_OBJECT_NOT_FOUND;
use anyhow::{anyhow, Result};
use serde::Deserialize;

/// What a storage notification asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    Provision,
    Suspend,
    Ignored,
}

impl EventKind {
    /// `ObjectCreated:Put`, `object created:put` and friends provision;
    /// `ObjectRemoved:*` suspends.
    pub fn classify(event_type: &str) -> Self {
        let normalized: String = event_type
            .chars()
            .filter(|ch| !ch.is_whitespace())
            .flat_map(char::to_lowercase)
            .collect();
        if normalized.starts_with("objectcreated") {
            EventKind::Provision
        } else if normalized.starts_with("objectremoved") {
            EventKind::Suspend
        } else {
            EventKind::Ignored
        }
    }
}

/// One (event type, bucket, key) triple from a notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageEvent {
    pub event_type: String,
    pub bucket: String,
    pub key: String,
}

#[derive(Debug, Deserialize)]
struct Notification {
    #[serde(rename = "Records", default)]
    records: Vec<Record>,
}

#[derive(Debug, Deserialize)]
struct Record {
    #[serde(rename = "eventName", default)]
    event_name: String,
    s3: S3Entity,
}

#[derive(Debug, Deserialize)]
struct S3Entity {
    bucket: Named,
    object: Keyed,
}

#[derive(Debug, Deserialize)]
struct Named {
    name: String,
}

#[derive(Debug, Deserialize)]
struct Keyed {
    key: String,
}

impl StorageEvent {
    pub fn kind(&self) -> EventKind {
        EventKind::classify(&self.event_type)
    }

    /// Parse an S3 notification document. Keys arrive form-encoded.
    pub fn parse_notification(json: &str) -> Result<Vec<StorageEvent>> {
        let notification: Notification =
            serde_json::from_str(json).map_err(|err| anyhow!("malformed notification: {err}"))?;
        Ok(notification
            .records
            .into_iter()
            .map(|record| StorageEvent {
                event_type: record.event_name,
                bucket: record.s3.bucket.name,
                key: decode_key(&record.s3.object.key),
            })
            .collect())
    }
}

fn decode_key(raw: &str) -> String {
    let bytes = raw.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut index = 0;
    while index < bytes.len() {
        match bytes[index] {
            b'+' => out.push(b' '),
            b'%' if index + 2 < bytes.len() => {
                let hex = std::str::from_utf8(&bytes[index + 1..index + 3]).ok();
                match hex.and_then(|hex| u8::from_str_radix(hex, 16).ok()) {
                    Some(byte) => {
                        out.push(byte);
                        index += 2;
                    }
                    None => out.push(b'%'),
                }
            }
            byte => out.push(byte),
        }
        index += 1;
    }
    String::from_utf8_lossy(&out).into_owned()
}

#[derive(Debug, Clone)]
pub enum TriggerOutcome {
    Ignored { event_type: String },
    /// Print-only: the job that would have been submitted.
    Planned(JobRequest),
    Dispatched(RemoteJob),
    Suspended(CommandResult),
    Failed { key: String, error: String },
}

impl TriggerOutcome {
    pub fn is_success(&self) -> bool {
        match self {
            TriggerOutcome::Ignored { .. } | TriggerOutcome::Planned(_) => true,
            TriggerOutcome::Dispatched(job) => job.succeeded(),
            TriggerOutcome::Suspended(result) => result.is_success(),
            TriggerOutcome::Failed { .. } => false,
        }
    }

    /// One-line description for the operator.
    pub fn summary(&self) -> String {
        match self {
            TriggerOutcome::Ignored { event_type } => format!("ignored {event_type}"),
            TriggerOutcome::Planned(request) => {
                format!("planned on {}: {}", request.target, request.command)
            }
            TriggerOutcome::Dispatched(job) => format!(
                "job {} on {} {:?} after {} polls",
                job.handle, job.target, job.state, job.attempts
            ),
            TriggerOutcome::Suspended(result) => format!("suspend exited {}", result.code),
            TriggerOutcome::Failed { key, error } => format!("{key} failed: {error}"),
        }
    }
}

/// Turns storage notifications into remote provisioning jobs.
pub struct TriggerHandler<'e, L, C> {
    env: &'e EnvConfig,
    runner: CommandRunner<L>,
    dispatcher: Dispatcher<C>,
}

impl<'e, L: ProcessLauncher, C: RemoteChannel> TriggerHandler<'e, L, C> {
    pub fn new(env: &'e EnvConfig, runner: CommandRunner<L>, dispatcher: Dispatcher<C>) -> Self {
        Self {
            env,
            runner,
            dispatcher,
        }
    }

    /// Handle every record of a notification. Malformed input is logged and
    /// yields no outcomes.
    pub fn handle_notification(&self, json: &str) -> Vec<TriggerOutcome> {
        match StorageEvent::parse_notification(json) {
            Ok(events) => events.iter().map(|event| self.handle(event)).collect(),
            Err(err) => {
                tracing::warn!(error = %format!("{err:#}"), "ignoring notification");
                Vec::new()
            }
        }
    }

    pub fn handle(&self, event: &StorageEvent) -> TriggerOutcome {
        let outcome = match event.kind() {
            EventKind::Provision => self.provision(event),
            EventKind::Suspend => self.suspend(),
            EventKind::Ignored => {
                tracing::info!(event_type = %event.event_type, key = %event.key, "ignoring event");
                return TriggerOutcome::Ignored {
                    event_type: event.event_type.clone(),
                };
            }
        };
        outcome.unwrap_or_else(|err| {
            tracing::error!(key = %event.key, error = %format!("{err:#}"), "trigger failed");
            TriggerOutcome::Failed {
                key: event.key.clone(),
                error: format!("{err:#}"),
            }
        })
    }

    fn provision(&self, event: &StorageEvent) -> Result<TriggerOutcome> {
        let request = self.job_request(event)?;
        if self.runner.policy().is_print_only() {
            println!("{}", request.command);
            return Ok(TriggerOutcome::Planned(request));
        }
        let body = self.read_object(&event.bucket, &event.key)?;
        let tokens = KeyValues::parse(&body);
        if tokens.is_empty() {
            tracing::warn!(key = %event.key, "request object carries no `key: value` lines");
        }
        tracing::info!(
            key = %event.key,
            fields = tokens.len(),
            branch = tokens.get("branch_name").unwrap_or_default(),
            file = tokens.get("file").unwrap_or_default(),
            "request object received"
        );
        let job = self.dispatcher.dispatch(&request)?;
        Ok(TriggerOutcome::Dispatched(job))
    }

    fn suspend(&self) -> Result<TriggerOutcome> {
        let spec = CommandSpec::new(CommandId::Ec2StopInstance, "aws")
            .args(["ec2", "stop-instances"])
            .flag("--instance-ids", self.env.instance_id()?);
        Ok(TriggerOutcome::Suspended(self.runner.run(&spec)))
    }

    fn read_object(&self, bucket: &str, key: &str) -> Result<String> {
        let spec = CommandSpec::new(CommandId::S3ReadObject, "aws")
            .args(["s3", "cp"])
            .arg(format!("s3://{bucket}/{key}"))
            .arg("-");
        let result = self.runner.run(&spec);
        if result.code == 0 {
            return Ok(result.output);
        }
        if S3_OBJECT_NOT_FOUND.matches(result.code, &result.error) {
            return Err(anyhow!("object s3://{bucket}/{key} not found"));
        }
        Err(anyhow!(
            "read s3://{bucket}/{key} failed (exit {}): {}",
            result.code,
            result.error.trim()
        ))
    }

    /// The remote command runs the workflow for this key as the configured
    /// user from the configured work directory.
    pub fn job_request(&self, event: &StorageEvent) -> Result<JobRequest> {
        let env = self.env;
        let mut inner = vec![
            "bops".to_string(),
            "--execute".to_string(),
            "process-s3-file".to_string(),
            "--env-file".to_string(),
            env.remote_env_file()?.to_string(),
            "--s3-key".to_string(),
            event.key.clone(),
        ];
        if self.runner.policy().verbose {
            inner.insert(1, "--debug".to_string());
        }
        let command = shell_words::join([
            "runuser".to_string(),
            "-l".to_string(),
            env.run_as().to_string(),
            "-c".to_string(),
            shell_words::join(&inner),
        ]);
        Ok(JobRequest {
            target: env.instance_id()?.to_string(),
            command,
            working_dir: env.work_dir()?.display().to_string(),
            timeout_seconds: env.remote_timeout_seconds(),
            document: env.ssm_document().to_string(),
        })
    }
}

#[cfg(test)]
#[path = "trigger_tests.rs"]
mod tests;
