//! CLI argument parsing for the provisioning entry point.
use crate::policy::ExecutionPolicy;
use crate::workflow::Stage;
use clap::{Args, Parser, Subcommand};
use std::path::{Path, PathBuf};

/// Environment descriptor used when `--env-file` is not given.
pub const DEFAULT_ENV_FILE: &str = "./env-ec2-prod.yaml";

/// Root CLI entrypoint.
#[derive(Parser, Debug)]
#[command(
    name = "bops",
    version,
    about = "Request-driven identity provisioning",
    after_help = "Examples:\n  bops --print process-s3-file -k requests/ticket-42.txt\n  bops -x process-request --request ./ticket-42.txt -e ./env-ec2-prod.yaml\n  bops handle-event --event ./notification.json",
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct RootArgs {
    /// Print the commands that would run without executing anything
    #[arg(long, short = 'p', global = true, conflicts_with = "execute")]
    pub print: bool,

    /// Execute and print commands (default)
    #[arg(long, short = 'x', global = true)]
    pub execute: bool,

    /// Log everything, including batch listings and raw command output
    #[arg(long, short = 'd', global = true)]
    pub debug: bool,

    #[command(subcommand)]
    pub command: Command,
}

impl RootArgs {
    pub fn policy(&self) -> ExecutionPolicy {
        let base = if self.print {
            ExecutionPolicy::print_only()
        } else {
            ExecutionPolicy::execute()
        };
        ExecutionPolicy {
            verbose: self.debug,
            ..base
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum Command {
    ProcessS3File(ProcessS3FileArgs),
    ProcessRequest(ProcessRequestArgs),
    HandleEvent(HandleEventArgs),
}

impl Command {
    pub fn env_file(&self) -> &Path {
        match self {
            Command::ProcessS3File(args) => &args.common.env_file,
            Command::ProcessRequest(args) => &args.common.env_file,
            Command::HandleEvent(args) => &args.env_file,
        }
    }
}

/// Options shared by the workflow subcommands.
#[derive(Args, Debug)]
pub struct WorkflowArgs {
    /// Environment descriptor (YAML)
    #[arg(long, short = 'e', value_name = "PATH", default_value = DEFAULT_ENV_FILE)]
    pub env_file: PathBuf,

    /// Skip a workflow stage; repeatable
    #[arg(long, value_enum, value_name = "STAGE")]
    pub skip: Vec<Stage>,
}

#[derive(Parser, Debug)]
#[command(about = "Fetch a dropped request from object storage and provision its subject")]
pub struct ProcessS3FileArgs {
    /// Object key of the request in the drop bucket
    #[arg(long, short = 'k', value_name = "KEY")]
    pub s3_key: String,

    #[command(flatten)]
    pub common: WorkflowArgs,
}

#[derive(Parser, Debug)]
#[command(about = "Provision the subject of a request file already on disk")]
pub struct ProcessRequestArgs {
    /// Request descriptor (`key: value` text)
    #[arg(long, value_name = "PATH")]
    pub request: PathBuf,

    #[command(flatten)]
    pub common: WorkflowArgs,
}

#[derive(Parser, Debug)]
#[command(about = "Handle an object-storage notification by dispatching a remote job")]
pub struct HandleEventArgs {
    /// Notification JSON
    #[arg(long, value_name = "PATH")]
    pub event: PathBuf,

    /// Environment descriptor (YAML)
    #[arg(long, short = 'e', value_name = "PATH", default_value = DEFAULT_ENV_FILE)]
    pub env_file: PathBuf,
}
