mod cli;
mod command;
mod config;
mod logging;
mod policy;
mod remote;
mod report;
mod roles;
mod sentinels;
mod util;
mod workflow;

use anyhow::{Context, Result};
use clap::Parser;
use cli::{Command, RootArgs};
use command::CommandRunner;
use config::EnvConfig;
use logging::LogSettings;
use remote::{AwsSsmChannel, Dispatcher, TriggerHandler};
use report::FailureReport;
use std::process::ExitCode;
use workflow::ProvisioningWorkflow;

fn main() -> ExitCode {
    let args = RootArgs::parse();
    match run(args) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(err) => {
            eprintln!("error: {err:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(args: RootArgs) -> Result<bool> {
    let policy = args.policy();
    let env = match EnvConfig::load(args.command.env_file()) {
        Ok(env) => env,
        Err(err) => {
            eprintln!("{}", FailureReport::error("load environment", err));
            return Ok(false);
        }
    };
    if let Some(path) = logging::init(&LogSettings::from_env(&env, policy.verbose))? {
        tracing::debug!(path = %path.display(), "logging to file");
    }
    tracing::info!(print_only = policy.is_print_only(), "bops start");

    let runner = CommandRunner::system(policy);
    let success = match args.command {
        Command::ProcessS3File(args) => {
            ProvisioningWorkflow::new(&env, runner)
                .skipping(args.common.skip)
                .process_s3_file(&args.s3_key)
                .success
        }
        Command::ProcessRequest(args) => {
            ProvisioningWorkflow::new(&env, runner)
                .skipping(args.common.skip)
                .process_request_file(&args.request)
                .success
        }
        Command::HandleEvent(args) => {
            let json = std::fs::read_to_string(&args.event)
                .with_context(|| format!("read {}", args.event.display()))?;
            let dispatcher = Dispatcher::from_env(AwsSsmChannel::new(runner.clone()), &env);
            let outcomes = TriggerHandler::new(&env, runner, dispatcher).handle_notification(&json);
            for outcome in &outcomes {
                tracing::info!(success = outcome.is_success(), "{}", outcome.summary());
            }
            outcomes.iter().all(|outcome| outcome.is_success())
        }
    };
    Ok(success)
}
