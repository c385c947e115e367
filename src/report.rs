//! Failure reports: one record per failure with the command, what it
//! printed and where in the workflow it was raised.
use crate::command::{CommandResult, StepRecord};
use crate::util::truncate_string;
use std::fmt;
use std::panic::Location;

const EXCERPT_BYTES: usize = 4096;

#[derive(Debug, Clone)]
pub struct FailureReport {
    pub context: String,
    pub command: String,
    pub output: String,
    pub error: String,
    pub code: Option<i32>,
    pub location: &'static Location<'static>,
}

impl FailureReport {
    #[track_caller]
    pub fn command(context: &str, command: &str, result: &CommandResult) -> Self {
        Self {
            context: context.to_string(),
            command: command.to_string(),
            output: result.output.clone(),
            error: result.error.clone(),
            code: Some(result.code),
            location: Location::caller(),
        }
    }

    #[track_caller]
    pub fn step(context: &str, step: &StepRecord) -> Self {
        let mut report = Self::command(context, &step.command_text, &step.result);
        if let Some(extract_error) = &step.extract_error {
            report.error = extract_error.clone();
        }
        report
    }

    /// A failure with no command behind it (missing files, bad descriptors).
    #[track_caller]
    pub fn message(context: &str, detail: impl fmt::Display) -> Self {
        Self {
            context: context.to_string(),
            command: String::new(),
            output: String::new(),
            error: detail.to_string(),
            code: None,
            location: Location::caller(),
        }
    }

    /// A failure carried by an error value; the report keeps its whole
    /// `source()` chain.
    #[track_caller]
    pub fn error<E>(context: &str, err: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::message(context, format!("{:#}", anyhow::Error::from(err)))
    }

    /// Write the report as one error event; the subscriber fans it out to
    /// the terminal and the log file.
    pub fn emit(&self) {
        tracing::error!(
            context = %self.context,
            command = %self.command,
            code = ?self.code,
            stdout = %truncate_string(self.output.trim(), EXCERPT_BYTES),
            stderr = %truncate_string(self.error.trim(), EXCERPT_BYTES),
            location = %format!("{}:{}", self.location.file(), self.location.line()),
            "failure"
        );
    }
}

impl fmt::Display for FailureReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} at {}:{}",
            self.context,
            self.location.file(),
            self.location.line()
        )?;
        if !self.command.is_empty() {
            write!(f, "\n  command: {}", self.command)?;
        }
        if let Some(code) = self.code {
            write!(f, "\n  code: {code}")?;
        }
        if !self.output.trim().is_empty() {
            write!(f, "\n  output: {}", self.output.trim())?;
        }
        if !self.error.trim().is_empty() {
            write!(f, "\n  error: {}", self.error.trim())?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn report_records_caller_location() {
        let result = CommandResult {
            output: String::new(),
            error: "fatal: repository not found".to_string(),
            code: 128,
        };
        let report = FailureReport::command("prepare repository", "git clone x y", &result);
        assert!(report.location.file().ends_with("report.rs"));
        let text = report.to_string();
        assert!(text.contains("command: git clone x y"));
        assert!(text.contains("code: 128"));
        assert!(text.contains("repository not found"));
    }

    #[test]
    fn error_reports_carry_the_parse_cause() {
        let err = crate::config::EnvConfig::from_yaml(
            "env: [unclosed",
            std::path::Path::new("env.yaml"),
        )
        .unwrap_err();
        let report = FailureReport::error("load environment", err);
        assert!(report.error.starts_with("parse descriptor env.yaml: "), "{}", report.error);
        assert!(report.error.len() > "parse descriptor env.yaml: ".len());
        assert!(report.location.file().ends_with("report.rs"));
    }

    #[test]
    fn message_reports_have_no_command() {
        let report = FailureReport::message("locate subject", "missing /srv/repo/u.yaml");
        assert_eq!(report.code, None);
        assert!(!report.to_string().contains("command:"));
    }
}
