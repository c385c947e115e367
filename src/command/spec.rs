use crate::util::command_text;
use std::fmt;
use std::path::PathBuf;

/// Post-processor applied to a successful command's stdout.
pub type Extractor = fn(&str) -> anyhow::Result<String>;

/// Closed set of operations the workflow can ask for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum CommandId {
    // Working copy
    SysRemoveGitDir,
    GitCloneRepo,
    GitCheckoutBranch,
    GitAddChanges,
    GitCommitChanges,
    GitPushChanges,
    // Identity provider
    IdpReadUser,
    IdpCreateUser,
    IdpDeleteUser,
    // Ledger certificate authority
    AmbReadUser,
    AmbRegisterUser,
    AmbRegisterReadOnly,
    AmbEnrollUser,
    AmbRemoveUser,
    // Object storage
    S3FileExists,
    S3MoveFile,
    S3ReadObject,
    // Remote execution target
    SsmSendCommand,
    SsmGetInvocation,
    Ec2StopInstance,
}

impl CommandId {
    pub fn as_str(self) -> &'static str {
        match self {
            CommandId::SysRemoveGitDir => "sys-remove-git-dir",
            CommandId::GitCloneRepo => "git-clone-repo",
            CommandId::GitCheckoutBranch => "git-checkout-branch",
            CommandId::GitAddChanges => "git-add-changes",
            CommandId::GitCommitChanges => "git-commit-changes",
            CommandId::GitPushChanges => "git-push-changes",
            CommandId::IdpReadUser => "idp-read-user",
            CommandId::IdpCreateUser => "idp-create-user",
            CommandId::IdpDeleteUser => "idp-delete-user",
            CommandId::AmbReadUser => "amb-read-user",
            CommandId::AmbRegisterUser => "amb-register-user",
            CommandId::AmbRegisterReadOnly => "amb-register-read-only",
            CommandId::AmbEnrollUser => "amb-enroll-user",
            CommandId::AmbRemoveUser => "amb-remove-user",
            CommandId::S3FileExists => "s3-file-exists",
            CommandId::S3MoveFile => "s3-move-file",
            CommandId::S3ReadObject => "s3-read-object",
            CommandId::SsmSendCommand => "ssm-send-command",
            CommandId::SsmGetInvocation => "ssm-get-invocation",
            CommandId::Ec2StopInstance => "ec2-stop-instance",
        }
    }
}

impl fmt::Display for CommandId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Stand-in for secret values in printed and logged command text.
pub const MASK: &str = "REDACTED";

/// One typed piece of a command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Param {
    /// Positional argument or subcommand word.
    Arg(String),
    /// `--flag value`
    Flag(&'static str, String),
    /// `--flag v1 v2 ...`
    Multi(&'static str, Vec<String>),
    /// Bare `--flag`
    Switch(&'static str),
    /// `--flag value` where the value carries a credential. `shown` replaces
    /// it everywhere except the launched argv.
    Masked {
        name: &'static str,
        value: String,
        shown: String,
    },
}

impl Param {
    pub fn arg(value: impl Into<String>) -> Self {
        Param::Arg(value.into())
    }

    pub fn flag(name: &'static str, value: impl Into<String>) -> Self {
        Param::Flag(name, value.into())
    }

    fn push_into(&self, argv: &mut Vec<String>) {
        match self {
            Param::Arg(value) => argv.push(value.clone()),
            Param::Flag(name, value) => {
                argv.push((*name).to_string());
                argv.push(value.clone());
            }
            Param::Multi(name, values) => {
                argv.push((*name).to_string());
                argv.extend(values.iter().cloned());
            }
            Param::Switch(name) => argv.push((*name).to_string()),
            Param::Masked { name, value, .. } => {
                argv.push((*name).to_string());
                argv.push(value.clone());
            }
        }
    }

    fn push_shown_into(&self, argv: &mut Vec<String>) {
        match self {
            Param::Masked { name, shown, .. } => {
                argv.push((*name).to_string());
                argv.push(shown.clone());
            }
            other => other.push_into(argv),
        }
    }
}

/// A fully substituted command line for one operation.
#[derive(Debug, Clone)]
pub struct CommandSpec {
    pub id: CommandId,
    pub program: String,
    pub params: Vec<Param>,
    pub cwd: Option<PathBuf>,
    pub extractor: Option<Extractor>,
}

impl CommandSpec {
    pub fn new(id: CommandId, program: impl Into<String>) -> Self {
        Self {
            id,
            program: program.into(),
            params: Vec::new(),
            cwd: None,
            extractor: None,
        }
    }

    pub fn arg(mut self, value: impl Into<String>) -> Self {
        self.params.push(Param::arg(value));
        self
    }

    pub fn args<I, S>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.params.extend(values.into_iter().map(Param::arg));
        self
    }

    pub fn flag(mut self, name: &'static str, value: impl Into<String>) -> Self {
        self.params.push(Param::flag(name, value));
        self
    }

    pub fn multi(mut self, name: &'static str, values: Vec<String>) -> Self {
        self.params.push(Param::Multi(name, values));
        self
    }

    /// Flag whose real value only reaches the launched process.
    pub fn masked_flag(
        mut self,
        name: &'static str,
        value: impl Into<String>,
        shown: impl Into<String>,
    ) -> Self {
        self.params.push(Param::Masked {
            name,
            value: value.into(),
            shown: shown.into(),
        });
        self
    }

    pub fn switch(mut self, name: &'static str) -> Self {
        self.params.push(Param::Switch(name));
        self
    }

    pub fn in_dir(mut self, cwd: impl Into<PathBuf>) -> Self {
        self.cwd = Some(cwd.into());
        self
    }

    pub fn with_extractor(mut self, extractor: Extractor) -> Self {
        self.extractor = Some(extractor);
        self
    }

    /// Program followed by every parameter, flattened. Empty when no program
    /// was supplied.
    pub fn argv(&self) -> Vec<String> {
        if self.program.trim().is_empty() {
            return Vec::new();
        }
        let mut argv = vec![self.program.clone()];
        for param in &self.params {
            param.push_into(&mut argv);
        }
        argv
    }

    /// Printable command line with masked values substituted. This is what
    /// logs, reports and print-only output carry.
    pub fn text(&self) -> String {
        if self.program.trim().is_empty() {
            return String::new();
        }
        let mut shown = vec![self.program.clone()];
        for param in &self.params {
            param.push_shown_into(&mut shown);
        }
        command_text(&shown)
    }
}
