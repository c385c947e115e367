use super::extract;
use super::spec::{CommandId, CommandSpec, MASK};
use crate::config::{ConfigError, EnvConfig, RequestConfig, SubjectDescriptor};
use std::collections::BTreeMap;
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("{id}: missing configuration value {field}")]
    MissingValue { id: CommandId, field: &'static str },
    #[error("{id}: {message}")]
    Config { id: CommandId, message: String },
    #[error("{id}: no request descriptor loaded")]
    MissingRequest { id: CommandId },
    #[error("{id}: no subject descriptor loaded")]
    MissingSubject { id: CommandId },
    #[error("{id}: no object key supplied")]
    MissingObjectKey { id: CommandId },
    #[error("{id}: built by the remote channel, not the workflow registry")]
    Unsupported { id: CommandId },
    #[error("{id}: not resolved by this registry")]
    NotResolved { id: CommandId },
}

impl RegistryError {
    pub fn id(&self) -> CommandId {
        match self {
            RegistryError::MissingValue { id, .. }
            | RegistryError::Config { id, .. }
            | RegistryError::MissingRequest { id }
            | RegistryError::MissingSubject { id }
            | RegistryError::MissingObjectKey { id }
            | RegistryError::Unsupported { id }
            | RegistryError::NotResolved { id } => *id,
        }
    }
}

/// Everything a workflow run knows when it asks for commands. Later stages
/// rebuild the registry once the subject descriptor has been read.
#[derive(Debug, Clone, Copy)]
pub struct WorkflowContext<'a> {
    pub env: &'a EnvConfig,
    pub request: Option<&'a RequestConfig>,
    pub subject: Option<&'a SubjectDescriptor>,
    pub object_key: Option<&'a str>,
}

impl<'a> WorkflowContext<'a> {
    pub fn new(env: &'a EnvConfig) -> Self {
        Self {
            env,
            request: None,
            subject: None,
            object_key: None,
        }
    }

    pub fn with_request(mut self, request: &'a RequestConfig) -> Self {
        self.request = Some(request);
        self
    }

    pub fn with_subject(mut self, subject: &'a SubjectDescriptor) -> Self {
        self.subject = Some(subject);
        self
    }

    pub fn with_object_key(mut self, key: &'a str) -> Self {
        self.object_key = Some(key);
        self
    }

    fn request(&self, id: CommandId) -> Result<&'a RequestConfig, RegistryError> {
        self.request.ok_or(RegistryError::MissingRequest { id })
    }

    fn subject(&self, id: CommandId) -> Result<&'a SubjectDescriptor, RegistryError> {
        self.subject.ok_or(RegistryError::MissingSubject { id })
    }

    fn object_key(&self, id: CommandId) -> Result<&'a str, RegistryError> {
        self.object_key
            .map(str::trim)
            .filter(|key| !key.is_empty())
            .ok_or(RegistryError::MissingObjectKey { id })
    }
}

/// Resolved command lines for one workflow run, keyed by operation id.
#[derive(Debug, Clone, Default)]
pub struct CommandRegistry {
    specs: BTreeMap<CommandId, CommandSpec>,
    unresolved: BTreeMap<CommandId, RegistryError>,
}

impl CommandRegistry {
    /// Build every requested id, failing on the first one that cannot be
    /// resolved from the context.
    pub fn build(ctx: &WorkflowContext<'_>, ids: &[CommandId]) -> Result<Self, RegistryError> {
        let registry = Self::resolve(ctx, ids);
        match ids.iter().find_map(|id| registry.unresolved.get(id)) {
            Some(err) => Err(err.clone()),
            None => Ok(registry),
        }
    }

    /// Build what can be built and remember why the rest could not.
    pub fn resolve(ctx: &WorkflowContext<'_>, ids: &[CommandId]) -> Self {
        let mut registry = Self::default();
        for &id in ids {
            match spec_for(ctx, id) {
                Ok(spec) => {
                    registry.specs.insert(id, spec);
                }
                Err(err) => {
                    registry.unresolved.insert(id, err);
                }
            }
        }
        registry
    }

    pub fn get(&self, id: CommandId) -> Result<&CommandSpec, RegistryError> {
        if let Some(spec) = self.specs.get(&id) {
            return Ok(spec);
        }
        Err(self
            .unresolved
            .get(&id)
            .cloned()
            .unwrap_or(RegistryError::NotResolved { id }))
    }
}

fn value<T>(id: CommandId, result: Result<T, ConfigError>) -> Result<T, RegistryError> {
    result.map_err(|err| match err {
        ConfigError::MissingField(field) => RegistryError::MissingValue { id, field },
        other => RegistryError::Config {
            id,
            message: format!("{:#}", anyhow::Error::from(other)),
        },
    })
}

fn strip_scheme(url: &str) -> &str {
    let url = url.trim();
    let host = url.split_once("://").map_or(url, |(_, rest)| rest);
    host.trim_end_matches('/')
}

fn git(id: CommandId, repo_dir: &Path) -> CommandSpec {
    CommandSpec::new(id, "git")
        .arg("-C")
        .arg(repo_dir.display().to_string())
}

fn spec_for(ctx: &WorkflowContext<'_>, id: CommandId) -> Result<CommandSpec, RegistryError> {
    let env = ctx.env;
    let spec = match id {
        CommandId::SysRemoveGitDir => {
            let repo_dir = value(id, env.git_repo_dir())?;
            CommandSpec::new(id, "rm")
                .arg("-rf")
                .arg(repo_dir.display().to_string())
        }
        CommandId::GitCloneRepo => {
            let repo = value(id, env.git_repo())?;
            let repo_dir = value(id, env.git_repo_dir())?;
            let spec = CommandSpec::new(id, "git")
                .arg("clone")
                .arg(repo)
                .arg(repo_dir.display().to_string());
            match env.work_dir() {
                Ok(work_dir) => spec.in_dir(work_dir),
                Err(_) => spec,
            }
        }
        CommandId::GitCheckoutBranch => {
            let repo_dir = value(id, env.git_repo_dir())?;
            let branch = &ctx.request(id)?.branch_name;
            git(id, &repo_dir)
                .arg("checkout")
                .flag("-b", branch.as_str())
                .arg(format!("origin/{branch}"))
        }
        CommandId::GitAddChanges => {
            let repo_dir = value(id, env.git_repo_dir())?;
            let request = ctx.request(id)?;
            let mut spec = git(id, &repo_dir)
                .arg("add")
                .arg(fragment_relative_path(env, request));
            let ssp = ctx
                .subject
                .and_then(|subject| subject.ssp_path.as_deref())
                .or(env.ssp_path());
            if let Some(ssp) = ssp {
                spec = spec.arg(ssp);
            }
            spec
        }
        CommandId::GitCommitChanges => {
            let repo_dir = value(id, env.git_repo_dir())?;
            let request = ctx.request(id)?;
            git(id, &repo_dir).arg("commit").flag(
                "-m",
                format!(
                    "auto-process addressed request in ticket #{}",
                    request.issue_number
                ),
            )
        }
        CommandId::GitPushChanges => {
            let repo_dir = value(id, env.git_repo_dir())?;
            let branch = &ctx.request(id)?.branch_name;
            git(id, &repo_dir)
                .arg("push")
                .flag("--set-upstream", "origin")
                .arg(branch.as_str())
        }
        CommandId::IdpReadUser => {
            let pool = value(id, env.idp_pool())?;
            let subject = ctx.subject(id)?;
            CommandSpec::new(id, "aws")
                .args(["cognito-idp", "admin-get-user"])
                .flag("--user-pool-id", pool)
                .flag("--username", subject.username.as_str())
                .flag("--output", "json")
                .with_extractor(extract::existing_uuid)
        }
        CommandId::IdpCreateUser => {
            let pool = value(id, env.idp_pool())?;
            let subject = ctx.subject(id)?;
            let attributes = subject
                .idp_attributes()
                .into_iter()
                .map(|(name, value)| format!("Name={name},Value={value}"))
                .collect();
            let mut spec = CommandSpec::new(id, "aws")
                .args(["cognito-idp", "admin-create-user"])
                .flag("--user-pool-id", pool)
                .flag("--username", subject.username.as_str())
                .multi("--user-attributes", attributes)
                .flag("--output", "json")
                .with_extractor(extract::created_uuid);
            if let Some(password) = env.idp_temp_password() {
                spec = spec.flag("--temporary-password", password);
            }
            spec
        }
        CommandId::IdpDeleteUser => {
            let pool = value(id, env.idp_pool())?;
            let subject = ctx.subject(id)?;
            CommandSpec::new(id, "aws")
                .args(["cognito-idp", "admin-delete-user"])
                .flag("--user-pool-id", pool)
                .flag("--username", subject.username.as_str())
        }
        CommandId::AmbReadUser => {
            let subject = ctx.subject(id)?;
            CommandSpec::new(id, "fabric-ca-client")
                .args(["identity", "list"])
                .flag("--id", subject.username.as_str())
                .flag("-u", value(id, env.ca_url())?)
                .flag("--mspdir", value(id, env.msp_dir())?)
                .flag("--tls.certfiles", value(id, env.tls_cert())?)
        }
        CommandId::AmbRegisterUser | CommandId::AmbRegisterReadOnly => {
            let subject = ctx.subject(id)?;
            let mut attrs = format!("blossom.role={}", subject.role.schema_id());
            if id == CommandId::AmbRegisterReadOnly {
                attrs.push_str(",blossom.access=read");
            }
            CommandSpec::new(id, "fabric-ca-client")
                .arg("register")
                .switch("-d")
                .flag("-u", value(id, env.ca_url())?)
                .flag("--mspdir", value(id, env.msp_dir())?)
                .flag("--id.name", subject.username.as_str())
                .masked_flag("--id.secret", value(id, env.default_secret())?, MASK)
                .flag("--id.type", "client")
                .flag("--id.attrs", attrs)
                .flag("--tls.certfiles", value(id, env.tls_cert())?)
        }
        CommandId::AmbEnrollUser => {
            let subject = ctx.subject(id)?;
            let host = strip_scheme(value(id, env.enroll_url())?);
            let secret = value(id, env.default_secret())?;
            let client_msp = value(id, env.clients_dir())?
                .join(&subject.username)
                .join("msp");
            CommandSpec::new(id, "fabric-ca-client")
                .arg("enroll")
                .masked_flag(
                    "-u",
                    format!("https://{}:{secret}@{host}", subject.username),
                    format!("https://{}:{MASK}@{host}", subject.username),
                )
                .flag("-M", client_msp.display().to_string())
                .flag("--tls.certfiles", value(id, env.tls_cert())?)
                .flag("--enrollment.attrs", "blossom.role")
        }
        CommandId::AmbRemoveUser => {
            let subject = ctx.subject(id)?;
            CommandSpec::new(id, "fabric-ca-client")
                .args(["identity", "remove"])
                .arg(subject.username.as_str())
                .flag("-u", value(id, env.ca_url())?)
                .flag("--mspdir", value(id, env.msp_dir())?)
                .flag("--tls.certfiles", value(id, env.tls_cert())?)
        }
        CommandId::S3FileExists => {
            let bucket = value(id, env.s3_drop_name())?;
            let key = ctx.object_key(id)?;
            CommandSpec::new(id, "aws")
                .args(["s3api", "head-object"])
                .flag("--bucket", bucket)
                .flag("--key", key)
        }
        CommandId::S3MoveFile => {
            let base = value(id, env.s3_drop_url())?;
            let user_dir = value(id, env.user_dir())?;
            let key = ctx.object_key(id)?;
            CommandSpec::new(id, "aws")
                .args(["s3", "mv"])
                .arg(format!("{}/{key}", base.trim_end_matches('/')))
                .arg(user_dir.join(key).display().to_string())
        }
        CommandId::S3ReadObject
        | CommandId::SsmSendCommand
        | CommandId::SsmGetInvocation
        | CommandId::Ec2StopInstance => return Err(RegistryError::Unsupported { id }),
    };
    Ok(spec)
}

/// Repository-relative path of the party fragment for this request.
pub fn fragment_relative_path(env: &EnvConfig, request: &RequestConfig) -> String {
    let file = request.party_fragment_file();
    match env.fragment_dir().trim_end_matches('/') {
        "" => file,
        dir => format!("{dir}/{file}"),
    }
}

#[cfg(test)]
#[path = "registry_tests.rs"]
mod tests;
