use super::{read_descriptor, ConfigError};
use crate::util::expand_home;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

const DEFAULT_SSM_DOCUMENT: &str = "AWS-RunShellScript";
const DEFAULT_RUN_AS: &str = "ec2-user";
const DEFAULT_TIMEOUT_SECONDS: u64 = 99;
const DEFAULT_MAX_POLL_ATTEMPTS: u32 = 100;
const DEFAULT_POLL_DELAY_MS: u64 = 900;

#[derive(Debug, Default, Deserialize)]
struct EnvFile {
    #[serde(default)]
    env: EnvConfig,
}

/// Environment descriptor rooted at the `env:` key.
///
/// Keys the tool does not consume are ignored. Every leaf is optional when
/// parsing; accessors fail with the descriptor path of the missing value
/// (e.g. `env/git/repo`) when a command needs it.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct EnvConfig {
    pub bat: BatSection,
    pub git: GitSection,
    pub aws: AwsSection,
    pub amb: AmbSection,
    pub ssm: SsmSection,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct BatSection {
    pub user_dir: String,
    pub work_dir: String,
    pub logs_dir: String,
    pub log_at: String,
    pub print_at: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct GitSection {
    pub repo: String,
    pub repo_dir: String,
    pub fragment_dir: String,
    pub ssp: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct AwsSection {
    pub idp_pool: String,
    pub idp_temp_password: String,
    pub s3_drop_name: String,
    pub s3_drop_url: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct AmbSection {
    pub ca_url: String,
    pub msp_dir: String,
    pub clients_dir: String,
    pub enroll_url: String,
    pub default_secret: String,
    pub tls_cert: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct SsmSection {
    pub instance_id: String,
    pub document: String,
    pub run_as: String,
    pub remote_env_file: String,
    pub timeout_seconds: Option<u64>,
    pub max_poll_attempts: Option<u32>,
    pub poll_delay_ms: Option<u64>,
}

fn require<'a>(value: &'a str, field: &'static str) -> Result<&'a str, ConfigError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(ConfigError::MissingField(field));
    }
    Ok(value)
}

impl EnvConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = read_descriptor(path)?;
        Self::from_yaml(&text, path)
    }

    pub fn from_yaml(text: &str, origin: &Path) -> Result<Self, ConfigError> {
        if text.trim().is_empty() {
            return Ok(Self::default());
        }
        let file: EnvFile = serde_yaml::from_str(text).map_err(|source| ConfigError::Parse {
            path: origin.to_path_buf(),
            source,
        })?;
        Ok(file.env)
    }

    pub fn user_dir(&self) -> Result<PathBuf, ConfigError> {
        require(&self.bat.user_dir, "env/bat/user-dir").map(expand_home)
    }

    pub fn work_dir(&self) -> Result<PathBuf, ConfigError> {
        require(&self.bat.work_dir, "env/bat/work-dir").map(expand_home)
    }

    /// Log directory; `None` disables the persisted log file.
    pub fn logs_dir(&self) -> Option<PathBuf> {
        require(&self.bat.logs_dir, "env/bat/logs-dir")
            .ok()
            .map(expand_home)
    }

    pub fn git_repo(&self) -> Result<&str, ConfigError> {
        require(&self.git.repo, "env/git/repo")
    }

    pub fn git_repo_dir(&self) -> Result<PathBuf, ConfigError> {
        require(&self.git.repo_dir, "env/git/repo-dir").map(expand_home)
    }

    /// Repository-relative directory receiving party fragments.
    pub fn fragment_dir(&self) -> &str {
        self.git.fragment_dir.trim()
    }

    /// Repository-relative compliance document path, when configured.
    pub fn ssp_path(&self) -> Option<&str> {
        require(&self.git.ssp, "env/git/ssp").ok()
    }

    pub fn idp_pool(&self) -> Result<&str, ConfigError> {
        require(&self.aws.idp_pool, "env/aws/idp-pool")
    }

    pub fn idp_temp_password(&self) -> Option<&str> {
        require(&self.aws.idp_temp_password, "env/aws/idp-temp-password").ok()
    }

    pub fn s3_drop_name(&self) -> Result<&str, ConfigError> {
        require(&self.aws.s3_drop_name, "env/aws/s3-drop-name")
    }

    pub fn s3_drop_url(&self) -> Result<&str, ConfigError> {
        require(&self.aws.s3_drop_url, "env/aws/s3-drop-url")
    }

    pub fn ca_url(&self) -> Result<&str, ConfigError> {
        require(&self.amb.ca_url, "env/amb/ca-url")
    }

    pub fn msp_dir(&self) -> Result<&str, ConfigError> {
        require(&self.amb.msp_dir, "env/amb/msp-dir")
    }

    pub fn clients_dir(&self) -> Result<PathBuf, ConfigError> {
        require(&self.amb.clients_dir, "env/amb/clients-dir").map(expand_home)
    }

    pub fn enroll_url(&self) -> Result<&str, ConfigError> {
        require(&self.amb.enroll_url, "env/amb/enroll-url")
    }

    pub fn default_secret(&self) -> Result<&str, ConfigError> {
        require(&self.amb.default_secret, "env/amb/default-secret")
    }

    pub fn tls_cert(&self) -> Result<&str, ConfigError> {
        require(&self.amb.tls_cert, "env/amb/tls-cert")
    }

    pub fn instance_id(&self) -> Result<&str, ConfigError> {
        require(&self.ssm.instance_id, "env/ssm/instance-id")
    }

    pub fn remote_env_file(&self) -> Result<&str, ConfigError> {
        require(&self.ssm.remote_env_file, "env/ssm/remote-env-file")
    }

    pub fn ssm_document(&self) -> &str {
        require(&self.ssm.document, "env/ssm/document").unwrap_or(DEFAULT_SSM_DOCUMENT)
    }

    pub fn run_as(&self) -> &str {
        require(&self.ssm.run_as, "env/ssm/run-as").unwrap_or(DEFAULT_RUN_AS)
    }

    pub fn remote_timeout_seconds(&self) -> u64 {
        self.ssm.timeout_seconds.unwrap_or(DEFAULT_TIMEOUT_SECONDS)
    }

    pub fn max_poll_attempts(&self) -> u32 {
        self.ssm.max_poll_attempts.unwrap_or(DEFAULT_MAX_POLL_ATTEMPTS)
    }

    pub fn poll_delay(&self) -> Duration {
        Duration::from_millis(self.ssm.poll_delay_ms.unwrap_or(DEFAULT_POLL_DELAY_MS))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ENV_YAML: &str = r#"
env:
  bat:
    user-dir: /opt/blossom/users
    work-dir: /opt/blossom
    log-at: warn
  git:
    repo: git@github.com:example/blossom-oscal-auto.git
    repo-dir: /opt/blossom/repo
    ssp: ato/ssp.xml
  aws:
    idp-pool: us-east-1_abc
  ssm:
    instance-id: i-0123
    max-poll-attempts: 5
"#;

    fn parsed() -> EnvConfig {
        EnvConfig::from_yaml(ENV_YAML, Path::new("env.yaml")).expect("valid env")
    }

    #[test]
    fn reads_namespaced_values() {
        let env = parsed();
        assert_eq!(env.git_repo().unwrap(), "git@github.com:example/blossom-oscal-auto.git");
        assert_eq!(env.git_repo_dir().unwrap(), PathBuf::from("/opt/blossom/repo"));
        assert_eq!(env.idp_pool().unwrap(), "us-east-1_abc");
        assert_eq!(env.ssp_path(), Some("ato/ssp.xml"));
        assert_eq!(env.bat.log_at, "warn");
    }

    #[test]
    fn missing_values_name_their_path() {
        let env = parsed();
        let err = env.ca_url().unwrap_err();
        assert!(matches!(err, ConfigError::MissingField("env/amb/ca-url")));
        assert_eq!(env.logs_dir(), None);
    }

    #[test]
    fn ssm_defaults_apply() {
        let env = parsed();
        assert_eq!(env.ssm_document(), "AWS-RunShellScript");
        assert_eq!(env.run_as(), "ec2-user");
        assert_eq!(env.remote_timeout_seconds(), 99);
        assert_eq!(env.max_poll_attempts(), 5);
        assert_eq!(env.poll_delay(), Duration::from_millis(900));
    }

    #[test]
    fn malformed_yaml_is_a_parse_error() {
        let err = EnvConfig::from_yaml("env: [unclosed", Path::new("bad.yaml")).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }
}
