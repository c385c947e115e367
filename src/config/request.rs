use super::{read_descriptor, ConfigError, KeyValues};
use std::path::Path;

const BRANCH_NAME: &str = "branch_name";
const FILE: &str = "file";
const ISSUE_NUMBER: &str = "issue_number";

/// The request object dropped into storage: which branch to work on, where
/// the subject descriptor lives inside the repository and which ticket the
/// change answers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestConfig {
    pub branch_name: String,
    pub file: String,
    pub issue_number: String,
}

impl RequestConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = read_descriptor(path)?;
        Self::from_key_values(&KeyValues::parse(&text), &path.display().to_string())
    }

    pub fn from_key_values(kv: &KeyValues, origin: &str) -> Result<Self, ConfigError> {
        let mut missing = Vec::new();
        for key in [BRANCH_NAME, FILE, ISSUE_NUMBER] {
            if kv.non_empty(key).is_none() {
                missing.push(key);
            }
        }
        if !missing.is_empty() {
            return Err(ConfigError::InvalidRequest {
                origin: origin.to_string(),
                missing,
            });
        }
        let value = |key: &str| kv.non_empty(key).unwrap_or_default().to_string();
        Ok(Self {
            branch_name: value(BRANCH_NAME),
            file: value(FILE),
            issue_number: value(ISSUE_NUMBER),
        })
    }

    /// Name of the party fragment generated for this request.
    ///
    /// `ato/created_users/20241106-215256_created_user.yaml` becomes
    /// `20241106-215256-party-frag.xml`.
    pub fn party_fragment_file(&self) -> String {
        let base = self.file.rsplit('/').next().unwrap_or(&self.file);
        let stem = match base.rfind("_created") {
            Some(end) => &base[..end],
            None => Path::new(base)
                .file_stem()
                .and_then(|stem| stem.to_str())
                .unwrap_or(base),
        };
        format!("{stem}-party-frag.xml")
    }
}
