//! Descriptor loading: environment, request and subject.
//!
//! All three descriptors are parsed into typed values up front. Anything the
//! workflow needs but the files do not supply surfaces as a `ConfigError`
//! naming the missing piece, before any remote call is attempted.
use std::path::PathBuf;

mod env;
mod kv;
mod request;
mod subject;

pub use env::{AmbSection, AwsSection, BatSection, EnvConfig, GitSection, SsmSection};
pub use kv::KeyValues;
pub use request::RequestConfig;
pub use subject::{SubjectAction, SubjectDescriptor};

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("descriptor {0} does not exist or is not a file")]
    MissingFile(PathBuf),

    #[error("read descriptor {path}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("parse descriptor {path}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("environment descriptor missing required value {0}")]
    MissingField(&'static str),

    #[error("request descriptor {origin} missing {}", .missing.join(", "))]
    InvalidRequest {
        origin: String,
        missing: Vec<&'static str>,
    },

    #[error("subject descriptor {origin} missing {}", .missing.join(", "))]
    InvalidSubject {
        origin: String,
        missing: Vec<&'static str>,
    },

    #[error("unknown role {0:?}")]
    UnknownRole(String),

    #[error("unknown subject command {0:?} (expected create-user or delete-user)")]
    UnknownAction(String),
}

impl ConfigError {
    /// Missing field names for descriptor validation failures.
    pub fn missing_fields(&self) -> &[&'static str] {
        match self {
            ConfigError::InvalidRequest { missing, .. }
            | ConfigError::InvalidSubject { missing, .. } => missing,
            _ => &[],
        }
    }
}

fn read_descriptor(path: &std::path::Path) -> Result<String, ConfigError> {
    if !path.is_file() {
        return Err(ConfigError::MissingFile(path.to_path_buf()));
    }
    std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })
}
