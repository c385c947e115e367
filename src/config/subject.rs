use super::{read_descriptor, ConfigError};
use crate::roles::Role;
use serde::Deserialize;
use std::path::Path;

/// Requested change for the subject.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubjectAction {
    Create,
    Delete,
}

impl SubjectAction {
    fn parse(raw: &str) -> Result<Self, ConfigError> {
        match raw.trim() {
            "create-user" => Ok(SubjectAction::Create),
            "delete-user" => Ok(SubjectAction::Delete),
            other => Err(ConfigError::UnknownAction(other.to_string())),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            SubjectAction::Create => "create-user",
            SubjectAction::Delete => "delete-user",
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct RawSubjectFile {
    command: Option<String>,
    user: Option<RawSubject>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
struct RawSubject {
    username: Option<String>,
    name: Option<String>,
    role: Option<String>,
    email_address: Option<String>,
    location_uuid: Option<String>,
    member_of_organization: Option<String>,
    ssp_path: Option<String>,
}

/// A validated subject descriptor. Construction fails unless the command,
/// username, display name and role are all present.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubjectDescriptor {
    pub action: SubjectAction,
    pub username: String,
    pub name: String,
    pub role: Role,
    pub email: Option<String>,
    pub location_uuid: Option<String>,
    pub member_of_organization: Option<String>,
    pub ssp_path: Option<String>,
}

fn present(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|value| !value.is_empty() && !value.eq_ignore_ascii_case("none"))
        .map(str::to_string)
}

impl SubjectDescriptor {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = read_descriptor(path)?;
        Self::from_yaml(&text, &path.display().to_string())
    }

    /// Parse descriptor text. Blank text parses as a descriptor with every
    /// required field missing.
    pub fn from_yaml(text: &str, origin: &str) -> Result<Self, ConfigError> {
        let raw: RawSubjectFile = if text.trim().is_empty() {
            RawSubjectFile::default()
        } else {
            serde_yaml::from_str(text).map_err(|source| ConfigError::Parse {
                path: origin.into(),
                source,
            })?
        };
        Self::from_raw(raw, origin)
    }

    fn from_raw(raw: RawSubjectFile, origin: &str) -> Result<Self, ConfigError> {
        let user = raw.user.unwrap_or_default();
        let command = present(&raw.command);
        let username = present(&user.username);
        let name = present(&user.name);
        let role = present(&user.role);

        let mut missing = Vec::new();
        if command.is_none() {
            missing.push("COMMAND");
        }
        if username.is_none() && name.is_none() && role.is_none() {
            missing.push("USER");
        }
        if username.is_none() {
            missing.push("USERNAME");
        }
        if name.is_none() {
            missing.push("NAME");
        }
        if role.is_none() {
            missing.push("ROLE");
        }
        let (Some(command), Some(username), Some(name), Some(role)) =
            (command, username, name, role)
        else {
            return Err(ConfigError::InvalidSubject {
                origin: origin.to_string(),
                missing,
            });
        };

        Ok(Self {
            action: SubjectAction::parse(&command)?,
            username,
            name,
            role: role.parse()?,
            email: present(&user.email_address),
            location_uuid: present(&user.location_uuid),
            member_of_organization: present(&user.member_of_organization),
            ssp_path: present(&user.ssp_path),
        })
    }

    /// Split the display name into (first, middle, last).
    ///
    /// Single-word names only fill `first`; everything between the first and
    /// last word is the middle part.
    pub fn split_name(&self) -> (&str, String, &str) {
        let parts: Vec<&str> = self.name.split_whitespace().collect();
        match parts.as_slice() {
            [] => ("", String::new(), ""),
            [first] => (*first, String::new(), ""),
            [first, last] => (*first, String::new(), *last),
            [first, middle @ .., last] => (*first, middle.join(" "), *last),
        }
    }

    /// Attributes sent to the identity provider when the subject is created,
    /// in a stable order.
    pub fn idp_attributes(&self) -> Vec<(&'static str, String)> {
        let mut attrs = Vec::new();
        if let Some(email) = &self.email {
            attrs.push(("email", email.clone()));
            attrs.push(("email_verified", "true".to_string()));
        }
        attrs.push(("name", self.name.clone()));
        let (first, middle, last) = self.split_name();
        if !first.is_empty() {
            attrs.push(("given_name", first.to_string()));
        }
        if !middle.is_empty() {
            attrs.push(("middle_name", middle));
        }
        if !last.is_empty() {
            attrs.push(("family_name", last.to_string()));
            attrs.push(("preferred_username", format!("{first} {last}")));
        } else if !first.is_empty() {
            attrs.push(("preferred_username", first.to_string()));
        }
        attrs.push(("profile", self.role.profile_tier().to_string()));
        attrs
    }

    /// Short name for the party record: `first-L` or just `first`.
    pub fn short_name(&self) -> String {
        let (first, _, last) = self.split_name();
        match last.chars().next() {
            Some(initial) => format!("{first}-{initial}"),
            None => first.to_string(),
        }
    }
}

#[cfg(test)]
#[path = "subject_tests.rs"]
mod tests;
