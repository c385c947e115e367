//! Output extractors for identity-provider responses.
use anyhow::{anyhow, Context, Result};
use serde::Deserialize;
use uuid::Uuid;

#[derive(Debug, Deserialize)]
struct Attribute {
    #[serde(rename = "Name")]
    name: String,
    #[serde(rename = "Value", default)]
    value: String,
}

#[derive(Debug, Deserialize)]
struct CreatedUser {
    #[serde(rename = "User")]
    user: CreatedUserBody,
}

#[derive(Debug, Deserialize)]
struct CreatedUserBody {
    #[serde(rename = "Attributes", default)]
    attributes: Vec<Attribute>,
}

#[derive(Debug, Deserialize)]
struct ExistingUser {
    #[serde(rename = "UserAttributes", default)]
    attributes: Vec<Attribute>,
}

fn sub_uuid(attributes: &[Attribute]) -> Result<String> {
    let sub = attributes
        .iter()
        .find(|attr| attr.name == "sub")
        .ok_or_else(|| anyhow!("response carries no `sub` attribute"))?;
    let id = Uuid::parse_str(sub.value.trim())
        .with_context(|| format!("`sub` is not a uuid: {}", sub.value))?;
    if id.get_version_num() != 4 {
        return Err(anyhow!("`sub` is not a v4 uuid: {id}"));
    }
    Ok(id.hyphenated().to_string())
}

/// Identifier assigned by `admin-create-user` (`User.Attributes[sub]`).
pub fn created_uuid(stdout: &str) -> Result<String> {
    let parsed: CreatedUser =
        serde_json::from_str(stdout).context("parse admin-create-user response")?;
    sub_uuid(&parsed.user.attributes)
}

/// Identifier reported by `admin-get-user` (`UserAttributes[sub]`).
pub fn existing_uuid(stdout: &str) -> Result<String> {
    let parsed: ExistingUser =
        serde_json::from_str(stdout).context("parse admin-get-user response")?;
    sub_uuid(&parsed.attributes)
}
