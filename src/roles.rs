//! Closed role taxonomy for provisioned subjects.
//!
//! Each role maps statically to its compliance-document role id, privilege
//! tier, ledger-network access and the numeric profile tier stored on the
//! identity-provider record.
use crate::config::ConfigError;
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    SystemOwner,
    AuthorizingOfficial,
    SystemSecAssessor,
    TechnicalPointOfContact,
    SystemAdministrator,
    LicenseOwner,
    AcquisitionOfficer,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Privilege {
    Privileged,
    NonPrivileged,
}

impl Privilege {
    pub fn as_str(self) -> &'static str {
        match self {
            Privilege::Privileged => "privileged",
            Privilege::NonPrivileged => "non-privileged",
        }
    }
}

/// What the subject needs on the permissioned ledger network.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LedgerAccess {
    /// Registered and enrolled identity.
    Identity,
    /// Registration mapped to the read-only service role.
    ReadOnly,
    None,
}

impl Role {
    pub const ALL: [Role; 7] = [
        Role::SystemOwner,
        Role::AuthorizingOfficial,
        Role::SystemSecAssessor,
        Role::TechnicalPointOfContact,
        Role::SystemAdministrator,
        Role::LicenseOwner,
        Role::AcquisitionOfficer,
    ];

    /// Human-readable name as written in subject descriptors.
    pub fn display_name(self) -> &'static str {
        match self {
            Role::SystemOwner => "System Owner",
            Role::AuthorizingOfficial => "Authorizing Official",
            Role::SystemSecAssessor => "System Sec Assessor",
            Role::TechnicalPointOfContact => "Technical Point of Contact",
            Role::SystemAdministrator => "System Administrator",
            Role::LicenseOwner => "License Owner",
            Role::AcquisitionOfficer => "Acquisition Officer",
        }
    }

    /// Role id used in the compliance document's responsible-party records.
    pub fn schema_id(self) -> &'static str {
        match self {
            Role::SystemOwner => "system-owner",
            Role::AuthorizingOfficial => "authorizing-official",
            Role::SystemSecAssessor => "sys-sec-assessor",
            Role::TechnicalPointOfContact => "tpoc",
            Role::SystemAdministrator => "system-administrator",
            Role::LicenseOwner => "license-owner",
            Role::AcquisitionOfficer => "acquisition-officer",
        }
    }

    pub fn privilege(self) -> Privilege {
        match self {
            Role::SystemOwner
            | Role::AuthorizingOfficial
            | Role::SystemAdministrator
            | Role::LicenseOwner
            | Role::AcquisitionOfficer => Privilege::Privileged,
            Role::SystemSecAssessor | Role::TechnicalPointOfContact => Privilege::NonPrivileged,
        }
    }

    pub fn ledger_access(self) -> LedgerAccess {
        match self {
            Role::AuthorizingOfficial | Role::AcquisitionOfficer => LedgerAccess::Identity,
            Role::SystemOwner | Role::SystemSecAssessor | Role::SystemAdministrator => {
                LedgerAccess::ReadOnly
            }
            Role::TechnicalPointOfContact | Role::LicenseOwner => LedgerAccess::None,
        }
    }

    /// Numeric tier written to the identity provider's `profile` attribute.
    pub fn profile_tier(self) -> u32 {
        match self {
            Role::SystemOwner => 2,
            Role::AuthorizingOfficial => 4,
            Role::SystemSecAssessor => 8,
            Role::TechnicalPointOfContact => 16,
            Role::SystemAdministrator => 32,
            Role::LicenseOwner => 64,
            Role::AcquisitionOfficer => 128,
        }
    }
}

impl FromStr for Role {
    type Err = ConfigError;

    /// Accepts either the display name or the schema id.
    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let wanted = raw.trim();
        Role::ALL
            .into_iter()
            .find(|role| {
                role.display_name().eq_ignore_ascii_case(wanted) || role.schema_id() == wanted
            })
            .ok_or_else(|| ConfigError::UnknownRole(wanted.to_string()))
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_display_names_and_schema_ids() {
        assert_eq!(
            "Authorizing Official".parse::<Role>().unwrap(),
            Role::AuthorizingOfficial
        );
        assert_eq!("tpoc".parse::<Role>().unwrap(), Role::TechnicalPointOfContact);
        assert_eq!(
            "  system administrator ".parse::<Role>().unwrap(),
            Role::SystemAdministrator
        );
    }

    #[test]
    fn unknown_role_is_rejected() {
        let err = "Chief Vibes Officer".parse::<Role>().unwrap_err();
        assert!(err.to_string().contains("Chief Vibes Officer"));
    }

    #[test]
    fn ledger_identity_roles_are_privileged() {
        let identity_roles: Vec<Role> = Role::ALL
            .into_iter()
            .filter(|role| role.ledger_access() == LedgerAccess::Identity)
            .collect();
        assert_eq!(
            identity_roles,
            vec![Role::AuthorizingOfficial, Role::AcquisitionOfficer]
        );
        assert!(identity_roles
            .iter()
            .all(|role| role.privilege() == Privilege::Privileged));
        assert_eq!(
            Role::SystemSecAssessor.privilege().as_str(),
            "non-privileged"
        );
    }
}
