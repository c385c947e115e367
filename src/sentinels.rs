//! Known exit codes and error-text fragments emitted by vendor CLIs.
//!
//! The tools we drive report "does not exist" through a mix of exit codes and
//! stderr wording. Every recognised marker lives here so callers classify
//! outcomes through one table instead of scattering literals.

/// A set of markers identifying one vendor condition.
#[derive(Debug, Clone, Copy)]
pub struct Sentinel {
    pub name: &'static str,
    pub codes: &'static [i32],
    pub fragments: &'static [&'static str],
}

impl Sentinel {
    /// True when either the exit code or the error text carries a marker.
    pub fn matches(&self, code: i32, error: &str) -> bool {
        self.codes.contains(&code) || self.matches_text(error)
    }

    pub fn matches_text(&self, error: &str) -> bool {
        self.fragments.iter().any(|fragment| error.contains(fragment))
    }
}

/// `aws cognito-idp admin-get-user` on an unknown username.
pub const IDP_USER_NOT_FOUND: Sentinel = Sentinel {
    name: "idp-user-not-found",
    codes: &[254],
    fragments: &["UserNotFoundException", "User does not exist"],
};

/// `fabric-ca-client identity list --id` on an unregistered identity.
pub const CA_IDENTITY_NOT_FOUND: Sentinel = Sentinel {
    name: "ca-identity-not-found",
    codes: &[],
    fragments: &["Error Code: 63"],
};

/// `aws ssm get-command-invocation` before the invocation is indexed.
pub const SSM_INVOCATION_NOT_VISIBLE: Sentinel = Sentinel {
    name: "ssm-invocation-not-visible",
    codes: &[],
    fragments: &["InvocationDoesNotExist"],
};

/// `aws s3api head-object` on a missing key.
pub const S3_OBJECT_NOT_FOUND: Sentinel = Sentinel {
    name: "s3-object-not-found",
    codes: &[],
    fragments: &["Not Found", "(404)", "NoSuchKey"],
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn idp_not_found_matches_code_or_text() {
        assert!(IDP_USER_NOT_FOUND.matches(254, ""));
        assert!(IDP_USER_NOT_FOUND.matches(
            255,
            "An error occurred (UserNotFoundException) when calling the AdminGetUser operation"
        ));
        assert!(!IDP_USER_NOT_FOUND.matches(255, "AccessDeniedException"));
    }

    #[test]
    fn ca_not_found_is_text_only() {
        assert!(CA_IDENTITY_NOT_FOUND.matches(1, "Error: Response from server: Error Code: 63 - Failed to get User"));
        assert!(!CA_IDENTITY_NOT_FOUND.matches(63, "connection refused"));
    }
}
