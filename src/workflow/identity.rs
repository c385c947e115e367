//! Idempotent identity-provider and ledger CA operations.
//!
//! Every mutation is preceded by a lookup, so rerunning a request never
//! creates, registers or removes twice. `fabric-ca-client` logs to stderr on
//! every call, so CA steps are judged on exit code alone.
use crate::command::{
    BatchResult, BatchStep, CommandId, CommandRegistry, ProcessLauncher, Sequencer, StepRecord,
};
use crate::config::{SubjectAction, SubjectDescriptor};
use crate::report::FailureReport;
use crate::roles::LedgerAccess;
use crate::sentinels::{CA_IDENTITY_NOT_FOUND, IDP_USER_NOT_FOUND};
use regex::Regex;

/// Result of asking a backend whether the subject exists.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Lookup {
    /// Present; carries the identifier when the backend reports one.
    Found(String),
    NotFound,
    Error(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LedgerOutcome {
    /// Role needs no ledger identity.
    NotRequired,
    AlreadyPresent,
    Registered { enrolled: bool },
    Removed,
    AlreadyAbsent,
}

impl LedgerOutcome {
    pub fn as_str(self) -> &'static str {
        match self {
            LedgerOutcome::NotRequired => "not-required",
            LedgerOutcome::AlreadyPresent => "already-present",
            LedgerOutcome::Registered { enrolled: true } => "registered-enrolled",
            LedgerOutcome::Registered { enrolled: false } => "registered",
            LedgerOutcome::Removed => "removed",
            LedgerOutcome::AlreadyAbsent => "already-absent",
        }
    }
}

/// Command ids the identity stage needs for this subject.
pub fn identity_ids(subject: &SubjectDescriptor) -> Vec<CommandId> {
    let access = subject.role.ledger_access();
    let mut ids = Vec::new();
    match subject.action {
        SubjectAction::Create => {
            ids.extend([CommandId::IdpReadUser, CommandId::IdpCreateUser]);
            match access {
                LedgerAccess::Identity => ids.extend([
                    CommandId::AmbReadUser,
                    CommandId::AmbRegisterUser,
                    CommandId::AmbEnrollUser,
                ]),
                LedgerAccess::ReadOnly => {
                    ids.extend([CommandId::AmbReadUser, CommandId::AmbRegisterReadOnly])
                }
                LedgerAccess::None => {}
            }
        }
        SubjectAction::Delete => {
            ids.extend([CommandId::IdpReadUser, CommandId::IdpDeleteUser]);
            if access != LedgerAccess::None {
                ids.extend([CommandId::AmbReadUser, CommandId::AmbRemoveUser]);
            }
        }
    }
    ids
}

/// `Error Code: NN` as printed by fabric-ca-client.
fn ca_error_code(text: &str) -> Option<u32> {
    let re = Regex::new(r"Error Code: (\d+)").ok()?;
    re.captures(text)?.get(1)?.as_str().parse().ok()
}

pub(super) struct IdentityOps<'a, 'r, L> {
    registry: &'a CommandRegistry,
    sequencer: &'a Sequencer<'r, L>,
}

impl<'a, 'r, L: ProcessLauncher> IdentityOps<'a, 'r, L> {
    pub fn new(registry: &'a CommandRegistry, sequencer: &'a Sequencer<'r, L>) -> Self {
        Self {
            registry,
            sequencer,
        }
    }

    fn run(&self, id: CommandId) -> Result<(StepRecord, BatchResult), FailureReport> {
        let spec = self
            .registry
            .get(id)
            .map_err(|err| FailureReport::error(id.as_str(), err))?;
        let batch = self
            .sequencer
            .run_batch(vec![BatchStep::from(spec.clone())]);
        match batch.steps.first() {
            Some(step) => Ok((step.clone(), batch)),
            None => Err(FailureReport::message(id.as_str(), "step produced no result")),
        }
    }

    pub fn idp_lookup(&self) -> Result<Lookup, FailureReport> {
        let (step, batch) = self.run(CommandId::IdpReadUser)?;
        if step.result.code == 0 {
            return Ok(match (batch.special.first(), &step.extract_error) {
                (Some(uuid), _) => Lookup::Found(uuid.clone()),
                (None, Some(err)) => Lookup::Error(err.clone()),
                (None, None) => Lookup::Error("no identifier in response".to_string()),
            });
        }
        if IDP_USER_NOT_FOUND.matches(step.result.code, &step.result.error) {
            tracing::debug!(sentinel = IDP_USER_NOT_FOUND.name, code = step.result.code, "lookup: not found");
            return Ok(Lookup::NotFound);
        }
        Ok(Lookup::Error(format!(
            "exit {}: {}",
            step.result.code,
            step.result.error.trim()
        )))
    }

    /// Reuse the provider's identifier when the subject exists, otherwise
    /// create it and take the identifier from the response.
    pub fn ensure_idp_identity(&self) -> Result<String, FailureReport> {
        match self.idp_lookup()? {
            Lookup::Found(uuid) => {
                tracing::info!(uuid = %uuid, "identity provider user exists; reusing");
                Ok(uuid)
            }
            Lookup::NotFound => {
                let (step, batch) = self.run(CommandId::IdpCreateUser)?;
                match batch.special.first() {
                    Some(uuid) if step.is_success() => {
                        tracing::info!(uuid = %uuid, "identity provider user created");
                        Ok(uuid.clone())
                    }
                    _ => Err(FailureReport::step("create identity provider user", &step)),
                }
            }
            Lookup::Error(detail) => Err(FailureReport::message(
                "look up identity provider user",
                detail,
            )),
        }
    }

    /// Remove the provider user. Returns the identifier it had, or `None`
    /// when it was already absent.
    pub fn remove_idp_identity(&self) -> Result<Option<String>, FailureReport> {
        match self.idp_lookup()? {
            Lookup::Found(uuid) => {
                let (step, _) = self.run(CommandId::IdpDeleteUser)?;
                if step.result.code != 0 {
                    return Err(FailureReport::step("delete identity provider user", &step));
                }
                tracing::info!(uuid = %uuid, "identity provider user deleted");
                Ok(Some(uuid))
            }
            Lookup::NotFound => {
                tracing::info!("identity provider user already absent");
                Ok(None)
            }
            Lookup::Error(detail) => Err(FailureReport::message(
                "look up identity provider user",
                detail,
            )),
        }
    }

    pub fn ca_lookup(&self) -> Result<Lookup, FailureReport> {
        let (step, _) = self.run(CommandId::AmbReadUser)?;
        let result = &step.result;
        if result.code == 0 {
            return Ok(Lookup::Found(String::new()));
        }
        let text = format!("{}\n{}", result.output, result.error);
        if CA_IDENTITY_NOT_FOUND.matches(result.code, &text) {
            tracing::debug!(sentinel = CA_IDENTITY_NOT_FOUND.name, code = result.code, "lookup: not found");
            return Ok(Lookup::NotFound);
        }
        let detail = match ca_error_code(&text) {
            Some(code) => format!("exit {}, CA error code {code}", result.code),
            None => format!("exit {}: {}", result.code, result.error.trim()),
        };
        Ok(Lookup::Error(detail))
    }

    /// Register and enroll (or register read-only) when the CA does not know
    /// the subject. Any lookup failure other than not-found is read as
    /// already registered.
    pub fn ensure_ledger_identity(
        &self,
        access: LedgerAccess,
    ) -> Result<LedgerOutcome, FailureReport> {
        if access == LedgerAccess::None {
            return Ok(LedgerOutcome::NotRequired);
        }
        match self.ca_lookup()? {
            Lookup::Found(_) => {
                tracing::info!("ledger identity exists; skipping registration");
                return Ok(LedgerOutcome::AlreadyPresent);
            }
            Lookup::Error(detail) => {
                tracing::warn!(detail = %detail, "ledger lookup failed; treating identity as registered");
                return Ok(LedgerOutcome::AlreadyPresent);
            }
            Lookup::NotFound => {}
        }

        let register = match access {
            LedgerAccess::ReadOnly => CommandId::AmbRegisterReadOnly,
            _ => CommandId::AmbRegisterUser,
        };
        let (step, _) = self.run(register)?;
        if step.result.code != 0 {
            return Err(FailureReport::step("register ledger identity", &step));
        }
        if access == LedgerAccess::ReadOnly {
            tracing::info!("ledger read-only mapping registered");
            return Ok(LedgerOutcome::Registered { enrolled: false });
        }

        let (step, _) = self.run(CommandId::AmbEnrollUser)?;
        if step.result.code != 0 {
            return Err(FailureReport::step("enroll ledger identity", &step));
        }
        tracing::info!("ledger identity registered and enrolled");
        Ok(LedgerOutcome::Registered { enrolled: true })
    }

    pub fn remove_ledger_identity(
        &self,
        access: LedgerAccess,
    ) -> Result<LedgerOutcome, FailureReport> {
        if access == LedgerAccess::None {
            return Ok(LedgerOutcome::NotRequired);
        }
        match self.ca_lookup()? {
            Lookup::NotFound => {
                tracing::info!("ledger identity already absent");
                Ok(LedgerOutcome::AlreadyAbsent)
            }
            Lookup::Error(detail) => Err(FailureReport::message("look up ledger identity", detail)),
            Lookup::Found(_) => {
                let (step, _) = self.run(CommandId::AmbRemoveUser)?;
                if step.result.code != 0 {
                    return Err(FailureReport::step("remove ledger identity", &step));
                }
                tracing::info!("ledger identity removed");
                Ok(LedgerOutcome::Removed)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ca_error_code_is_parsed() {
        assert_eq!(
            ca_error_code("Error: Response from server: Error Code: 63 - Failed to get User"),
            Some(63)
        );
        assert_eq!(ca_error_code("connection refused"), None);
    }

    #[test]
    fn identity_ids_follow_role_and_action() {
        let ao = SubjectDescriptor::from_yaml(
            "command: create-user\nuser:\n  username: a\n  name: A B\n  role: Authorizing Official\n",
            "s",
        )
        .unwrap();
        assert!(identity_ids(&ao).contains(&CommandId::AmbEnrollUser));

        let tpoc = SubjectDescriptor::from_yaml(
            "command: delete-user\nuser:\n  username: t\n  name: T P\n  role: tpoc\n",
            "s",
        )
        .unwrap();
        assert_eq!(
            identity_ids(&tpoc),
            vec![CommandId::IdpReadUser, CommandId::IdpDeleteUser]
        );
    }
}
