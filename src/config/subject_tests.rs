use super::{SubjectAction, SubjectDescriptor};
use crate::config::ConfigError;
use crate::roles::Role;

const AO_SUBJECT: &str = r#"
command: create-user
user:
  username: aort
  name: Ada Marie Ort
  role: Authorizing Official
  email-address: ada.ort@example.gov
  member-of-organization: 8aed7ffd-5158-445d-8d7c-eec5cf240cba
  location-uuid: none
"#;

#[test]
fn parses_full_subject() {
    let subject = SubjectDescriptor::from_yaml(AO_SUBJECT, "inline").expect("valid subject");
    assert_eq!(subject.action, SubjectAction::Create);
    assert_eq!(subject.username, "aort");
    assert_eq!(subject.role, Role::AuthorizingOfficial);
    assert_eq!(subject.email.as_deref(), Some("ada.ort@example.gov"));
    assert_eq!(subject.location_uuid, None, "literal none is treated as absent");
    assert_eq!(
        subject.member_of_organization.as_deref(),
        Some("8aed7ffd-5158-445d-8d7c-eec5cf240cba")
    );
}

#[test]
fn missing_role_is_named() {
    let text = "command: create-user\nuser:\n  username: aort\n  name: Ada Ort\n";
    let err = SubjectDescriptor::from_yaml(text, "inline").unwrap_err();
    assert!(matches!(err, ConfigError::InvalidSubject { .. }));
    assert_eq!(err.missing_fields(), &["ROLE"]);
    assert!(err.to_string().contains("ROLE"));
}

#[test]
fn missing_user_block_reports_all_user_fields() {
    let err = SubjectDescriptor::from_yaml("command: delete-user\n", "inline").unwrap_err();
    assert_eq!(
        err.missing_fields(),
        &["USER", "USERNAME", "NAME", "ROLE"]
    );
}

#[test]
fn blank_descriptor_file_reports_every_field() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("blank.yaml");
    std::fs::write(&path, "\n  \n").unwrap();
    let err = SubjectDescriptor::load(&path).unwrap_err();
    assert_eq!(
        err.missing_fields(),
        &["COMMAND", "USER", "USERNAME", "NAME", "ROLE"]
    );
    assert!(err.to_string().contains("blank.yaml"));
}

#[test]
fn unknown_command_is_rejected() {
    let text = "command: rename-user\nuser:\n  username: a\n  name: A\n  role: tpoc\n";
    let err = SubjectDescriptor::from_yaml(text, "inline").unwrap_err();
    assert!(matches!(err, ConfigError::UnknownAction(ref cmd) if cmd == "rename-user"));
}

#[test]
fn idp_attributes_follow_name_shape() {
    let subject = SubjectDescriptor::from_yaml(AO_SUBJECT, "inline").unwrap();
    let attrs = subject.idp_attributes();
    let names: Vec<&str> = attrs.iter().map(|(name, _)| *name).collect();
    assert_eq!(
        names,
        vec![
            "email",
            "email_verified",
            "name",
            "given_name",
            "middle_name",
            "family_name",
            "preferred_username",
            "profile"
        ]
    );
    assert!(attrs.contains(&("preferred_username", "Ada Ort".to_string())));
    assert!(attrs.contains(&("profile", "4".to_string())));
}

#[test]
fn single_word_names_have_no_family_name() {
    let text = "command: create-user\nuser:\n  username: cher\n  name: Cher\n  role: tpoc\n";
    let subject = SubjectDescriptor::from_yaml(text, "inline").unwrap();
    assert_eq!(subject.short_name(), "Cher");
    let attrs = subject.idp_attributes();
    assert!(attrs.contains(&("preferred_username", "Cher".to_string())));
    assert!(!attrs.iter().any(|(name, _)| *name == "family_name"));
}
