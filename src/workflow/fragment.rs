//! OSCAL party fragments merged into the compliance document downstream.
use crate::config::SubjectDescriptor;
use anyhow::{Context, Result};
use std::fmt::Write as _;
use std::fs;
use std::io::Write as _;
use std::path::{Path, PathBuf};

const OSCAL_NS: &str = "http://csrc.nist.gov/ns/oscal/1.0";
/// Namespace for props OSCAL does not define on a party.
const PROVISIONING_NS: &str = "https://github.com/marketplace/actions/upload-s3";

fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            other => out.push(other),
        }
    }
    out
}

/// `<insert>` carrying the subject's party and responsible-party records.
pub fn party_insert(subject: &SubjectDescriptor, uuid: &str) -> String {
    let role = subject.role;
    let uuid = escape(uuid);
    let mut xml = String::new();
    let _ = writeln!(xml, r#"<insert xmlns="{OSCAL_NS}" target="metadata">"#);
    let _ = writeln!(xml, r#"  <party uuid="{uuid}" type="person">"#);
    let _ = writeln!(xml, "    <name>{}</name>", escape(&subject.name));
    let _ = writeln!(xml, "    <short-name>{}</short-name>", escape(&subject.short_name()));
    let _ = writeln!(
        xml,
        r#"    <prop name="job-title" value="{}"/>"#,
        escape(role.display_name())
    );
    let _ = writeln!(
        xml,
        r#"    <prop name="privilege-level" value="{}" ns="{PROVISIONING_NS}"/>"#,
        role.privilege().as_str()
    );
    if let Some(email) = &subject.email {
        let _ = writeln!(xml, "    <email-address>{}</email-address>", escape(email));
    }
    if let Some(location) = &subject.location_uuid {
        let _ = writeln!(xml, "    <location-uuid>{}</location-uuid>", escape(location));
    }
    if let Some(org) = &subject.member_of_organization {
        let _ = writeln!(
            xml,
            "    <member-of-organization>{}</member-of-organization>",
            escape(org)
        );
    }
    let _ = writeln!(xml, "  </party>");
    let _ = writeln!(
        xml,
        r#"  <responsible-party role-id="{}">"#,
        role.schema_id()
    );
    let _ = writeln!(xml, "    <party-uuid>{uuid}</party-uuid>");
    let _ = writeln!(xml, "  </responsible-party>");
    let _ = writeln!(xml, "</insert>");
    xml
}

/// `<remove>` dropping the subject's party and responsible-party records.
pub fn party_remove(subject: &SubjectDescriptor, uuid: &str) -> String {
    let mut xml = String::new();
    let _ = writeln!(xml, r#"<remove xmlns="{OSCAL_NS}" target="metadata">"#);
    let _ = writeln!(xml, r#"  <party uuid="{}"/>"#, escape(uuid));
    let _ = writeln!(
        xml,
        r#"  <responsible-party role-id="{}" party-uuid="{}"/>"#,
        subject.role.schema_id(),
        escape(uuid)
    );
    let _ = writeln!(xml, "</remove>");
    xml
}

/// Write `text` to `root/rel_path` through a temp file in the same
/// directory, so readers never see a partial fragment.
pub fn write_fragment(root: &Path, rel_path: &str, text: &str) -> Result<PathBuf> {
    let path = root.join(rel_path);
    let parent = path
        .parent()
        .with_context(|| format!("fragment path {} has no parent", path.display()))?;
    fs::create_dir_all(parent).with_context(|| format!("create {}", parent.display()))?;
    let mut staged = tempfile::NamedTempFile::new_in(parent)
        .with_context(|| format!("stage fragment in {}", parent.display()))?;
    staged
        .write_all(text.as_bytes())
        .with_context(|| format!("write staged fragment for {}", path.display()))?;
    staged
        .persist(&path)
        .with_context(|| format!("publish {}", path.display()))?;
    Ok(path)
}
