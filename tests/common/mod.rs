//! Shared test infrastructure for CLI integration tests.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use tempfile::TempDir;

/// A scratch workspace holding an environment descriptor whose directories
/// all live inside the temp dir.
pub struct Workspace {
    pub dir: TempDir,
}

impl Workspace {
    pub fn create() -> Self {
        let dir = TempDir::new().expect("create temp dir");
        let ws = Self { dir };
        fs::create_dir_all(ws.path("user")).expect("create user dir");
        fs::write(ws.env_file(), ws.env_yaml()).expect("write env descriptor");
        ws
    }

    pub fn path(&self, rel: &str) -> PathBuf {
        self.dir.path().join(rel)
    }

    pub fn env_file(&self) -> PathBuf {
        self.path("env.yaml")
    }

    fn env_yaml(&self) -> String {
        let root = self.dir.path().display();
        format!(
            "env:\n\
             \x20 bat:\n\
             \x20   user-dir: {root}/user\n\
             \x20   work-dir: {root}/work\n\
             \x20   logs-dir: {root}/logs\n\
             \x20   log-at: all\n\
             \x20   print-at: error\n\
             \x20 git:\n\
             \x20   repo: https://git.example.gov/blossom/ato.git\n\
             \x20   repo-dir: {root}/repo\n\
             \x20   fragment-dir: ato/fragments\n\
             \x20   ssp: ato/ssp.xml\n\
             \x20 aws:\n\
             \x20   idp-pool: us-east-1_TESTPOOL\n\
             \x20   s3-drop-name: blossom-drop\n\
             \x20   s3-drop-url: s3://blossom-drop\n\
             \x20 ssm:\n\
             \x20   instance-id: i-0123456789\n\
             \x20   remote-env-file: /srv/blossom/env-ec2-prod.yaml\n"
        )
    }

    /// Write a request descriptor and return its path.
    pub fn request(&self, name: &str) -> PathBuf {
        let path = self.path(name);
        fs::write(
            &path,
            "branch_name: ticket-42\nfile: users/aort_created.yaml\nissue_number: 42\n",
        )
        .expect("write request");
        path
    }

    pub fn write(&self, name: &str, text: &str) -> PathBuf {
        let path = self.path(name);
        fs::write(&path, text).expect("write file");
        path
    }
}

pub fn bops<I, S>(args: I) -> Output
where
    I: IntoIterator<Item = S>,
    S: AsRef<std::ffi::OsStr>,
{
    Command::new(env!("CARGO_BIN_EXE_bops"))
        .args(args)
        .env_remove("RUST_LOG")
        .output()
        .expect("run bops")
}

pub fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

pub fn arg(path: &Path) -> String {
    path.display().to_string()
}
