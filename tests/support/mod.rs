#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};

use assert_cmd::Command;
use serde_json::Value;
use tempfile::TempDir;

/// A throwaway data directory driven through the `taskchat` binary.
pub struct TestData {
    dir: TempDir,
}

impl TestData {
    pub fn new() -> Self {
        Self {
            dir: tempfile::tempdir().expect("failed to create tempdir"),
        }
    }

    /// `init`ed data dir with the given users registered
    pub fn with_users(users: &[&str]) -> Self {
        let data = Self::new();
        data.cmd().arg("init").assert().success();
        for user in users {
            data.cmd()
                .args(["user", "register", user])
                .args(["--email", &format!("{user}@example.com")])
                .args(["--password", "pw"])
                .assert()
                .success();
        }
        data
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn cmd(&self) -> Command {
        let mut cmd = Command::cargo_bin("taskchat").expect("binary");
        cmd.env_remove("TASKCHAT_SESSION")
            .env_remove("TASKCHAT_PASSWORD")
            .env_remove("RUST_LOG")
            .env("TASKCHAT_DATA_DIR", self.dir.path());
        cmd
    }

    pub fn login(&self, user: &str) {
        self.cmd()
            .args(["user", "login", user, "--password", "pw"])
            .assert()
            .success();
    }

    pub fn write_file(&self, rel_path: &str, contents: &str) -> PathBuf {
        let path = self.dir.path().join(rel_path);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("create parent");
        }
        fs::write(&path, contents).expect("write file");
        path
    }

    pub fn write_intent(&self, name: &str, intent: Value) -> PathBuf {
        self.write_file(
            &format!("intents/{name}.json"),
            &serde_json::to_string_pretty(&intent).expect("intent json"),
        )
    }

    /// Run with `--json` and parse stdout
    pub fn json(&self, args: &[&str]) -> Value {
        let output = self
            .cmd()
            .args(args)
            .arg("--json")
            .assert()
            .success()
            .get_output()
            .stdout
            .clone();
        serde_json::from_slice(&output).expect("json output")
    }
}
