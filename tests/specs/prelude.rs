//! Shared helpers for CLI specs

use assert_cmd::Command;
use predicates::Predicate;
use std::path::Path;
use tempfile::TempDir;

/// A scratch directory with an optional `bq.toml`
pub struct Project {
    dir: TempDir,
}

impl Project {
    /// No config file: the CLI falls back to the local backend
    pub fn empty() -> Self {
        Self {
            dir: tempfile::tempdir().unwrap(),
        }
    }

    pub fn with_config(text: &str) -> Self {
        let project = Self::empty();
        project.file("bq.toml", text);
        project
    }

    pub fn file(&self, name: &str, text: &str) {
        std::fs::write(self.dir.path().join(name), text).unwrap();
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn bq(&self) -> Bq {
        let mut cmd = Command::cargo_bin("bq").unwrap();
        cmd.current_dir(self.dir.path()).env_remove("BQ_CONFIG").env_remove("RUST_LOG");
        Bq { cmd }
    }
}

pub struct Bq {
    cmd: Command,
}

impl Bq {
    pub fn args(mut self, args: &[&str]) -> Self {
        self.cmd.args(args);
        self
    }

    pub fn env(mut self, key: &str, value: &str) -> Self {
        self.cmd.env(key, value);
        self
    }

    pub fn passes(mut self) -> Outcome {
        let output = self.cmd.output().unwrap();
        let outcome = Outcome::from(output);
        assert!(
            outcome.success,
            "expected success\nstdout: {}\nstderr: {}",
            outcome.stdout,
            outcome.stderr
        );
        outcome
    }

    pub fn fails(mut self) -> Outcome {
        let output = self.cmd.output().unwrap();
        let outcome = Outcome::from(output);
        assert!(!outcome.success, "expected failure\nstdout: {}", outcome.stdout);
        outcome
    }
}

pub struct Outcome {
    pub success: bool,
    pub stdout: String,
    pub stderr: String,
}

impl From<std::process::Output> for Outcome {
    fn from(output: std::process::Output) -> Self {
        Self {
            success: output.status.success(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        }
    }
}

impl Outcome {
    pub fn stdout_has(self, needle: &str) -> Self {
        assert!(
            predicates::str::contains(needle).eval(&self.stdout),
            "stdout missing {needle:?}:\n{}",
            self.stdout
        );
        self
    }

    pub fn stderr_has(self, needle: &str) -> Self {
        assert!(
            predicates::str::contains(needle).eval(&self.stderr),
            "stderr missing {needle:?}:\n{}",
            self.stderr
        );
        self
    }

    pub fn stdout_eq(self, expected: &str) -> Self {
        similar_asserts::assert_eq!(self.stdout, expected);
        self
    }

    pub fn stdout_json(&self) -> serde_json::Value {
        serde_json::from_str(&self.stdout).unwrap()
    }
}
