//! Configuration discovery

use crate::prelude::*;

#[test]
fn defaults_to_the_local_backend() {
    Project::empty()
        .bq()
        .args(&["status"])
        .passes()
        .stdout_has("Backend:  local");
}

#[test]
fn reads_bq_toml_from_the_working_directory() {
    Project::with_config("[backend]\nmember_address = \"ops-1\"\n")
        .bq()
        .args(&["status"])
        .passes()
        .stdout_has("(as ops-1)")
        .stdout_has("Members:  ops-1");
}

#[test]
fn config_flag_overrides_the_default_file() {
    let project = Project::with_config("[backend]\nmember_address = \"ops-1\"\n");
    project.file("other.toml", "[backend]\nmember_address = \"ops-2\"\n");

    project
        .bq()
        .args(&["--config", "other.toml", "status"])
        .passes()
        .stdout_has("(as ops-2)");
}

#[test]
fn config_can_come_from_the_environment() {
    let project = Project::empty();
    project.file("env.toml", "[backend]\nkind = \"grid\"\nmember_address = \"ops-3\"\n");
    let path = project.path().join("env.toml");

    project
        .bq()
        .env("BQ_CONFIG", path.to_str().unwrap())
        .args(&["status"])
        .passes()
        .stdout_has("Backend:  grid (as ops-3)");
}

#[test]
fn status_as_json() {
    let out = Project::with_config("[backend]\nmember_address = \"ops-1\"\n")
        .bq()
        .args(&["--format", "json", "status"])
        .passes();
    let json = out.stdout_json();
    assert_eq!(json["backend"], "local");
    assert_eq!(json["member"], "ops-1");
    assert_eq!(json["queued"], 0);
    assert_eq!(json["agents"], 0);
}
