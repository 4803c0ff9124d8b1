//! Failure modes and their messages

use crate::prelude::*;

#[test]
fn unknown_command_fails() {
    Project::empty()
        .bq()
        .args(&["frobnicate"])
        .fails()
        .stderr_has("unrecognized subcommand");
}

#[test]
fn unknown_config_field_is_reported_with_the_file() {
    Project::with_config("[agent]\nshortname = \"typo\"\n")
        .bq()
        .args(&["status"])
        .fails()
        .stderr_has("loading bq.toml")
        .stderr_has("unknown field");
}

#[test]
fn invalid_short_name_is_rejected() {
    Project::with_config("[agent]\nshort_name = \"Agent One\"\n")
        .bq()
        .args(&["status"])
        .fails()
        .stderr_has("invalid agent short name");
}

#[test]
fn redis_without_url_fails_before_running_the_command() {
    Project::with_config("[backend]\nkind = \"redis\"\n")
        .bq()
        .args(&["status"])
        .fails()
        .stderr_has("backend.url is required for redis");
}

#[test]
fn missing_explicit_config_fails() {
    Project::empty()
        .bq()
        .args(&["--config", "absent.toml", "status"])
        .fails()
        .stderr_has("failed to read absent.toml");
}
