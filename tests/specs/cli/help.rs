//! Help and version output

use crate::prelude::*;

#[test]
fn help_lists_every_command() {
    let out = Project::empty().bq().args(&["--help"]).passes();
    for command in [
        "status",
        "queue",
        "submit",
        "cancel",
        "agents",
        "agent",
        "requeue-orphans",
    ] {
        assert!(out.stdout.contains(command), "missing {command}");
    }
}

#[test]
fn version_prints_the_binary_name() {
    Project::empty()
        .bq()
        .args(&["--version"])
        .passes()
        .stdout_has("bq ");
}

#[test]
fn agent_help_lists_pause_and_resume() {
    Project::empty()
        .bq()
        .args(&["agent", "--help"])
        .passes()
        .stdout_has("pause")
        .stdout_has("resume");
}
