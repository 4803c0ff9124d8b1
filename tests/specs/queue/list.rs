//! `bq queue list` and `bq queue running`

use crate::prelude::*;

#[test]
fn empty_queue() {
    Project::empty()
        .bq()
        .args(&["queue", "list"])
        .passes()
        .stdout_eq("No queued build jobs\n");
}

#[test]
fn no_running_jobs() {
    Project::empty()
        .bq()
        .args(&["queue", "running", "--agent", "agent-1"])
        .passes()
        .stdout_eq("No running build jobs\n");
}

#[test]
fn empty_queue_as_json() {
    Project::empty()
        .bq()
        .args(&["--format", "json", "queue", "list", "--course", "3"])
        .passes()
        .stdout_eq("[]\n");
}

#[test]
fn course_and_participation_filters_conflict() {
    Project::empty()
        .bq()
        .args(&["queue", "list", "--course", "3", "--participation", "7"])
        .fails()
        .stderr_has("cannot be used with");
}
