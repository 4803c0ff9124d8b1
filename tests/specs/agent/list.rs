//! `bq agents`

use crate::prelude::*;

#[test]
fn no_agents_registered() {
    Project::empty()
        .bq()
        .args(&["agents"])
        .passes()
        .stdout_eq("No build agents\n");
}

#[test]
fn no_agents_as_json() {
    Project::empty()
        .bq()
        .args(&["--format", "json", "agents"])
        .passes()
        .stdout_eq("[]\n");
}
