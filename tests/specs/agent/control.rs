//! `bq agent pause|resume`

use crate::prelude::*;

#[test]
fn pause_is_refused_on_the_local_backend() {
    Project::empty()
        .bq()
        .args(&["agent", "pause", "agent-1"])
        .fails()
        .stderr_has("`bq agent pause` cannot reach build agents through the local backend");
}

#[test]
fn resume_is_refused_on_the_grid_backend() {
    Project::with_config("[backend]\nkind = \"grid\"\n")
        .bq()
        .args(&["agent", "resume", "agent-1"])
        .fails()
        .stderr_has("`bq agent resume` cannot reach build agents through the grid backend");
}

#[test]
fn pause_requires_a_name() {
    Project::empty()
        .bq()
        .args(&["agent", "pause"])
        .fails()
        .stderr_has("<NAME>");
}
