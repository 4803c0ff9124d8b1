//! `bq cancel` and `bq requeue-orphans`

use crate::prelude::*;

#[test]
fn cancel_is_refused_on_the_local_backend() {
    Project::empty()
        .bq()
        .args(&["cancel", "job-9"])
        .fails()
        .stderr_has("`bq cancel` cannot reach build agents through the local backend");
}

#[test]
fn requeue_orphans_is_refused_on_the_grid_backend() {
    Project::with_config("[backend]\nkind = \"grid\"\n")
        .bq()
        .args(&["requeue-orphans"])
        .fails()
        .stderr_has("`bq requeue-orphans` cannot reach build agents through the grid backend");
}

#[test]
fn cancel_requires_a_job_id() {
    Project::empty()
        .bq()
        .args(&["cancel"])
        .fails()
        .stderr_has("<JOB_ID>");
}
