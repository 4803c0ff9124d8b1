//! `bq submit`

use crate::prelude::*;

#[test]
fn submit_is_refused_on_the_default_local_backend() {
    Project::empty()
        .bq()
        .args(&["submit", "--participation", "7", "--course", "3", "--id", "job-1"])
        .fails()
        .stderr_has("`bq submit` cannot reach build agents through the local backend")
        .stderr_has("kind = \"redis\"");
}

#[test]
fn submit_is_refused_on_the_grid_backend() {
    Project::with_config("[backend]\nkind = \"grid\"\n")
        .bq()
        .args(&["submit", "--participation", "7", "--course", "3"])
        .fails()
        .stderr_has("through the grid backend");
}

#[test]
fn submit_on_redis_goes_on_to_connect() {
    Project::with_config("[backend]\nkind = \"redis\"\n")
        .bq()
        .args(&["submit", "--participation", "7", "--course", "3"])
        .fails()
        .stderr_has("backend.url is required for redis");
}

#[test]
fn refused_submit_prints_nothing() {
    let out = Project::empty()
        .bq()
        .args(&["--format", "json", "submit", "--participation", "7", "--course", "3"])
        .fails();
    assert!(out.stdout.is_empty(), "{}", out.stdout);
}

#[test]
fn submit_requires_a_course() {
    Project::empty()
        .bq()
        .args(&["submit", "--participation", "7"])
        .fails()
        .stderr_has("--course");
}
