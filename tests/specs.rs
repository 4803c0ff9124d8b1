//! Behavioral specifications for the bq CLI.
//!
//! These tests are black-box: they invoke the CLI binary and verify
//! stdout, stderr, and exit codes.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

#[path = "specs/prelude.rs"]
mod prelude;

// cli/
#[path = "specs/cli/config.rs"]
mod cli_config;
#[path = "specs/cli/errors.rs"]
mod cli_errors;
#[path = "specs/cli/help.rs"]
mod cli_help;

// queue/
#[path = "specs/queue/cancel.rs"]
mod queue_cancel;
#[path = "specs/queue/list.rs"]
mod queue_list;
#[path = "specs/queue/submit.rs"]
mod queue_submit;

// agent/
#[path = "specs/agent/control.rs"]
mod agent_control;
#[path = "specs/agent/list.rs"]
mod agent_list;
