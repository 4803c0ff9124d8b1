use super::*;
use clap::Parser;

#[derive(Parser)]
struct Line {
    #[command(subcommand)]
    command: Command,
}

fn parse(args: &[&str]) -> Command {
    Line::try_parse_from(std::iter::once("bq").chain(args.iter().copied()))
        .unwrap()
        .command
}

#[test]
fn changes_are_refused_on_process_local_backends() {
    let changes: [&[&str]; 5] = [
        &["submit", "--participation", "7", "--course", "3"],
        &["cancel", "job-1"],
        &["agent", "pause", "agent-1"],
        &["agent", "resume", "agent-1"],
        &["requeue-orphans"],
    ];
    for args in changes {
        let command = parse(args);
        assert!(command.changes_shared_state(), "{args:?}");
        for kind in [BackendKind::Local, BackendKind::Grid] {
            let err = command.check_backend(kind).unwrap_err().to_string();
            assert!(err.contains(&format!("`bq {}`", command.name())), "{err}");
            assert!(err.contains(&format!("the {kind} backend")), "{err}");
        }
        command.check_backend(BackendKind::Redis).unwrap();
    }
}

#[test]
fn reads_run_on_any_backend() {
    let reads: [&[&str]; 3] = [&["status"], &["queue", "list"], &["agents"]];
    for args in reads {
        let command = parse(args);
        assert!(!command.changes_shared_state());
        for kind in [BackendKind::Local, BackendKind::Grid, BackendKind::Redis] {
            command.check_backend(kind).unwrap();
        }
    }
}

#[test]
fn agent_control_is_named_by_its_action() {
    assert_eq!(parse(&["agent", "resume", "agent-1"]).name(), "agent resume");
}
