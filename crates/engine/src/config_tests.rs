use super::*;
use bq_core::BackendKind;
use yare::parameterized;

const FULL: &str = r#"
[backend]
kind = "redis"
url = "redis://127.0.0.1/"
member_address = "agent-1"
lite_member = false

[backend.lock]
lease = "30s"
retry_interval = "20ms"

[agent]
short_name = "agent-1"
display_name = "Agent 1"
max_concurrent_builds = 2
recent_jobs_capacity = 10
max_retries = 3
check_interval = "5s"
pause_grace_period = "2m"

[executor]
command = "./ci/build.sh"
timeout = "15m"

[log]
path = "/var/log/bq/agent.log"
filter = "bq_engine=debug"
"#;

fn parse(text: &str) -> Result<Config, ConfigError> {
    Config::parse(text, Path::new("bq.toml"))
}

#[test]
fn empty_file_uses_defaults() {
    let config = parse("").unwrap();
    assert_eq!(config, Config::default());
    assert_eq!(config.backend.kind, BackendKind::Local);
    assert_eq!(config.agent.max_retries, 5);
    assert_eq!(config.agent.display_name(), "build-agent");
}

#[test]
fn full_file_parses_every_section() {
    let config = parse(FULL).unwrap();
    assert_eq!(config.backend.kind, BackendKind::Redis);
    assert_eq!(config.backend.url.as_deref(), Some("redis://127.0.0.1/"));
    assert_eq!(config.backend.lock.lease, Duration::from_secs(30));
    assert_eq!(config.backend.lock.retry_interval, Duration::from_millis(20));
    assert_eq!(config.agent.display_name(), "Agent 1");
    assert_eq!(config.agent.max_concurrent_builds, 2);
    assert_eq!(config.agent.pause_grace_period, Duration::from_secs(120));
    assert_eq!(config.executor.timeout, Duration::from_secs(15 * 60));
    assert_eq!(config.log.path, Some(PathBuf::from("/var/log/bq/agent.log")));
}

#[parameterized(
    upper = { "Agent" },
    underscore = { "agent_1" },
    space = { "agent 1" },
    empty = { "" },
)]
fn rejects_short_name(name: &str) {
    let text = format!("[agent]\nshort_name = {name:?}\n");
    assert!(matches!(parse(&text), Err(ConfigError::InvalidShortName(_))));
}

#[parameterized(
    builds = { "max_concurrent_builds = 0", "agent.max_concurrent_builds" },
    recent = { "recent_jobs_capacity = 0", "agent.recent_jobs_capacity" },
    interval = { "check_interval = \"0s\"", "agent.check_interval" },
)]
fn rejects_zero(line: &str, field: &str) {
    let text = format!("[agent]\n{line}\n");
    match parse(&text) {
        Err(ConfigError::Zero(name)) => assert_eq!(name, field),
        other => panic!("expected zero error, got {other:?}"),
    }
}

#[test]
fn unknown_keys_are_rejected() {
    assert!(matches!(
        parse("[agent]\nshortname = \"a\"\n"),
        Err(ConfigError::Parse { .. })
    ));
}

#[test]
fn load_reports_missing_file() {
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("missing.toml");
    assert!(matches!(Config::load(&missing), Err(ConfigError::Read { .. })));

    let present = dir.path().join("bq.toml");
    std::fs::write(&present, FULL).unwrap();
    assert_eq!(Config::load(&present).unwrap().agent.short_name, "agent-1");
}
