use super::*;
use bq_adapters::LocalDataProvider;
use bq_core::{BuildJobQueueItem, LockConfig};
use chrono::Utc;

#[test]
fn status_counts_queue_and_agents() {
    let provider = LocalDataProvider::new("bq-cli", LockConfig::default());
    let access = DistributedDataAccess::new(provider);
    access
        .enqueue(&BuildJobQueueItem::new("job-1", 7, 3, Utc::now()))
        .unwrap();

    let status = status(&access).unwrap();
    assert_eq!(status.backend, BackendKind::Local);
    assert_eq!(status.member, "bq-cli");
    assert_eq!(status.members, vec!["bq-cli".to_string()]);
    assert_eq!(status.queued, 1);
    assert_eq!(status.running, 0);
    assert_eq!(status.agents, 0);
}

#[test]
fn status_text_layout() {
    let status = Status {
        backend: BackendKind::Grid,
        member: "bq-cli".to_string(),
        members: vec!["agent-1".to_string(), "bq-cli".to_string()],
        queued: 4,
        running: 2,
        results: 9,
        agents: 1,
        paused_agents: 0,
    };
    assert_eq!(
        status.to_string(),
        "Backend:  grid (as bq-cli)\nMembers:  agent-1, bq-cli\nQueued:   4\nRunning:  2\nResults:  9\nAgents:   1 (0 paused)"
    );
}
