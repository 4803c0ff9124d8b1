use super::*;
use bq_adapters::LocalDataProvider;
use bq_core::{BuildAgentRef, LockConfig};
use chrono::TimeZone;

fn at(minute: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 2, 8, minute, 0).unwrap()
}

fn access() -> DistributedDataAccess<LocalDataProvider> {
    DistributedDataAccess::new(LocalDataProvider::new("access-test", LockConfig::default()))
}

fn job(id: &str, course: u64, priority: i32, minute: u32) -> BuildJobQueueItem {
    BuildJobQueueItem::new(id, 100 + course, course, at(minute))
        .with_priority(priority)
        .with_commit_hash("abc123")
}

#[test]
fn handles_are_cached() {
    let access = access();
    assert!(Arc::ptr_eq(&access.queue().unwrap(), &access.queue().unwrap()));
    assert!(Arc::ptr_eq(&access.jobs().unwrap(), &access.jobs().unwrap()));
}

#[test]
fn queued_jobs_follow_dequeue_order() {
    let access = access();
    access.enqueue(&job("normal", 1, 2, 0)).unwrap();
    access.enqueue(&job("urgent", 2, 1, 5)).unwrap();
    access.enqueue(&job("later", 1, 2, 9)).unwrap();

    let ids: Vec<_> = access
        .queued_jobs()
        .unwrap()
        .into_iter()
        .map(|j| j.id)
        .collect();
    assert_eq!(ids, vec!["urgent", "normal", "later"]);

    let course_one: Vec<_> = access
        .queued_jobs_for_course(1)
        .unwrap()
        .into_iter()
        .map(|j| j.id)
        .collect();
    assert_eq!(course_one, vec!["normal", "later"]);
    assert_eq!(access.queued_jobs_for_participation(102).unwrap().len(), 1);
}

#[test]
fn queued_reference_without_item_is_skipped() {
    let access = access();
    access.enqueue(&job("kept", 1, 2, 0)).unwrap();
    access.enqueue(&job("vanished", 1, 2, 1)).unwrap();
    access.jobs().unwrap().remove(&"vanished".to_string()).unwrap();

    let ids: Vec<_> = access
        .queued_jobs()
        .unwrap()
        .into_iter()
        .map(|j| j.id)
        .collect();
    assert_eq!(ids, vec!["kept"]);
}

#[test]
fn processing_jobs_filter_by_status_and_agent() {
    let access = access();
    let jobs = access.jobs().unwrap();
    let agent = BuildAgentRef::new("agent-1", "10.0.0.1");
    let other = BuildAgentRef::new("agent-2", "10.0.0.2");
    jobs.put("a".into(), job("a", 1, 2, 0).claimed_by(&agent, at(3)))
        .unwrap();
    jobs.put("b".into(), job("b", 2, 2, 0).claimed_by(&other, at(1)))
        .unwrap();
    jobs.put("queued".into(), job("queued", 1, 2, 0)).unwrap();

    let ids: Vec<_> = access
        .processing_jobs()
        .unwrap()
        .into_iter()
        .map(|j| j.id)
        .collect();
    assert_eq!(ids, vec!["b", "a"]);
    assert_eq!(access.processing_jobs_for_agent("agent-1").unwrap().len(), 1);
    assert_eq!(access.processing_jobs_for_course(2).unwrap()[0].id, "b");
    assert_eq!(access.processing_jobs_for_participation(101).unwrap()[0].id, "a");
    assert_eq!(
        access.processing_job_ids().unwrap(),
        HashSet::from(["a".to_string(), "b".to_string()])
    );
}

#[test]
fn requeue_bumps_retry_until_the_ceiling() {
    let access = access();
    let agent = BuildAgentRef::new("agent-1", "10.0.0.1");
    let running = job("flaky", 1, 2, 0).claimed_by(&agent, at(1));

    let outcome = access.requeue_or_fail(&running, 2, at(2), "timed out").unwrap();
    assert_eq!(outcome, RequeueOutcome::Requeued { retry_count: 1 });
    let queued = access.queued_jobs().unwrap();
    assert_eq!(queued.len(), 1);
    assert_eq!(queued[0].retry_count, 1);
    assert!(queued[0].build_agent.is_none());
    assert_eq!(access.result_queue_size().unwrap(), 0);

    let exhausted = BuildJobQueueItem {
        retry_count: 2,
        ..running
    };
    access.queue().unwrap().clear().unwrap();
    let outcome = access.requeue_or_fail(&exhausted, 2, at(3), "timed out").unwrap();
    assert_eq!(outcome, RequeueOutcome::Failed);
    assert!(access.queue().unwrap().is_empty().unwrap());
    assert_eq!(access.jobs().unwrap().get(&"flaky".to_string()).unwrap(), None);

    let result = access.results().unwrap().poll().unwrap().unwrap();
    assert_eq!(result.build_job.status, BuildStatus::Failed);
    assert_eq!(result.build_job.timing.build_completion_date, Some(at(3)));
    assert_eq!(result.error.as_deref(), Some("timed out"));
    assert_eq!(result.result.commit_hash.as_deref(), Some("abc123"));
}

#[test]
fn agent_status_reads_the_information_map() {
    let access = access();
    let info = BuildAgentInformation::new(BuildAgentRef::new("agent-1", "10.0.0.1"), 2, 5);
    access.agents().unwrap().put("agent-1".into(), info).unwrap();

    assert_eq!(
        access.agent_status("agent-1").unwrap(),
        Some(BuildAgentStatus::Idle)
    );
    assert_eq!(access.agent_status("agent-9").unwrap(), None);
    assert_eq!(access.agent_information().unwrap().len(), 1);
    assert!(access.agent_information_map().unwrap().contains_key("agent-1"));
}
