use super::*;
use crate::access::names;
use bq_adapters::{GridCluster, GridDataProvider, LocalDataProvider};
use bq_core::{
    BuildAgentStatus, ChangeListener, DataError, DataResult, DistributedMap, EntryListener,
    FakeClock, ListenerId, LockConfig,
};
use chrono::{DateTime, TimeZone, Utc};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::AtomicUsize;
use std::sync::{Barrier, Mutex};

fn at(minute: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 2, 8, minute, 0).unwrap()
}

fn config(name: &str, slots: usize) -> AgentConfig {
    AgentConfig {
        short_name: name.to_string(),
        max_concurrent_builds: slots,
        recent_jobs_capacity: 3,
        max_retries: 2,
        ..AgentConfig::default()
    }
}

fn local() -> Arc<DistributedDataAccess<LocalDataProvider>> {
    Arc::new(DistributedDataAccess::new(LocalDataProvider::new(
        "10.0.0.1",
        LockConfig::default(),
    )))
}

fn agent<P: DistributedDataProvider>(
    access: &Arc<DistributedDataAccess<P>>,
    name: &str,
    slots: usize,
) -> BuildAgent<P, FakeClock> {
    let clock = FakeClock::at(at(30));
    let agent = BuildAgent::with_clock(Arc::clone(access), &config(name, slots), clock).unwrap();
    agent.register().unwrap();
    agent
}

fn enqueue<P: DistributedDataProvider>(access: &DistributedDataAccess<P>, ids: &[&str]) {
    for (n, id) in ids.iter().enumerate() {
        let job = BuildJobQueueItem::new(*id, 1, 1, at(n as u32)).with_commit_hash("abc");
        access.enqueue(&job).unwrap();
    }
}

/// Map handle whose next `put`s fail as if the connection dropped
struct FlakyMap<K, V> {
    inner: Arc<dyn DistributedMap<K, V>>,
    failures: AtomicUsize,
}

impl<K, V> FlakyMap<K, V> {
    fn wrap(inner: Arc<dyn DistributedMap<K, V>>) -> Arc<Self> {
        Arc::new(Self {
            inner,
            failures: AtomicUsize::new(0),
        })
    }

    fn fail_next_put(&self) {
        self.failures.store(1, Ordering::SeqCst);
    }
}

impl<K, V> DistributedMap<K, V> for FlakyMap<K, V> {
    fn name(&self) -> &str {
        self.inner.name()
    }

    fn get(&self, key: &K) -> DataResult<Option<V>> {
        self.inner.get(key)
    }

    fn get_all(&self, keys: &HashSet<K>) -> DataResult<HashMap<K, V>> {
        self.inner.get_all(keys)
    }

    fn put(&self, key: K, value: V) -> DataResult<Option<V>> {
        let armed = self
            .failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if armed {
            return Err(DataError::Connection("connection reset".to_string()));
        }
        self.inner.put(key, value)
    }

    fn remove(&self, key: &K) -> DataResult<Option<V>> {
        self.inner.remove(key)
    }

    fn contains_key(&self, key: &K) -> DataResult<bool> {
        self.inner.contains_key(key)
    }

    fn values(&self) -> DataResult<Vec<V>> {
        self.inner.values()
    }

    fn key_set(&self) -> DataResult<HashSet<K>> {
        self.inner.key_set()
    }

    fn entry_set(&self) -> DataResult<Vec<(K, V)>> {
        self.inner.entry_set()
    }

    fn map_copy(&self) -> DataResult<HashMap<K, V>> {
        self.inner.map_copy()
    }

    fn size(&self) -> DataResult<usize> {
        self.inner.size()
    }

    fn clear(&self) -> DataResult<()> {
        self.inner.clear()
    }

    fn lock(&self, key: &K) -> DataResult<()> {
        self.inner.lock(key)
    }

    fn unlock(&self, key: &K) -> DataResult<()> {
        self.inner.unlock(key)
    }

    fn add_entry_listener(&self, listener: Arc<dyn EntryListener<K, V>>) -> DataResult<ListenerId> {
        self.inner.add_entry_listener(listener)
    }

    fn add_listener(&self, listener: Arc<dyn ChangeListener>) -> DataResult<ListenerId> {
        self.inner.add_listener(listener)
    }

    fn remove_listener(&self, id: &ListenerId) {
        self.inner.remove_listener(id)
    }
}

type FlakyMaps = (
    Arc<FlakyMap<String, BuildJobQueueItem>>,
    Arc<FlakyMap<String, BuildAgentInformation>>,
);

fn flaky(access: &DistributedDataAccess<LocalDataProvider>) -> FlakyMaps {
    let provider = access.provider();
    let jobs = FlakyMap::wrap(
        provider
            .get_map::<String, BuildJobQueueItem>(names::BUILD_JOBS)
            .unwrap(),
    );
    let agents = FlakyMap::wrap(
        provider
            .get_map::<String, BuildAgentInformation>(names::BUILD_AGENT_INFORMATION)
            .unwrap(),
    );
    access.install_maps(jobs.clone(), agents.clone());
    (jobs, agents)
}

#[test]
fn register_publishes_idle_information() {
    let access = local();
    let agent = agent(&access, "agent-1", 2);

    let info = access.agents().unwrap().get(&"agent-1".to_string()).unwrap().unwrap();
    assert_eq!(info.agent.member_address, "10.0.0.1");
    assert_eq!(info.max_number_of_concurrent_build_jobs, 2);
    assert_eq!(info.status, BuildAgentStatus::Idle);
    assert_eq!(agent.information().unwrap(), info);
}

#[test]
fn claim_takes_the_most_urgent_job_and_stamps_it() {
    let access = local();
    let agent = agent(&access, "agent-1", 2);
    enqueue(&access, &["first", "second"]);
    let urgent = BuildJobQueueItem::new("urgent", 1, 1, at(9)).with_priority(1);
    access.enqueue(&urgent).unwrap();

    let claimed = agent.claim_next().unwrap().unwrap();
    assert_eq!(claimed.id, "urgent");
    assert_eq!(claimed.status, BuildStatus::Running);
    assert_eq!(claimed.timing.build_start_date, Some(at(30)));
    assert!(claimed.is_claimed_by("agent-1"));

    let stored = access.jobs().unwrap().get(&"urgent".to_string()).unwrap().unwrap();
    assert_eq!(stored, claimed);
    let info = agent.information().unwrap();
    assert_eq!(info.number_of_current_build_jobs, 1);
    assert_eq!(info.status, BuildAgentStatus::Active);
}

#[test]
fn claim_stops_at_capacity() {
    let access = local();
    let agent = agent(&access, "agent-1", 2);
    enqueue(&access, &["a", "b", "c"]);

    assert!(agent.claim_next().unwrap().is_some());
    assert!(agent.claim_next().unwrap().is_some());
    assert_eq!(agent.claim_next().unwrap(), None);
    assert_eq!(access.queue().unwrap().size().unwrap(), 1);
}

#[test]
fn claim_skips_references_without_items() {
    let access = local();
    let agent = agent(&access, "agent-1", 1);
    enqueue(&access, &["gone", "kept"]);
    access.jobs().unwrap().remove(&"gone".to_string()).unwrap();

    assert_eq!(agent.claim_next().unwrap().unwrap().id, "kept");
}

#[test]
fn finish_archives_and_reports() {
    let access = local();
    let agent = agent(&access, "agent-1", 1);
    enqueue(&access, &["a", "b", "c", "d"]);

    for _ in 0..4 {
        let job = agent.claim_next().unwrap().unwrap();
        let result = BuildResult {
            successful: true,
            ..BuildResult::default()
        };
        let finished = agent.finish(&job, Completion::built(result)).unwrap();
        assert_eq!(finished.status, BuildStatus::Successful);
    }

    let info = agent.information().unwrap();
    assert_eq!(info.number_of_current_build_jobs, 0);
    assert_eq!(info.status, BuildAgentStatus::Idle);
    let recent: Vec<_> = info.recent_build_jobs.iter().map(|j| j.id.as_str()).collect();
    assert_eq!(recent, vec!["b", "c", "d"]);
    assert_eq!(access.jobs().unwrap().size().unwrap(), 0);
    assert_eq!(access.result_queue_size().unwrap(), 4);

    let first = access.results().unwrap().poll().unwrap().unwrap();
    assert_eq!(first.build_job.id, "a");
    assert_eq!(first.result.commit_hash.as_deref(), Some("abc"));
}

#[test]
fn requeue_counts_retries_then_fails() {
    let access = local();
    let agent = agent(&access, "agent-1", 1);
    enqueue(&access, &["flaky"]);

    for expected in 1..=2 {
        let job = agent.claim_next().unwrap().unwrap();
        let outcome = agent.requeue(&job, "timed out").unwrap();
        assert_eq!(outcome, RequeueOutcome::Requeued { retry_count: expected });
        assert_eq!(agent.information().unwrap().number_of_current_build_jobs, 0);
    }

    let job = agent.claim_next().unwrap().unwrap();
    assert_eq!(job.retry_count, 2);
    assert_eq!(agent.requeue(&job, "timed out").unwrap(), RequeueOutcome::Failed);
    assert!(access.queue().unwrap().is_empty().unwrap());

    let info = agent.information().unwrap();
    assert_eq!(info.recent_build_jobs[0].status, BuildStatus::Failed);
    let result = access.results().unwrap().poll().unwrap().unwrap();
    assert_eq!(result.error.as_deref(), Some("timed out"));
}

#[test]
fn return_to_queue_keeps_the_retry_count() {
    let access = local();
    let agent = agent(&access, "agent-1", 1);
    enqueue(&access, &["paused"]);

    let job = agent.claim_next().unwrap().unwrap();
    agent.return_to_queue(&job).unwrap();

    let queued = access.queued_jobs().unwrap();
    assert_eq!(queued.len(), 1);
    assert_eq!(queued[0].retry_count, 0);
    assert!(queued[0].build_agent.is_none());
    assert_eq!(agent.information().unwrap().number_of_current_build_jobs, 0);
}

#[test]
fn paused_agent_claims_nothing() {
    let access = local();
    let agent = agent(&access, "agent-1", 1);
    enqueue(&access, &["a"]);

    assert!(agent.pause().unwrap());
    assert!(!agent.pause().unwrap());
    assert_eq!(access.agent_status("agent-1").unwrap(), Some(BuildAgentStatus::Paused));
    assert_eq!(agent.claim_next().unwrap(), None);

    assert!(agent.resume().unwrap());
    assert!(!agent.resume().unwrap());
    assert_eq!(access.agent_status("agent-1").unwrap(), Some(BuildAgentStatus::Idle));
    assert!(agent.claim_next().unwrap().is_some());
}

#[test]
fn restart_requeues_jobs_left_running() {
    let access = local();
    let first = agent(&access, "agent-1", 2);
    enqueue(&access, &["a", "b"]);
    first.claim_next().unwrap().unwrap();
    drop(first);

    let second = agent(&access, "agent-1", 2);
    let info = second.information().unwrap();
    assert_eq!(info.number_of_current_build_jobs, 0);
    let queued = access.queued_jobs().unwrap();
    let retried: Vec<_> = queued.iter().map(|j| (j.id.as_str(), j.retry_count)).collect();
    assert_eq!(retried, vec![("a", 1), ("b", 0)]);
}

#[test]
fn restart_leaves_jobs_another_agent_took_over() {
    let access = local();
    let first = agent(&access, "agent-1", 2);
    enqueue(&access, &["a", "b"]);
    let taken = first.claim_next().unwrap().unwrap();
    first.claim_next().unwrap().unwrap();
    drop(first);

    let other = BuildAgentRef::new("agent-2", "10.0.0.2");
    let reclaimed = taken.for_retry().claimed_by(&other, at(40));
    access.jobs().unwrap().put(taken.id.clone(), reclaimed.clone()).unwrap();

    agent(&access, "agent-1", 2);
    let queued: Vec<_> = access.queued_jobs().unwrap().into_iter().map(|j| j.id).collect();
    assert_eq!(queued, vec!["b"]);
    assert_eq!(access.jobs().unwrap().get(&taken.id).unwrap(), Some(reclaimed));
}

#[test]
fn claim_skips_stale_references_to_running_jobs() {
    let access = local();
    let first = agent(&access, "agent-1", 1);
    let second = agent(&access, "agent-2", 1);
    enqueue(&access, &["a"]);
    let running = first.claim_next().unwrap().unwrap();
    access.queue().unwrap().add(running.reference()).unwrap();

    assert_eq!(second.claim_next().unwrap(), None);
    assert!(access.queue().unwrap().is_empty().unwrap());
    assert_eq!(access.jobs().unwrap().get(&running.id).unwrap(), Some(running));
    assert_eq!(second.information().unwrap().number_of_current_build_jobs, 0);
}

#[test]
fn claim_interrupted_before_the_job_is_stamped_keeps_it_queued() {
    let access = local();
    let (jobs, _) = flaky(&access);
    let agent = agent(&access, "agent-1", 1);
    enqueue(&access, &["a"]);

    jobs.fail_next_put();
    assert!(agent.claim_next().unwrap_err().is_retryable());

    let queued = access.queued_jobs().unwrap();
    assert_eq!(queued.len(), 1);
    assert_eq!(queued[0].status, BuildStatus::Queued);
    assert_eq!(agent.information().unwrap().number_of_current_build_jobs, 0);
    assert_eq!(agent.claim_next().unwrap().unwrap().id, "a");
}

#[test]
fn claim_interrupted_before_the_agent_entry_is_written_restores_the_job() {
    let access = local();
    let (_, agents) = flaky(&access);
    let agent = agent(&access, "agent-1", 1);
    enqueue(&access, &["a"]);

    agents.fail_next_put();
    assert!(agent.claim_next().unwrap_err().is_retryable());

    let queued = access.queued_jobs().unwrap();
    assert_eq!(queued.len(), 1);
    assert_eq!(queued[0].status, BuildStatus::Queued);
    assert!(queued[0].build_agent.is_none());
    assert_eq!(agent.information().unwrap().number_of_current_build_jobs, 0);

    let claimed = agent.claim_next().unwrap().unwrap();
    assert_eq!(claimed.id, "a");
    assert_eq!(agent.information().unwrap().running_build_jobs, vec![claimed]);
}

#[test]
fn deregister_removes_the_entry() {
    let access = local();
    let agent = agent(&access, "agent-1", 1);
    agent.deregister().unwrap();
    assert_eq!(access.agent_status("agent-1").unwrap(), None);

    agent.refresh().unwrap();
    assert_eq!(access.agent_status("agent-1").unwrap(), Some(BuildAgentStatus::Idle));
}

#[test]
fn concurrent_claims_never_exceed_capacity() {
    let access = local();
    let agent = Arc::new(agent(&access, "agent-1", 3));
    let ids: Vec<String> = (0..20).map(|n| format!("job-{n:02}")).collect();
    enqueue(&access, &ids.iter().map(String::as_str).collect::<Vec<_>>());

    let barrier = Arc::new(Barrier::new(8));
    let claimed = Arc::new(Mutex::new(Vec::new()));
    let threads: Vec<_> = (0..8)
        .map(|_| {
            let agent = Arc::clone(&agent);
            let barrier = Arc::clone(&barrier);
            let claimed = Arc::clone(&claimed);
            std::thread::spawn(move || {
                barrier.wait();
                if let Some(job) = agent.claim_next().unwrap() {
                    claimed.lock().unwrap().push(job.id);
                }
            })
        })
        .collect();
    for thread in threads {
        thread.join().unwrap();
    }

    assert_eq!(claimed.lock().unwrap().len(), 3);
    assert_eq!(agent.information().unwrap().number_of_current_build_jobs, 3);
    assert_eq!(access.queue().unwrap().size().unwrap(), 17);
}

#[test]
fn agents_on_separate_members_claim_each_job_once() {
    let cluster = GridCluster::new("stress");
    let members: Vec<_> = (0..4)
        .map(|n| {
            let address = format!("10.0.0.{n}");
            let provider =
                GridDataProvider::join(&cluster, &address, false, LockConfig::default()).unwrap();
            Arc::new(DistributedDataAccess::new(provider))
        })
        .collect();
    let ids: Vec<String> = (0..40).map(|n| format!("job-{n:02}")).collect();
    enqueue(&members[0], &ids.iter().map(String::as_str).collect::<Vec<_>>());

    let claimed = Arc::new(Mutex::new(Vec::new()));
    let threads: Vec<_> = members
        .iter()
        .enumerate()
        .map(|(n, access)| {
            let agent = agent(access, &format!("agent-{n}"), 2);
            let claimed = Arc::clone(&claimed);
            std::thread::spawn(move || loop {
                let mut batch = Vec::new();
                while let Some(job) = agent.claim_next().unwrap() {
                    batch.push(job);
                }
                let running = agent.information().unwrap().number_of_current_build_jobs;
                assert!(running <= 2, "{} running", running);
                if batch.is_empty() {
                    break;
                }
                for job in batch {
                    claimed.lock().unwrap().push(job.id.clone());
                    agent.finish(&job, Completion::cancelled()).unwrap();
                }
            })
        })
        .collect();
    for thread in threads {
        thread.join().unwrap();
    }

    let claimed = claimed.lock().unwrap();
    let unique: HashSet<_> = claimed.iter().collect();
    assert_eq!(claimed.len(), 40);
    assert_eq!(unique.len(), 40);
    assert_eq!(members[1].result_queue_size().unwrap(), 40);
}
