// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Agent event loop
//!
//! Claims jobs when the queue reports an addition or a slot frees up, with a
//! periodic tick as backup. Each claimed job runs as its own task. Data layer
//! calls block and run on the blocking pool.

use crate::access::{JobQueue, NameTopic};
use crate::agent::{BuildAgent, Completion};
use crate::config::{AgentConfig, ExecutorConfig};
use crate::error::SchedulerError;
use crate::executor::BuildExecutor;
use crate::images::DockerImageCache;
use bq_core::{
    BuildJobQueueItem, BuildResult, ChangeEvent, ChangeKind, ChangeListener, Clock,
    DistributedDataProvider, ListenerId, Message, MessageListener, SystemClock,
};
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinSet;
use tokio::time::Instant;

#[derive(Clone, Debug, PartialEq)]
pub struct WorkerSettings {
    pub check_interval: Duration,
    pub timeout: Duration,
    pub pause_grace_period: Duration,
}

impl WorkerSettings {
    pub fn from_config(agent: &AgentConfig, executor: &ExecutorConfig) -> Self {
        Self {
            check_interval: agent.check_interval,
            timeout: executor.timeout,
            pause_grace_period: agent.pause_grace_period,
        }
    }
}

/// Why a running job was stopped before it finished
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Stop {
    Cancel,
    Pause,
    Shutdown,
}

enum Outcome {
    Built(BuildResult),
    Errored(String),
    TimedOut,
    Stopped(Stop),
}

/// Cluster events relevant to this agent
#[derive(Debug)]
enum Signal {
    QueueChanged,
    Cancel(String),
    Pause,
    Resume,
}

/// Listener registrations to undo on exit
struct Subscriptions {
    queue: Arc<JobQueue>,
    queue_listener: ListenerId,
    topics: Vec<(Arc<NameTopic>, ListenerId)>,
}

impl Subscriptions {
    fn remove(self) {
        self.queue.remove_listener(&self.queue_listener);
        for (topic, id) in self.topics {
            topic.remove_message_listener(&id);
        }
    }
}

pub struct Worker<P, E, C: Clock = SystemClock> {
    agent: Arc<BuildAgent<P, C>>,
    executor: Arc<E>,
    images: Arc<DockerImageCache<P, C>>,
    settings: WorkerSettings,
}

impl<P, E, C> Worker<P, E, C>
where
    P: DistributedDataProvider,
    E: BuildExecutor,
    C: Clock,
{
    pub fn new(agent: Arc<BuildAgent<P, C>>, executor: Arc<E>, settings: WorkerSettings) -> Self {
        let images = Arc::new(DockerImageCache::with_clock(
            Arc::clone(agent.access()),
            agent.clock().clone(),
        ));
        Self {
            agent,
            executor,
            images,
            settings,
        }
    }

    pub fn agent(&self) -> &Arc<BuildAgent<P, C>> {
        &self.agent
    }

    /// Run until `shutdown` resolves; running jobs are then returned to the queue
    pub async fn run(self, shutdown: impl Future<Output = ()>) -> Result<(), SchedulerError> {
        self.blocking(|agent| agent.register()).await?;
        let (signal_tx, mut signals) = mpsc::unbounded_channel();
        let subscriptions = self.blocking(move |agent| subscribe(agent, signal_tx)).await?;

        let mut running: HashMap<String, oneshot::Sender<Stop>> = HashMap::new();
        let mut tasks: JoinSet<String> = JoinSet::new();
        let mut check = tokio::time::interval(self.settings.check_interval);
        let mut pause_deadline: Option<Instant> = None;
        tokio::pin!(shutdown);

        tracing::info!(agent = %self.agent.name(), "worker started");
        loop {
            let grace_ends = pause_deadline.unwrap_or_else(Instant::now);
            tokio::select! {
                _ = &mut shutdown => break,
                _ = check.tick() => {
                    if let Err(e) = self.blocking(|agent| agent.refresh()).await {
                        tracing::warn!(error = %e, "failed to refresh agent information");
                    }
                    self.fill(&mut running, &mut tasks).await;
                }
                Some(signal) = signals.recv() => match signal {
                    Signal::QueueChanged => self.fill(&mut running, &mut tasks).await,
                    Signal::Cancel(job_id) => {
                        if let Some(stop) = running.remove(&job_id) {
                            tracing::info!(job_id, "cancelling running build");
                            let _ = stop.send(Stop::Cancel);
                        }
                    }
                    Signal::Pause => match self.blocking(|agent| agent.pause()).await {
                        Ok(true) => {
                            pause_deadline =
                                Some(Instant::now() + self.settings.pause_grace_period);
                        }
                        Ok(false) => tracing::info!("build agent is already paused"),
                        Err(e) => tracing::error!(error = %e, "failed to pause"),
                    },
                    Signal::Resume => match self.blocking(|agent| agent.resume()).await {
                        Ok(true) => {
                            pause_deadline = None;
                            self.fill(&mut running, &mut tasks).await;
                        }
                        Ok(false) => tracing::info!("build agent is already running"),
                        Err(e) => tracing::error!(error = %e, "failed to resume"),
                    },
                },
                Some(joined) = tasks.join_next(), if !tasks.is_empty() => {
                    match joined {
                        Ok(job_id) => {
                            running.remove(&job_id);
                        }
                        Err(e) => tracing::error!(error = %e, "build task failed"),
                    }
                    self.fill(&mut running, &mut tasks).await;
                }
                _ = tokio::time::sleep_until(grace_ends), if pause_deadline.is_some() => {
                    pause_deadline = None;
                    if !running.is_empty() {
                        tracing::info!(
                            jobs = running.len(),
                            "grace period exceeded, returning running builds to the queue"
                        );
                    }
                    for (_, stop) in running.drain() {
                        let _ = stop.send(Stop::Pause);
                    }
                }
            }
        }

        tracing::info!(agent = %self.agent.name(), running = running.len(), "worker stopping");
        for (_, stop) in running.drain() {
            let _ = stop.send(Stop::Shutdown);
        }
        while let Some(joined) = tasks.join_next().await {
            if let Err(e) = joined {
                tracing::error!(error = %e, "build task failed");
            }
        }
        subscriptions.remove();
        self.blocking(|agent| agent.deregister()).await
    }

    /// Claim jobs until the agent is full, paused or the queue is empty
    async fn fill(
        &self,
        running: &mut HashMap<String, oneshot::Sender<Stop>>,
        tasks: &mut JoinSet<String>,
    ) {
        while running.len() < self.agent.max_concurrent() && !self.agent.is_paused() {
            match self.blocking(|agent| agent.claim_next()).await {
                Ok(Some(job)) => {
                    let (stop_tx, stop_rx) = oneshot::channel();
                    running.insert(job.id.clone(), stop_tx);
                    tasks.spawn(execute(
                        Arc::clone(&self.agent),
                        Arc::clone(&self.executor),
                        Arc::clone(&self.images),
                        job,
                        self.settings.timeout,
                        stop_rx,
                    ));
                }
                Ok(None) => break,
                Err(e) if e.is_retryable() => {
                    tracing::warn!(error = %e, "cluster unavailable, not claiming");
                    break;
                }
                Err(e) => {
                    tracing::error!(error = %e, "failed to claim build job");
                    break;
                }
            }
        }
    }

    async fn blocking<R: Send + 'static>(
        &self,
        f: impl FnOnce(&BuildAgent<P, C>) -> Result<R, SchedulerError> + Send + 'static,
    ) -> Result<R, SchedulerError> {
        let agent = Arc::clone(&self.agent);
        tokio::task::spawn_blocking(move || f(&agent)).await?
    }
}

fn subscribe<P: DistributedDataProvider, C: Clock>(
    agent: &BuildAgent<P, C>,
    signals: mpsc::UnboundedSender<Signal>,
) -> Result<Subscriptions, SchedulerError> {
    let access = agent.access();
    let queue = access.queue()?;

    let tx = signals.clone();
    let on_queue: Arc<dyn ChangeListener> = Arc::new(move |event: ChangeEvent| {
        if event.kind == ChangeKind::Added {
            let _ = tx.send(Signal::QueueChanged);
        }
    });
    let queue_listener = queue.add_listener(on_queue)?;

    let tx = signals.clone();
    let on_cancel: Arc<dyn MessageListener<String>> = Arc::new(move |message: Message<String>| {
        let _ = tx.send(Signal::Cancel(message.payload));
    });
    let name = agent.name().to_string();
    let tx = signals.clone();
    let on_pause: Arc<dyn MessageListener<String>> = Arc::new(move |message: Message<String>| {
        if message.payload == name {
            let _ = tx.send(Signal::Pause);
        }
    });
    let name = agent.name().to_string();
    let tx = signals;
    let on_resume: Arc<dyn MessageListener<String>> = Arc::new(move |message: Message<String>| {
        if message.payload == name {
            let _ = tx.send(Signal::Resume);
        }
    });

    let mut topics = Vec::new();
    for (topic, listener) in [
        (access.cancel_topic()?, on_cancel),
        (access.pause_topic()?, on_pause),
        (access.resume_topic()?, on_resume),
    ] {
        let id = topic.add_message_listener(listener)?;
        topics.push((topic, id));
    }

    Ok(Subscriptions {
        queue,
        queue_listener,
        topics,
    })
}

/// Run one job to an outcome and settle it; yields the job id
async fn execute<P, E, C>(
    agent: Arc<BuildAgent<P, C>>,
    executor: Arc<E>,
    images: Arc<DockerImageCache<P, C>>,
    job: BuildJobQueueItem,
    timeout: Duration,
    stop: oneshot::Receiver<Stop>,
) -> String
where
    P: DistributedDataProvider,
    E: BuildExecutor,
    C: Clock,
{
    tracing::info!(job_id = %job.id, "starting build");
    let outcome = tokio::select! {
        result = tokio::time::timeout(timeout, executor.execute(&job)) => match result {
            Ok(Ok(result)) => Outcome::Built(result),
            Ok(Err(e)) => Outcome::Errored(e.to_string()),
            Err(_) => Outcome::TimedOut,
        },
        stop = stop => Outcome::Stopped(stop.unwrap_or(Stop::Shutdown)),
    };

    let job_id = job.id.clone();
    let settled = tokio::task::spawn_blocking(move || settle(&agent, &images, &job, outcome)).await;
    match settled {
        Ok(Ok(())) => {}
        Ok(Err(e)) => tracing::error!(job_id, error = %e, "failed to settle build job"),
        Err(e) => tracing::error!(job_id, error = %e, "settle task failed"),
    }
    job_id
}

fn settle<P: DistributedDataProvider, C: Clock>(
    agent: &BuildAgent<P, C>,
    images: &DockerImageCache<P, C>,
    job: &BuildJobQueueItem,
    outcome: Outcome,
) -> Result<(), SchedulerError> {
    match outcome {
        Outcome::Built(result) => {
            if let Some(image) = &job.docker_image {
                images.record_build(image)?;
            }
            agent.finish(job, Completion::built(result))?;
        }
        Outcome::Errored(error) => {
            tracing::warn!(job_id = %job.id, %error, "build errored");
            agent.finish(job, Completion::errored(error))?;
        }
        Outcome::TimedOut => {
            tracing::warn!(job_id = %job.id, "build timed out");
            agent.requeue(job, "build timed out")?;
        }
        Outcome::Stopped(Stop::Cancel) => {
            agent.finish(job, Completion::cancelled())?;
        }
        Outcome::Stopped(Stop::Pause | Stop::Shutdown) => agent.return_to_queue(job)?,
    }
    Ok(())
}

#[cfg(test)]
#[path = "worker_tests.rs"]
mod tests;
