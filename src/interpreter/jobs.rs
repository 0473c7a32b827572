use super::*;
use std::collections::VecDeque;
use tracing::{debug, trace};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum JobKind {
    PromiseFulfillReaction,
    PromiseRejectReaction,
    PromiseResolveThenable,
}

/// A deferred unit of work. Jobs are produced by the promise machinery and
/// owned by the [`MicrotaskQueue`] until they run.
#[derive(Clone, Debug)]
pub enum Job {
    Reaction(PromiseReactionJob),
    ResolveThenable(PromiseResolveThenableJob),
}

impl Job {
    pub fn kind(&self) -> JobKind {
        match self {
            Job::Reaction(job) => match job.reaction_type {
                PromiseReactionType::Fulfill => JobKind::PromiseFulfillReaction,
                PromiseReactionType::Reject => JobKind::PromiseRejectReaction,
            },
            Job::ResolveThenable(_) => JobKind::PromiseResolveThenable,
        }
    }
}

#[derive(Debug, Default)]
pub struct MicrotaskQueue {
    jobs: VecDeque<Job>,
    total_enqueued: u64,
}

impl MicrotaskQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn enqueue(&mut self, job: Job) {
        self.total_enqueued += 1;
        self.jobs.push_back(job);
    }

    pub fn pop(&mut self) -> Option<Job> {
        self.jobs.pop_front()
    }

    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }

    pub fn total_enqueued(&self) -> u64 {
        self.total_enqueued
    }

    pub fn kinds(&self) -> Vec<JobKind> {
        self.jobs.iter().map(Job::kind).collect()
    }
}

impl Interpreter {
    pub fn enqueue_job(&mut self, job: Job) {
        trace!(kind = ?job.kind(), queued = self.microtask_queue.len(), "enqueue job");
        self.microtask_queue.enqueue(job);
    }

    pub fn has_pending_jobs(&self) -> bool {
        !self.microtask_queue.is_empty()
    }

    pub fn pending_job_kinds(&self) -> Vec<JobKind> {
        self.microtask_queue.kinds()
    }

    pub fn total_jobs_enqueued(&self) -> u64 {
        self.microtask_queue.total_enqueued()
    }

    /// Runs the oldest queued job to completion. Returns false when the queue
    /// was empty.
    pub fn run_next_job(&mut self) -> bool {
        let Some(job) = self.microtask_queue.pop() else {
            return false;
        };
        trace!(kind = ?job.kind(), "run job");
        match job {
            Job::Reaction(job) => self.run_promise_reaction_job(job),
            Job::ResolveThenable(job) => self.run_promise_resolve_thenable_job(job),
        }
        true
    }

    /// Drains the queue, including jobs enqueued by the jobs it runs.
    pub fn run_jobs(&mut self) -> Result<usize, EngineError> {
        let mut ran = 0;
        while self.has_pending_jobs() {
            if let Some(limit) = self.options.job_limit
                && ran >= limit
            {
                let pending = self.microtask_queue.len();
                debug!(limit, pending, "job limit reached");
                return Err(EngineError::JobLimitExceeded { limit, pending });
            }
            self.run_next_job();
            ran += 1;
        }
        Ok(ran)
    }
}
