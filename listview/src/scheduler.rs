//! Cooperative, priority-ordered job scheduling.
//!
//! Long-running work (container construction, occupancy placement, unrealized layout, item
//! eviction, ARIA propagation) is expressed as jobs. On each turn the owner takes the highest
//! priority runnable job, runs one slice of it with a [`JobInfo`] budget, and either drops it
//! (`JobStep::Complete`) or puts it back (`JobStep::Yield`) with its continuation state stored in
//! the task payload itself.

use alloc::vec::Vec;

/// Job priority, lowest first.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Priority {
    Idle,
    BelowNormal,
    Normal,
    AboveNormal,
    High,
    Max,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct JobId(u64);

/// What a job slice asks the scheduler to do next.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum JobStep {
    /// The job has more work (or is waiting on a promise); run it again on a later turn.
    Yield,
    Complete,
}

/// Budget accounting for one scheduler turn.
///
/// Jobs call [`JobInfo::consume`] for each unit of work and check [`JobInfo::should_yield`] at
/// their checkpoints.
#[derive(Clone, Copy, Debug)]
pub struct JobInfo {
    budget: u32,
    used: u32,
    now_ms: u64,
}

impl JobInfo {
    pub fn new(budget: u32, now_ms: u64) -> Self {
        Self {
            budget,
            used: 0,
            now_ms,
        }
    }

    /// A budget that never asks to yield.
    pub fn unbounded(now_ms: u64) -> Self {
        Self::new(u32::MAX, now_ms)
    }

    pub fn should_yield(&self) -> bool {
        self.used >= self.budget
    }

    pub fn consume(&mut self, units: u32) {
        self.used = self.used.saturating_add(units);
    }

    pub fn used(&self) -> u32 {
        self.used
    }

    pub fn remaining(&self) -> u32 {
        self.budget.saturating_sub(self.used)
    }

    pub fn now_ms(&self) -> u64 {
        self.now_ms
    }
}

/// A job removed from the queue for execution.
#[derive(Debug)]
pub struct ScheduledJob<T> {
    pub id: JobId,
    pub priority: Priority,
    pub name: &'static str,
    pub task: T,
}

#[derive(Debug)]
struct Job<T> {
    id: JobId,
    priority: Priority,
    name: &'static str,
    paused: bool,
    seq: u64,
    task: T,
}

/// Priority queue of cooperative jobs. Equal priorities run round-robin.
#[derive(Debug)]
pub struct Scheduler<T> {
    jobs: Vec<Job<T>>,
    next_id: u64,
    next_seq: u64,
}

impl<T> Default for Scheduler<T> {
    fn default() -> Self {
        Self {
            jobs: Vec::new(),
            next_id: 0,
            next_seq: 0,
        }
    }
}

impl<T> Scheduler<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn schedule(&mut self, task: T, priority: Priority, name: &'static str) -> JobId {
        let id = JobId(self.next_id);
        self.next_id += 1;
        let seq = self.bump_seq();
        vtrace!(job = id.0, name, ?priority, "schedule");
        self.jobs.push(Job {
            id,
            priority,
            name,
            paused: false,
            seq,
            task,
        });
        id
    }

    /// Same as [`Self::schedule`] but the job does not run until [`Self::resume`].
    pub fn schedule_paused(&mut self, task: T, priority: Priority, name: &'static str) -> JobId {
        let id = self.schedule(task, priority, name);
        self.pause(id);
        id
    }

    pub fn is_scheduled(&self, id: JobId) -> bool {
        self.jobs.iter().any(|j| j.id == id)
    }

    pub fn is_paused(&self, id: JobId) -> bool {
        self.jobs.iter().any(|j| j.id == id && j.paused)
    }

    pub fn priority(&self, id: JobId) -> Option<Priority> {
        self.jobs.iter().find(|j| j.id == id).map(|j| j.priority)
    }

    pub fn set_priority(&mut self, id: JobId, priority: Priority) {
        if let Some(job) = self.jobs.iter_mut().find(|j| j.id == id) {
            job.priority = priority;
        }
    }

    pub fn pause(&mut self, id: JobId) {
        if let Some(job) = self.jobs.iter_mut().find(|j| j.id == id) {
            job.paused = true;
        }
    }

    pub fn resume(&mut self, id: JobId) {
        if let Some(job) = self.jobs.iter_mut().find(|j| j.id == id) {
            job.paused = false;
        }
    }

    /// Removes a job. Returns its task if it was still queued.
    pub fn cancel(&mut self, id: JobId) -> Option<T> {
        let pos = self.jobs.iter().position(|j| j.id == id)?;
        vtrace!(job = id.0, name = self.jobs[pos].name, "cancel");
        Some(self.jobs.remove(pos).task)
    }

    /// Removes every job whose task matches `pred`. Returns how many were removed.
    pub fn cancel_where(&mut self, mut pred: impl FnMut(&T) -> bool) -> usize {
        let before = self.jobs.len();
        self.jobs.retain(|j| !pred(&j.task));
        before - self.jobs.len()
    }

    /// Drops every queued job and returns their tasks.
    pub fn clear(&mut self) -> Vec<T> {
        self.jobs.drain(..).map(|j| j.task).collect()
    }

    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }

    pub fn has_runnable(&self) -> bool {
        self.jobs.iter().any(|j| !j.paused)
    }

    pub fn tasks(&self) -> impl Iterator<Item = &T> {
        self.jobs.iter().map(|j| &j.task)
    }

    pub fn task_mut(&mut self, id: JobId) -> Option<&mut T> {
        self.jobs
            .iter_mut()
            .find(|j| j.id == id)
            .map(|j| &mut j.task)
    }

    /// Removes and returns the next runnable job: highest priority, then oldest.
    pub fn take_next(&mut self) -> Option<ScheduledJob<T>> {
        let pos = self
            .jobs
            .iter()
            .enumerate()
            .filter(|(_, j)| !j.paused)
            .max_by(|(_, a), (_, b)| a.priority.cmp(&b.priority).then(b.seq.cmp(&a.seq)))
            .map(|(i, _)| i)?;
        let job = self.jobs.remove(pos);
        Some(ScheduledJob {
            id: job.id,
            priority: job.priority,
            name: job.name,
            task: job.task,
        })
    }

    /// Puts a yielded job back behind the other jobs of its priority.
    pub fn requeue(&mut self, job: ScheduledJob<T>) {
        let seq = self.bump_seq();
        self.jobs.push(Job {
            id: job.id,
            priority: job.priority,
            name: job.name,
            paused: false,
            seq,
            task: job.task,
        });
    }

    fn bump_seq(&mut self) -> u64 {
        let seq = self.next_seq;
        self.next_seq += 1;
        seq
    }
}
