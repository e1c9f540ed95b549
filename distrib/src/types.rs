use std::fmt;

/// Position of a task in the input sequence.
pub type TaskId = usize;

/// Slot of the worker that executed a task.
pub type WorkerId = usize;

/// A unit of work executed by the pipeline.
///
/// `work` takes no arguments and returns nothing; results are left as state on the
/// implementor. It may run arbitrarily long and is never interrupted: a task that exceeds its
/// deadline keeps running on a blocking thread while the pipeline moves on without it.
pub trait Work: Send + 'static {
    fn work(&mut self);
}

impl<F> Work for F
where
    F: FnMut() + Send + 'static,
{
    fn work(&mut self) {
        self()
    }
}

/// A task travelling through the pipeline.
///
/// Owned by exactly one stage at a time; ownership moves with each channel handoff.
#[derive(Debug)]
pub struct Packet<W> {
    task_id: TaskId,
    worker_id: Option<WorkerId>,
    work: W,
}

impl<W> Packet<W> {
    pub fn new(task_id: TaskId, work: W) -> Self {
        Self {
            task_id,
            worker_id: None,
            work,
        }
    }

    pub fn task_id(&self) -> TaskId {
        self.task_id
    }

    /// Worker that executed this packet, `None` until a worker picked it up.
    pub fn worker_id(&self) -> Option<WorkerId> {
        self.worker_id
    }

    pub fn work(&self) -> &W {
        &self.work
    }

    pub fn into_work(self) -> W {
        self.work
    }

    /// Stamps the executing worker. The first stamp wins.
    pub(crate) fn assign_worker(&mut self, worker_id: WorkerId) {
        self.worker_id.get_or_insert(worker_id);
    }
}

impl<W: Work> Packet<W> {
    /// Runs the packet's work on the current thread.
    pub(crate) fn execute(&mut self) {
        self.work.work();
    }
}

impl<W> fmt::Display for Packet<W> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, " packet#{:<2}  wkr", self.task_id)?;
        match self.worker_id {
            Some(worker_id) => write!(f, "{worker_id}"),
            None => f.write_str("-"),
        }
    }
}
