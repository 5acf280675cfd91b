//! The main serial work queue.
//!
//! Deferred work (render flushes, coalesced table refreshes) is posted here
//! with zero delay and runs on a later turn of the host's run loop. Tasks are
//! never cancelled: once posted, a task runs exactly once.

use std::collections::VecDeque;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::scene::Scene;

/// A unique identifier for a posted task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TaskId(u64);

impl TaskId {
    /// Get the raw u64 value of this task ID.
    pub fn as_u64(self) -> u64 {
        self.0
    }
}

static NEXT_TASK_ID: AtomicU64 = AtomicU64::new(1);

fn next_task_id() -> TaskId {
    TaskId(NEXT_TASK_ID.fetch_add(1, Ordering::Relaxed))
}

/// A task receives the scene it was posted to.
pub type Task = Box<dyn FnOnce(&mut Scene) + 'static>;

struct TaskData {
    id: TaskId,
    task: Task,
}

/// FIFO of deferred tasks owned by a [`Scene`].
#[derive(Default)]
pub struct MainQueue {
    tasks: VecDeque<TaskData>,
}

impl MainQueue {
    /// Create an empty queue.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a task.
    pub fn post<F>(&mut self, task: F) -> TaskId
    where
        F: FnOnce(&mut Scene) + 'static,
    {
        let id = next_task_id();
        self.tasks.push_back(TaskData {
            id,
            task: Box::new(task),
        });
        id
    }

    /// Check if there are any pending tasks.
    pub fn has_pending(&self) -> bool {
        !self.tasks.is_empty()
    }

    /// Get the number of pending tasks.
    pub fn pending_count(&self) -> usize {
        self.tasks.len()
    }

    /// Ids of the pending tasks in execution order.
    pub fn pending_ids(&self) -> Vec<TaskId> {
        self.tasks.iter().map(|t| t.id).collect()
    }

    /// Detach the tasks queued so far; work posted afterwards belongs to the
    /// next turn.
    pub(crate) fn take_turn(&mut self) -> Vec<Task> {
        self.tasks.drain(..).map(|t| t.task).collect()
    }
}

impl fmt::Debug for MainQueue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MainQueue")
            .field("pending", &self.tasks.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_post_assigns_increasing_ids() {
        let mut queue = MainQueue::new();
        let a = queue.post(|_| {});
        let b = queue.post(|_| {});

        assert!(b > a);
        assert_eq!(queue.pending_count(), 2);
        assert_eq!(queue.pending_ids(), vec![a, b]);
    }

    #[test]
    fn test_take_turn_empties_queue() {
        let mut queue = MainQueue::new();
        queue.post(|_| {});
        let turn = queue.take_turn();

        assert_eq!(turn.len(), 1);
        assert!(!queue.has_pending());
    }
}
