//! Single-threaded timer queue with explicit cancel handles.
//!
//! Nothing here runs on its own: the owner calls [`Scheduler::pop_due`]
//! from its event loop and uses [`Scheduler::next_due`] to decide when it
//! wants to be woken.

use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TaskHandle {
    due_ms: u64,
    id: u64,
}

impl TaskHandle {
    pub fn due_ms(&self) -> u64 {
        self.due_ms
    }
}

#[derive(Debug)]
pub struct Scheduler<T> {
    next_id: u64,
    tasks: BTreeMap<TaskHandle, T>,
}

impl<T> Default for Scheduler<T> {
    fn default() -> Self {
        Self {
            next_id: 0,
            tasks: BTreeMap::new(),
        }
    }
}

impl<T> Scheduler<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn schedule_at(&mut self, due_ms: u64, task: T) -> TaskHandle {
        let handle = TaskHandle {
            due_ms,
            id: self.next_id,
        };
        self.next_id += 1;
        self.tasks.insert(handle, task);
        handle
    }

    pub fn schedule_after(&mut self, now_ms: u64, delay_ms: u64, task: T) -> TaskHandle {
        self.schedule_at(now_ms.saturating_add(delay_ms), task)
    }

    /// Removes a pending task. Returns false if it already ran or was
    /// cancelled.
    pub fn cancel(&mut self, handle: TaskHandle) -> bool {
        self.tasks.remove(&handle).is_some()
    }

    /// Cancels every pending task matching `predicate`.
    pub fn cancel_where(&mut self, mut predicate: impl FnMut(&T) -> bool) -> usize {
        let before = self.tasks.len();
        self.tasks.retain(|_, task| !predicate(task));
        before - self.tasks.len()
    }

    pub fn clear(&mut self) {
        self.tasks.clear();
    }

    pub fn is_scheduled(&self, handle: TaskHandle) -> bool {
        self.tasks.contains_key(&handle)
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub fn next_due(&self) -> Option<u64> {
        self.tasks.keys().next().map(TaskHandle::due_ms)
    }

    /// Takes the earliest task due at `now_ms`; tasks due at the same
    /// time come out in scheduling order.
    pub fn pop_due(&mut self, now_ms: u64) -> Option<T> {
        let handle = *self.tasks.keys().next()?;
        if handle.due_ms > now_ms {
            return None;
        }
        self.tasks.remove(&handle)
    }
}
