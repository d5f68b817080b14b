//! Tick scheduler for deferred and periodic realm tasks.
//!
//! Tasks are plain data; the owner pops due tasks on every tick and handles them
//! itself, so a task never holds a borrow on realm state.
//!
//! * A deferred task runs on the first tick at or after its delay, never earlier.
//!   A delay of 0 runs on the next tick.
//! * Periodic tasks re-arm themselves until cancelled.
//! * Tasks due on the same tick run in scheduling order.
//! * Cancelling is the owner's job: nothing is ever dropped implicitly.

use std::collections::{BTreeMap, HashMap};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TaskHandle(u64);

#[derive(Debug)]
struct Entry<T> {
    task: T,
    every: Option<u64>,
}

#[derive(Debug)]
pub struct TickScheduler<T> {
    tick: u64,
    next_id: u64,
    /// (due tick, id) -> entry
    queue: BTreeMap<(u64, u64), Entry<T>>,
    /// id -> due tick
    due_by_id: HashMap<u64, u64>,
}

impl<T: Clone> TickScheduler<T> {
    pub fn new() -> Self {
        Self {
            tick: 0,
            next_id: 0,
            queue: BTreeMap::new(),
            due_by_id: HashMap::new(),
        }
    }

    pub fn current_tick(&self) -> u64 {
        self.tick
    }

    pub fn pending(&self) -> usize {
        self.queue.len()
    }

    pub fn is_scheduled(&self, handle: TaskHandle) -> bool {
        self.due_by_id.contains_key(&handle.0)
    }

    fn insert(&mut self, task: T, delay: u64, every: Option<u64>) -> TaskHandle {
        let id = self.next_id;
        self.next_id += 1;
        let due = self.tick + delay.max(1);
        self.queue.insert((due, id), Entry { task, every });
        self.due_by_id.insert(id, due);
        TaskHandle(id)
    }

    pub fn run_deferred(&mut self, task: T, delay_ticks: u64) -> TaskHandle {
        self.insert(task, delay_ticks, None)
    }

    /// First run happens `interval_ticks` from now.
    pub fn run_periodic(&mut self, task: T, interval_ticks: u64) -> TaskHandle {
        let interval = interval_ticks.max(1);
        self.insert(task, interval, Some(interval))
    }

    /// Returns false when the handle already ran (one-shot) or was cancelled.
    pub fn cancel(&mut self, handle: TaskHandle) -> bool {
        match self.due_by_id.remove(&handle.0) {
            Some(due) => self.queue.remove(&(due, handle.0)).is_some(),
            None => false,
        }
    }

    /// Advance one tick and return every task now due.
    pub fn advance(&mut self) -> Vec<(TaskHandle, T)> {
        self.tick += 1;
        let mut due = Vec::new();
        while let Some(entry) = self.queue.first_entry() {
            if entry.key().0 > self.tick {
                break;
            }
            let ((_, id), entry) = entry.remove_entry();
            self.due_by_id.remove(&id);
            if let Some(every) = entry.every {
                let next = self.tick + every;
                self.queue.insert(
                    (next, id),
                    Entry {
                        task: entry.task.clone(),
                        every: Some(every),
                    },
                );
                self.due_by_id.insert(id, next);
            }
            due.push((TaskHandle(id), entry.task));
        }
        due
    }
}

impl<T: Clone> Default for TickScheduler<T> {
    fn default() -> Self {
        Self::new()
    }
}
