// ── Task store ──
//
// Concurrent map of task records. Only one task runs at a time, so the
// map holds at most one running task plus whatever settled tasks remain
// from before; a new submission evicts the settled ones.

use dashmap::DashMap;
use uuid::Uuid;

use crate::model::Task;

#[derive(Debug, Default)]
pub struct TaskStore {
    tasks: DashMap<Uuid, Task>,
}

impl TaskStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a freshly submitted task, dropping every settled one.
    pub fn begin(&self, task: Task) {
        self.tasks.retain(|_, t| !t.is_settled());
        self.tasks.insert(task.id, task);
    }

    /// Snapshot of a task.
    pub fn get(&self, id: &Uuid) -> Option<Task> {
        self.tasks.get(id).map(|t| t.value().clone())
    }

    /// Apply `f` to a running task. Settled tasks are immutable; returns
    /// `false` if the task is unknown or already settled.
    pub(crate) fn settle(&self, id: &Uuid, f: impl FnOnce(&mut Task)) -> bool {
        let Some(mut task) = self.tasks.get_mut(id) else {
            return false;
        };
        if task.is_settled() {
            return false;
        }
        f(task.value_mut());
        true
    }

    pub fn ids(&self) -> Vec<Uuid> {
        let mut ids: Vec<Uuid> = self.tasks.iter().map(|t| *t.key()).collect();
        ids.sort_unstable();
        ids
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }
}
