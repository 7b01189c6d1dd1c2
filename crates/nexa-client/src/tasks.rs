//! Tasks: role-scoped CRUD, the status board and the upcoming list.

use nexa_shared::types::{TaskId, TaskStatus};
use nexa_shared::CrmError;
use nexa_store::{NewTask, Storage, Task, TaskPatch};

use crate::collection::ScopedStore;
use crate::events::Notifier;
use crate::session::SessionStore;

/// Visible tasks grouped by status, in collection order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TaskBoard {
    pub todo: Vec<Task>,
    pub in_progress: Vec<Task>,
    pub done: Vec<Task>,
}

impl TaskBoard {
    pub fn column(&self, status: TaskStatus) -> &[Task] {
        match status {
            TaskStatus::Todo => &self.todo,
            TaskStatus::InProgress => &self.in_progress,
            TaskStatus::Done => &self.done,
        }
    }
}

/// Not-done tasks ordered by due date, soonest first.
pub fn upcoming_of(tasks: &[Task], limit: usize) -> Vec<Task> {
    let mut pending: Vec<Task> = tasks
        .iter()
        .filter(|t| t.status != TaskStatus::Done)
        .cloned()
        .collect();
    pending.sort_by_key(|t| t.due_date);
    pending.truncate(limit);
    pending
}

#[derive(Clone)]
pub struct TaskStore {
    tasks: ScopedStore<Task>,
    notifier: Notifier,
}

impl TaskStore {
    pub fn new(storage: Storage, session: SessionStore, notifier: Notifier) -> Self {
        Self {
            tasks: ScopedStore::new(storage, session),
            notifier,
        }
    }

    pub fn refresh(&self) {
        self.tasks.refresh();
    }

    pub fn tasks(&self) -> Vec<Task> {
        self.tasks.visible()
    }

    pub fn board(&self) -> TaskBoard {
        let mut board = TaskBoard::default();
        for task in self.tasks.visible() {
            match task.status {
                TaskStatus::Todo => board.todo.push(task),
                TaskStatus::InProgress => board.in_progress.push(task),
                TaskStatus::Done => board.done.push(task),
            }
        }
        board
    }

    pub fn upcoming(&self, limit: usize) -> Vec<Task> {
        upcoming_of(&self.tasks.visible(), limit)
    }

    pub fn create_task(&self, draft: NewTask) -> Result<Task, CrmError> {
        if let Err(e) = draft.validate() {
            self.notifier.error(e.to_string());
            return Err(e);
        }
        let task = draft.into_task();
        self.tasks.insert(task.clone());

        tracing::info!(task_id = %task.id, "Task created");
        self.notifier.success("Tarefa criada com sucesso");
        Ok(task)
    }

    /// Unknown ids are a silent no-op returning `Ok(None)`.
    pub fn update_task(&self, id: &TaskId, patch: TaskPatch) -> Result<Option<Task>, CrmError> {
        if let Err(e) = patch.validate() {
            self.notifier.error(e.to_string());
            return Err(e);
        }
        let updated = self.tasks.update(id, |t| patch.apply(t));
        if updated.is_some() {
            tracing::info!(task_id = %id, "Task updated");
            self.notifier.success("Tarefa atualizada com sucesso");
        }
        Ok(updated)
    }

    pub fn delete_task(&self, id: &TaskId) -> bool {
        let removed = self.tasks.remove(id);
        if removed {
            tracing::info!(task_id = %id, "Task deleted");
            self.notifier.success("Tarefa excluída com sucesso");
        }
        removed
    }

    /// Any status may follow any other, including reopening a done task.
    pub fn set_status(&self, id: &TaskId, status: TaskStatus) -> Option<Task> {
        let updated = self.tasks.update(id, |t| t.status = status)?;
        tracing::debug!(task_id = %id, ?status, "Task status changed");
        self.notifier.success("Status da tarefa atualizado");
        Some(updated)
    }
}
