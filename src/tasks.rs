//! Onboarding and AI-content task boards for one customer.
use tracing::{instrument, warn};

use crate::api::TaskBoardKind;
use crate::errors::{ApiError, ApiResult};
use crate::model::{CustomerId, NewTask, Task, TaskId, TaskStatus};
use crate::notify::ConfirmRequest;
use crate::scope::Scope;
use crate::services::Services;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoardColumn<'a> {
    pub status: TaskStatus,
    pub tasks: Vec<&'a Task>,
}

/// Group tasks into one column per status, in board order. Empty columns are
/// kept so every board has the same shape.
pub fn columns(tasks: &[Task]) -> Vec<BoardColumn<'_>> {
    TaskStatus::ALL
        .into_iter()
        .map(|status| BoardColumn {
            status,
            tasks: tasks.iter().filter(|t| t.status == status).collect(),
        })
        .collect()
}

/// Percentage of tasks completed, ignoring cancelled ones.
pub fn completion_percent(tasks: &[Task]) -> u8 {
    let relevant: Vec<&Task> = tasks
        .iter()
        .filter(|t| t.status != TaskStatus::Cancelled)
        .collect();
    if relevant.is_empty() {
        return 0;
    }
    let done = relevant
        .iter()
        .filter(|t| t.status == TaskStatus::Completed)
        .count();
    ((done * 100) / relevant.len()) as u8
}

#[derive(Debug)]
pub struct TaskBoard {
    services: Services,
    scope: Scope,
    kind: TaskBoardKind,
    customer_id: CustomerId,
    tasks: Vec<Task>,
}

impl TaskBoard {
    pub fn new(services: Services, kind: TaskBoardKind, customer_id: CustomerId) -> Self {
        Self {
            services,
            scope: Scope::new(),
            kind,
            customer_id,
            tasks: Vec::new(),
        }
    }

    pub fn scope(&self) -> Scope {
        self.scope.clone()
    }

    pub fn kind(&self) -> TaskBoardKind {
        self.kind
    }

    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn columns(&self) -> Vec<BoardColumn<'_>> {
        columns(&self.tasks)
    }

    pub fn completion_percent(&self) -> u8 {
        completion_percent(&self.tasks)
    }

    fn report(&self, action: &str, err: &ApiError) {
        if !err.is_cancelled() {
            self.services
                .notifier
                .error(format!("Could not {} {} task: {}", action, self.kind, err));
        }
    }

    /// Refetch after a change the backend already applied. A failed refetch
    /// is recorded and notified by `load` and does not undo the change.
    async fn reload_after_change(&mut self) {
        if let Err(err) = self.load().await {
            warn!(error = %err, "refetch after change failed");
        }
    }

    #[instrument(skip(self), fields(board = %self.kind, customer_id = self.customer_id))]
    pub async fn load(&mut self) -> ApiResult<()> {
        let api = self.services.api.clone();
        match self.scope.run(api.list_tasks(self.kind, self.customer_id)).await {
            Ok(tasks) => {
                self.tasks = tasks;
                Ok(())
            }
            Err(err) => {
                self.report("load", &err);
                Err(err)
            }
        }
    }

    pub async fn create(&mut self, task: NewTask) -> ApiResult<Task> {
        if task.task_name.trim().is_empty() {
            return Err(ApiError::InvalidInput("task name is required".to_string()));
        }
        let api = self.services.api.clone();
        match self
            .scope
            .run(api.create_task(self.kind, self.customer_id, &task))
            .await
        {
            Ok(created) => {
                self.services
                    .notifier
                    .success(format!("Added task {}", created.task_name));
                self.reload_after_change().await;
                Ok(created)
            }
            Err(err) => {
                self.report("create", &err);
                Err(err)
            }
        }
    }

    #[instrument(skip(self), fields(board = %self.kind))]
    pub async fn move_task(&mut self, task_id: TaskId, status: TaskStatus) -> ApiResult<()> {
        if !self.tasks.iter().any(|t| t.id == task_id) {
            return Err(ApiError::InvalidInput(format!(
                "task #{} is not on this board",
                task_id
            )));
        }
        let api = self.services.api.clone();
        match self
            .scope
            .run(api.update_task_status(self.kind, task_id, status))
            .await
        {
            Ok(()) => {
                self.reload_after_change().await;
                Ok(())
            }
            Err(err) => {
                self.report("update", &err);
                Err(err)
            }
        }
    }

    /// Returns false when the user declined.
    pub async fn delete(&mut self, task_id: TaskId) -> ApiResult<bool> {
        let request = ConfirmRequest::danger("Delete task", format!("Delete task #{}?", task_id));
        if !self.services.confirmer.confirm(&request).await {
            return Ok(false);
        }
        let api = self.services.api.clone();
        match self.scope.run(api.delete_task(self.kind, task_id)).await {
            Ok(()) => {
                self.reload_after_change().await;
                Ok(true)
            }
            Err(err) => {
                self.report("delete", &err);
                Err(err)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn task(id: TaskId, status: TaskStatus) -> Task {
        Task {
            id,
            task_name: format!("task {}", id),
            task_type: None,
            status,
            progress_current: 0,
            progress_total: 0,
            notes: None,
            started_at: None,
            completed_at: None,
        }
    }

    #[test]
    fn columns_follow_board_order() {
        let tasks = vec![
            task(1, TaskStatus::Completed),
            task(2, TaskStatus::NotStarted),
            task(3, TaskStatus::Completed),
        ];
        let cols = columns(&tasks);
        assert_eq!(cols.len(), 5);
        assert_eq!(cols[0].status, TaskStatus::NotStarted);
        assert_eq!(cols[0].tasks.len(), 1);
        assert_eq!(cols[3].status, TaskStatus::Completed);
        let ids: Vec<TaskId> = cols[3].tasks.iter().map(|t| t.id).collect();
        assert_eq!(ids, vec![1, 3]);
        assert!(cols[4].tasks.is_empty());
    }

    #[test]
    fn completion_ignores_cancelled() {
        let tasks = vec![
            task(1, TaskStatus::Completed),
            task(2, TaskStatus::InProgress),
            task(3, TaskStatus::Cancelled),
        ];
        assert_eq!(completion_percent(&tasks), 50);
        assert_eq!(completion_percent(&[task(4, TaskStatus::Cancelled)]), 0);
    }
}
