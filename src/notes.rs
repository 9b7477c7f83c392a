use tracing::{instrument, warn};

use crate::errors::{ApiError, ApiResult};
use crate::model::{CustomerId, Note, NoteId};
use crate::scope::Scope;
use crate::services::Services;

/// Notes on one customer, newest first.
#[derive(Debug)]
pub struct NoteList {
    services: Services,
    scope: Scope,
    customer_id: CustomerId,
    notes: Vec<Note>,
}

impl NoteList {
    pub fn new(services: Services, customer_id: CustomerId) -> Self {
        Self {
            services,
            scope: Scope::new(),
            customer_id,
            notes: Vec::new(),
        }
    }

    pub fn scope(&self) -> Scope {
        self.scope.clone()
    }

    pub fn notes(&self) -> &[Note] {
        &self.notes
    }

    /// Refetch after a change the backend already applied. A failed refetch
    /// is recorded and notified by `load` and does not undo the change.
    async fn reload_after_change(&mut self) {
        if let Err(err) = self.load().await {
            warn!(error = %err, "refetch after change failed");
        }
    }

    #[instrument(skip(self), fields(customer_id = self.customer_id))]
    pub async fn load(&mut self) -> ApiResult<()> {
        let api = self.services.api.clone();
        match self.scope.run(api.list_notes(self.customer_id)).await {
            Ok(mut notes) => {
                notes.sort_by(|a, b| b.created_at.cmp(&a.created_at));
                self.notes = notes;
                Ok(())
            }
            Err(err) => {
                if !err.is_cancelled() {
                    self.services
                        .notifier
                        .error(format!("Could not load notes: {}", err));
                }
                Err(err)
            }
        }
    }

    pub async fn add(&mut self, text: &str) -> ApiResult<Note> {
        let text = text.trim();
        if text.is_empty() {
            return Err(ApiError::InvalidInput("note cannot be empty".to_string()));
        }
        let api = self.services.api.clone();
        match self.scope.run(api.create_note(self.customer_id, text)).await {
            Ok(note) => {
                self.services.notifier.success("Note added");
                self.reload_after_change().await;
                Ok(note)
            }
            Err(err) => {
                if !err.is_cancelled() {
                    self.services
                        .notifier
                        .error(format!("Could not add note: {}", err));
                }
                Err(err)
            }
        }
    }

    pub async fn delete(&mut self, note_id: NoteId) -> ApiResult<()> {
        let api = self.services.api.clone();
        match self.scope.run(api.delete_note(note_id)).await {
            Ok(()) => {
                self.services.notifier.success("Note deleted");
                self.reload_after_change().await;
                Ok(())
            }
            Err(err) => {
                if !err.is_cancelled() {
                    self.services
                        .notifier
                        .error(format!("Could not delete note: {}", err));
                }
                Err(err)
            }
        }
    }
}
