//! Soft-deleted customers: list, restore, delete permanently.
use tracing::{instrument, warn};

use crate::errors::{ApiError, ApiResult};
use crate::model::{Customer, CustomerId};
use crate::notify::ConfirmRequest;
use crate::scope::Scope;
use crate::services::Services;

#[derive(Debug)]
pub struct RecycleBin {
    services: Services,
    scope: Scope,
    customers: Vec<Customer>,
}

impl RecycleBin {
    pub fn new(services: Services) -> Self {
        Self {
            services,
            scope: Scope::new(),
            customers: Vec::new(),
        }
    }

    pub fn scope(&self) -> Scope {
        self.scope.clone()
    }

    /// Most recently deleted first.
    pub fn customers(&self) -> &[Customer] {
        &self.customers
    }

    fn name_of(&self, id: CustomerId) -> String {
        self.customers
            .iter()
            .find(|c| c.id == id)
            .map(|c| c.company_name.clone())
            .unwrap_or_else(|| format!("customer #{}", id))
    }

    /// Refetch after a change the backend already applied. A failed refetch
    /// is recorded and notified by `load` and does not undo the change.
    async fn reload_after_change(&mut self) {
        if let Err(err) = self.load().await {
            warn!(error = %err, "refetch after change failed");
        }
    }

    #[instrument(skip(self))]
    pub async fn load(&mut self) -> ApiResult<()> {
        let api = self.services.api.clone();
        match self.scope.run(api.list_deleted_customers()).await {
            Ok(mut customers) => {
                customers.sort_by(|a, b| b.deleted_at.cmp(&a.deleted_at));
                self.customers = customers;
                Ok(())
            }
            Err(err) => {
                if !err.is_cancelled() {
                    self.services
                        .notifier
                        .error(format!("Could not load the recycle bin: {}", err));
                }
                Err(err)
            }
        }
    }

    #[instrument(skip(self))]
    pub async fn restore(&mut self, id: CustomerId) -> ApiResult<()> {
        let name = self.name_of(id);
        let api = self.services.api.clone();
        match self.scope.run(api.restore_customer(id)).await {
            Ok(()) => {
                self.services.notifier.success(format!("Restored {}", name));
                self.reload_after_change().await;
                Ok(())
            }
            Err(err) => {
                if !err.is_cancelled() {
                    self.services
                        .notifier
                        .error(format!("Could not restore {}: {}", name, err));
                }
                Err(err)
            }
        }
    }

    /// Irreversible; asks for confirmation first. Returns false when declined.
    #[instrument(skip(self))]
    pub async fn purge(&mut self, id: CustomerId) -> ApiResult<bool> {
        let name = self.name_of(id);
        let request = ConfirmRequest::danger(
            "Delete permanently",
            format!(
                "Permanently delete {} and all of its files? This cannot be undone.",
                name
            ),
        );
        if !self.services.confirmer.confirm(&request).await {
            return Ok(false);
        }
        let api = self.services.api.clone();
        match self.scope.run(api.hard_delete_customer(id)).await {
            Ok(()) => {
                self.services
                    .notifier
                    .success(format!("Permanently deleted {}", name));
                self.reload_after_change().await;
                Ok(true)
            }
            Err(ApiError::Cancelled) => Err(ApiError::Cancelled),
            Err(err) => {
                self.services
                    .notifier
                    .error(format!("Could not delete {}: {}", name, err));
                Err(err)
            }
        }
    }
}
