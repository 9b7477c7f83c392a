use tracing::{instrument, warn};

use crate::errors::{ApiError, ApiResult};
use crate::model::{Customer, CustomerId, CustomerStatus, NewCustomer};
use crate::notify::ConfirmRequest;
use crate::scope::Scope;
use crate::services::Services;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatusBreakdown {
    pub active: usize,
    pub passive: usize,
    pub cancelled: usize,
}

impl StatusBreakdown {
    /// Soft-deleted customers are not counted.
    pub fn of(customers: &[Customer]) -> Self {
        let mut out = StatusBreakdown::default();
        for customer in customers.iter().filter(|c| !c.is_deleted()) {
            match customer.status {
                CustomerStatus::Active => out.active += 1,
                CustomerStatus::Passive => out.passive += 1,
                CustomerStatus::Cancelled => out.cancelled += 1,
            }
        }
        out
    }

    pub fn total(&self) -> usize {
        self.active + self.passive + self.cancelled
    }
}

/// Customer overview list with client-side search and status filter.
#[derive(Debug)]
pub struct CustomerList {
    services: Services,
    scope: Scope,
    customers: Vec<Customer>,
    search: String,
    status: Option<CustomerStatus>,
    loading: bool,
    error: Option<String>,
}

impl CustomerList {
    pub fn new(services: Services) -> Self {
        Self {
            services,
            scope: Scope::new(),
            customers: Vec::new(),
            search: String::new(),
            status: None,
            loading: false,
            error: None,
        }
    }

    pub fn scope(&self) -> Scope {
        self.scope.clone()
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn customers(&self) -> &[Customer] {
        &self.customers
    }

    pub fn set_search(&mut self, query: impl Into<String>) {
        self.search = query.into();
    }

    pub fn set_status_filter(&mut self, status: Option<CustomerStatus>) {
        self.status = status;
    }

    /// Non-deleted customers matching the search (company name or sector)
    /// and the status filter, sorted by company name.
    pub fn visible(&self) -> Vec<&Customer> {
        let needle = self.search.trim().to_lowercase();
        let mut out: Vec<&Customer> = self
            .customers
            .iter()
            .filter(|c| !c.is_deleted())
            .filter(|c| self.status.map_or(true, |s| c.status == s))
            .filter(|c| {
                needle.is_empty()
                    || c.company_name.to_lowercase().contains(&needle)
                    || c
                        .sector
                        .as_deref()
                        .is_some_and(|s| s.to_lowercase().contains(&needle))
            })
            .collect();
        out.sort_by_key(|c| c.company_name.to_lowercase());
        out
    }

    pub fn breakdown(&self) -> StatusBreakdown {
        StatusBreakdown::of(&self.customers)
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
        self.loading = true;
        let api = self.services.api.clone();
        let result = self.scope.run(api.list_customers()).await;
        self.loading = false;
        match result {
            Ok(customers) => {
                self.customers = customers;
                self.error = None;
                Ok(())
            }
            Err(ApiError::Cancelled) => Err(ApiError::Cancelled),
            Err(err) => {
                self.error = Some(err.to_string());
                self.services
                    .notifier
                    .error(format!("Could not load customers: {}", err));
                Err(err)
            }
        }
    }

    pub async fn create(&mut self, customer: NewCustomer) -> ApiResult<Customer> {
        if customer.company_name.trim().is_empty() {
            return Err(ApiError::InvalidInput("company name is required".to_string()));
        }
        let api = self.services.api.clone();
        let created = self.scope.run(api.create_customer(&customer)).await;
        match created {
            Ok(created) => {
                self.services
                    .notifier
                    .success(format!("Created {}", created.company_name));
                self.reload_after_change().await;
                Ok(created)
            }
            Err(err) => {
                if !err.is_cancelled() {
                    self.services
                        .notifier
                        .error(format!("Could not create customer: {}", err));
                }
                Err(err)
            }
        }
    }

    #[instrument(skip(self))]
    pub async fn change_status(&mut self, id: CustomerId, status: CustomerStatus) -> ApiResult<()> {
        let api = self.services.api.clone();
        match self.scope.run(api.update_customer_status(id, status)).await {
            Ok(()) => {
                self.services
                    .notifier
                    .success(format!("Customer #{} is now {}", id, status));
                self.reload_after_change().await;
                Ok(())
            }
            Err(err) => {
                if !err.is_cancelled() {
                    self.services
                        .notifier
                        .error(format!("Could not change status: {}", err));
                }
                Err(err)
            }
        }
    }

    /// Move a customer to the recycle bin. Returns false when declined.
    #[instrument(skip(self))]
    pub async fn soft_delete(&mut self, id: CustomerId) -> ApiResult<bool> {
        let name = self
            .customers
            .iter()
            .find(|c| c.id == id)
            .map(|c| c.company_name.clone())
            .unwrap_or_else(|| format!("customer #{}", id));
        let request = ConfirmRequest::danger(
            "Move to recycle bin",
            format!("Move {} to the recycle bin? It can be restored later.", name),
        );
        if !self.services.confirmer.confirm(&request).await {
            return Ok(false);
        }
        let api = self.services.api.clone();
        match self.scope.run(api.soft_delete_customer(id)).await {
            Ok(()) => {
                self.services
                    .notifier
                    .success(format!("{} moved to the recycle bin", name));
                self.reload_after_change().await;
                Ok(true)
            }
            Err(err) => {
                if !err.is_cancelled() {
                    self.services
                        .notifier
                        .error(format!("Could not delete {}: {}", name, err));
                }
                Err(err)
            }
        }
    }
}
