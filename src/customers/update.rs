//! Section-by-section editing of one customer.
//!
//! Each save sends the complete section payload to its own endpoint and then
//! re-fetches the whole customer. Nothing is merged locally.
use std::collections::BTreeSet;
use tracing::{info, instrument};

use crate::api::model::{Section, SectionUpdate};
use crate::errors::{ApiError, ApiResult};
use crate::model::{BasicInfo, Customer, CustomerId};
use crate::scope::Scope;
use crate::services::Services;

#[derive(Debug)]
pub struct CustomerUpdate {
    services: Services,
    scope: Scope,
    customer_id: CustomerId,
    customer: Option<Customer>,
    loading: bool,
    saving: BTreeSet<Section>,
    error: Option<String>,
}

impl CustomerUpdate {
    pub fn new(services: Services, customer_id: CustomerId) -> Self {
        Self {
            services,
            scope: Scope::new(),
            customer_id,
            customer: None,
            loading: false,
            saving: BTreeSet::new(),
            error: None,
        }
    }

    pub fn scope(&self) -> Scope {
        self.scope.clone()
    }

    pub fn customer(&self) -> Option<&Customer> {
        self.customer.as_ref()
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn is_saving(&self, section: Section) -> bool {
        self.saving.contains(&section)
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    #[instrument(skip(self), fields(customer_id = self.customer_id))]
    pub async fn load(&mut self) -> ApiResult<&Customer> {
        self.loading = true;
        let api = self.services.api.clone();
        let result = self.scope.run(api.get_customer(self.customer_id)).await;
        self.loading = false;
        match result {
            Ok(customer) => {
                self.error = None;
                Ok(&*self.customer.insert(customer))
            }
            Err(err) => {
                if !err.is_cancelled() {
                    self.error = Some(err.to_string());
                }
                Err(err)
            }
        }
    }

    /// The cached values of `section`, ready to be edited and saved.
    pub fn draft(&self, section: Section) -> ApiResult<SectionUpdate> {
        let c = self
            .customer
            .as_ref()
            .ok_or_else(|| ApiError::InvalidInput("customer not loaded".to_string()))?;
        Ok(match section {
            Section::BasicInfo => SectionUpdate::BasicInfo(BasicInfo::from(c)),
            Section::Contacts => SectionUpdate::Contacts(c.contacts.clone()),
            Section::SocialMedia => SectionUpdate::SocialMedia(c.social_media.clone()),
            Section::TargetAudience => SectionUpdate::TargetAudience(c.target_audience.clone()),
            Section::Seo => SectionUpdate::Seo(c.seo.clone()),
            Section::ApiKeys => SectionUpdate::ApiKeys(c.api_keys.clone()),
        })
    }

    /// Save one section, then reload the full customer. On failure the cached
    /// customer is left as it was.
    #[instrument(skip(self, update), fields(customer_id = self.customer_id, section = %update.section()))]
    pub async fn save(&mut self, update: SectionUpdate) -> ApiResult<&Customer> {
        let section = update.section();
        if let SectionUpdate::BasicInfo(info) = &update {
            if info.company_name.trim().is_empty() {
                return Err(ApiError::InvalidInput("company name is required".to_string()));
            }
        }

        self.saving.insert(section);
        let api = self.services.api.clone();
        let result = self
            .scope
            .run(api.update_section(self.customer_id, &update))
            .await;
        self.saving.remove(&section);

        if let Err(err) = result {
            if !err.is_cancelled() {
                self.error = Some(err.to_string());
                self.services
                    .notifier
                    .error(format!("Could not save {}: {}", section, err));
            }
            return Err(err);
        }
        info!("section saved");
        self.services.notifier.success(format!("Saved {}", section));
        self.load().await
    }
}
