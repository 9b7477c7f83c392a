//! Media gallery for the selected customer: list, filter, select, upload,
//! delete and download.
use std::path::{Path, PathBuf};
use tracing::{info, instrument, warn};

use crate::api::model::UploadFile;
use crate::bulk::{self, BatchReport};
use crate::errors::{ApiError, ApiResult};
use crate::media::{MediaFilters, MediaSelection, MediaTab, MediaView, SortBy, TabCounts};
use crate::model::{CustomerId, Media, MediaId};
use crate::notify::ConfirmRequest;
use crate::scope::Scope;
use crate::services::Services;

#[derive(Debug)]
pub struct MediaGallery {
    services: Services,
    scope: Scope,
    bulk_concurrency: usize,
    customer_id: Option<CustomerId>,
    view: MediaView,
    selection: MediaSelection,
    loading: bool,
    error: Option<String>,
}

impl MediaGallery {
    pub fn new(services: Services, bulk_concurrency: usize) -> Self {
        Self {
            services,
            scope: Scope::new(),
            bulk_concurrency,
            customer_id: None,
            view: MediaView::default(),
            selection: MediaSelection::new(),
            loading: false,
            error: None,
        }
    }

    /// Handle for cancelling this gallery's in-flight requests.
    pub fn scope(&self) -> Scope {
        self.scope.clone()
    }

    pub fn customer_id(&self) -> Option<CustomerId> {
        self.customer_id
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn all_media(&self) -> &[Media] {
        self.view.all()
    }

    pub fn filters(&self) -> &MediaFilters {
        self.view.filters()
    }

    pub fn filtered(&mut self) -> &[Media] {
        self.view.filtered()
    }

    pub fn tab_counts(&self) -> TabCounts {
        self.view.tab_counts()
    }

    pub fn selection(&self) -> &MediaSelection {
        &self.selection
    }

    pub fn set_tab(&mut self, tab: MediaTab) {
        self.view.set_tab(tab);
    }

    pub fn set_search(&mut self, query: impl Into<String>) {
        self.view.set_search(query);
    }

    pub fn set_sort(&mut self, sort: SortBy) {
        self.view.set_sort(sort);
    }

    pub fn set_filters(&mut self, filters: MediaFilters) {
        self.view.set_filters(filters);
    }

    pub fn toggle(&mut self, id: MediaId) {
        self.selection.toggle(id);
    }

    /// Operates on the filtered view only.
    pub fn toggle_select_all(&mut self) {
        let visible = self.view.filtered();
        self.selection.toggle_select_all(visible);
    }

    pub fn is_all_selected(&mut self) -> bool {
        let visible = self.view.filtered();
        self.selection.is_all_selected(visible)
    }

    pub fn clear_selection(&mut self) {
        self.selection.clear();
    }

    fn require_customer(&self) -> ApiResult<CustomerId> {
        self.customer_id
            .ok_or_else(|| ApiError::InvalidInput("no customer selected".to_string()))
    }

    /// Switch to `customer_id` and fetch its media. Selection and filters are
    /// reset when the customer changes.
    #[instrument(skip(self))]
    pub async fn load(&mut self, customer_id: CustomerId) -> ApiResult<()> {
        if self.customer_id != Some(customer_id) {
            self.customer_id = Some(customer_id);
            self.selection.clear();
            self.view = MediaView::default();
        }
        self.refresh().await
    }

    /// Refetch after a change the backend already applied. A failed refetch
    /// is recorded and notified by `refresh` and does not undo the change.
    async fn refresh_after_change(&mut self) {
        if let Err(err) = self.refresh().await {
            warn!(error = %err, "refetch after change failed");
        }
    }

    /// Re-fetch the current customer's media.
    pub async fn refresh(&mut self) -> ApiResult<()> {
        let customer_id = self.require_customer()?;
        self.loading = true;
        let api = self.services.api.clone();
        let result = self.scope.run(api.list_media(customer_id)).await;
        self.loading = false;
        match result {
            Ok(media) => {
                self.selection.retain_existing(&media);
                self.view.set_media(media);
                self.error = None;
                Ok(())
            }
            Err(ApiError::Cancelled) => Err(ApiError::Cancelled),
            Err(err) => {
                self.error = Some(err.to_string());
                self.services
                    .notifier
                    .error(format!("Could not load media: {}", err));
                Err(err)
            }
        }
    }

    /// Upload one file, or several in one batch request.
    #[instrument(skip(self, files), fields(count = files.len()))]
    pub async fn upload(&mut self, files: &[UploadFile]) -> ApiResult<Vec<Media>> {
        let customer_id = self.require_customer()?;
        let api = self.services.api.clone();
        let result = match files {
            [] => return Err(ApiError::InvalidInput("no files given".to_string())),
            [single] => self
                .scope
                .run(async { api.upload_media(customer_id, single).await.map(|m| vec![m]) })
                .await,
            many => self.scope.run(api.upload_media_batch(customer_id, many)).await,
        };
        match result {
            Ok(uploaded) => {
                self.services
                    .notifier
                    .success(format!("Uploaded {} file(s)", uploaded.len()));
                self.refresh_after_change().await;
                Ok(uploaded)
            }
            Err(err) => {
                if !err.is_cancelled() {
                    self.services
                        .notifier
                        .error(format!("Upload failed: {}", err));
                }
                Err(err)
            }
        }
    }

    /// Delete a single item after confirmation. Returns false when the user
    /// declined.
    pub async fn delete_one(&mut self, media_id: MediaId) -> ApiResult<bool> {
        let customer_id = self.require_customer()?;
        let name = self
            .view
            .all()
            .iter()
            .find(|m| m.id == media_id)
            .map(|m| m.original_file_name.clone())
            .unwrap_or_else(|| format!("#{}", media_id));
        let request = ConfirmRequest::danger("Delete file", format!("Delete {}?", name));
        if !self.services.confirmer.confirm(&request).await {
            return Ok(false);
        }
        let api = self.services.api.clone();
        match self.scope.run(api.delete_media(customer_id, media_id)).await {
            Ok(()) => {
                self.selection.deselect(media_id);
                self.services.notifier.success(format!("Deleted {}", name));
                self.refresh_after_change().await;
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

    /// Delete every selected item. Items that fail stay selected; the report
    /// lists them. Returns `None` when the user declined.
    #[instrument(skip(self))]
    pub async fn delete_selected(&mut self) -> ApiResult<Option<BatchReport<MediaId>>> {
        let customer_id = self.require_customer()?;
        let ids = self.selection.ids();
        if ids.is_empty() {
            return Err(ApiError::InvalidInput("nothing selected".to_string()));
        }
        let request = ConfirmRequest::danger(
            "Delete files",
            format!("Delete {} selected file(s)?", ids.len()),
        );
        if !self.services.confirmer.confirm(&request).await {
            return Ok(None);
        }

        let api = self.services.api.clone();
        let concurrency = self.bulk_concurrency;
        let report = self
            .scope
            .run(async {
                Ok::<_, ApiError>(
                    bulk::delete_media(api.as_ref(), customer_id, &ids, concurrency).await,
                )
            })
            .await?;

        self.selection.remove_all(&report.succeeded);
        if report.is_complete_success() {
            self.services
                .notifier
                .success(format!("Deleted {} file(s)", report.succeeded.len()));
        } else {
            let failed: Vec<String> = report.failed_ids().iter().map(|id| id.to_string()).collect();
            self.services.notifier.warning(format!(
                "Deleted {} of {} file(s); failed: {}",
                report.succeeded.len(),
                report.total(),
                failed.join(", ")
            ));
        }
        info!(
            customer_id,
            deleted = report.succeeded.len(),
            failed = report.failed.len(),
            "selection deleted"
        );
        self.refresh_after_change().await;
        Ok(Some(report))
    }

    /// Download the selection as one ZIP into `dir`.
    pub async fn download_selected(&mut self, dir: &Path) -> ApiResult<PathBuf> {
        let customer_id = self.require_customer()?;
        let ids = self.selection.ids();
        let api = self.services.api.clone();
        let result = self
            .scope
            .run(bulk::download_zip(api.as_ref(), customer_id, &ids, dir))
            .await;
        match &result {
            Ok(path) => {
                self.services
                    .notifier
                    .success(format!("Saved {}", path.display()));
            }
            Err(err) if !err.is_cancelled() => {
                self.services
                    .notifier
                    .error(format!("Download failed: {}", err));
            }
            Err(_) => {}
        }
        result
    }
}
