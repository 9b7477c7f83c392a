#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

use smm_console::api::model::{Download, SectionUpdate, UploadFile};
use smm_console::api::{ConsoleApi, TaskBoardKind};
use smm_console::errors::{ApiError, ApiResult};
use smm_console::model::*;
use smm_console::notify::{FixedConfirmer, Notifier};
use smm_console::services::Services;

/// In-memory backend that records every call.
#[derive(Clone, Default)]
pub struct RecordingApi {
    pub customers: Arc<Mutex<BTreeMap<CustomerId, Customer>>>,
    pub media: Arc<Mutex<BTreeMap<CustomerId, Vec<Media>>>>,
    pub tasks: Arc<Mutex<Vec<(TaskBoardKind, CustomerId, Task)>>>,
    pub notes: Arc<Mutex<Vec<Note>>>,
    pub activities: Arc<Mutex<Vec<Activity>>>,
    pub calls: Arc<Mutex<Vec<String>>>,
    /// Media ids whose DELETE fails.
    pub failing_deletes: Arc<Mutex<HashSet<MediaId>>>,
    /// Endpoint names that fail with a 500.
    pub failing_endpoints: Arc<Mutex<HashSet<&'static str>>>,
    pub media_delay: Arc<Mutex<Option<Duration>>>,
    next_id: Arc<Mutex<i64>>,
}

impl RecordingApi {
    pub fn new() -> Self {
        Self {
            next_id: Arc::new(Mutex::new(1000)),
            ..Default::default()
        }
    }

    pub async fn calls(&self) -> Vec<String> {
        self.calls.lock().await.clone()
    }

    pub async fn fail_endpoint(&self, name: &'static str) {
        self.failing_endpoints.lock().await.insert(name);
    }

    pub async fn fail_delete(&self, id: MediaId) {
        self.failing_deletes.lock().await.insert(id);
    }

    pub async fn insert_customer(&self, customer: Customer) {
        self.customers.lock().await.insert(customer.id, customer);
    }

    pub async fn insert_media(&self, customer_id: CustomerId, items: Vec<Media>) {
        self.media
            .lock()
            .await
            .entry(customer_id)
            .or_default()
            .extend(items);
    }

    async fn record(&self, call: String, endpoint: &'static str) -> ApiResult<()> {
        self.calls.lock().await.push(call);
        if self.failing_endpoints.lock().await.contains(endpoint) {
            return Err(ApiError::Status(
                reqwest::StatusCode::INTERNAL_SERVER_ERROR,
                format!("{} is down", endpoint),
            ));
        }
        Ok(())
    }

    async fn next_id(&self) -> i64 {
        let mut guard = self.next_id.lock().await;
        *guard += 1;
        *guard
    }
}

pub fn services(api: RecordingApi) -> (Services, Notifier) {
    let notifier = Notifier::new();
    let services = Services::new(Arc::new(api), notifier.clone(), Arc::new(FixedConfirmer(true)));
    (services, notifier)
}

pub fn customer(id: CustomerId, name: &str, status: CustomerStatus) -> Customer {
    Customer {
        id,
        company_name: name.to_string(),
        sector: Some("Retail".to_string()),
        address: None,
        status,
        membership_package: Some("GOLD".to_string()),
        contacts: vec![Contact {
            name: "Ada".into(),
            surname: "Lovelace".into(),
            email: Some("ada@example.com".into()),
            phone: None,
            priority: 1,
        }],
        social_media: SocialMedia {
            instagram: Some(format!("@{}", name.to_lowercase())),
            ..Default::default()
        },
        target_audience: TargetAudience::default(),
        seo: Seo::default(),
        api_keys: ApiKeys::default(),
        media: Vec::new(),
        created_at: Some(Utc.with_ymd_and_hms(2024, 1, 1, 9, 0, 0).unwrap()),
        updated_at: None,
        deleted_at: None,
    }
}

pub fn media(id: MediaId, kind: MediaType, name: &str, size: u64, day: u32) -> Media {
    Media {
        id,
        media_type: kind,
        original_file_name: name.to_string(),
        file_size: size,
        full_url: Some(format!("https://cdn.example.com/{}", name)),
        uploaded_at: Utc.with_ymd_and_hms(2024, 6, day, 8, 30, 0).unwrap(),
    }
}

pub fn activity(id: i64, customer_id: Option<CustomerId>, day: u32) -> Activity {
    Activity {
        id,
        customer_id,
        activity_type: "MEDIA_UPLOADED".into(),
        message: format!("activity {}", id),
        icon: None,
        timestamp: Utc.with_ymd_and_hms(2024, 6, day, 12, 0, 0).unwrap(),
    }
}

fn not_found(what: &str) -> ApiError {
    ApiError::Status(reqwest::StatusCode::NOT_FOUND, format!("{} not found", what))
}

#[async_trait]
impl ConsoleApi for RecordingApi {
    async fn list_customers(&self) -> ApiResult<Vec<Customer>> {
        self.record("list_customers".into(), "list_customers").await?;
        Ok(self
            .customers
            .lock()
            .await
            .values()
            .filter(|c| c.deleted_at.is_none())
            .cloned()
            .collect())
    }

    async fn list_deleted_customers(&self) -> ApiResult<Vec<Customer>> {
        self.record("list_deleted_customers".into(), "list_deleted_customers")
            .await?;
        Ok(self
            .customers
            .lock()
            .await
            .values()
            .filter(|c| c.deleted_at.is_some())
            .cloned()
            .collect())
    }

    async fn get_customer(&self, id: CustomerId) -> ApiResult<Customer> {
        self.record(format!("get_customer {}", id), "get_customer").await?;
        let mut customer = self
            .customers
            .lock()
            .await
            .get(&id)
            .cloned()
            .ok_or_else(|| not_found("customer"))?;
        customer.media = self
            .media
            .lock()
            .await
            .get(&id)
            .cloned()
            .unwrap_or_default();
        Ok(customer)
    }

    async fn create_customer(&self, new: &NewCustomer) -> ApiResult<Customer> {
        self.record("create_customer".into(), "create_customer").await?;
        let id = self.next_id().await;
        let mut created = customer(id, &new.company_name, new.status);
        created.sector = new.sector.clone();
        created.contacts = new.contacts.clone();
        self.customers.lock().await.insert(id, created.clone());
        Ok(created)
    }

    async fn update_customer_status(
        &self,
        id: CustomerId,
        status: CustomerStatus,
    ) -> ApiResult<()> {
        self.record(format!("update_status {} {}", id, status), "update_status")
            .await?;
        let mut guard = self.customers.lock().await;
        let c = guard.get_mut(&id).ok_or_else(|| not_found("customer"))?;
        c.status = status;
        Ok(())
    }

    async fn update_section(&self, id: CustomerId, update: &SectionUpdate) -> ApiResult<()> {
        self.record(format!("update_section {} {}", id, update.section()), "update_section")
            .await?;
        let mut guard = self.customers.lock().await;
        let c = guard.get_mut(&id).ok_or_else(|| not_found("customer"))?;
        match update.clone() {
            SectionUpdate::BasicInfo(info) => {
                c.company_name = info.company_name;
                c.sector = info.sector;
                c.address = info.address;
                c.status = info.status;
                c.membership_package = info.membership_package;
            }
            SectionUpdate::Contacts(contacts) => c.contacts = contacts,
            SectionUpdate::SocialMedia(social) => c.social_media = social,
            SectionUpdate::TargetAudience(audience) => c.target_audience = audience,
            SectionUpdate::Seo(seo) => c.seo = seo,
            SectionUpdate::ApiKeys(keys) => c.api_keys = keys,
        }
        Ok(())
    }

    async fn soft_delete_customer(&self, id: CustomerId) -> ApiResult<()> {
        self.record(format!("soft_delete {}", id), "soft_delete").await?;
        let mut guard = self.customers.lock().await;
        let c = guard.get_mut(&id).ok_or_else(|| not_found("customer"))?;
        c.deleted_at = Some(Utc::now());
        Ok(())
    }

    async fn restore_customer(&self, id: CustomerId) -> ApiResult<()> {
        self.record(format!("restore {}", id), "restore").await?;
        let mut guard = self.customers.lock().await;
        let c = guard.get_mut(&id).ok_or_else(|| not_found("customer"))?;
        c.deleted_at = None;
        Ok(())
    }

    async fn hard_delete_customer(&self, id: CustomerId) -> ApiResult<()> {
        self.record(format!("hard_delete {}", id), "hard_delete").await?;
        self.customers
            .lock()
            .await
            .remove(&id)
            .ok_or_else(|| not_found("customer"))?;
        self.media.lock().await.remove(&id);
        Ok(())
    }

    async fn list_media(&self, customer_id: CustomerId) -> ApiResult<Vec<Media>> {
        self.record(format!("list_media {}", customer_id), "list_media")
            .await?;
        let delay = *self.media_delay.lock().await;
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        Ok(self
            .media
            .lock()
            .await
            .get(&customer_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn upload_media(&self, customer_id: CustomerId, file: &UploadFile) -> ApiResult<Media> {
        self.record(format!("upload_media {}", customer_id), "upload_media")
            .await?;
        let id = self.next_id().await;
        let name = file
            .path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("upload")
            .to_string();
        let item = Media {
            id,
            media_type: file.media_type,
            original_file_name: name,
            file_size: 1,
            full_url: None,
            uploaded_at: Utc::now(),
        };
        self.insert_media(customer_id, vec![item.clone()]).await;
        Ok(item)
    }

    async fn upload_media_batch(
        &self,
        customer_id: CustomerId,
        files: &[UploadFile],
    ) -> ApiResult<Vec<Media>> {
        self.record(
            format!("upload_media_batch {} {}", customer_id, files.len()),
            "upload_media_batch",
        )
        .await?;
        let mut out = Vec::new();
        for file in files {
            let id = self.next_id().await;
            out.push(Media {
                id,
                media_type: file.media_type,
                original_file_name: file.path.display().to_string(),
                file_size: 1,
                full_url: None,
                uploaded_at: Utc::now(),
            });
        }
        self.insert_media(customer_id, out.clone()).await;
        Ok(out)
    }

    async fn delete_media(&self, customer_id: CustomerId, media_id: MediaId) -> ApiResult<()> {
        self.record(format!("delete_media {}", media_id), "delete_media")
            .await?;
        if self.failing_deletes.lock().await.contains(&media_id) {
            return Err(ApiError::Status(
                reqwest::StatusCode::CONFLICT,
                format!("media {} is in use", media_id),
            ));
        }
        let mut guard = self.media.lock().await;
        let items = guard.entry(customer_id).or_default();
        let before = items.len();
        items.retain(|m| m.id != media_id);
        if items.len() == before {
            return Err(not_found("media"));
        }
        Ok(())
    }

    async fn download_media_zip(
        &self,
        customer_id: CustomerId,
        media_ids: &[MediaId],
    ) -> ApiResult<Download> {
        self.record(
            format!("download_zip {} {:?}", customer_id, media_ids),
            "download_zip",
        )
        .await?;
        let mut bytes = b"PK\x03\x04".to_vec();
        bytes.extend(format!("{:?}", media_ids).into_bytes());
        Ok(Download {
            file_name: Some(format!("customer-{}.zip", customer_id)),
            bytes,
        })
    }

    async fn dashboard_stats(&self) -> ApiResult<DashboardStats> {
        self.record("dashboard_stats".into(), "dashboard_stats").await?;
        let customers = self.customers.lock().await;
        Ok(DashboardStats {
            total_customers: customers.len() as u64,
            active_customers: customers
                .values()
                .filter(|c| c.status == CustomerStatus::Active)
                .count() as u64,
            ..Default::default()
        })
    }

    async fn platform_breakdown(&self) -> ApiResult<Vec<PlatformCount>> {
        self.record("platform_breakdown".into(), "platform_breakdown")
            .await?;
        Ok(vec![
            PlatformCount {
                platform: "facebook".into(),
                count: 2,
            },
            PlatformCount {
                platform: "instagram".into(),
                count: 5,
            },
        ])
    }

    async fn recent_activities(&self, limit: u32) -> ApiResult<Vec<Activity>> {
        self.record(format!("recent_activities {}", limit), "recent_activities")
            .await?;
        Ok(self.activities.lock().await.clone())
    }

    async fn customer_activities(&self, customer_id: CustomerId) -> ApiResult<Vec<Activity>> {
        self.record(
            format!("customer_activities {}", customer_id),
            "customer_activities",
        )
        .await?;
        Ok(self
            .activities
            .lock()
            .await
            .iter()
            .filter(|a| a.customer_id == Some(customer_id))
            .cloned()
            .collect())
    }

    async fn list_tasks(
        &self,
        board: TaskBoardKind,
        customer_id: CustomerId,
    ) -> ApiResult<Vec<Task>> {
        self.record(format!("list_tasks {} {}", board, customer_id), "list_tasks")
            .await?;
        Ok(self
            .tasks
            .lock()
            .await
            .iter()
            .filter(|(b, c, _)| *b == board && *c == customer_id)
            .map(|(_, _, t)| t.clone())
            .collect())
    }

    async fn create_task(
        &self,
        board: TaskBoardKind,
        customer_id: CustomerId,
        task: &NewTask,
    ) -> ApiResult<Task> {
        self.record(format!("create_task {}", board), "create_task").await?;
        let created = Task {
            id: self.next_id().await,
            task_name: task.task_name.clone(),
            task_type: task.task_type.clone(),
            status: TaskStatus::NotStarted,
            progress_current: 0,
            progress_total: task.progress_total,
            notes: task.notes.clone(),
            started_at: None,
            completed_at: None,
        };
        self.tasks
            .lock()
            .await
            .push((board, customer_id, created.clone()));
        Ok(created)
    }

    async fn update_task_status(
        &self,
        board: TaskBoardKind,
        task_id: TaskId,
        status: TaskStatus,
    ) -> ApiResult<()> {
        self.record(
            format!("update_task_status {} {} {}", board, task_id, status),
            "update_task_status",
        )
        .await?;
        let mut guard = self.tasks.lock().await;
        let (_, _, task) = guard
            .iter_mut()
            .find(|(b, _, t)| *b == board && t.id == task_id)
            .ok_or_else(|| not_found("task"))?;
        task.status = status;
        if status == TaskStatus::Completed {
            task.completed_at = Some(Utc::now());
            task.progress_current = task.progress_total;
        }
        Ok(())
    }

    async fn delete_task(&self, board: TaskBoardKind, task_id: TaskId) -> ApiResult<()> {
        self.record(format!("delete_task {} {}", board, task_id), "delete_task")
            .await?;
        self.tasks
            .lock()
            .await
            .retain(|(b, _, t)| !(*b == board && t.id == task_id));
        Ok(())
    }

    async fn list_notes(&self, customer_id: CustomerId) -> ApiResult<Vec<Note>> {
        self.record(format!("list_notes {}", customer_id), "list_notes")
            .await?;
        Ok(self
            .notes
            .lock()
            .await
            .iter()
            .filter(|n| n.customer_id == customer_id)
            .cloned()
            .collect())
    }

    async fn create_note(&self, customer_id: CustomerId, note: &str) -> ApiResult<Note> {
        self.record(format!("create_note {}", customer_id), "create_note")
            .await?;
        let created = Note {
            id: self.next_id().await,
            customer_id,
            note: note.to_string(),
            created_by: Some("admin".into()),
            created_at: Utc::now(),
        };
        self.notes.lock().await.push(created.clone());
        Ok(created)
    }

    async fn delete_note(&self, note_id: NoteId) -> ApiResult<()> {
        self.record(format!("delete_note {}", note_id), "delete_note")
            .await?;
        self.notes.lock().await.retain(|n| n.id != note_id);
        Ok(())
    }
}
