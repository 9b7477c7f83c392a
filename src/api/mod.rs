use async_trait::async_trait;
use reqwest::header::{HeaderMap, CONTENT_DISPOSITION};
use reqwest::{Client, Method, RequestBuilder, Url};
use serde::Serialize;
use std::fmt;
use std::path::Path;
use std::time::Duration;
use tokio::fs;
use tracing::{debug, info, instrument, warn};

use crate::config::Config;
use crate::errors::{ApiError, ApiResult};
use crate::model::{
    Activity, Customer, CustomerId, CustomerStatus, DashboardStats, Media, MediaId, NewCustomer,
    NewTask, Note, NoteId, PlatformCount, Task, TaskId, TaskStatus,
};

pub mod model;

use model::{
    content_disposition_filename, decode_envelope, decode_envelope_list, decode_envelope_unit,
    decode_json, decode_list, error_message, CustomerStatusRequest, Download, MediaIdsRequest,
    NoteRequest, SectionUpdate, TaskStatusRequest, UploadFile,
};

/// Which task board a task belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaskBoardKind {
    Onboarding,
    AiContent,
}

impl TaskBoardKind {
    pub fn path(&self) -> &'static str {
        match self {
            TaskBoardKind::Onboarding => "onboarding-tasks",
            TaskBoardKind::AiContent => "ai-tasks",
        }
    }
}

impl fmt::Display for TaskBoardKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TaskBoardKind::Onboarding => f.write_str("onboarding"),
            TaskBoardKind::AiContent => f.write_str("ai-content"),
        }
    }
}

impl std::str::FromStr for TaskBoardKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "onboarding" => Ok(TaskBoardKind::Onboarding),
            "ai" | "ai-content" | "ai_content" => Ok(TaskBoardKind::AiContent),
            other => Err(format!("unknown task board '{}'", other)),
        }
    }
}

/// Every backend endpoint the console consumes.
#[async_trait]
pub trait ConsoleApi: Send + Sync {
    async fn list_customers(&self) -> ApiResult<Vec<Customer>>;
    async fn list_deleted_customers(&self) -> ApiResult<Vec<Customer>>;
    async fn get_customer(&self, id: CustomerId) -> ApiResult<Customer>;
    async fn create_customer(&self, customer: &NewCustomer) -> ApiResult<Customer>;
    async fn update_customer_status(&self, id: CustomerId, status: CustomerStatus)
        -> ApiResult<()>;
    async fn update_section(&self, id: CustomerId, update: &SectionUpdate) -> ApiResult<()>;
    async fn soft_delete_customer(&self, id: CustomerId) -> ApiResult<()>;
    async fn restore_customer(&self, id: CustomerId) -> ApiResult<()>;
    async fn hard_delete_customer(&self, id: CustomerId) -> ApiResult<()>;

    async fn list_media(&self, customer_id: CustomerId) -> ApiResult<Vec<Media>>;
    async fn upload_media(&self, customer_id: CustomerId, file: &UploadFile) -> ApiResult<Media>;
    async fn upload_media_batch(
        &self,
        customer_id: CustomerId,
        files: &[UploadFile],
    ) -> ApiResult<Vec<Media>>;
    async fn delete_media(&self, customer_id: CustomerId, media_id: MediaId) -> ApiResult<()>;
    async fn download_media_zip(
        &self,
        customer_id: CustomerId,
        media_ids: &[MediaId],
    ) -> ApiResult<Download>;

    async fn dashboard_stats(&self) -> ApiResult<DashboardStats>;
    async fn platform_breakdown(&self) -> ApiResult<Vec<PlatformCount>>;
    async fn recent_activities(&self, limit: u32) -> ApiResult<Vec<Activity>>;
    async fn customer_activities(&self, customer_id: CustomerId) -> ApiResult<Vec<Activity>>;

    async fn list_tasks(&self, board: TaskBoardKind, customer_id: CustomerId)
        -> ApiResult<Vec<Task>>;
    async fn create_task(
        &self,
        board: TaskBoardKind,
        customer_id: CustomerId,
        task: &NewTask,
    ) -> ApiResult<Task>;
    async fn update_task_status(
        &self,
        board: TaskBoardKind,
        task_id: TaskId,
        status: TaskStatus,
    ) -> ApiResult<()>;
    async fn delete_task(&self, board: TaskBoardKind, task_id: TaskId) -> ApiResult<()>;

    async fn list_notes(&self, customer_id: CustomerId) -> ApiResult<Vec<Note>>;
    async fn create_note(&self, customer_id: CustomerId, note: &str) -> ApiResult<Note>;
    async fn delete_note(&self, note_id: NoteId) -> ApiResult<()>;
}

/// `reqwest`-backed implementation of [`ConsoleApi`].
#[derive(Clone)]
pub struct ApiClient {
    http: Client,
    base_url: Url,
    analytics_url: Url,
    token: Option<String>,
}

impl fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiClient")
            .field("base_url", &self.base_url)
            .field("analytics_url", &self.analytics_url)
            .finish_non_exhaustive()
    }
}

/// Which backend service an endpoint lives on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Service {
    Customers,
    Analytics,
}

impl ApiClient {
    pub fn new(
        base_url: Url,
        analytics_url: Url,
        token: Option<String>,
        timeout: Duration,
    ) -> ApiResult<Self> {
        let http = Client::builder()
            .user_agent(concat!("smm-console/", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .build()?;
        Ok(Self {
            http,
            base_url: with_trailing_slash(base_url),
            analytics_url: with_trailing_slash(analytics_url),
            token,
        })
    }

    pub fn from_config(cfg: &Config) -> ApiResult<Self> {
        let parse = |raw: &str| {
            Url::parse(raw).map_err(|e| ApiError::InvalidInput(format!("invalid URL {}: {}", raw, e)))
        };
        Self::new(
            parse(&cfg.api.base_url)?,
            parse(&cfg.api.analytics_base_url)?,
            cfg.api.token.clone(),
            cfg.timeout(),
        )
    }

    pub fn endpoint(&self, service: Service, path: &str) -> ApiResult<Url> {
        let base = match service {
            Service::Customers => &self.base_url,
            Service::Analytics => &self.analytics_url,
        };
        base.join(path.trim_start_matches('/'))
            .map_err(|e| ApiError::InvalidInput(format!("invalid endpoint {}: {}", path, e)))
    }

    fn request(&self, method: Method, url: Url) -> RequestBuilder {
        let builder = self.http.request(method, url);
        match &self.token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    /// Build a JSON request without sending it.
    pub fn build_json_request<B: Serialize + ?Sized>(
        &self,
        method: Method,
        service: Service,
        path: &str,
        body: Option<&B>,
    ) -> ApiResult<reqwest::Request> {
        let url = self.endpoint(service, path)?;
        let mut builder = self.request(method, url);
        if let Some(body) = body {
            builder = builder.json(body);
        }
        Ok(builder.build()?)
    }

    /// Send a request and return the raw body of a success response.
    async fn execute(&self, request: reqwest::Request) -> ApiResult<(HeaderMap, Vec<u8>)> {
        let method = request.method().clone();
        let url = request.url().clone();
        debug!(%method, %url, "sending request");

        let res = self.http.execute(request).await?;
        let status = res.status();
        if !status.is_success() {
            let body = res.text().await.unwrap_or_default();
            let message = error_message(status, &body);
            warn!(%method, %url, %status, %message, "backend returned an error");
            return Err(ApiError::Status(status, message));
        }
        let headers = res.headers().clone();
        let bytes = res.bytes().await?;
        debug!(%method, %url, %status, len = bytes.len(), "response received");
        Ok((headers, bytes.to_vec()))
    }

    async fn send<B: Serialize + ?Sized>(
        &self,
        method: Method,
        service: Service,
        path: &str,
        body: Option<&B>,
    ) -> ApiResult<Vec<u8>> {
        let request = self.build_json_request(method, service, path, body)?;
        self.execute(request).await.map(|(_, body)| body)
    }

    async fn get(&self, service: Service, path: &str) -> ApiResult<Vec<u8>> {
        self.send::<()>(Method::GET, service, path, None).await
    }

    async fn multipart_part(&self, file: &UploadFile) -> ApiResult<reqwest::multipart::Part> {
        let file_name = file_name_of(&file.path)?;
        let content = fs::read(&file.path).await?;
        reqwest::multipart::Part::bytes(content)
            .file_name(file_name)
            .mime_str(content_type_for(&file.path))
            .map_err(ApiError::from)
    }
}

fn with_trailing_slash(mut url: Url) -> Url {
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    url
}

pub(crate) fn file_name_of(path: &Path) -> ApiResult<String> {
    path.file_name()
        .and_then(|n| n.to_str())
        .map(str::to_string)
        .ok_or_else(|| ApiError::InvalidInput(format!("invalid file name: {}", path.display())))
}

/// MIME type guessed from the file extension.
pub fn content_type_for(path: &Path) -> &'static str {
    match path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|s| s.to_ascii_lowercase())
        .as_deref()
    {
        Some("jpg" | "jpeg") => "image/jpeg",
        Some("png") => "image/png",
        Some("gif") => "image/gif",
        Some("webp") => "image/webp",
        Some("svg") => "image/svg+xml",
        Some("mp4") => "video/mp4",
        Some("mov") => "video/quicktime",
        Some("avi") => "video/x-msvideo",
        Some("webm") => "video/webm",
        Some("pdf") => "application/pdf",
        Some("doc") => "application/msword",
        Some("docx") => "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
        Some("xlsx") => "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
        Some("txt") => "text/plain",
        _ => "application/octet-stream",
    }
}

#[async_trait]
impl ConsoleApi for ApiClient {
    #[instrument(skip_all)]
    async fn list_customers(&self) -> ApiResult<Vec<Customer>> {
        decode_list(&self.get(Service::Customers, "api/customers").await?)
    }

    #[instrument(skip_all)]
    async fn list_deleted_customers(&self) -> ApiResult<Vec<Customer>> {
        decode_list(&self.get(Service::Customers, "api/customers/deleted").await?)
    }

    #[instrument(skip(self))]
    async fn get_customer(&self, id: CustomerId) -> ApiResult<Customer> {
        decode_json(&self.get(Service::Customers, &format!("api/customers/{}", id)).await?)
    }

    #[instrument(skip_all)]
    async fn create_customer(&self, customer: &NewCustomer) -> ApiResult<Customer> {
        let body = self
            .send(Method::POST, Service::Customers, "api/customers", Some(customer))
            .await?;
        let created: Customer = decode_json(&body)?;
        info!(id = created.id, company = %created.company_name, "customer created");
        Ok(created)
    }

    #[instrument(skip(self))]
    async fn update_customer_status(
        &self,
        id: CustomerId,
        status: CustomerStatus,
    ) -> ApiResult<()> {
        self.send(
            Method::PATCH,
            Service::Customers,
            &format!("api/customers/{}/status", id),
            Some(&CustomerStatusRequest { status }),
        )
        .await
        .map(|_| ())
    }

    #[instrument(skip(self, update), fields(section = %update.section()))]
    async fn update_section(&self, id: CustomerId, update: &SectionUpdate) -> ApiResult<()> {
        let payload = update.to_json()?;
        self.send(
            Method::PUT,
            Service::Customers,
            &format!("api/customers/{}/{}", id, update.section().path()),
            Some(&payload),
        )
        .await
        .map(|_| ())
    }

    #[instrument(skip(self))]
    async fn soft_delete_customer(&self, id: CustomerId) -> ApiResult<()> {
        self.send::<()>(Method::DELETE, Service::Customers, &format!("api/customers/{}", id), None)
            .await
            .map(|_| ())
    }

    #[instrument(skip(self))]
    async fn restore_customer(&self, id: CustomerId) -> ApiResult<()> {
        self.send::<()>(
            Method::PATCH,
            Service::Customers,
            &format!("api/customers/{}/restore", id),
            None,
        )
        .await
        .map(|_| ())
    }

    #[instrument(skip(self))]
    async fn hard_delete_customer(&self, id: CustomerId) -> ApiResult<()> {
        self.send::<()>(
            Method::DELETE,
            Service::Customers,
            &format!("api/customers/{}/permanent", id),
            None,
        )
        .await
        .map(|_| ())
    }

    #[instrument(skip(self))]
    async fn list_media(&self, customer_id: CustomerId) -> ApiResult<Vec<Media>> {
        decode_list(
            &self
                .get(Service::Customers, &format!("api/customers/{}/media", customer_id))
                .await?,
        )
    }

    #[instrument(skip(self, file), fields(path = %file.path.display()))]
    async fn upload_media(&self, customer_id: CustomerId, file: &UploadFile) -> ApiResult<Media> {
        let form = reqwest::multipart::Form::new()
            .part("file", self.multipart_part(file).await?)
            .text("mediaType", file.media_type.as_str());
        let url = self.endpoint(
            Service::Customers,
            &format!("api/customers/{}/media/upload", customer_id),
        )?;
        let request = self.request(Method::POST, url).multipart(form).build()?;
        let (_, body) = self.execute(request).await?;
        let media: Media = decode_json(&body)?;
        info!(customer_id, media_id = media.id, "uploaded media");
        Ok(media)
    }

    #[instrument(skip(self, files), fields(count = files.len()))]
    async fn upload_media_batch(
        &self,
        customer_id: CustomerId,
        files: &[UploadFile],
    ) -> ApiResult<Vec<Media>> {
        let media_type = match files.first() {
            Some(first) => first.media_type,
            None => return Ok(Vec::new()),
        };
        if files.iter().any(|f| f.media_type != media_type) {
            return Err(ApiError::InvalidInput(
                "batch uploads must share one media type".to_string(),
            ));
        }
        let mut form = reqwest::multipart::Form::new().text("mediaType", media_type.as_str());
        for file in files {
            form = form.part("files", self.multipart_part(file).await?);
        }
        let url = self.endpoint(
            Service::Customers,
            &format!("api/customers/{}/media/upload/batch", customer_id),
        )?;
        let request = self.request(Method::POST, url).multipart(form).build()?;
        let (_, body) = self.execute(request).await?;
        decode_list(&body)
    }

    #[instrument(skip(self))]
    async fn delete_media(&self, customer_id: CustomerId, media_id: MediaId) -> ApiResult<()> {
        self.send::<()>(
            Method::DELETE,
            Service::Customers,
            &format!("api/customers/{}/media/{}", customer_id, media_id),
            None,
        )
        .await
        .map(|_| ())
    }

    #[instrument(skip(self, media_ids), fields(count = media_ids.len()))]
    async fn download_media_zip(
        &self,
        customer_id: CustomerId,
        media_ids: &[MediaId],
    ) -> ApiResult<Download> {
        let body = MediaIdsRequest {
            media_ids: media_ids.to_vec(),
        };
        let request = self.build_json_request(
            Method::POST,
            Service::Customers,
            &format!("api/customers/{}/media/download-zip", customer_id),
            Some(&body),
        )?;
        let (headers, bytes) = self.execute(request).await?;
        let file_name = headers
            .get(CONTENT_DISPOSITION)
            .and_then(|v| v.to_str().ok())
            .and_then(content_disposition_filename);
        Ok(Download { file_name, bytes })
    }

    #[instrument(skip_all)]
    async fn dashboard_stats(&self) -> ApiResult<DashboardStats> {
        decode_envelope(&self.get(Service::Analytics, "api/analytics/dashboard/stats").await?)
    }

    #[instrument(skip_all)]
    async fn platform_breakdown(&self) -> ApiResult<Vec<PlatformCount>> {
        decode_envelope_list(
            &self
                .get(Service::Analytics, "api/analytics/dashboard/platforms")
                .await?,
        )
    }

    #[instrument(skip(self))]
    async fn recent_activities(&self, limit: u32) -> ApiResult<Vec<Activity>> {
        decode_envelope_list(
            &self
                .get(Service::Analytics, &format!("api/analytics/activities?limit={}", limit))
                .await?,
        )
    }

    #[instrument(skip(self))]
    async fn customer_activities(&self, customer_id: CustomerId) -> ApiResult<Vec<Activity>> {
        decode_envelope_list(
            &self
                .get(
                    Service::Analytics,
                    &format!("api/analytics/customers/{}/activities", customer_id),
                )
                .await?,
        )
    }

    #[instrument(skip(self))]
    async fn list_tasks(
        &self,
        board: TaskBoardKind,
        customer_id: CustomerId,
    ) -> ApiResult<Vec<Task>> {
        decode_envelope_list(
            &self
                .get(
                    Service::Analytics,
                    &format!("api/analytics/customers/{}/{}", customer_id, board.path()),
                )
                .await?,
        )
    }

    #[instrument(skip(self, task))]
    async fn create_task(
        &self,
        board: TaskBoardKind,
        customer_id: CustomerId,
        task: &NewTask,
    ) -> ApiResult<Task> {
        let body = self
            .send(
                Method::POST,
                Service::Analytics,
                &format!("api/analytics/customers/{}/{}", customer_id, board.path()),
                Some(task),
            )
            .await?;
        decode_envelope(&body)
    }

    #[instrument(skip(self))]
    async fn update_task_status(
        &self,
        board: TaskBoardKind,
        task_id: TaskId,
        status: TaskStatus,
    ) -> ApiResult<()> {
        let body = self
            .send(
                Method::PATCH,
                Service::Analytics,
                &format!("api/analytics/{}/{}/status", board.path(), task_id),
                Some(&TaskStatusRequest { status }),
            )
            .await?;
        decode_envelope_unit(&body)
    }

    #[instrument(skip(self))]
    async fn delete_task(&self, board: TaskBoardKind, task_id: TaskId) -> ApiResult<()> {
        let body = self
            .send::<()>(
                Method::DELETE,
                Service::Analytics,
                &format!("api/analytics/{}/{}", board.path(), task_id),
                None,
            )
            .await?;
        decode_envelope_unit(&body)
    }

    #[instrument(skip(self))]
    async fn list_notes(&self, customer_id: CustomerId) -> ApiResult<Vec<Note>> {
        decode_envelope_list(
            &self
                .get(
                    Service::Analytics,
                    &format!("api/analytics/customers/{}/notes", customer_id),
                )
                .await?,
        )
    }

    #[instrument(skip(self, note))]
    async fn create_note(&self, customer_id: CustomerId, note: &str) -> ApiResult<Note> {
        let body = self
            .send(
                Method::POST,
                Service::Analytics,
                &format!("api/analytics/customers/{}/notes", customer_id),
                Some(&NoteRequest {
                    note: note.to_string(),
                }),
            )
            .await?;
        decode_envelope(&body)
    }

    #[instrument(skip(self))]
    async fn delete_note(&self, note_id: NoteId) -> ApiResult<()> {
        let body = self
            .send::<()>(
                Method::DELETE,
                Service::Analytics,
                &format!("api/analytics/notes/{}", note_id),
                None,
            )
            .await?;
        decode_envelope_unit(&body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::path::PathBuf;

    fn client(token: Option<&str>) -> ApiClient {
        ApiClient::new(
            Url::parse("http://localhost:8080/backend").unwrap(),
            Url::parse("http://localhost:8081").unwrap(),
            token.map(str::to_string),
            Duration::from_secs(5),
        )
        .unwrap()
    }

    #[test]
    fn endpoints_join_under_base_path() {
        let client = client(None);
        assert_eq!(
            client
                .endpoint(Service::Customers, "/api/customers/4/media")
                .unwrap()
                .as_str(),
            "http://localhost:8080/backend/api/customers/4/media"
        );
        assert_eq!(
            client
                .endpoint(Service::Analytics, "api/analytics/dashboard/stats")
                .unwrap()
                .as_str(),
            "http://localhost:8081/api/analytics/dashboard/stats"
        );
    }

    #[test]
    fn build_request_sets_headers() {
        let client = client(Some("secret"));
        let body = json!({ "mediaIds": [1, 2] });
        let request = client
            .build_json_request(
                Method::POST,
                Service::Customers,
                "api/customers/9/media/download-zip",
                Some(&body),
            )
            .unwrap();
        assert_eq!(request.method(), Method::POST);
        assert_eq!(request.url().path(), "/backend/api/customers/9/media/download-zip");
        let headers = request.headers();
        assert_eq!(
            headers
                .get("Authorization")
                .and_then(|h| h.to_str().ok())
                .unwrap(),
            "Bearer secret"
        );
        assert_eq!(
            headers
                .get("Content-Type")
                .and_then(|h| h.to_str().ok())
                .unwrap(),
            "application/json"
        );
    }

    #[test]
    fn build_request_without_token_has_no_auth() {
        let client = client(None);
        let request = client
            .build_json_request::<()>(Method::GET, Service::Customers, "api/customers", None)
            .unwrap();
        assert!(request.headers().get("Authorization").is_none());
        assert!(request.body().is_none());
    }

    #[test]
    fn content_types_by_extension() {
        assert_eq!(content_type_for(&PathBuf::from("a/LOGO.PNG")), "image/png");
        assert_eq!(content_type_for(&PathBuf::from("clip.mov")), "video/quicktime");
        assert_eq!(content_type_for(&PathBuf::from("brief.pdf")), "application/pdf");
        assert_eq!(content_type_for(&PathBuf::from("noext")), "application/octet-stream");
    }

    #[test]
    fn task_board_paths() {
        assert_eq!("ai".parse::<TaskBoardKind>().unwrap(), TaskBoardKind::AiContent);
        assert_eq!(TaskBoardKind::Onboarding.path(), "onboarding-tasks");
    }
}
