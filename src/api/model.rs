//! Wire shapes and the single decoding boundary for backend responses.
//!
//! Every response body passes through one of the `decode_*` functions below;
//! callers receive typed values or an [`ApiError`], never raw JSON.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use crate::errors::{ApiError, ApiResult};
use crate::model::{
    ApiKeys, BasicInfo, Contact, CustomerStatus, MediaId, MediaType, SocialMedia, TargetAudience,
    TaskStatus, Seo,
};

/// List endpoints answer with a bare array, a Spring-style page or a
/// `{data: [...]}` wrapper depending on the service version.
#[derive(Deserialize)]
#[serde(untagged)]
enum ListPayload<T> {
    Bare(Vec<T>),
    Page { content: Vec<T> },
    Wrapped { data: Vec<T> },
}

impl<T> ListPayload<T> {
    fn into_vec(self) -> Vec<T> {
        match self {
            ListPayload::Bare(items) => items,
            ListPayload::Page { content } => content,
            ListPayload::Wrapped { data } => data,
        }
    }
}

/// Analytics `{success, data, error}` envelope.
#[derive(Deserialize)]
struct Envelope<T> {
    success: bool,
    #[serde(default = "Option::default")]
    data: Option<T>,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

impl<T> Envelope<T> {
    fn check(self) -> ApiResult<Option<T>> {
        if self.success {
            return Ok(self.data);
        }
        let reason = self
            .error
            .or(self.message)
            .filter(|m| !m.trim().is_empty())
            .unwrap_or_else(|| "request was not successful".to_string());
        Err(ApiError::Rejected(reason))
    }
}

pub fn decode_json<T: DeserializeOwned>(body: &[u8]) -> ApiResult<T> {
    serde_json::from_slice(body).map_err(|e| ApiError::Shape(e.to_string()))
}

pub fn decode_list<T: DeserializeOwned>(body: &[u8]) -> ApiResult<Vec<T>> {
    serde_json::from_slice::<ListPayload<T>>(body)
        .map(ListPayload::into_vec)
        .map_err(|e| ApiError::Shape(format!("expected a list: {}", e)))
}

pub fn decode_envelope<T: DeserializeOwned>(body: &[u8]) -> ApiResult<T> {
    let envelope: Envelope<T> = decode_json(body)?;
    envelope
        .check()?
        .ok_or_else(|| ApiError::Shape("envelope has no data".to_string()))
}

/// A successful envelope whose `data` is null or absent yields an empty list.
pub fn decode_envelope_list<T: DeserializeOwned>(body: &[u8]) -> ApiResult<Vec<T>> {
    let envelope: Envelope<ListPayload<T>> = decode_json(body)?;
    Ok(envelope.check()?.map(ListPayload::into_vec).unwrap_or_default())
}

/// Accepts an envelope (checked for `success`) or an empty body.
pub fn decode_envelope_unit(body: &[u8]) -> ApiResult<()> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(());
    }
    let envelope: Envelope<Value> = decode_json(body)?;
    envelope.check().map(|_| ())
}

/// Human-readable message for an error response body.
pub fn error_message(status: reqwest::StatusCode, body: &str) -> String {
    if let Ok(Value::Object(map)) = serde_json::from_str::<Value>(body) {
        for key in ["message", "error", "detail"] {
            if let Some(Value::String(msg)) = map.get(key) {
                if !msg.trim().is_empty() {
                    return msg.clone();
                }
            }
        }
    }
    let trimmed = body.trim();
    if trimmed.is_empty() {
        status
            .canonical_reason()
            .unwrap_or("request failed")
            .to_string()
    } else {
        trimmed.to_string()
    }
}

static FILENAME_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)filename\*?=(?:UTF-8'')?"?([^";]+)"?"#).expect("valid filename regex")
});

/// Extract the file name from a `Content-Disposition` header value.
pub fn content_disposition_filename(header: &str) -> Option<String> {
    FILENAME_RE
        .captures(header)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().trim().to_string())
        .filter(|name| !name.is_empty() && !name.contains('/') && !name.contains('\\'))
}

/// Binary payload returned by the ZIP endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Download {
    pub file_name: Option<String>,
    pub bytes: Vec<u8>,
}

/// A local file queued for upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadFile {
    pub path: PathBuf,
    pub media_type: MediaType,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct MediaIdsRequest {
    pub media_ids: Vec<MediaId>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CustomerStatusRequest {
    pub status: CustomerStatus,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TaskStatusRequest {
    pub status: TaskStatus,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NoteRequest {
    pub note: String,
}

/// Independently saved groups of customer fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Section {
    BasicInfo,
    Contacts,
    SocialMedia,
    TargetAudience,
    Seo,
    ApiKeys,
}

impl Section {
    pub const ALL: [Section; 6] = [
        Section::BasicInfo,
        Section::Contacts,
        Section::SocialMedia,
        Section::TargetAudience,
        Section::Seo,
        Section::ApiKeys,
    ];

    /// Path segment under `/api/customers/{id}/`.
    pub fn path(&self) -> &'static str {
        match self {
            Section::BasicInfo => "basic-info",
            Section::Contacts => "contacts",
            Section::SocialMedia => "social-media",
            Section::TargetAudience => "target-audience",
            Section::Seo => "seo",
            Section::ApiKeys => "api-keys",
        }
    }
}

impl fmt::Display for Section {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.path())
    }
}

impl FromStr for Section {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace('_', "-");
        Section::ALL
            .into_iter()
            .find(|section| section.path() == normalized)
            .ok_or_else(|| format!("unknown section '{}'", s))
    }
}

/// A complete section payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SectionUpdate {
    BasicInfo(BasicInfo),
    Contacts(Vec<Contact>),
    SocialMedia(SocialMedia),
    TargetAudience(TargetAudience),
    Seo(Seo),
    ApiKeys(ApiKeys),
}

impl SectionUpdate {
    pub fn section(&self) -> Section {
        match self {
            SectionUpdate::BasicInfo(_) => Section::BasicInfo,
            SectionUpdate::Contacts(_) => Section::Contacts,
            SectionUpdate::SocialMedia(_) => Section::SocialMedia,
            SectionUpdate::TargetAudience(_) => Section::TargetAudience,
            SectionUpdate::Seo(_) => Section::Seo,
            SectionUpdate::ApiKeys(_) => Section::ApiKeys,
        }
    }

    pub fn to_json(&self) -> ApiResult<Value> {
        let value = match self {
            SectionUpdate::BasicInfo(v) => serde_json::to_value(v),
            SectionUpdate::Contacts(v) => serde_json::to_value(v),
            SectionUpdate::SocialMedia(v) => serde_json::to_value(v),
            SectionUpdate::TargetAudience(v) => serde_json::to_value(v),
            SectionUpdate::Seo(v) => serde_json::to_value(v),
            SectionUpdate::ApiKeys(v) => serde_json::to_value(v),
        };
        value.map_err(|e| ApiError::InvalidInput(e.to_string()))
    }

    /// Parse a section payload from JSON, e.g. a file given on the command line.
    pub fn from_json(section: Section, value: Value) -> ApiResult<Self> {
        let parsed = match section {
            Section::BasicInfo => serde_json::from_value(value).map(SectionUpdate::BasicInfo),
            Section::Contacts => serde_json::from_value(value).map(SectionUpdate::Contacts),
            Section::SocialMedia => serde_json::from_value(value).map(SectionUpdate::SocialMedia),
            Section::TargetAudience => {
                serde_json::from_value(value).map(SectionUpdate::TargetAudience)
            }
            Section::Seo => serde_json::from_value(value).map(SectionUpdate::Seo),
            Section::ApiKeys => serde_json::from_value(value).map(SectionUpdate::ApiKeys),
        };
        parsed.map_err(|e| ApiError::InvalidInput(format!("{} payload: {}", section, e)))
    }
}
