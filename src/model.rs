use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::str::FromStr;

pub type CustomerId = i64;
pub type MediaId = i64;
pub type TaskId = i64;
pub type NoteId = i64;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CustomerStatus {
    Active,
    Passive,
    Cancelled,
}

impl CustomerStatus {
    pub const ALL: [CustomerStatus; 3] = [
        CustomerStatus::Active,
        CustomerStatus::Passive,
        CustomerStatus::Cancelled,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            CustomerStatus::Active => "ACTIVE",
            CustomerStatus::Passive => "PASSIVE",
            CustomerStatus::Cancelled => "CANCELLED",
        }
    }
}

impl fmt::Display for CustomerStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CustomerStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        CustomerStatus::ALL
            .into_iter()
            .find(|status| status.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("unknown customer status '{}'", s))
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MediaType {
    Logo,
    Photo,
    Video,
    Document,
}

impl MediaType {
    pub const ALL: [MediaType; 4] = [
        MediaType::Logo,
        MediaType::Photo,
        MediaType::Video,
        MediaType::Document,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            MediaType::Logo => "LOGO",
            MediaType::Photo => "PHOTO",
            MediaType::Video => "VIDEO",
            MediaType::Document => "DOCUMENT",
        }
    }
}

impl fmt::Display for MediaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MediaType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        MediaType::ALL
            .into_iter()
            .find(|t| t.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("unknown media type '{}'", s))
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskStatus {
    NotStarted,
    InProgress,
    Pending,
    Completed,
    Cancelled,
}

impl TaskStatus {
    /// Board column order.
    pub const ALL: [TaskStatus; 5] = [
        TaskStatus::NotStarted,
        TaskStatus::InProgress,
        TaskStatus::Pending,
        TaskStatus::Completed,
        TaskStatus::Cancelled,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::NotStarted => "NOT_STARTED",
            TaskStatus::InProgress => "IN_PROGRESS",
            TaskStatus::Pending => "PENDING",
            TaskStatus::Completed => "COMPLETED",
            TaskStatus::Cancelled => "CANCELLED",
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TaskStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().replace('-', "_");
        TaskStatus::ALL
            .into_iter()
            .find(|st| st.as_str().eq_ignore_ascii_case(&normalized))
            .ok_or_else(|| format!("unknown task status '{}'", s))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Contact {
    pub name: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub surname: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub priority: i32,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SocialMedia {
    #[serde(default)]
    pub instagram: Option<String>,
    #[serde(default)]
    pub facebook: Option<String>,
    #[serde(default)]
    pub tiktok: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TargetAudience {
    #[serde(default)]
    pub post_type: Option<String>,
    #[serde(default)]
    pub tone: Option<String>,
    #[serde(default)]
    pub frequency: Option<String>,
    #[serde(default)]
    pub region: Option<String>,
    #[serde(default)]
    pub age_range: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub hashtags: Vec<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub interests: Vec<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub special_dates: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Seo {
    #[serde(default)]
    pub console_email: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub title_suggestions: Vec<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub content_suggestions: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ApiKeys {
    #[serde(default)]
    pub instagram: Option<String>,
    #[serde(default)]
    pub facebook: Option<String>,
    #[serde(default)]
    pub tiktok: Option<String>,
    #[serde(default)]
    pub google: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Media {
    pub id: MediaId,
    pub media_type: MediaType,
    pub original_file_name: String,
    #[serde(default)]
    pub file_size: u64,
    #[serde(default)]
    pub full_url: Option<String>,
    #[serde(with = "timestamp")]
    pub uploaded_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Customer {
    pub id: CustomerId,
    pub company_name: String,
    #[serde(default)]
    pub sector: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
    pub status: CustomerStatus,
    #[serde(default)]
    pub membership_package: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub contacts: Vec<Contact>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub social_media: SocialMedia,
    #[serde(default, deserialize_with = "null_as_default")]
    pub target_audience: TargetAudience,
    #[serde(default, deserialize_with = "null_as_default")]
    pub seo: Seo,
    #[serde(default, deserialize_with = "null_as_default")]
    pub api_keys: ApiKeys,
    #[serde(default, deserialize_with = "null_as_default")]
    pub media: Vec<Media>,
    #[serde(default, with = "timestamp::option")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, with = "timestamp::option")]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(default, with = "timestamp::option")]
    pub deleted_at: Option<DateTime<Utc>>,
}

impl Customer {
    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }
}

/// Body for `POST /api/customers`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct NewCustomer {
    pub company_name: String,
    pub sector: Option<String>,
    pub address: Option<String>,
    pub status: CustomerStatus,
    pub membership_package: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub contacts: Vec<Contact>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct BasicInfo {
    pub company_name: String,
    pub sector: Option<String>,
    pub address: Option<String>,
    pub status: CustomerStatus,
    pub membership_package: Option<String>,
}

impl From<&Customer> for BasicInfo {
    fn from(c: &Customer) -> Self {
        Self {
            company_name: c.company_name.clone(),
            sector: c.sector.clone(),
            address: c.address.clone(),
            status: c.status,
            membership_package: c.membership_package.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: TaskId,
    pub task_name: String,
    #[serde(default)]
    pub task_type: Option<String>,
    pub status: TaskStatus,
    #[serde(default)]
    pub progress_current: u32,
    #[serde(default)]
    pub progress_total: u32,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default, with = "timestamp::option")]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(default, with = "timestamp::option")]
    pub completed_at: Option<DateTime<Utc>>,
}

impl Task {
    /// Progress in whole percent, clamped to 0..=100. A task with no total is
    /// 100% once completed and 0% otherwise.
    pub fn progress_percent(&self) -> u8 {
        if self.progress_total == 0 {
            return if self.status == TaskStatus::Completed { 100 } else { 0 };
        }
        let pct = (u64::from(self.progress_current) * 100) / u64::from(self.progress_total);
        pct.min(100) as u8
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct NewTask {
    pub task_name: String,
    pub task_type: Option<String>,
    pub progress_total: u32,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Note {
    pub id: NoteId,
    pub customer_id: CustomerId,
    pub note: String,
    #[serde(default)]
    pub created_by: Option<String>,
    #[serde(with = "timestamp")]
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Activity {
    pub id: i64,
    #[serde(default)]
    pub customer_id: Option<CustomerId>,
    pub activity_type: String,
    pub message: String,
    #[serde(default)]
    pub icon: Option<String>,
    #[serde(with = "timestamp")]
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct DashboardStats {
    #[serde(default)]
    pub total_customers: u64,
    #[serde(default)]
    pub active_customers: u64,
    #[serde(default)]
    pub total_media: u64,
    #[serde(default)]
    pub pending_tasks: u64,
    #[serde(default)]
    pub completed_tasks: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PlatformCount {
    pub platform: String,
    pub count: u64,
}

/// Treats an explicit `null` like a missing field.
fn null_as_default<'de, D, T>(d: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Option::<T>::deserialize(d).map(Option::unwrap_or_default)
}

/// Serde adapter accepting RFC 3339 or zone-less ISO local date-times (taken
/// as UTC). Always serializes as RFC 3339.
pub mod timestamp {
    use chrono::{DateTime, NaiveDateTime, Utc};
    use serde::{de, Deserialize, Deserializer, Serializer};

    pub fn parse(raw: &str) -> Option<DateTime<Utc>> {
        if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
            return Some(dt.with_timezone(&Utc));
        }
        NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
            .ok()
            .map(|naive| naive.and_utc())
    }

    pub fn serialize<S: Serializer>(value: &DateTime<Utc>, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&value.to_rfc3339())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<DateTime<Utc>, D::Error> {
        let raw = String::deserialize(d)?;
        parse(&raw).ok_or_else(|| de::Error::custom(format!("invalid timestamp '{}'", raw)))
    }

    pub mod option {
        use chrono::{DateTime, Utc};
        use serde::{de, Deserialize, Deserializer, Serializer};

        pub fn serialize<S: Serializer>(
            value: &Option<DateTime<Utc>>,
            s: S,
        ) -> Result<S::Ok, S::Error> {
            match value {
                Some(dt) => s.serialize_some(&dt.to_rfc3339()),
                None => s.serialize_none(),
            }
        }

        pub fn deserialize<'de, D: Deserializer<'de>>(
            d: D,
        ) -> Result<Option<DateTime<Utc>>, D::Error> {
            match Option::<String>::deserialize(d)? {
                None => Ok(None),
                Some(raw) if raw.trim().is_empty() => Ok(None),
                Some(raw) => super::parse(&raw)
                    .map(Some)
                    .ok_or_else(|| de::Error::custom(format!("invalid timestamp '{}'", raw))),
            }
        }
    }
}
