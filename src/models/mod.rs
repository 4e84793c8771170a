use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use uuid::Uuid;

pub mod db_operations;
pub mod feedback_filter;

/// Maximum number of characters allowed in a feedback title.
pub const MAX_TITLE_CHARS: usize = 150;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{kind} must be one of: {allowed}")]
pub struct UnknownVariant {
    pub kind: &'static str,
    pub value: String,
    pub allowed: String,
}

// --- Enumerated types shared by validation, serialization and the schema ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Category {
    Canteen,
    Academics,
    Hostel,
    Infrastructure,
    Transport,
    Other,
}

impl Category {
    pub const ALL: [Category; 6] = [
        Category::Canteen,
        Category::Academics,
        Category::Hostel,
        Category::Infrastructure,
        Category::Transport,
        Category::Other,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Category::Canteen => "Canteen",
            Category::Academics => "Academics",
            Category::Hostel => "Hostel",
            Category::Infrastructure => "Infrastructure",
            Category::Transport => "Transport",
            Category::Other => "Other",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FeedbackStatus {
    Open,
    InProgress,
    Resolved,
    Closed,
}

impl FeedbackStatus {
    pub const ALL: [FeedbackStatus; 4] = [
        FeedbackStatus::Open,
        FeedbackStatus::InProgress,
        FeedbackStatus::Resolved,
        FeedbackStatus::Closed,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            FeedbackStatus::Open => "open",
            FeedbackStatus::InProgress => "in-progress",
            FeedbackStatus::Resolved => "resolved",
            FeedbackStatus::Closed => "closed",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum AdminRole {
    #[default]
    Admin,
    Moderator,
}

impl AdminRole {
    pub const ALL: [AdminRole; 2] = [AdminRole::Admin, AdminRole::Moderator];

    pub fn as_str(self) -> &'static str {
        match self {
            AdminRole::Admin => "admin",
            AdminRole::Moderator => "moderator",
        }
    }
}

/// Human-readable list of the accepted spellings, e.g. `open, in-progress`.
pub fn allowed_values<T: Copy>(all: &[T], as_str: fn(T) -> &'static str) -> String {
    all.iter().map(|v| as_str(*v)).collect::<Vec<_>>().join(", ")
}

fn parse_variant<T: Copy>(
    kind: &'static str,
    value: &str,
    all: &[T],
    as_str: fn(T) -> &'static str,
) -> Result<T, UnknownVariant> {
    all.iter()
        .copied()
        .find(|v| as_str(*v) == value)
        .ok_or_else(|| UnknownVariant {
            kind,
            value: value.to_string(),
            allowed: allowed_values(all, as_str),
        })
}

impl FromStr for Category {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_variant("Category", s, &Category::ALL, Category::as_str)
    }
}

impl FromStr for FeedbackStatus {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_variant("Status", s, &FeedbackStatus::ALL, FeedbackStatus::as_str)
    }
}

impl FromStr for AdminRole {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_variant("Role", s, &AdminRole::ALL, AdminRole::as_str)
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for FeedbackStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for AdminRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// --- Feedback records ---

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Reply {
    pub message: String,
    pub public: bool,
    pub created_at: DateTime<Utc>,
}

/// The full stored record. This is the admin view; public paths go through
/// [`PublicFeedback`].
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedbackRecord {
    #[serde(rename = "_id")]
    pub id: Uuid,
    pub title: String,
    pub content: String,
    pub category: Category,
    pub tags: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contact_email: Option<String>,
    pub status: FeedbackStatus,
    pub is_public: bool,
    pub replies: Vec<Reply>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A validated submission, ready to be persisted.
#[derive(Debug, Clone, PartialEq)]
pub struct NewFeedback {
    pub title: String,
    pub content: String,
    pub category: Category,
    pub tags: Vec<String>,
    pub contact_email: Option<String>,
}

/// Public projection: no contact email, only replies marked public.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicFeedback {
    #[serde(rename = "_id")]
    pub id: Uuid,
    pub title: String,
    pub content: String,
    pub category: Category,
    pub tags: Vec<String>,
    pub status: FeedbackStatus,
    pub is_public: bool,
    pub replies: Vec<Reply>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<FeedbackRecord> for PublicFeedback {
    fn from(record: FeedbackRecord) -> Self {
        PublicFeedback {
            id: record.id,
            title: record.title,
            content: record.content,
            category: record.category,
            tags: record.tags,
            status: record.status,
            is_public: record.is_public,
            replies: record.replies.into_iter().filter(|r| r.public).collect(),
            created_at: record.created_at,
            updated_at: record.updated_at,
        }
    }
}

/// Returned by the submission endpoint.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedbackReceipt {
    pub id: Uuid,
    pub title: String,
    pub category: Category,
    pub created_at: DateTime<Utc>,
}

impl From<&FeedbackRecord> for FeedbackReceipt {
    fn from(record: &FeedbackRecord) -> Self {
        FeedbackReceipt {
            id: record.id,
            title: record.title.clone(),
            category: record.category,
            created_at: record.created_at,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Pagination {
    pub page: u32,
    pub limit: u32,
    pub total: u64,
    pub pages: u64,
}

impl Pagination {
    pub fn new(page: u32, limit: u32, total: u64) -> Self {
        Pagination {
            page,
            limit,
            total,
            pages: total.div_ceil(u64::from(limit.max(1))),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct FeedbackPage<T> {
    pub feedback: Vec<T>,
    pub pagination: Pagination,
}

// --- Administrators ---

/// Stored administrator account. Deliberately not `Serialize`; use
/// [`AdminProfile`] for anything leaving the server.
#[derive(Debug, Clone)]
pub struct AdminUser {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub role: AdminRole,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AdminProfile {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub role: AdminRole,
}

impl From<&AdminUser> for AdminProfile {
    fn from(admin: &AdminUser) -> Self {
        AdminProfile {
            id: admin.id,
            name: admin.name.clone(),
            email: admin.email.clone(),
            role: admin.role,
        }
    }
}

/// Lower-cases and trims an email so lookups are case-insensitive.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

// --- Response envelope ---

#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn data(data: T) -> Self {
        ApiResponse { success: true, message: None, data: Some(data), error: None }
    }

    pub fn data_with_message(message: &str, data: T) -> Self {
        ApiResponse { success: true, message: Some(message.to_string()), data: Some(data), error: None }
    }
}

impl ApiResponse<()> {
    pub fn message(message: &str) -> Self {
        ApiResponse { success: true, message: Some(message.to_string()), data: None, error: None }
    }

    pub fn failure(message: &str) -> Self {
        ApiResponse { success: false, message: Some(message.to_string()), data: None, error: None }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record_with_replies() -> FeedbackRecord {
        let now = Utc::now();
        FeedbackRecord {
            id: Uuid::new_v4(),
            title: "Hostel WiFi Connection Issues".to_string(),
            content: "Slow and flaky.".to_string(),
            category: Category::Hostel,
            tags: vec!["wifi".to_string()],
            contact_email: Some("student@college.edu".to_string()),
            status: FeedbackStatus::Open,
            is_public: true,
            replies: vec![
                Reply { message: "internal note".to_string(), public: false, created_at: now },
                Reply { message: "We are on it.".to_string(), public: true, created_at: now },
            ],
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn status_uses_kebab_case_on_the_wire() {
        assert_eq!(serde_json::to_string(&FeedbackStatus::InProgress).unwrap(), "\"in-progress\"");
        assert_eq!("in-progress".parse::<FeedbackStatus>().unwrap(), FeedbackStatus::InProgress);
    }

    #[test]
    fn unknown_status_lists_allowed_values() {
        let err = "archived".parse::<FeedbackStatus>().unwrap_err();
        assert_eq!(err.to_string(), "Status must be one of: open, in-progress, resolved, closed");
    }

    #[test]
    fn category_parsing_is_case_sensitive() {
        assert_eq!("Hostel".parse::<Category>().unwrap(), Category::Hostel);
        assert!("hostel".parse::<Category>().is_err());
    }

    #[test]
    fn public_projection_drops_email_and_private_replies() {
        let public = PublicFeedback::from(record_with_replies());
        assert_eq!(public.replies.len(), 1);
        assert!(public.replies[0].public);

        let json = serde_json::to_value(&public).unwrap();
        assert!(json.get("contactEmail").is_none());
        assert!(json.get("_id").is_some());
    }

    #[test]
    fn admin_view_keeps_everything() {
        let json = serde_json::to_value(record_with_replies()).unwrap();
        assert_eq!(json["contactEmail"], "student@college.edu");
        assert_eq!(json["replies"].as_array().unwrap().len(), 2);
        assert_eq!(json["isPublic"], true);
    }

    #[test]
    fn pagination_rounds_pages_up() {
        assert_eq!(Pagination::new(3, 10, 25).pages, 3);
        assert_eq!(Pagination::new(1, 10, 30).pages, 3);
        assert_eq!(Pagination::new(1, 10, 0).pages, 0);
    }

    #[test]
    fn envelope_omits_empty_fields() {
        let json = serde_json::to_value(ApiResponse::failure("Feedback not found.")).unwrap();
        assert_eq!(json, serde_json::json!({ "success": false, "message": "Feedback not found." }));
    }
}
