use regex::Regex;
use serde::Deserialize;
use serde_json::Value;
use std::sync::LazyLock;

use crate::error::{ApiError, ApiResult};
use crate::models::{normalize_email, Category, FeedbackStatus, NewFeedback, MAX_TITLE_CHARS};

static EMAIL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("email pattern is valid"));

pub const REQUIRED_FIELDS_MESSAGE: &str = "Title, content, and category are required fields.";

// --- Request bodies ---

/// Body of `POST /api/feedback`. Any `isPublic` or `status` sent by the
/// client is ignored.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedbackSubmission {
    pub title: Option<String>,
    pub content: Option<String>,
    pub category: Option<String>,
    pub tags: Option<Value>,
    pub contact_email: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct StatusUpdateRequest {
    pub status: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ReplyRequest {
    pub message: Option<String>,
    pub public: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
pub struct LoginRequest {
    pub email: Option<String>,
    pub password: Option<String>,
}

fn present(raw: &Option<String>) -> Option<&str> {
    raw.as_deref().filter(|s| !s.trim().is_empty())
}

pub fn is_valid_email(email: &str) -> bool {
    EMAIL_RE.is_match(email)
}

// --- Validators ---

/// Checks a submission and turns it into a storable [`NewFeedback`] with
/// trimmed text, trimmed tags and a normalized contact email.
pub fn validate_feedback_submission(submission: &FeedbackSubmission) -> ApiResult<NewFeedback> {
    let (title, content, category) = match (
        present(&submission.title),
        present(&submission.content),
        present(&submission.category),
    ) {
        (Some(title), Some(content), Some(category)) => (title, content, category),
        _ => return Err(ApiError::validation(REQUIRED_FIELDS_MESSAGE)),
    };

    if title.chars().count() > MAX_TITLE_CHARS {
        return Err(ApiError::validation(format!(
            "Title must be {} characters or less.",
            MAX_TITLE_CHARS
        )));
    }

    let category: Category = category.parse()?;
    let tags = parse_tags(submission.tags.as_ref())?;

    // The shape check runs on the value as sent; only an empty string is absent.
    let contact_email = match submission.contact_email.as_deref().filter(|e| !e.is_empty()) {
        Some(email) if is_valid_email(email) => Some(normalize_email(email)),
        Some(_) => return Err(ApiError::validation("Invalid email format.")),
        None => None,
    };

    Ok(NewFeedback {
        title: title.trim().to_string(),
        content: content.trim().to_string(),
        category,
        tags,
        contact_email,
    })
}

/// Tags are optional; when given they must be a JSON array of strings.
/// Blank entries are dropped.
fn parse_tags(raw: Option<&Value>) -> ApiResult<Vec<String>> {
    let items = match raw {
        None | Some(Value::Null) => return Ok(Vec::new()),
        Some(Value::Array(items)) => items,
        Some(_) => return Err(ApiError::validation("Tags must be an array of strings.")),
    };

    let mut tags = Vec::with_capacity(items.len());
    for item in items {
        match item.as_str() {
            Some(tag) if !tag.trim().is_empty() => tags.push(tag.trim().to_string()),
            Some(_) => {}
            None => return Err(ApiError::validation("Tags must be an array of strings.")),
        }
    }
    Ok(tags)
}

pub fn validate_status_update(request: &StatusUpdateRequest) -> ApiResult<FeedbackStatus> {
    Ok(request.status.as_deref().unwrap_or_default().trim().parse()?)
}

/// Returns the trimmed reply text and its visibility (private by default).
pub fn validate_reply(request: &ReplyRequest) -> ApiResult<(String, bool)> {
    let message = present(&request.message).ok_or_else(|| ApiError::validation("Reply message is required."))?;
    Ok((message.trim().to_string(), request.public.unwrap_or(false)))
}

pub fn validate_login(request: &LoginRequest) -> ApiResult<(String, String)> {
    match (present(&request.email), request.password.as_deref().filter(|p| !p.is_empty())) {
        (Some(email), Some(password)) => Ok((normalize_email(email), password.to_string())),
        _ => Err(ApiError::validation("Email and password are required.")),
    }
}
