use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::Role;

// -- Envelopes --

#[derive(Debug, Serialize, Deserialize)]
pub struct Items<T> {
    pub items: Vec<T>,
}

impl<T> From<Vec<T>> for Items<T> {
    fn from(items: Vec<T>) -> Self {
        Self { items }
    }
}

/// Acknowledgement body for mutations that return no entity.
#[derive(Debug, Serialize, Deserialize)]
pub struct Ack {
    pub message: String,
}

impl Ack {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Created {
    pub id: i64,
    pub message: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}

// -- Auth --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RegisterRequest {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
    /// Checked only when present.
    #[serde(default)]
    pub confirm_password: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoginRequest {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SecretLoginRequest {
    #[serde(default)]
    pub password: String,
    /// Display name recorded as author of anything written in this session.
    #[serde(default)]
    pub nickname: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AuthResponse {
    pub token: String,
    pub username: String,
    pub role: Role,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ProfileResponse {
    pub username: String,
    pub role: Role,
    pub created_at: DateTime<Utc>,
    pub registration_ip: Option<String>,
    pub last_login_ip: Option<String>,
    pub last_login_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AccountSummary {
    pub user_count: i64,
    pub poster_count: i64,
    pub user_messages: i64,
}

// -- Diaries --

/// Anonymous view of a public diary: never carries the full body.
#[derive(Debug, Serialize, Deserialize)]
pub struct PublicDiary {
    pub id: i64,
    pub author: String,
    pub title: String,
    pub excerpt: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DiaryResponse {
    pub id: i64,
    pub author: String,
    pub title: String,
    pub content: String,
    pub is_public: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub can_edit: bool,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreateDiaryRequest {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub is_public: bool,
}

/// Partial update. Absent or blank `title`/`content` keep the stored value.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UpdateDiaryRequest {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub is_public: Option<bool>,
}

// -- Guestbook --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PublicMessageRequest {
    #[serde(default)]
    pub nickname: Option<String>,
    #[serde(default)]
    pub content: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PublicMessage {
    pub id: i64,
    pub nickname: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ModeratedMessage {
    pub id: i64,
    pub nickname: String,
    pub content: String,
    pub is_hidden: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ModerateMessageRequest {
    #[serde(default)]
    pub is_hidden: bool,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UserMessageRequest {
    #[serde(default)]
    pub content: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct UserMessage {
    pub id: i64,
    pub username: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

// -- Private notes --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SendNoteRequest {
    #[serde(default)]
    pub to_name: String,
    #[serde(default)]
    pub content: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Note {
    pub id: i64,
    pub from_name: String,
    pub to_name: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

// -- Admin --

#[derive(Debug, Serialize, Deserialize)]
pub struct AdminSummary {
    pub diary_total: i64,
    pub diary_public: i64,
    pub messages_public: i64,
    pub messages_private: i64,
    pub user_count: i64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct UserEntry {
    pub username: String,
    pub role: Role,
    pub registration_ip: Option<String>,
    pub created_at: DateTime<Utc>,
    pub last_login_ip: Option<String>,
    pub last_login_at: Option<DateTime<Utc>>,
}
