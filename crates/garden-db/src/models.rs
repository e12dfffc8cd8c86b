use chrono::{DateTime, NaiveDateTime, Utc};

/// Database row types. Each maps directly to one SQLite row.
/// Distinct from garden-types API models to keep the DB layer independent.

pub struct UserRow {
    pub id: i64,
    pub username: String,
    pub role: String,
    pub password_hash: String,
    pub registration_ip: Option<String>,
    pub last_login_ip: Option<String>,
    pub last_login_at: Option<String>,
    pub created_at: String,
}

pub struct DiaryRow {
    pub id: i64,
    pub author_name: String,
    pub title: String,
    pub content: String,
    pub is_public: bool,
    pub created_at: String,
    pub updated_at: String,
}

pub struct PublicMessageRow {
    pub id: i64,
    pub nickname: String,
    pub content: String,
    pub is_hidden: bool,
    pub created_at: String,
}

pub struct PrivateMessageRow {
    pub id: i64,
    pub from_name: String,
    pub to_name: String,
    pub content: String,
    pub created_at: String,
}

pub struct UserMessageRow {
    pub id: i64,
    pub username: String,
    pub content: String,
    pub created_at: String,
}

/// Counts behind the signed-in account summary.
pub struct AccountCounts {
    pub members: i64,
    pub posters: i64,
    pub user_messages: i64,
}

/// Counts behind the admin dashboard.
pub struct AdminCounts {
    pub diary_total: i64,
    pub diary_public: i64,
    pub messages_public: i64,
    pub messages_private: i64,
    pub users: i64,
}

/// Parse a stored timestamp.
///
/// SQLite's `datetime('now')` writes "YYYY-MM-DD HH:MM:SS" without timezone,
/// always UTC. RFC 3339 is accepted too.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    raw.parse::<DateTime<Utc>>()
        .ok()
        .or_else(|| {
            NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S")
                .ok()
                .map(|ndt| ndt.and_utc())
        })
}
