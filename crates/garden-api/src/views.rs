//! Row → response conversions. Corrupt stored values are logged and replaced
//! with defaults rather than failing the whole listing.

use chrono::{DateTime, Utc};
use tracing::warn;

use garden_db::models::{
    DiaryRow, PrivateMessageRow, PublicMessageRow, UserMessageRow, UserRow, parse_timestamp,
};
use garden_types::api::{
    DiaryResponse, ModeratedMessage, Note, ProfileResponse, PublicDiary, PublicMessage, UserEntry,
    UserMessage,
};
use garden_types::models::Role;

use crate::validate::{escape_markup, excerpt};

fn timestamp(raw: &str, field: &str, table: &str, id: i64) -> DateTime<Utc> {
    parse_timestamp(raw).unwrap_or_else(|| {
        warn!("Corrupt {} '{}' on {} {}", field, raw, table, id);
        DateTime::default()
    })
}

fn optional_timestamp(raw: Option<&str>, field: &str, id: i64) -> Option<DateTime<Utc>> {
    let raw = raw?;
    let parsed = parse_timestamp(raw);
    if parsed.is_none() {
        warn!("Corrupt {} '{}' on user {}", field, raw, id);
    }
    parsed
}

fn role(row: &UserRow) -> Role {
    row.role.parse().unwrap_or_else(|e| {
        warn!("Corrupt role on user {}: {}", row.id, e);
        Role::User
    })
}

/// Anonymous readers get escaped text; diary bodies are stored as written.
pub fn public_diary(row: DiaryRow) -> PublicDiary {
    PublicDiary {
        id: row.id,
        excerpt: escape_markup(&excerpt(&row.content)),
        created_at: timestamp(&row.created_at, "created_at", "diary", row.id),
        author: escape_markup(&row.author_name),
        title: escape_markup(&row.title),
    }
}

pub fn diary(row: DiaryRow, can_edit: bool) -> DiaryResponse {
    DiaryResponse {
        id: row.id,
        created_at: timestamp(&row.created_at, "created_at", "diary", row.id),
        updated_at: timestamp(&row.updated_at, "updated_at", "diary", row.id),
        author: row.author_name,
        title: row.title,
        content: row.content,
        is_public: row.is_public,
        can_edit,
    }
}

pub fn public_message(row: PublicMessageRow) -> PublicMessage {
    PublicMessage {
        id: row.id,
        created_at: timestamp(&row.created_at, "created_at", "public message", row.id),
        nickname: row.nickname,
        content: row.content,
    }
}

pub fn moderated_message(row: PublicMessageRow) -> ModeratedMessage {
    ModeratedMessage {
        id: row.id,
        created_at: timestamp(&row.created_at, "created_at", "public message", row.id),
        nickname: row.nickname,
        content: row.content,
        is_hidden: row.is_hidden,
    }
}

pub fn user_message(row: UserMessageRow) -> UserMessage {
    UserMessage {
        id: row.id,
        created_at: timestamp(&row.created_at, "created_at", "user message", row.id),
        username: row.username,
        content: row.content,
    }
}

pub fn note(row: PrivateMessageRow) -> Note {
    Note {
        id: row.id,
        created_at: timestamp(&row.created_at, "created_at", "private message", row.id),
        from_name: row.from_name,
        to_name: row.to_name,
        content: row.content,
    }
}

pub fn profile(row: UserRow) -> ProfileResponse {
    ProfileResponse {
        role: role(&row),
        created_at: timestamp(&row.created_at, "created_at", "user", row.id),
        last_login_at: optional_timestamp(row.last_login_at.as_deref(), "last_login_at", row.id),
        username: row.username,
        registration_ip: row.registration_ip,
        last_login_ip: row.last_login_ip,
    }
}

pub fn user_entry(row: UserRow) -> UserEntry {
    UserEntry {
        role: role(&row),
        created_at: timestamp(&row.created_at, "created_at", "user", row.id),
        last_login_at: optional_timestamp(row.last_login_at.as_deref(), "last_login_at", row.id),
        username: row.username,
        registration_ip: row.registration_ip,
        last_login_ip: row.last_login_ip,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn diary_row(content: &str) -> DiaryRow {
        DiaryRow {
            id: 7,
            author_name: "luna".into(),
            title: "夜".into(),
            content: content.into(),
            is_public: true,
            created_at: "2024-05-01 20:00:00".into(),
            updated_at: "garbage".into(),
        }
    }

    #[test]
    fn public_diary_carries_only_an_excerpt() {
        let view = public_diary(diary_row(&"字".repeat(300)));
        assert_eq!(view.excerpt.chars().count(), 120);
        assert_eq!(view.author, "luna");
    }

    #[test]
    fn public_diary_escapes_markup() {
        let mut row = diary_row("<script>steal()</script>");
        row.title = "<img src=x onerror=alert(1)>".into();
        let view = public_diary(row);
        assert_eq!(view.title, "&lt;img src=x onerror=alert(1)&gt;");
        assert_eq!(view.excerpt, "&lt;script&gt;steal()&lt;/script&gt;");
        assert_eq!(view.author, "luna");
    }

    #[test]
    fn corrupt_timestamps_fall_back_to_epoch() {
        let view = diary(diary_row("body"), true);
        assert_eq!(view.updated_at, DateTime::<Utc>::default());
        assert_ne!(view.created_at, DateTime::<Utc>::default());
        assert!(view.can_edit);
    }

    #[test]
    fn unknown_roles_degrade_to_user() {
        let row = UserRow {
            id: 1,
            username: "luna".into(),
            role: "wizard".into(),
            password_hash: String::new(),
            registration_ip: None,
            last_login_ip: None,
            last_login_at: None,
            created_at: "2024-05-01 20:00:00".into(),
        };
        let entry = user_entry(row);
        assert_eq!(entry.role, Role::User);
        assert!(entry.last_login_at.is_none());
    }
}
