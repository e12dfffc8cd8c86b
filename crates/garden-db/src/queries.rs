use crate::models::{
    AccountCounts, AdminCounts, DiaryRow, PrivateMessageRow, PublicMessageRow, UserMessageRow,
    UserRow,
};
use crate::{Database, DbError};
use anyhow::Result;
use rusqlite::{Connection, ErrorCode, OptionalExtension, Row, params};

const USER_COLUMNS: &str = "id, username, COALESCE(role, 'user'), COALESCE(password_hash, ''),
    registration_ip, last_login_ip, last_login_at, created_at";

const DIARY_COLUMNS: &str = "id, COALESCE(author_name, ''), COALESCE(title, ''),
    COALESCE(content, ''), COALESCE(is_public, 0), created_at,
    COALESCE(updated_at, created_at)";

const PUBLIC_MESSAGE_COLUMNS: &str =
    "id, COALESCE(nickname, ''), COALESCE(content, ''), COALESCE(is_hidden, 0), created_at";

const PRIVATE_MESSAGE_COLUMNS: &str =
    "id, COALESCE(from_name, ''), COALESCE(to_name, ''), COALESCE(content, ''), created_at";

impl Database {
    // -- Users --

    /// Insert a user. A taken username surfaces as [`DbError::Conflict`].
    pub fn create_user(
        &self,
        username: &str,
        role: &str,
        password_hash: &str,
        registration_ip: &str,
    ) -> Result<i64> {
        self.with_conn(|conn| {
            let inserted = conn.execute(
                "INSERT INTO users (username, role, password_hash, registration_ip)
                 VALUES (?1, ?2, ?3, ?4)",
                (username, role, password_hash, registration_ip),
            );
            match inserted {
                Ok(_) => Ok(conn.last_insert_rowid()),
                Err(rusqlite::Error::SqliteFailure(e, _))
                    if e.code == ErrorCode::ConstraintViolation =>
                {
                    Err(DbError::Conflict(format!("username '{}'", username)).into())
                }
                Err(e) => Err(e.into()),
            }
        })
    }

    pub fn get_user_by_username(&self, username: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| query_user_by_username(conn, username))
    }

    pub fn user_exists(&self, username: &str) -> Result<bool> {
        self.with_conn(|conn| {
            let found = conn
                .query_row("SELECT 1 FROM users WHERE username = ?1", [username], |_| Ok(()))
                .optional()?;
            Ok(found.is_some())
        })
    }

    /// Stamp last-login IP and time. The only mutation a user row ever sees.
    pub fn record_login(&self, user_id: i64, ip: &str) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "UPDATE users SET last_login_ip = ?1, last_login_at = datetime('now') WHERE id = ?2",
                params![ip, user_id],
            )?;
            Ok(())
        })
    }

    pub fn list_users(&self) -> Result<Vec<UserRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {USER_COLUMNS} FROM users ORDER BY created_at DESC, id DESC"
            ))?;
            let rows = stmt
                .query_map([], user_from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    // -- Diaries --

    pub fn insert_diary(
        &self,
        author: &str,
        title: &str,
        content: &str,
        is_public: bool,
    ) -> Result<i64> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO diaries (author_name, title, content, is_public) VALUES (?1, ?2, ?3, ?4)",
                params![author, title, content, is_public],
            )?;
            Ok(conn.last_insert_rowid())
        })
    }

    pub fn get_diary(&self, id: i64) -> Result<Option<DiaryRow>> {
        self.with_conn(|conn| {
            let row = conn
                .query_row(
                    &format!("SELECT {DIARY_COLUMNS} FROM diaries WHERE id = ?1"),
                    [id],
                    diary_from_row,
                )
                .optional()?;
            Ok(row)
        })
    }

    /// Overwrite title, body and visibility, refreshing `updated_at`.
    /// Returns false when the row no longer exists.
    pub fn update_diary(
        &self,
        id: i64,
        title: &str,
        content: &str,
        is_public: bool,
    ) -> Result<bool> {
        self.with_conn(|conn| {
            let changed = conn.execute(
                "UPDATE diaries
                 SET title = ?1, content = ?2, is_public = ?3, updated_at = datetime('now')
                 WHERE id = ?4",
                params![title, content, is_public, id],
            )?;
            Ok(changed > 0)
        })
    }

    pub fn delete_diary(&self, id: i64) -> Result<bool> {
        self.with_conn(|conn| {
            let changed = conn.execute("DELETE FROM diaries WHERE id = ?1", [id])?;
            Ok(changed > 0)
        })
    }

    pub fn list_public_diaries(&self, limit: u32) -> Result<Vec<DiaryRow>> {
        self.with_conn(|conn| {
            query_diaries(
                conn,
                &format!(
                    "SELECT {DIARY_COLUMNS} FROM diaries WHERE is_public = 1
                     ORDER BY created_at DESC, id DESC LIMIT ?1"
                ),
                params![limit],
            )
        })
    }

    pub fn list_diaries_by_author(&self, author: &str) -> Result<Vec<DiaryRow>> {
        self.with_conn(|conn| {
            query_diaries(
                conn,
                &format!(
                    "SELECT {DIARY_COLUMNS} FROM diaries WHERE author_name = ?1
                     ORDER BY created_at DESC, id DESC"
                ),
                params![author],
            )
        })
    }

    pub fn list_all_diaries(&self) -> Result<Vec<DiaryRow>> {
        self.with_conn(|conn| {
            query_diaries(
                conn,
                &format!("SELECT {DIARY_COLUMNS} FROM diaries ORDER BY created_at DESC, id DESC"),
                params![],
            )
        })
    }

    // -- Public guestbook --

    pub fn insert_public_message(&self, nickname: &str, content: &str) -> Result<i64> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO messages_public (nickname, content) VALUES (?1, ?2)",
                (nickname, content),
            )?;
            Ok(conn.last_insert_rowid())
        })
    }

    /// Public feed: hidden rows never appear.
    pub fn list_visible_public_messages(&self, limit: u32) -> Result<Vec<PublicMessageRow>> {
        self.with_conn(|conn| {
            query_public_messages(
                conn,
                &format!(
                    "SELECT {PUBLIC_MESSAGE_COLUMNS} FROM messages_public WHERE is_hidden = 0
                     ORDER BY created_at DESC, id DESC LIMIT ?1"
                ),
                limit,
            )
        })
    }

    /// Moderation view, hidden rows included.
    pub fn list_all_public_messages(&self, limit: u32) -> Result<Vec<PublicMessageRow>> {
        self.with_conn(|conn| {
            query_public_messages(
                conn,
                &format!(
                    "SELECT {PUBLIC_MESSAGE_COLUMNS} FROM messages_public
                     ORDER BY created_at DESC, id DESC LIMIT ?1"
                ),
                limit,
            )
        })
    }

    pub fn set_public_message_hidden(&self, id: i64, hidden: bool) -> Result<bool> {
        self.with_conn(|conn| {
            let changed = conn.execute(
                "UPDATE messages_public SET is_hidden = ?1 WHERE id = ?2",
                params![hidden, id],
            )?;
            Ok(changed > 0)
        })
    }

    pub fn delete_public_message(&self, id: i64) -> Result<bool> {
        self.with_conn(|conn| {
            let changed = conn.execute("DELETE FROM messages_public WHERE id = ?1", [id])?;
            Ok(changed > 0)
        })
    }

    // -- Signed-in guestbook --

    pub fn insert_user_message(&self, username: &str, content: &str) -> Result<i64> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO messages_user (username, content) VALUES (?1, ?2)",
                (username, content),
            )?;
            Ok(conn.last_insert_rowid())
        })
    }

    pub fn list_user_messages(&self, limit: u32) -> Result<Vec<UserMessageRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, COALESCE(username, ''), COALESCE(content, ''), created_at
                 FROM messages_user
                 ORDER BY created_at DESC, id DESC
                 LIMIT ?1",
            )?;
            let rows = stmt
                .query_map([limit], |row| {
                    Ok(UserMessageRow {
                        id: row.get(0)?,
                        username: row.get(1)?,
                        content: row.get(2)?,
                        created_at: row.get(3)?,
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    // -- Private notes --

    pub fn insert_private_message(&self, from: &str, to: &str, content: &str) -> Result<i64> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO messages_private (from_name, to_name, content) VALUES (?1, ?2, ?3)",
                (from, to, content),
            )?;
            Ok(conn.last_insert_rowid())
        })
    }

    pub fn get_private_message(&self, id: i64) -> Result<Option<PrivateMessageRow>> {
        self.with_conn(|conn| {
            let row = conn
                .query_row(
                    &format!("SELECT {PRIVATE_MESSAGE_COLUMNS} FROM messages_private WHERE id = ?1"),
                    [id],
                    private_message_from_row,
                )
                .optional()?;
            Ok(row)
        })
    }

    /// Notes `username` sent or received.
    pub fn list_private_messages_for(
        &self,
        username: &str,
        limit: u32,
    ) -> Result<Vec<PrivateMessageRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {PRIVATE_MESSAGE_COLUMNS} FROM messages_private
                 WHERE from_name = ?1 OR to_name = ?1
                 ORDER BY created_at DESC, id DESC
                 LIMIT ?2"
            ))?;
            let rows = stmt
                .query_map(params![username, limit], private_message_from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    pub fn list_all_private_messages(&self, limit: u32) -> Result<Vec<PrivateMessageRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {PRIVATE_MESSAGE_COLUMNS} FROM messages_private
                 ORDER BY created_at DESC, id DESC
                 LIMIT ?1"
            ))?;
            let rows = stmt
                .query_map([limit], private_message_from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    pub fn delete_private_message(&self, id: i64) -> Result<bool> {
        self.with_conn(|conn| {
            let changed = conn.execute("DELETE FROM messages_private WHERE id = ?1", [id])?;
            Ok(changed > 0)
        })
    }

    // -- Settings --

    pub fn get_setting(&self, key: &str) -> Result<Option<String>> {
        self.with_conn(|conn| {
            let value = conn
                .query_row("SELECT value FROM settings WHERE key = ?1", [key], |row| {
                    row.get(0)
                })
                .optional()?;
            Ok(value)
        })
    }

    // -- Summaries --

    pub fn account_counts(&self) -> Result<AccountCounts> {
        self.with_tx(|tx| {
            Ok(AccountCounts {
                members: count(tx, "SELECT COUNT(*) FROM users WHERE role != 'admin'")?,
                posters: count(tx, "SELECT COUNT(DISTINCT author_name) FROM diaries")?,
                user_messages: count(tx, "SELECT COUNT(*) FROM messages_user")?,
            })
        })
    }

    pub fn admin_counts(&self) -> Result<AdminCounts> {
        self.with_tx(|tx| {
            Ok(AdminCounts {
                diary_total: count(tx, "SELECT COUNT(*) FROM diaries")?,
                diary_public: count(tx, "SELECT COUNT(*) FROM diaries WHERE is_public = 1")?,
                messages_public: count(tx, "SELECT COUNT(*) FROM messages_public")?,
                messages_private: count(tx, "SELECT COUNT(*) FROM messages_private")?,
                users: count(tx, "SELECT COUNT(*) FROM users")?,
            })
        })
    }
}

fn count(conn: &Connection, sql: &str) -> Result<i64> {
    Ok(conn.query_row(sql, [], |row| row.get(0))?)
}

fn query_user_by_username(conn: &Connection, username: &str) -> Result<Option<UserRow>> {
    let row = conn
        .query_row(
            &format!("SELECT {USER_COLUMNS} FROM users WHERE username = ?1"),
            [username],
            user_from_row,
        )
        .optional()?;

    Ok(row)
}

fn query_diaries(
    conn: &Connection,
    sql: &str,
    params: &[&dyn rusqlite::ToSql],
) -> Result<Vec<DiaryRow>> {
    let mut stmt = conn.prepare(sql)?;
    let rows = stmt
        .query_map(params, diary_from_row)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

fn query_public_messages(conn: &Connection, sql: &str, limit: u32) -> Result<Vec<PublicMessageRow>> {
    let mut stmt = conn.prepare(sql)?;
    let rows = stmt
        .query_map([limit], |row| {
            Ok(PublicMessageRow {
                id: row.get(0)?,
                nickname: row.get(1)?,
                content: row.get(2)?,
                is_hidden: row.get(3)?,
                created_at: row.get(4)?,
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

fn user_from_row(row: &Row<'_>) -> rusqlite::Result<UserRow> {
    Ok(UserRow {
        id: row.get(0)?,
        username: row.get(1)?,
        role: row.get(2)?,
        password_hash: row.get(3)?,
        registration_ip: row.get(4)?,
        last_login_ip: row.get(5)?,
        last_login_at: row.get(6)?,
        created_at: row.get(7)?,
    })
}

fn diary_from_row(row: &Row<'_>) -> rusqlite::Result<DiaryRow> {
    Ok(DiaryRow {
        id: row.get(0)?,
        author_name: row.get(1)?,
        title: row.get(2)?,
        content: row.get(3)?,
        is_public: row.get(4)?,
        created_at: row.get(5)?,
        updated_at: row.get(6)?,
    })
}

fn private_message_from_row(row: &Row<'_>) -> rusqlite::Result<PrivateMessageRow> {
    Ok(PrivateMessageRow {
        id: row.get(0)?,
        from_name: row.get(1)?,
        to_name: row.get(2)?,
        content: row.get(3)?,
        created_at: row.get(4)?,
    })
}
