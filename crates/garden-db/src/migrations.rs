use anyhow::Result;
use rusqlite::Connection;
use tracing::info;

/// Columns added after the first release. Older databases get them on
/// startup; nothing is ever dropped or renamed.
const ADDED_COLUMNS: &[(&str, &str, &str)] = &[
    ("users", "registration_ip", "TEXT"),
    ("users", "last_login_ip", "TEXT"),
    ("users", "last_login_at", "TEXT"),
    ("diaries", "updated_at", "TEXT"),
    ("messages_public", "is_hidden", "INTEGER NOT NULL DEFAULT 0"),
];

pub fn run(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS users (
            id              INTEGER PRIMARY KEY AUTOINCREMENT,
            username        TEXT NOT NULL UNIQUE,
            role            TEXT NOT NULL DEFAULT 'user',
            password_hash   TEXT NOT NULL,
            registration_ip TEXT,
            last_login_ip   TEXT,
            last_login_at   TEXT,
            created_at      TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE TABLE IF NOT EXISTS diaries (
            id          INTEGER PRIMARY KEY AUTOINCREMENT,
            author_name TEXT NOT NULL,
            title       TEXT NOT NULL,
            content     TEXT NOT NULL,
            is_public   INTEGER NOT NULL DEFAULT 0,
            created_at  TEXT NOT NULL DEFAULT (datetime('now')),
            updated_at  TEXT DEFAULT (datetime('now'))
        );

        CREATE TABLE IF NOT EXISTS messages_public (
            id          INTEGER PRIMARY KEY AUTOINCREMENT,
            nickname    TEXT NOT NULL,
            content     TEXT NOT NULL,
            is_hidden   INTEGER NOT NULL DEFAULT 0,
            created_at  TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE TABLE IF NOT EXISTS messages_private (
            id          INTEGER PRIMARY KEY AUTOINCREMENT,
            from_name   TEXT NOT NULL,
            to_name     TEXT NOT NULL,
            content     TEXT NOT NULL,
            created_at  TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE TABLE IF NOT EXISTS messages_user (
            id          INTEGER PRIMARY KEY AUTOINCREMENT,
            username    TEXT NOT NULL,
            content     TEXT NOT NULL,
            created_at  TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE TABLE IF NOT EXISTS settings (
            key     TEXT PRIMARY KEY,
            value   TEXT NOT NULL
        );
        ",
    )?;

    for (table, column, decl) in ADDED_COLUMNS {
        ensure_column(conn, table, column, decl)?;
    }

    // Rows that predate `updated_at` take their creation time.
    conn.execute(
        "UPDATE diaries SET updated_at = created_at WHERE updated_at IS NULL",
        [],
    )?;

    conn.execute_batch(
        "
        CREATE INDEX IF NOT EXISTS idx_diaries_public
            ON diaries(is_public, created_at);

        CREATE INDEX IF NOT EXISTS idx_diaries_author
            ON diaries(author_name, created_at);

        CREATE INDEX IF NOT EXISTS idx_messages_private_from
            ON messages_private(from_name);

        CREATE INDEX IF NOT EXISTS idx_messages_private_to
            ON messages_private(to_name);
        ",
    )?;

    info!("Database migrations complete");
    Ok(())
}

fn ensure_column(conn: &Connection, table: &str, column: &str, decl: &str) -> Result<()> {
    if table_columns(conn, table)?.iter().any(|c| c == column) {
        return Ok(());
    }

    info!("Adding missing column {}.{}", table, column);
    conn.execute_batch(&format!("ALTER TABLE {table} ADD COLUMN {column} {decl}"))?;
    Ok(())
}

pub(crate) fn table_columns(conn: &Connection, table: &str) -> Result<Vec<String>> {
    let mut stmt = conn.prepare(&format!("PRAGMA table_info({table})"))?;
    let columns = stmt
        .query_map([], |row| row.get::<_, String>(1))?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(columns)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Database;

    #[test]
    fn fresh_schema_has_every_column() {
        let conn = Connection::open_in_memory().unwrap();
        run(&conn).unwrap();

        for (table, column, _) in ADDED_COLUMNS {
            let columns = table_columns(&conn, table).unwrap();
            assert!(columns.iter().any(|c| c == column), "{table}.{column} missing");
        }
    }

    #[test]
    fn migrations_are_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        run(&conn).unwrap();
        run(&conn).unwrap();
    }

    #[test]
    fn upgrades_an_older_database_in_place() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("garden.db");

        {
            let conn = Connection::open(&path).unwrap();
            conn.execute_batch(
                "
                CREATE TABLE users (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    username TEXT UNIQUE,
                    role TEXT,
                    password_hash TEXT,
                    created_at DATETIME DEFAULT CURRENT_TIMESTAMP
                );
                CREATE TABLE diaries (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    author_name TEXT,
                    title TEXT,
                    content TEXT,
                    is_public INTEGER DEFAULT 0,
                    created_at DATETIME DEFAULT CURRENT_TIMESTAMP
                );
                CREATE TABLE messages_public (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    nickname TEXT,
                    content TEXT,
                    created_at DATETIME DEFAULT CURRENT_TIMESTAMP
                );
                INSERT INTO users (username, role, password_hash) VALUES ('mei', 'user', 'x:y');
                INSERT INTO diaries (author_name, title, content, is_public)
                    VALUES ('mei', 'old', 'kept', 1);
                INSERT INTO messages_public (nickname, content) VALUES ('guest', 'hello');
                ",
            )
            .unwrap();
        }

        let db = Database::open(&path).unwrap();

        let user = db.get_user_by_username("mei").unwrap().unwrap();
        assert_eq!(user.role, "user");
        assert!(user.last_login_at.is_none());

        db.record_login(user.id, "10.0.0.9").unwrap();
        let user = db.get_user_by_username("mei").unwrap().unwrap();
        assert_eq!(user.last_login_ip.as_deref(), Some("10.0.0.9"));

        let diaries = db.list_public_diaries(6).unwrap();
        assert_eq!(diaries.len(), 1);
        assert_eq!(diaries[0].content, "kept");
        assert_eq!(diaries[0].updated_at, diaries[0].created_at);

        let visible = db.list_visible_public_messages(50).unwrap();
        assert_eq!(visible.len(), 1);
        assert!(!visible[0].is_hidden);
    }
}
