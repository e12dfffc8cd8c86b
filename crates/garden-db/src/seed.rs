use anyhow::Result;
use rusqlite::params;
use tracing::info;

use crate::Database;

/// Settings key holding the shared diary-zone passphrase hash.
pub const SECRET_PASSWORD_KEY: &str = "secret_password";

/// (author, title, content, is_public). Authors are not registered accounts.
const SAMPLE_DIARIES: &[(&str, &str, &str, bool)] = &[
    (
        "Yingxue",
        "篱笆上的月光",
        "风很轻，我把今天写进纸里，塞进花园尽头的树洞。",
        true,
    ),
    (
        "Xiaoman",
        "小径旁的萤火",
        "约好在石凳边见面，连星星都在偷偷听。",
        true,
    ),
    ("Yingxue", "写给你的晚安", "夜色很深，想念却很亮。", false),
];

impl Database {
    /// Store a setting unless the key already has a value. Returns true if written.
    pub fn insert_setting_if_absent(&self, key: &str, value: &str) -> Result<bool> {
        self.with_conn(|conn| {
            let changed = conn.execute(
                "INSERT OR IGNORE INTO settings (key, value) VALUES (?1, ?2)",
                (key, value),
            )?;
            Ok(changed > 0)
        })
    }

    /// Fill an empty diaries table with the sample entries.
    /// Returns how many rows were inserted (0 when diaries already exist).
    pub fn seed_sample_diaries(&self) -> Result<usize> {
        let inserted = self.with_tx(|tx| {
            let existing: i64 = tx.query_row("SELECT COUNT(*) FROM diaries", [], |r| r.get(0))?;
            if existing > 0 {
                return Ok(0);
            }

            let mut stmt = tx.prepare(
                "INSERT INTO diaries (author_name, title, content, is_public) VALUES (?1, ?2, ?3, ?4)",
            )?;
            for (author, title, content, is_public) in SAMPLE_DIARIES {
                stmt.execute(params![author, title, content, is_public])?;
            }
            Ok(SAMPLE_DIARIES.len())
        })?;

        if inserted > 0 {
            info!("Seeded {} sample diaries", inserted);
        }
        Ok(inserted)
    }
}
