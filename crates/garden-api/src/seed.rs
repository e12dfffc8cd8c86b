//! First-start bootstrap: admin account, diary-zone passphrase, sample diaries.
//! Every step is a no-op when its data already exists.

use anyhow::Result;
use tracing::info;

use garden_db::seed::SECRET_PASSWORD_KEY;
use garden_db::{Database, DbError};
use garden_types::models::Role;

pub const DEFAULT_ADMIN_USERNAME: &str = "admin";
pub const DEFAULT_ADMIN_PASSWORD: &str = "garden-admin";
pub const DEFAULT_SECRET_PASSPHRASE: &str = "moonlight";

/// Registration IP recorded on accounts created by the server itself.
const SYSTEM_IP: &str = "system";

#[derive(Debug, Clone)]
pub struct SeedOptions {
    pub admin_username: String,
    pub admin_password: String,
    pub secret_passphrase: String,
    pub sample_diaries: bool,
}

impl Default for SeedOptions {
    fn default() -> Self {
        Self {
            admin_username: DEFAULT_ADMIN_USERNAME.to_string(),
            admin_password: DEFAULT_ADMIN_PASSWORD.to_string(),
            secret_passphrase: DEFAULT_SECRET_PASSPHRASE.to_string(),
            sample_diaries: true,
        }
    }
}

impl SeedOptions {
    /// True when either credential is still the well-known default.
    pub fn uses_default_credentials(&self) -> bool {
        self.admin_password == DEFAULT_ADMIN_PASSWORD
            || self.secret_passphrase == DEFAULT_SECRET_PASSPHRASE
    }
}

/// Existing credentials are never overwritten, so changing the configured
/// password after first start has no effect on a populated database.
pub fn seed(db: &Database, opts: &SeedOptions) -> Result<()> {
    if !db.user_exists(&opts.admin_username)? {
        let hash = garden_crypto::hash_password(&opts.admin_password)?;
        match db.create_user(&opts.admin_username, Role::Admin.as_str(), &hash, SYSTEM_IP) {
            Ok(_) => info!("Created admin account '{}'", opts.admin_username),
            // Another process seeded the same database first.
            Err(e) if matches!(e.downcast_ref::<DbError>(), Some(DbError::Conflict(_))) => {}
            Err(e) => return Err(e),
        }
    }

    if db.get_setting(SECRET_PASSWORD_KEY)?.is_none() {
        let hash = garden_crypto::hash_password(&opts.secret_passphrase)?;
        if db.insert_setting_if_absent(SECRET_PASSWORD_KEY, &hash)? {
            info!("Stored diary-zone passphrase");
        }
    }

    if opts.sample_diaries {
        db.seed_sample_diaries()?;
    }
    Ok(())
}
