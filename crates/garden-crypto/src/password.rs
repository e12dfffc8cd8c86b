use anyhow::{Result, anyhow};
use base64::{Engine as _, engine::general_purpose::STANDARD as BASE64};
use rand_core::{OsRng, RngCore};
use scrypt::Params;
use subtle::ConstantTimeEq;

/// scrypt cost: N = 2^14.
const LOG_N: u8 = 14;
const BLOCK_SIZE: u32 = 8;
const PARALLELISM: u32 = 1;

const SALT_LEN: usize = 16;
const DIGEST_LEN: usize = 64;

/// Separates salt and digest. Never produced by standard base64.
const DELIMITER: char = ':';

fn derive(password: &[u8], salt: &[u8], out: &mut [u8]) -> Result<()> {
    let params = Params::new(LOG_N, BLOCK_SIZE, PARALLELISM, out.len())
        .map_err(|e| anyhow!("invalid scrypt parameters: {}", e))?;
    scrypt::scrypt(password, salt, &params, out)
        .map_err(|e| anyhow!("scrypt derivation failed: {}", e))
}

/// Hash a password with a fresh random salt.
/// Returns `base64(salt):base64(digest)`.
pub fn hash_password(password: &str) -> Result<String> {
    let mut salt = [0u8; SALT_LEN];
    OsRng.fill_bytes(&mut salt);

    let mut digest = [0u8; DIGEST_LEN];
    derive(password.as_bytes(), &salt, &mut digest)?;

    Ok(format!(
        "{}{}{}",
        BASE64.encode(salt),
        DELIMITER,
        BASE64.encode(digest)
    ))
}

/// Check a password against a stored `salt:digest` form.
///
/// Any malformed stored form (missing or repeated delimiter, bad base64, a
/// digest length scrypt cannot produce) verifies as `false`.
pub fn verify_password(password: &str, stored: &str) -> bool {
    let Some((salt_b64, digest_b64)) = stored.split_once(DELIMITER) else {
        return false;
    };
    if digest_b64.contains(DELIMITER) {
        return false;
    }

    let (Ok(salt), Ok(expected)) = (BASE64.decode(salt_b64), BASE64.decode(digest_b64)) else {
        return false;
    };

    let mut actual = vec![0u8; expected.len()];
    if derive(password.as_bytes(), &salt, &mut actual).is_err() {
        return false;
    }

    actual.ct_eq(&expected).into()
}

/// Run the same key derivation `verify_password` would, for a login whose
/// account does not exist. Always false, so missing accounts and wrong
/// passwords take the same time to reject.
pub fn verify_missing(password: &str) -> bool {
    let mut digest = [0u8; DIGEST_LEN];
    let _ = derive(password.as_bytes(), &[0u8; SALT_LEN], &mut digest);
    false
}
