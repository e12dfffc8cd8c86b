/// Garden Crypto Library
///
/// Credential storage for user accounts, the admin account and the shared
/// diary passphrase (scrypt, N=2^14, r=8, p=1), plus opaque bearer tokens.
///
/// Stored credentials use the `base64(salt):base64(digest)` layout written by
/// earlier deployments, so existing databases keep verifying.

pub mod password;
pub mod token;

pub use password::{hash_password, verify_missing, verify_password};
pub use token::generate_token;
