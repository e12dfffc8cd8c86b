use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Role bound to a session. `Admin` and `User` are also persisted on the
/// `users` table; `Secret` only ever exists on sessions issued by the
/// shared-passphrase login.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    User,
    Secret,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Admin => "admin",
            Self::User => "user",
            Self::Secret => "secret",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown role '{0}'")]
pub struct UnknownRole(pub String);

impl FromStr for Role {
    type Err = UnknownRole;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "admin" => Ok(Self::Admin),
            "user" => Ok(Self::User),
            "secret" => Ok(Self::Secret),
            other => Err(UnknownRole(other.to_string())),
        }
    }
}

/// Deployment-wide authorization variant for the diary zone.
///
/// `PerUser`: accounts with registration/login, diaries and notes owned by
/// their author. `SharedSecret`: one passphrase grants the flat `secret` role
/// with no per-owner checks. Exactly one is active per process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AuthMode {
    #[default]
    PerUser,
    SharedSecret,
}

impl AuthMode {
    /// Role a session must carry to enter the diary zone under this mode.
    pub fn zone_role(&self) -> Role {
        match self {
            Self::PerUser => Role::User,
            Self::SharedSecret => Role::Secret,
        }
    }
}

impl fmt::Display for AuthMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PerUser => f.write_str("per-user"),
            Self::SharedSecret => f.write_str("shared-secret"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown auth mode '{0}' (expected 'per-user' or 'shared-secret')")]
pub struct UnknownAuthMode(pub String);

impl FromStr for AuthMode {
    type Err = UnknownAuthMode;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "per-user" | "per_user" | "peruser" => Ok(Self::PerUser),
            "shared-secret" | "shared_secret" | "sharedsecret" => Ok(Self::SharedSecret),
            other => Err(UnknownAuthMode(other.to_string())),
        }
    }
}
