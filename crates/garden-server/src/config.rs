use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use garden_api::{Limits, SeedOptions};
use garden_types::models::AuthMode;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{var}={value:?} is invalid: {reason}")]
    Invalid {
        var: &'static str,
        value: String,
        reason: String,
    },
}

/// Everything the server reads from the environment at startup.
#[derive(Debug, Clone)]
pub struct Config {
    pub addr: SocketAddr,
    pub db_path: PathBuf,
    pub mode: AuthMode,
    pub limits: Limits,
    pub sweep_interval: Duration,
    pub seed: SeedOptions,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |var: &str, default: &str| lookup(var).unwrap_or_else(|| default.to_string());

        let host = get("GARDEN_HOST", "0.0.0.0");
        let port: u16 = parse(&lookup, "GARDEN_PORT", 8000)?;
        let addr = SocketAddr::new(host_ip(&host)?, port);

        let session_hours: u64 = positive(&lookup, "GARDEN_SESSION_TTL_HOURS", 168)?;
        if session_hours > MAX_SESSION_TTL_HOURS {
            return Err(ConfigError::Invalid {
                var: "GARDEN_SESSION_TTL_HOURS",
                value: session_hours.to_string(),
                reason: format!("must be at most {}", MAX_SESSION_TTL_HOURS),
            });
        }
        let limits = Limits {
            session_ttl: Duration::from_secs(session_hours.saturating_mul(3600)),
            login_window: Duration::from_secs(positive(&lookup, "GARDEN_LOGIN_WINDOW_SECS", 60)?),
            login_max_attempts: positive(&lookup, "GARDEN_LOGIN_MAX_ATTEMPTS", 8)?,
            public_cooldown: Duration::from_secs(parse(&lookup, "GARDEN_PUBLIC_COOLDOWN_SECS", 12)?),
        };

        let seed = SeedOptions {
            admin_username: get("GARDEN_ADMIN_USERNAME", garden_api::seed::DEFAULT_ADMIN_USERNAME),
            admin_password: get("GARDEN_ADMIN_PASSWORD", garden_api::seed::DEFAULT_ADMIN_PASSWORD),
            secret_passphrase: get(
                "GARDEN_SECRET_PASSPHRASE",
                garden_api::seed::DEFAULT_SECRET_PASSPHRASE,
            ),
            sample_diaries: parse(&lookup, "GARDEN_SEED_SAMPLES", true)?,
        };
        if seed.admin_password.is_empty() || seed.secret_passphrase.is_empty() {
            return Err(ConfigError::Invalid {
                var: "GARDEN_ADMIN_PASSWORD/GARDEN_SECRET_PASSPHRASE",
                value: String::new(),
                reason: "must not be empty".to_string(),
            });
        }

        Ok(Self {
            addr,
            db_path: get("GARDEN_DB_PATH", "garden.db").into(),
            mode: parse(&lookup, "GARDEN_AUTH_MODE", AuthMode::PerUser)?,
            limits,
            sweep_interval: Duration::from_secs(positive(&lookup, "GARDEN_SWEEP_INTERVAL_SECS", 300)?),
            seed,
        })
    }
}

/// Ten years, the longest lifetime the session table accepts.
const MAX_SESSION_TTL_HOURS: u64 = 10 * 365 * 24;

/// Bind address: an IPv4 or IPv6 literal (brackets optional) or `localhost`.
fn host_ip(host: &str) -> Result<IpAddr, ConfigError> {
    let trimmed = host.trim().trim_start_matches('[').trim_end_matches(']');
    if trimmed.eq_ignore_ascii_case("localhost") {
        return Ok(IpAddr::V4(Ipv4Addr::LOCALHOST));
    }
    trimmed.parse().map_err(|e: std::net::AddrParseError| ConfigError::Invalid {
        var: "GARDEN_HOST",
        value: host.to_string(),
        reason: e.to_string(),
    })
}

fn parse<T>(
    lookup: &impl Fn(&str) -> Option<String>,
    var: &'static str,
    default: T,
) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(var) {
        None => Ok(default),
        Some(raw) => raw.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
            var,
            value: raw.clone(),
            reason: e.to_string(),
        }),
    }
}

fn positive<T>(
    lookup: &impl Fn(&str) -> Option<String>,
    var: &'static str,
    default: T,
) -> Result<T, ConfigError>
where
    T: FromStr + Default + PartialEq + ToString,
    T::Err: std::fmt::Display,
{
    let value = parse(lookup, var, default)?;
    if value == T::default() {
        return Err(ConfigError::Invalid {
            var,
            value: value.to_string(),
            reason: "must be greater than zero".to_string(),
        });
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(vars: &[(&str, &str)]) -> Result<Config, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|var| vars.get(var).cloned())
    }

    #[test]
    fn defaults() {
        let cfg = config(&[]).unwrap();
        assert_eq!(cfg.addr, "0.0.0.0:8000".parse().unwrap());
        assert_eq!(cfg.db_path, PathBuf::from("garden.db"));
        assert_eq!(cfg.mode, AuthMode::PerUser);
        assert_eq!(cfg.limits.session_ttl, Duration::from_secs(7 * 24 * 3600));
        assert_eq!(cfg.limits.login_max_attempts, 8);
        assert_eq!(cfg.limits.public_cooldown, Duration::from_secs(12));
        assert_eq!(cfg.sweep_interval, Duration::from_secs(300));
        assert!(cfg.seed.sample_diaries);
        assert!(cfg.seed.uses_default_credentials());
    }

    #[test]
    fn overrides() {
        let cfg = config(&[
            ("GARDEN_HOST", "127.0.0.1"),
            ("GARDEN_PORT", "9100"),
            ("GARDEN_AUTH_MODE", "shared-secret"),
            ("GARDEN_LOGIN_MAX_ATTEMPTS", "3"),
            ("GARDEN_PUBLIC_COOLDOWN_SECS", "0"),
            ("GARDEN_SEED_SAMPLES", "false"),
            ("GARDEN_ADMIN_PASSWORD", "s3cret-keeper"),
            ("GARDEN_SECRET_PASSPHRASE", "lanterns"),
        ])
        .unwrap();
        assert_eq!(cfg.addr, "127.0.0.1:9100".parse().unwrap());
        assert_eq!(cfg.mode, AuthMode::SharedSecret);
        assert_eq!(cfg.limits.login_max_attempts, 3);
        assert_eq!(cfg.limits.public_cooldown, Duration::ZERO);
        assert!(!cfg.seed.sample_diaries);
        assert!(!cfg.seed.uses_default_credentials());
    }

    #[test]
    fn hosts_accept_ipv6_and_localhost() {
        let cfg = config(&[("GARDEN_HOST", "::"), ("GARDEN_PORT", "8080")]).unwrap();
        assert_eq!(cfg.addr, "[::]:8080".parse().unwrap());

        let cfg = config(&[("GARDEN_HOST", "[::1]")]).unwrap();
        assert_eq!(cfg.addr, "[::1]:8000".parse().unwrap());

        let cfg = config(&[("GARDEN_HOST", "localhost")]).unwrap();
        assert_eq!(cfg.addr, "127.0.0.1:8000".parse().unwrap());
    }

    #[test]
    fn session_ttl_is_bounded() {
        let cfg = config(&[("GARDEN_SESSION_TTL_HOURS", "87600")]).unwrap();
        assert_eq!(cfg.limits.session_ttl, Duration::from_secs(87_600 * 3600));

        let err = config(&[("GARDEN_SESSION_TTL_HOURS", "5124095576030431")]).unwrap_err();
        assert!(err.to_string().contains("GARDEN_SESSION_TTL_HOURS"));
    }

    #[test]
    fn invalid_values_are_errors() {
        for (var, value) in [
            ("GARDEN_PORT", "eighty"),
            ("GARDEN_AUTH_MODE", "everyone"),
            ("GARDEN_SESSION_TTL_HOURS", "0"),
            ("GARDEN_SEED_SAMPLES", "maybe"),
            ("GARDEN_HOST", "not a host"),
            ("GARDEN_ADMIN_PASSWORD", ""),
        ] {
            let err = config(&[(var, value)]).unwrap_err();
            assert!(err.to_string().contains(var), "{var}: {err}");
        }
    }
}
