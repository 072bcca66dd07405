use std::fmt::Display;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use tracing::info;

use vidhub_api::state::Settings;

/// Placeholder JWT secrets that MUST NOT be used.
const PLACEHOLDER_SECRETS: &[&str] = &[
    "change-me-to-a-random-string",
    "dev-secret-change-me",
    "secret",
];

pub struct Config {
    pub host: String,
    pub port: u16,
    pub db_path: PathBuf,
    /// Exact origin to allow; `None` allows any.
    pub cors_origin: Option<String>,
    pub settings: Settings,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let access_token_secret = secret(&lookup, "VIDHUB_ACCESS_TOKEN_SECRET")?;
        let refresh_token_secret = secret(&lookup, "VIDHUB_REFRESH_TOKEN_SECRET")?;
        if access_token_secret == refresh_token_secret {
            bail!("VIDHUB_ACCESS_TOKEN_SECRET and VIDHUB_REFRESH_TOKEN_SECRET must differ");
        }

        let access_minutes: i64 = parse_or(&lookup, "VIDHUB_ACCESS_TOKEN_TTL_MINUTES", 60)?;
        let refresh_days: i64 = parse_or(&lookup, "VIDHUB_REFRESH_TOKEN_TTL_DAYS", 10)?;
        let store_timeout_secs: u64 = parse_or(&lookup, "VIDHUB_STORE_TIMEOUT_SECS", 5)?;
        if access_minutes <= 0 || refresh_days <= 0 || store_timeout_secs == 0 {
            bail!("Token lifetimes and the store timeout must be positive");
        }

        Ok(Self {
            host: lookup("VIDHUB_HOST").unwrap_or_else(|| "0.0.0.0".into()),
            port: parse_or(&lookup, "VIDHUB_PORT", 8000)?,
            db_path: lookup("VIDHUB_DB_PATH").unwrap_or_else(|| "vidhub.db".into()).into(),
            cors_origin: lookup("VIDHUB_CORS_ORIGIN").filter(|o| !o.trim().is_empty()),
            settings: Settings {
                access_token_secret,
                refresh_token_secret,
                access_token_ttl: chrono::Duration::minutes(access_minutes),
                refresh_token_ttl: chrono::Duration::days(refresh_days),
                store_timeout: Duration::from_secs(store_timeout_secs),
            },
        })
    }
}

fn secret(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Result<String> {
    let value = lookup(key).map(|s| s.trim().to_string()).unwrap_or_default();
    if value.is_empty() || PLACEHOLDER_SECRETS.contains(&value.as_str()) {
        bail!("{key} is unset or still a placeholder. Set it in your .env file and restart.");
    }
    Ok(value)
}

fn parse_or<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> Result<T>
where
    T: FromStr + Display,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match lookup(key) {
        Some(raw) => raw.trim().parse().with_context(|| format!("Invalid {key} value '{raw}'")),
        None => {
            info!("{key} not set, using default: {default}");
            Ok(default)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> =
            pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        move |key: &str| map.get(key).cloned()
    }

    const SECRETS: [(&str, &str); 2] = [
        ("VIDHUB_ACCESS_TOKEN_SECRET", "access-0123456789"),
        ("VIDHUB_REFRESH_TOKEN_SECRET", "refresh-0123456789"),
    ];

    #[test]
    fn defaults_apply_when_only_secrets_are_set() {
        let config = Config::from_lookup(lookup(&SECRETS)).unwrap();
        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.port, 8000);
        assert_eq!(config.db_path, PathBuf::from("vidhub.db"));
        assert!(config.cors_origin.is_none());
        assert_eq!(config.settings.access_token_ttl, chrono::Duration::minutes(60));
        assert_eq!(config.settings.refresh_token_ttl, chrono::Duration::days(10));
        assert_eq!(config.settings.store_timeout, Duration::from_secs(5));
    }

    #[test]
    fn placeholder_or_missing_secret_is_rejected() {
        assert!(Config::from_lookup(lookup(&[])).is_err());
        assert!(
            Config::from_lookup(lookup(&[
                ("VIDHUB_ACCESS_TOKEN_SECRET", "dev-secret-change-me"),
                ("VIDHUB_REFRESH_TOKEN_SECRET", "refresh-0123456789"),
            ]))
            .is_err()
        );
    }

    #[test]
    fn malformed_port_is_an_error() {
        let mut pairs = SECRETS.to_vec();
        pairs.push(("VIDHUB_PORT", "eighty"));
        assert!(Config::from_lookup(lookup(&pairs)).is_err());
    }

    #[test]
    fn overrides_are_read() {
        let mut pairs = SECRETS.to_vec();
        pairs.extend([
            ("VIDHUB_PORT", "9100"),
            ("VIDHUB_CORS_ORIGIN", "http://localhost:5173"),
            ("VIDHUB_ACCESS_TOKEN_TTL_MINUTES", "15"),
        ]);
        let config = Config::from_lookup(lookup(&pairs)).unwrap();
        assert_eq!(config.port, 9100);
        assert_eq!(config.cors_origin.as_deref(), Some("http://localhost:5173"));
        assert_eq!(config.settings.access_token_ttl, chrono::Duration::minutes(15));
    }
}
