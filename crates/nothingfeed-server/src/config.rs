use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use tracing::warn;

/// Placeholder session secrets that MUST NOT be used in production.
const PLACEHOLDER_SECRETS: &[&str] = &[
    "change-me-to-a-random-string",
    "development-only-weak-secret-do-not-use-in-production",
];

const DEV_SECRET: &str = "development-only-weak-secret-do-not-use-in-production";
const MIN_SECRET_LEN: usize = 32;

pub struct Config {
    pub host: String,
    pub port: u16,
    pub db_path: PathBuf,
    pub session_secret: String,
    pub production: bool,
    pub max_text_length: usize,
    /// Honour `X-Forwarded-For`/`X-Real-IP` when keying rate limits.
    pub trust_proxy: bool,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup; `from_env` passes the process environment.
    pub fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let production = get("NOTHINGFEED_ENV").is_some_and(|v| v.eq_ignore_ascii_case("production"));

        let host = get("NOTHINGFEED_HOST").unwrap_or_else(|| "0.0.0.0".into());
        let port: u16 = get("NOTHINGFEED_PORT")
            .unwrap_or_else(|| "3000".into())
            .parse()
            .context("NOTHINGFEED_PORT must be a port number")?;
        let db_path: PathBuf = get("NOTHINGFEED_DB_PATH")
            .unwrap_or_else(|| "nothingfeed.db".into())
            .into();
        let max_text_length: usize = get("NOTHINGFEED_MAX_TEXT_LENGTH")
            .unwrap_or_else(|| "500".into())
            .parse()
            .context("NOTHINGFEED_MAX_TEXT_LENGTH must be a positive integer")?;
        if max_text_length == 0 {
            bail!("NOTHINGFEED_MAX_TEXT_LENGTH must be a positive integer");
        }
        let trust_proxy = get("NOTHINGFEED_TRUST_PROXY")
            .is_some_and(|v| matches!(v.to_ascii_lowercase().as_str(), "1" | "true" | "yes"));

        let session_secret = match get("NOTHINGFEED_SESSION_SECRET").filter(|s| !s.is_empty()) {
            Some(secret) => secret,
            None if production => bail!("NOTHINGFEED_SESSION_SECRET must be set in production"),
            None => {
                warn!("NOTHINGFEED_SESSION_SECRET unset; using the development secret");
                DEV_SECRET.to_string()
            }
        };

        if production {
            if PLACEHOLDER_SECRETS.contains(&session_secret.as_str()) {
                bail!("NOTHINGFEED_SESSION_SECRET is still a placeholder");
            }
            if session_secret.len() < MIN_SECRET_LEN {
                bail!("NOTHINGFEED_SESSION_SECRET must be at least {MIN_SECRET_LEN} characters in production");
            }
        }

        Ok(Self {
            host,
            port,
            db_path,
            session_secret,
            production,
            max_text_length,
            trust_proxy,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn config(vars: &[(&str, &str)]) -> Result<Config> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn development_defaults() {
        let config = config(&[]).unwrap();
        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.port, 3000);
        assert_eq!(config.db_path, PathBuf::from("nothingfeed.db"));
        assert_eq!(config.max_text_length, 500);
        assert!(!config.production);
        assert!(!config.trust_proxy);
        assert_eq!(config.session_secret, DEV_SECRET);
    }

    #[test]
    fn overrides_are_read() {
        let config = config(&[
            ("NOTHINGFEED_PORT", "8080"),
            ("NOTHINGFEED_DB_PATH", "/tmp/feed.db"),
            ("NOTHINGFEED_MAX_TEXT_LENGTH", "280"),
            ("NOTHINGFEED_TRUST_PROXY", "true"),
        ])
        .unwrap();
        assert!(config.trust_proxy);
        assert_eq!(config.port, 8080);
        assert_eq!(config.db_path, PathBuf::from("/tmp/feed.db"));
        assert_eq!(config.max_text_length, 280);
    }

    #[test]
    fn bad_port_is_an_error() {
        assert!(config(&[("NOTHINGFEED_PORT", "http")]).is_err());
    }

    #[test]
    fn max_text_length_must_be_positive() {
        assert!(config(&[("NOTHINGFEED_MAX_TEXT_LENGTH", "0")]).is_err());
        assert!(config(&[("NOTHINGFEED_MAX_TEXT_LENGTH", "-5")]).is_err());
        assert_eq!(config(&[("NOTHINGFEED_MAX_TEXT_LENGTH", "1")]).unwrap().max_text_length, 1);
    }

    #[test]
    fn production_requires_strong_secret() {
        assert!(config(&[("NOTHINGFEED_ENV", "production")]).is_err());
        assert!(config(&[("NOTHINGFEED_ENV", "production"), ("NOTHINGFEED_SESSION_SECRET", "short")]).is_err());
        assert!(config(&[("NOTHINGFEED_ENV", "production"), ("NOTHINGFEED_SESSION_SECRET", DEV_SECRET)]).is_err());

        let strong = "x".repeat(40);
        let config = config(&[("NOTHINGFEED_ENV", "Production"), ("NOTHINGFEED_SESSION_SECRET", strong.as_str())]).unwrap();
        assert!(config.production);
        assert_eq!(config.session_secret, strong);
    }
}
