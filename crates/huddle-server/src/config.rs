use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::{Context, bail};

/// Placeholder secrets that must not reach a running server.
const PLACEHOLDER_SECRETS: &[&str] = &["change-me-to-a-random-string", "dev-secret-change-me"];

#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub db_path: PathBuf,
    pub jwt_secret: String,
    pub session_hours: i64,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(get: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let jwt_secret = get("HUDDLE_JWT_SECRET").unwrap_or_default();
        if jwt_secret.is_empty() || PLACEHOLDER_SECRETS.contains(&jwt_secret.as_str()) {
            bail!("HUDDLE_JWT_SECRET is unset or still a placeholder");
        }

        let port: u16 = get("HUDDLE_PORT")
            .unwrap_or_else(|| "3000".into())
            .parse()
            .context("HUDDLE_PORT must be a port number")?;

        let session_hours: i64 = get("HUDDLE_SESSION_HOURS")
            .unwrap_or_else(|| "1".into())
            .parse()
            .context("HUDDLE_SESSION_HOURS must be a whole number of hours")?;
        if session_hours < 1 {
            bail!("HUDDLE_SESSION_HOURS must be at least 1");
        }

        Ok(Self {
            host: get("HUDDLE_HOST").unwrap_or_else(|| "0.0.0.0".into()),
            port,
            db_path: get("HUDDLE_DB_PATH").unwrap_or_else(|| "huddle.db".into()).into(),
            jwt_secret,
            session_hours,
        })
    }

    pub fn addr(&self) -> anyhow::Result<SocketAddr> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .with_context(|| format!("invalid listen address {}:{}", self.host, self.port))
    }

    pub fn session_ttl(&self) -> chrono::Duration {
        chrono::Duration::hours(self.session_hours)
    }
}
