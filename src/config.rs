//! Process configuration, read once at startup and immutable afterwards.
//! The signing secret and TTL constants are passed explicitly into the token
//! manager at construction time; nothing reads ambient process state later.

use std::time::Duration;

fn env_u64(name: &str, default: u64) -> u64 {
    std::env::var(name).ok().and_then(|s| s.parse::<u64>().ok()).unwrap_or(default)
}

/// Signing and lifetime parameters for issued credentials.
#[derive(Debug, Clone)]
pub struct AuthConfig {
    /// HMAC secret for token signatures.
    pub secret: String,
    pub access_ttl: Duration,
    pub refresh_ttl: Duration,
}

impl AuthConfig {
    pub fn new<S: Into<String>>(secret: S, access_ttl: Duration, refresh_ttl: Duration) -> Self {
        Self { secret: secret.into(), access_ttl, refresh_ttl }
    }

    /// Build from `LOBBYD_SECRET`, `LOBBYD_ACCESS_TTL_SECS` and
    /// `LOBBYD_REFRESH_TTL_SECS`. Defaults: 15 minute access, 14 day refresh.
    pub fn from_env() -> Self {
        let secret = std::env::var("LOBBYD_SECRET").unwrap_or_else(|_| "dev-secret-change-me".to_string());
        let access = env_u64("LOBBYD_ACCESS_TTL_SECS", 15 * 60);
        let refresh = env_u64("LOBBYD_REFRESH_TTL_SECS", 14 * 24 * 60 * 60);
        Self::new(secret, Duration::from_secs(access), Duration::from_secs(refresh))
    }
}

/// Host-facing server settings.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub http_port: u16,
    pub db_root: String,
}

impl ServerConfig {
    pub fn from_env() -> Self {
        let http_port = env_u64("LOBBYD_HTTP_PORT", 8090) as u16;
        let db_root = std::env::var("LOBBYD_DB_FOLDER").unwrap_or_else(|_| "dbs".to_string());
        Self { http_port, db_root }
    }
}
