use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct UserConfig {
    pub username: String,
    pub password_hash: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_bind_addr")]
    pub bind_addr: SocketAddr,
    #[serde(default)]
    pub auth: AuthConfig,
    #[serde(default)]
    pub rate_limit: RateLimitConfig,
    #[serde(default)]
    pub users: Vec<UserConfig>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfig {
    #[serde(default)]
    pub jwt_secret: String,
    #[serde(default = "default_jwt_ttl_hours")]
    pub jwt_ttl_hours: u64,
}

/// Request-rate and throttle housekeeping settings.
///
/// The failed-login allowance and block durations are fixed in
/// `loginguard_core::policy` and deliberately absent here.
#[derive(Debug, Clone, Deserialize)]
pub struct RateLimitConfig {
    #[serde(default = "default_login_rpm")]
    pub login_requests_per_minute: u32,
    #[serde(default = "default_sweep_interval_secs")]
    pub sweep_interval_secs: u64,
    /// Take the client address from `X-Forwarded-For` / `X-Real-IP`.
    /// Only safe behind a reverse proxy that overwrites these headers.
    #[serde(default)]
    pub trust_forwarded_for: bool,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            jwt_secret: String::new(),
            jwt_ttl_hours: default_jwt_ttl_hours(),
        }
    }
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            login_requests_per_minute: default_login_rpm(),
            sweep_interval_secs: default_sweep_interval_secs(),
            trust_forwarded_for: false,
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
            auth: AuthConfig::default(),
            rate_limit: RateLimitConfig::default(),
            users: Vec::new(),
        }
    }
}

fn default_bind_addr() -> SocketAddr {
    SocketAddr::from(([0, 0, 0, 0], 8080))
}

fn default_jwt_ttl_hours() -> u64 { 24 }
fn default_login_rpm() -> u32 { 5 }
fn default_sweep_interval_secs() -> u64 { 300 }

const WEAK_SECRETS: &[&str] = &[
    "change-me-to-a-random-secret",
    "secret",
    "password",
    "jwt-secret",
];

impl ServerConfig {
    pub fn find_user(&self, username: &str) -> Option<&UserConfig> {
        self.users.iter().find(|u| u.username == username)
    }

    pub fn sweep_interval(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.rate_limit.sweep_interval_secs.max(1))
    }

    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("Failed to read config {}: {e}", path.display()))?;
        Ok(toml::from_str(&contents)?)
    }

    /// Reads `LOGINGUARD_CONFIG` (if set), applies environment overrides, and
    /// validates the result.
    pub fn load() -> anyhow::Result<Self> {
        let config_path = std::env::var("LOGINGUARD_CONFIG").map(PathBuf::from).ok();

        let mut config = match config_path {
            Some(path) => Self::from_file(&path)?,
            None => Self::default(),
        };

        config.apply_env_overrides()?;
        config.finalize()?;
        Ok(config)
    }

    fn apply_env_overrides(&mut self) -> anyhow::Result<()> {
        if let Ok(secret) = std::env::var("LOGINGUARD_JWT_SECRET") {
            self.auth.jwt_secret = secret;
        }

        if let Ok(addr) = std::env::var("LOGINGUARD_BIND_ADDR") {
            self.bind_addr = addr.parse()?;
        }

        if let Ok(val) = std::env::var("LOGINGUARD_SWEEP_INTERVAL_SECS") {
            if let Ok(secs) = val.parse::<u64>() {
                self.rate_limit.sweep_interval_secs = secs;
            }
        }

        if let Ok(val) = std::env::var("LOGINGUARD_TRUST_FORWARDED_FOR") {
            self.rate_limit.trust_forwarded_for = matches!(val.as_str(), "1" | "true" | "yes");
        }

        Ok(())
    }

    /// Fills in a JWT secret when none is configured and rejects weak ones.
    fn finalize(&mut self) -> anyhow::Result<()> {
        if self.auth.jwt_secret.is_empty() {
            self.auth.jwt_secret = uuid::Uuid::new_v4().to_string();
            tracing::warn!(
                "No JWT secret configured. Generated random secret (will change on restart)."
            );
        }

        if WEAK_SECRETS.iter().any(|&w| self.auth.jwt_secret == w) {
            anyhow::bail!(
                "JWT secret matches a known weak/placeholder value. \
                 Set a strong random secret via LOGINGUARD_JWT_SECRET."
            );
        }
        if self.auth.jwt_secret.len() < 32 {
            tracing::warn!("JWT secret is shorter than 32 characters.");
        }

        if self.users.is_empty() {
            tracing::warn!("No users configured. Every login attempt will fail.");
        }

        Ok(())
    }
}
