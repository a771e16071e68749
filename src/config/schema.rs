use anyhow::{bail, Context, Result};
use chrono::TimeDelta;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Upper bound for configured lifetimes (10 years).
const MAX_TTL_MINUTES: u64 = 10 * 365 * 24 * 60;

/// Top-level configuration (`config.toml`).
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct Config {
    /// SQLite database file. `~` is expanded.
    pub database_path: String,
    pub auth: AuthConfig,
    pub sweep: SweepConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_path: "tokenvault.db".into(),
            auth: AuthConfig::default(),
            sweep: SweepConfig::default(),
        }
    }
}

/// `[auth]` section.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct AuthConfig {
    /// HS256 signing secret for access tokens. Required.
    pub jwt_secret: Option<String>,
    /// Access-token lifetime in minutes.
    pub access_token_ttl_minutes: u64,
    /// Refresh-token lifetime in minutes.
    pub refresh_token_ttl_minutes: u64,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            jwt_secret: None,
            access_token_ttl_minutes: 60,
            refresh_token_ttl_minutes: 7 * 24 * 60,
        }
    }
}

impl AuthConfig {
    pub fn access_token_ttl(&self) -> TimeDelta {
        TimeDelta::minutes(self.access_token_ttl_minutes as i64)
    }

    pub fn refresh_token_ttl(&self) -> TimeDelta {
        TimeDelta::minutes(self.refresh_token_ttl_minutes as i64)
    }

    /// The signing secret, or an error if none is configured.
    pub fn jwt_secret(&self) -> Result<&str> {
        self.jwt_secret
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .context("No access token signing secret configured (set auth.jwt_secret or TOKENVAULT_JWT_SECRET)")
    }
}

/// `[sweep]` section.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct SweepConfig {
    /// Seconds between expired-token purges in watch mode.
    pub interval_secs: u64,
}

impl Default for SweepConfig {
    fn default() -> Self {
        Self {
            interval_secs: 3600,
        }
    }
}

impl Config {
    /// Load from `path` (or the default location), apply environment
    /// overrides, and validate.
    ///
    /// A missing file at the default location yields defaults. An explicit
    /// path must exist, and a present but unparsable file is an error.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let file = match path {
            Some(explicit) => {
                if !explicit.exists() {
                    bail!("Config file not found at {}", explicit.display());
                }
                Some(explicit.to_path_buf())
            }
            None => default_config_path().filter(|p| p.exists()),
        };

        let mut config = match file {
            Some(path) => {
                let raw = std::fs::read_to_string(&path)
                    .with_context(|| format!("Failed to read config at {}", path.display()))?;
                let config = Self::from_toml(&raw)
                    .with_context(|| format!("Invalid config at {}", path.display()))?;
                tracing::debug!("Loaded config from {}", path.display());
                config
            }
            None => {
                tracing::debug!("No config file found, using defaults");
                Self::default()
            }
        };
        config.apply_overrides(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    pub fn from_toml(raw: &str) -> Result<Self> {
        Ok(toml::from_str(raw)?)
    }

    /// Apply `TOKENVAULT_*` overrides from `lookup`. Blank values are ignored.
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        if let Some(secret) = get("TOKENVAULT_JWT_SECRET") {
            self.auth.jwt_secret = Some(secret);
        }
        if let Some(path) = get("TOKENVAULT_DATABASE_PATH") {
            self.database_path = path;
        }
        for (key, slot) in [
            (
                "TOKENVAULT_ACCESS_TOKEN_TTL_MINUTES",
                &mut self.auth.access_token_ttl_minutes,
            ),
            (
                "TOKENVAULT_REFRESH_TOKEN_TTL_MINUTES",
                &mut self.auth.refresh_token_ttl_minutes,
            ),
        ] {
            if let Some(raw) = get(key) {
                match raw.parse::<u64>() {
                    Ok(value) => *slot = value,
                    Err(_) => tracing::warn!("Ignoring {key}={raw}: not a whole number of minutes"),
                }
            }
        }
    }

    pub fn validate(&self) -> Result<()> {
        self.auth.jwt_secret()?;

        let access = self.auth.access_token_ttl_minutes;
        let refresh = self.auth.refresh_token_ttl_minutes;
        if access == 0 || refresh == 0 {
            bail!("Token lifetimes must be greater than zero");
        }
        if access > MAX_TTL_MINUTES || refresh > MAX_TTL_MINUTES {
            bail!("Token lifetimes must not exceed {MAX_TTL_MINUTES} minutes");
        }
        if refresh <= access {
            bail!(
                "Refresh token lifetime ({refresh}m) must be longer than access token lifetime ({access}m)"
            );
        }
        if self.sweep.interval_secs == 0 {
            bail!("sweep.interval_secs must be greater than zero");
        }
        if self.database_path.trim().is_empty() {
            bail!("database_path must not be empty");
        }
        Ok(())
    }

    /// Database path with `~` expanded.
    pub fn database_path(&self) -> PathBuf {
        PathBuf::from(shellexpand::tilde(&self.database_path).into_owned())
    }
}

/// `<platform config dir>/tokenvault/config.toml`, if a home directory exists.
pub fn default_config_path() -> Option<PathBuf> {
    directories::ProjectDirs::from("", "", "tokenvault")
        .map(|dirs| dirs.config_dir().join("config.toml"))
}

/// JSON schema of [`Config`] for editor tooling.
pub fn config_json_schema() -> Result<String> {
    let schema = schemars::schema_for!(Config);
    Ok(serde_json::to_string_pretty(&schema)?)
}
