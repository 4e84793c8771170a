use serde::Deserialize;
use std::env;
use std::path::{Path, PathBuf};
use config::ConfigError;

/// Minimum length of `JWT_SECRET`, in bytes. HS256 keys shorter than the
/// digest size weaken the signature.
pub const MIN_JWT_SECRET_LEN: usize = 32;

const DEFAULT_CONFIG_FILE: &str = "config/default.toml";

#[derive(Debug, Deserialize, Clone)]
pub struct WebConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub web: WebConfig,
    pub database_url: String,
    pub jwt_secret: String,
    pub app_env: String,
    pub log_level: String,
    pub allowed_origins: String,
    pub trust_proxy_headers: bool,
    pub bcrypt_cost: u32,
}

/// Optional environment variables and the config keys they override.
const ENV_OVERRIDES: &[(&str, &str)] = &[
    ("HOST", "web.host"),
    ("PORT", "web.port"),
    ("APP_ENV", "app_env"),
    ("LOG_LEVEL", "log_level"),
    ("ALLOWED_ORIGINS", "allowed_origins"),
    ("TRUST_PROXY_HEADERS", "trust_proxy_headers"),
    ("BCRYPT_COST", "bcrypt_cost"),
];

impl Config {
    /// Loads the `.env` file (the given one, or `./.env` when present) and
    /// builds the configuration from the process environment.
    pub fn from_env(env_path: Option<&Path>) -> Result<Self, ConfigError> {
        match env_path {
            Some(path) => {
                dotenvy::from_path(path).map_err(|e| ConfigError::Message(format!(
                    "Failed to load .env file from '{}'. Error: {}", path.display(), e
                )))?;
            }
            None => {
                if let Err(e) = dotenvy::dotenv() {
                    if !e.not_found() {
                        return Err(ConfigError::Message(format!("Failed to load .env file. Error: {}", e)));
                    }
                }
            }
        }

        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the configuration from `config/default.toml` (if present),
    /// overridden by whatever `lookup` returns for each known variable.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        // --- VALIDATION OF REQUIRED VARIABLES ---
        let database_url = lookup("DATABASE_URL")
            .filter(|v| !v.trim().is_empty())
            .ok_or_else(|| ConfigError::Message(
                "Environment variable 'DATABASE_URL' is not set.".to_string()
            ))?;

        let jwt_secret = lookup("JWT_SECRET")
            .ok_or_else(|| ConfigError::Message(
                "Environment variable 'JWT_SECRET' is not set.".to_string()
            ))?;

        if jwt_secret.len() < MIN_JWT_SECRET_LEN {
            return Err(ConfigError::Message(format!(
                "'JWT_SECRET' must be at least {} bytes long.", MIN_JWT_SECRET_LEN
            )));
        }

        if let Some(app_env) = lookup("APP_ENV") {
            if app_env != "development" && app_env != "production" {
                return Err(ConfigError::Message(format!(
                    "'APP_ENV' must be 'development' or 'production', got '{}'.", app_env
                )));
            }
        }
        // --- END VALIDATION ---

        let mut builder = config::Config::builder()
            .set_default("web.host", "127.0.0.1")?
            .set_default("web.port", 5555_i64)?
            .set_default("app_env", "production")?
            .set_default("log_level", "info")?
            .set_default("allowed_origins", "")?
            .set_default("trust_proxy_headers", false)?
            .set_default("bcrypt_cost", i64::from(bcrypt::DEFAULT_COST))?
            .add_source(config::File::new(DEFAULT_CONFIG_FILE, config::FileFormat::Toml).required(false))
            .set_override("database_url", database_url)?
            .set_override("jwt_secret", jwt_secret)?;

        for (var, key) in ENV_OVERRIDES {
            if let Some(value) = lookup(*var) {
                builder = builder.set_override(*key, value)?;
            }
        }

        builder.build()?.try_deserialize()
    }

    pub fn is_development(&self) -> bool {
        self.app_env == "development"
    }

    /// Path of the SQLite database file. A leading `sqlite://` is accepted.
    pub fn database_path(&self) -> PathBuf {
        let raw = self.database_url.strip_prefix("sqlite://").unwrap_or(&self.database_url);
        PathBuf::from(raw)
    }

    pub fn server_address(&self) -> String {
        format!("{}:{}", self.web.host, self.web.port)
    }
}
