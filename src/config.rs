use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::info;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub general: GeneralConfig,

    pub server: ServerConfig,

    pub mail: MailConfig,

    pub auth: AuthConfig,

    pub security: SecurityConfig,

    pub observability: ObservabilityConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    pub database_path: String,

    pub log_level: String,

    /// Number of tokio worker threads (default: 2)
    /// Set to 0 to use the number of CPU cores
    pub worker_threads: usize,

    pub max_db_connections: u32,

    pub min_db_connections: u32,

    /// Ceiling applied to every storage call, transactions included.
    pub query_timeout_seconds: u64,

    /// `production` disables mail sandboxing.
    pub environment: String,

    pub version: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            database_path: "sqlite:data/postline.db".to_string(),
            log_level: "info".to_string(),
            worker_threads: 2,
            max_db_connections: 5,
            min_db_connections: 1,
            query_timeout_seconds: 5,
            environment: "development".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

impl GeneralConfig {
    #[must_use]
    pub fn is_production(&self) -> bool {
        self.environment.eq_ignore_ascii_case("production")
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,

    pub port: u16,

    /// Base URL activation links point at.
    pub frontend_url: String,

    pub cors_allowed_origins: Vec<String>,

    pub request_timeout_seconds: u64,

    pub max_body_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            frontend_url: "http://localhost:5173".to_string(),
            cors_allowed_origins: vec!["http://localhost:5173".to_string()],
            request_timeout_seconds: 60,
            max_body_bytes: 1_048_576,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MailProvider {
    Mailtrap,
    Log,
}

/// One year; longer invitation lifetimes are rejected by [`Config::validate`].
pub const MAX_INVITATION_EXPIRY_HOURS: i64 = 8760;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MailConfig {
    pub provider: MailProvider,

    pub api_url: String,

    /// Endpoint used instead of `api_url` outside production.
    pub sandbox_api_url: String,

    pub api_key: String,

    pub from_email: String,

    pub from_name: String,

    /// Upper bound on send attempts per invitation.
    pub max_retries: u32,

    pub invitation_expiry_hours: i64,
}

impl Default for MailConfig {
    fn default() -> Self {
        Self {
            provider: MailProvider::Log,
            api_url: "https://send.api.mailtrap.io/api/send".to_string(),
            sandbox_api_url: "https://sandbox.api.mailtrap.io/api/send".to_string(),
            api_key: String::new(),
            from_email: "hello@postline.dev".to_string(),
            from_name: "Postline".to_string(),
            max_retries: 3,
            invitation_expiry_hours: 72,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    pub basic: BasicAuthConfig,

    pub token: TokenConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BasicAuthConfig {
    pub username: String,

    pub password: String,
}

impl Default for BasicAuthConfig {
    fn default() -> Self {
        Self {
            username: "admin".to_string(),
            password: "admin".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TokenConfig {
    pub secret: String,

    pub audience: String,

    pub issuer: String,

    pub expiry_hours: i64,
}

impl Default for TokenConfig {
    fn default() -> Self {
        Self {
            secret: "change-me-before-deploying".to_string(),
            audience: "postline".to_string(),
            issuer: "postline".to_string(),
            expiry_hours: 72,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SecurityConfig {
    /// Argon2 memory cost in KiB (default: 8192 = 8MB)
    pub argon2_memory_cost_kib: u32,

    /// Argon2 time cost (iterations)
    pub argon2_time_cost: u32,

    pub argon2_parallelism: u32,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            argon2_memory_cost_kib: 8192,
            argon2_time_cost: 3,
            argon2_parallelism: 1,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    pub metrics_enabled: bool,

    pub loki_enabled: bool,

    pub loki_url: String,

    pub loki_labels: std::collections::HashMap<String, String>,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        let mut labels = std::collections::HashMap::new();
        labels.insert("app".to_string(), "postline".to_string());

        Self {
            metrics_enabled: true,
            loki_enabled: false,
            loki_url: "http://localhost:3100".to_string(),
            loki_labels: labels,
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        let paths = Self::config_paths();

        for path in &paths {
            if path.exists() {
                info!("Loading config from: {}", path.display());
                let mut config = Self::load_from_path(path)?;
                config.apply_env_overrides();
                return Ok(config);
            }
        }

        info!("No config file found, using defaults");
        let mut config = Self::default();
        config.apply_env_overrides();
        Ok(config)
    }

    pub fn load_from_path(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Self = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    pub fn save_to_path(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        info!("Config saved to: {}", path.display());
        Ok(())
    }

    fn config_paths() -> Vec<PathBuf> {
        let mut paths = vec![];

        paths.push(PathBuf::from("config.toml"));

        if let Some(config_dir) = dirs::config_dir() {
            paths.push(config_dir.join("postline").join("config.toml"));
        }

        if let Some(home) = dirs::home_dir() {
            paths.push(home.join(".postline").join("config.toml"));
        }

        paths
    }

    fn default_config_path() -> PathBuf {
        PathBuf::from("config.toml")
    }

    pub fn create_default_if_missing() -> Result<bool> {
        let path = Self::default_config_path();
        if path.exists() {
            Ok(false)
        } else {
            let config = Self::default();
            config.save_to_path(&path)?;
            info!("Created default config file: {}", path.display());
            Ok(true)
        }
    }

    /// Overlays `POSTLINE_*` variables (including ones loaded from `.env`).
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(format!("POSTLINE_{key}")).ok());
    }

    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(v) = lookup("DATABASE_URL") {
            self.general.database_path = v;
        }
        if let Some(v) = lookup("LOG_LEVEL") {
            self.general.log_level = v;
        }
        if let Some(v) = lookup("ENVIRONMENT") {
            self.general.environment = v;
        }
        if let Some(port) = lookup("PORT").and_then(|v| v.parse().ok()) {
            self.server.port = port;
        }
        if let Some(v) = lookup("FRONTEND_URL") {
            self.server.frontend_url = v;
        }
        if let Some(v) = lookup("MAIL_API_KEY") {
            self.mail.api_key = v;
        }
        if let Some(v) = lookup("MAIL_FROM") {
            self.mail.from_email = v;
        }
        if let Some(v) = lookup("TOKEN_SECRET") {
            self.auth.token.secret = v;
        }
        if let Some(v) = lookup("BASIC_AUTH_USERNAME") {
            self.auth.basic.username = v;
        }
        if let Some(v) = lookup("BASIC_AUTH_PASSWORD") {
            self.auth.basic.password = v;
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.mail.max_retries == 0 {
            anyhow::bail!("mail.max_retries must be at least 1");
        }

        if !(1..=MAX_INVITATION_EXPIRY_HOURS).contains(&self.mail.invitation_expiry_hours) {
            anyhow::bail!(
                "mail.invitation_expiry_hours must be between 1 and {MAX_INVITATION_EXPIRY_HOURS}"
            );
        }

        if self.mail.provider == MailProvider::Mailtrap && self.mail.api_key.is_empty() {
            anyhow::bail!("mail.api_key cannot be empty when the mailtrap provider is enabled");
        }

        if self.auth.token.secret.is_empty() {
            anyhow::bail!("auth.token.secret cannot be empty");
        }

        if self.auth.basic.username.is_empty() || self.auth.basic.password.is_empty() {
            anyhow::bail!("auth.basic credentials cannot be empty");
        }

        if self.general.query_timeout_seconds == 0 {
            anyhow::bail!("general.query_timeout_seconds must be > 0");
        }

        Ok(())
    }
}
