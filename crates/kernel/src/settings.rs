use std::path::{Path, PathBuf};
use std::str::FromStr;

use anyhow::{anyhow, Context};
use serde::{Deserialize, Serialize};

const DEFAULT_ENV: &str = "local";
const ENV_VAR_NAME: &str = "BOOKREVIEW_ENV";
const CONFIG_DIR_ENV: &str = "BOOKREVIEW_CONFIG_DIR";
const ENV_PREFIX: &str = "BOOKREVIEW";

/// Deployment environment the application is running in.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    Local,
    Staging,
    Production,
}

impl FromStr for Environment {
    type Err = anyhow::Error;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw {
            "local" => Ok(Environment::Local),
            "staging" => Ok(Environment::Staging),
            "production" => Ok(Environment::Production),
            other => Err(anyhow!(
                "unsupported environment '{}'; expected local/staging/production",
                other
            )),
        }
    }
}

/// Top-level configuration structure loaded from layered sources.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct Settings {
    #[serde(default)]
    pub environment: Environment,
    #[serde(default)]
    pub server: ServerSettings,
    #[serde(default)]
    pub database: DatabaseSettings,
    #[serde(default)]
    pub auth: AuthSettings,
    #[serde(default)]
    pub pagination: PaginationSettings,
    #[serde(default)]
    pub telemetry: TelemetrySettings,
}

impl Settings {
    /// Load configuration by layering `.env`, base file, environment overlay
    /// and `BOOKREVIEW__*` variables.
    pub fn load() -> anyhow::Result<Self> {
        // Allow missing `.env` files without failing.
        let _ = dotenvy::dotenv();

        let environment = std::env::var(ENV_VAR_NAME).unwrap_or_else(|_| DEFAULT_ENV.to_string());
        let config_dir = match std::env::var(CONFIG_DIR_ENV) {
            Ok(dir) => PathBuf::from(dir),
            Err(_) => std::env::current_dir()
                .context("unable to resolve current directory")?
                .join("config"),
        };

        Self::load_from(&config_dir, &environment)
    }

    /// Load from an explicit config directory and environment name.
    pub fn load_from(config_dir: &Path, environment: &str) -> anyhow::Result<Self> {
        let parsed_env: Environment = environment.parse()?;

        let base_path = config_dir.join("base.toml");
        let environment_path = config_dir.join(format!("{}.toml", environment));

        let builder = config::Config::builder()
            .add_source(config::File::from(base_path).required(false))
            .add_source(config::File::from(environment_path).required(false))
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__"),
            );

        let cfg = builder
            .build()
            .with_context(|| "failed to build configuration")?;

        let mut settings: Settings = cfg
            .try_deserialize()
            .with_context(|| "failed to deserialize configuration")?;

        settings.environment = parsed_env;
        Ok(settings)
    }

    /// Settings as JSON with secrets masked, for diagnostics.
    pub fn redacted(&self) -> serde_json::Value {
        let mut value = serde_json::to_value(self).unwrap_or_default();
        if let Some(database) = value.get_mut("database") {
            if self.database.uri.is_some() {
                database["uri"] = "<redacted>".into();
            }
        }
        if let Some(auth) = value.get_mut("auth") {
            if !self.auth.jwt_secret.is_empty() {
                auth["jwt_secret"] = "<redacted>".into();
            }
            if let Some(admin) = auth.get_mut("bootstrap_admin").filter(|a| !a.is_null()) {
                admin["password"] = "<redacted>".into();
            }
        }
        value
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerSettings {
    #[serde(default = "ServerSettings::default_host")]
    pub host: String,
    #[serde(default = "ServerSettings::default_port")]
    pub port: u16,
    #[serde(default = "ServerSettings::default_request_timeout_ms")]
    pub request_timeout_ms: u64,
    /// Allowed browser origin; any origin when unset.
    #[serde(default)]
    pub cors_origin: Option<String>,
    #[serde(default = "ServerSettings::default_body_limit_bytes")]
    pub body_limit_bytes: usize,
}

impl ServerSettings {
    fn default_host() -> String {
        "0.0.0.0".to_string()
    }

    fn default_port() -> u16 {
        5001
    }

    fn default_request_timeout_ms() -> u64 {
        15000
    }

    fn default_body_limit_bytes() -> usize {
        10 * 1024
    }
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: Self::default_host(),
            port: Self::default_port(),
            request_timeout_ms: Self::default_request_timeout_ms(),
            cors_origin: None,
            body_limit_bytes: Self::default_body_limit_bytes(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DatabaseSettings {
    /// MongoDB connection string. The in-memory store is used when unset.
    #[serde(default)]
    pub uri: Option<String>,
    #[serde(default = "DatabaseSettings::default_name")]
    pub name: String,
}

impl DatabaseSettings {
    fn default_name() -> String {
        "bookreview".to_string()
    }

    /// The configured URI, ignoring blank values.
    pub fn uri(&self) -> Option<&str> {
        self.uri.as_deref().map(str::trim).filter(|uri| !uri.is_empty())
    }
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        Self {
            uri: None,
            name: Self::default_name(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AuthSettings {
    /// HS256 key for bearer tokens. Start-up fails while this is empty.
    #[serde(default)]
    pub jwt_secret: String,
    #[serde(default = "AuthSettings::default_token_ttl_secs")]
    pub token_ttl_secs: u64,
    /// Admin account created on start-up when no user holds its email yet.
    #[serde(default)]
    pub bootstrap_admin: Option<BootstrapAdmin>,
}

impl AuthSettings {
    fn default_token_ttl_secs() -> u64 {
        30 * 24 * 60 * 60
    }
}

impl Default for AuthSettings {
    fn default() -> Self {
        Self {
            jwt_secret: String::new(),
            token_ttl_secs: Self::default_token_ttl_secs(),
            bootstrap_admin: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct BootstrapAdmin {
    pub username: String,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Copy, Deserialize, Serialize)]
pub struct PaginationSettings {
    #[serde(default = "PaginationSettings::default_books_page_size")]
    pub books_page_size: u64,
    #[serde(default = "PaginationSettings::default_reviews_page_size")]
    pub reviews_page_size: u64,
    #[serde(default = "PaginationSettings::default_max_page_size")]
    pub max_page_size: u64,
}

impl PaginationSettings {
    fn default_books_page_size() -> u64 {
        10
    }

    fn default_reviews_page_size() -> u64 {
        5
    }

    fn default_max_page_size() -> u64 {
        100
    }
}

impl Default for PaginationSettings {
    fn default() -> Self {
        Self {
            books_page_size: Self::default_books_page_size(),
            reviews_page_size: Self::default_reviews_page_size(),
            max_page_size: Self::default_max_page_size(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct TelemetrySettings {
    #[serde(default)]
    pub log_format: LogFormat,
    /// `EnvFilter` directive used when `RUST_LOG` is unset.
    #[serde(default)]
    pub filter: Option<String>,
}

#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scratch_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("bookreview-settings-{}-{}", name, std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn default_environment_is_local() {
        let settings = Settings::default();
        assert_eq!(settings.environment, Environment::Local);
    }

    #[test]
    fn defaults_match_service_conventions() {
        let settings = Settings::default();
        assert_eq!(settings.server.port, 5001);
        assert_eq!(settings.server.body_limit_bytes, 10 * 1024);
        assert_eq!(settings.pagination.books_page_size, 10);
        assert_eq!(settings.pagination.reviews_page_size, 5);
        assert_eq!(settings.auth.token_ttl_secs, 2_592_000);
        assert!(settings.auth.jwt_secret.is_empty());
        assert_eq!(settings.database.name, "bookreview");
        assert!(settings.database.uri().is_none());
    }

    #[test]
    fn blank_database_uri_counts_as_unset() {
        let mut database = DatabaseSettings {
            uri: Some("   ".to_string()),
            ..DatabaseSettings::default()
        };
        assert!(database.uri().is_none());

        database.uri = Some("mongodb://localhost:27017".to_string());
        assert_eq!(database.uri(), Some("mongodb://localhost:27017"));
    }

    #[test]
    fn environment_file_overlays_base() {
        let dir = scratch_dir("overlay");
        std::fs::write(
            dir.join("base.toml"),
            "[server]\nport = 7000\n[auth]\njwt_secret = \"base\"\n",
        )
        .unwrap();
        std::fs::write(dir.join("staging.toml"), "[auth]\njwt_secret = \"staging\"\n").unwrap();

        let settings = Settings::load_from(&dir, "staging").unwrap();
        assert_eq!(settings.environment, Environment::Staging);
        assert_eq!(settings.server.port, 7000);
        assert_eq!(settings.auth.jwt_secret, "staging");

        std::fs::remove_dir_all(dir).ok();
    }

    #[test]
    fn unknown_environment_is_rejected() {
        let dir = scratch_dir("unknown");
        let err = Settings::load_from(&dir, "qa").unwrap_err();
        assert!(err.to_string().contains("unsupported environment 'qa'"));
        std::fs::remove_dir_all(dir).ok();
    }

    #[test]
    fn redacted_hides_secrets() {
        let mut settings = Settings::default();
        settings.auth.jwt_secret = "hunter2".to_string();
        settings.database.uri = Some("mongodb://app:hunter4@db:27017".to_string());
        settings.auth.bootstrap_admin = Some(BootstrapAdmin {
            username: "admin".to_string(),
            email: "admin@example.com".to_string(),
            password: "hunter3".to_string(),
        });

        let value = settings.redacted();
        assert_eq!(value["auth"]["jwt_secret"], "<redacted>");
        assert_eq!(value["auth"]["bootstrap_admin"]["password"], "<redacted>");
        assert_eq!(value["auth"]["bootstrap_admin"]["username"], "admin");
        assert_eq!(value["database"]["uri"], "<redacted>");
        assert_eq!(value["database"]["name"], "bookreview");
        assert!(!value.to_string().contains("hunter"));
    }
}
