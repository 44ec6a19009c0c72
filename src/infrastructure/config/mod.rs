//! Service configuration.
//!
//! Loaded once at startup and passed down explicitly. Sources, later ones winning:
//! - built-in defaults
//! - `csv_user_import.toml` (or the file named by `APP_CONFIG`)
//! - environment variables (`CSV_FILE_PATH`, `PORT`, `DATABASE_URL`, `PG*`, ...)

use std::path::PathBuf;

use figment::providers::{Env, Format, Serialized, Toml};
use figment::value::{Uncased, UncasedStr};
use figment::Figment;
use serde::{Deserialize, Deserializer, Serialize};

use crate::domain::error::Result;
use crate::infrastructure::db::validate_table_name;

pub const DEFAULT_CONFIG_FILE: &str = "csv_user_import.toml";
const ENV_CONFIG_FILE: &str = "APP_CONFIG";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    /// CSV source read by `/upload`
    pub csv_path: PathBuf,
    pub host: String,
    pub port: u16,
    /// Target table; must be a plain SQL identifier
    pub table: String,
    pub database: DatabaseConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            csv_path: PathBuf::from("./sample.csv"),
            host: "127.0.0.1".to_string(),
            port: 3000,
            table: "users".to_string(),
            database: DatabaseConfig::default(),
        }
    }
}

/// Storage connection parameters. `url` wins over the individual fields when set;
/// a `sqlite:` url selects the SQLite backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: Option<String>,
    pub host: String,
    pub port: u16,
    #[serde(deserialize_with = "lenient_string")]
    pub user: String,
    #[serde(default, deserialize_with = "lenient_opt_string")]
    pub password: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    pub name: String,
    pub ssl_mode: String,
    pub max_connections: u32,
    pub connect_timeout_secs: u64,
    pub idle_timeout_secs: u64,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: None,
            host: "localhost".to_string(),
            port: 5432,
            user: "postgres".to_string(),
            password: None,
            name: "postgres".to_string(),
            ssl_mode: "prefer".to_string(),
            max_connections: 5,
            connect_timeout_secs: 10,
            idle_timeout_secs: 300,
        }
    }
}

impl DatabaseConfig {
    pub fn is_sqlite(&self) -> bool {
        self.url
            .as_deref()
            .map(|url| url.starts_with("sqlite:"))
            .unwrap_or(false)
    }
}

impl AppConfig {
    /// Load from every source and validate.
    pub fn load() -> Result<Self> {
        let config: AppConfig = Self::figment().extract()?;
        config.validate()?;
        Ok(config)
    }

    pub fn figment() -> Figment {
        let file = std::env::var(ENV_CONFIG_FILE).unwrap_or_else(|_| DEFAULT_CONFIG_FILE.to_string());

        Figment::from(Serialized::defaults(AppConfig::default()))
            .merge(Toml::file(file))
            .merge(Env::raw().filter_map(map_env_key))
    }

    pub fn validate(&self) -> Result<()> {
        validate_table_name(&self.table)
    }
}

fn map_env_key(key: &UncasedStr) -> Option<Uncased<'_>> {
    let mapped = match key.as_str().to_ascii_uppercase().as_str() {
        "CSV_FILE_PATH" => "csv_path",
        "APP_HOST" => "host",
        "PORT" => "port",
        "USERS_TABLE" => "table",
        "DATABASE_URL" => "database.url",
        "PGHOST" => "database.host",
        "PGPORT" => "database.port",
        "PGUSER" => "database.user",
        "PGPASSWORD" => "database.password",
        "PGDATABASE" => "database.name",
        "PGSSLMODE" => "database.ssl_mode",
        "DB_MAX_CONNECTIONS" => "database.max_connections",
        _ => return None,
    };
    Some(mapped.into())
}

// Environment values that look numeric (e.g. PGPASSWORD=12345) arrive as numbers.
#[derive(Deserialize)]
#[serde(untagged)]
enum StringOrNumber {
    Text(String),
    Int(i64),
    Float(f64),
}

impl From<StringOrNumber> for String {
    fn from(value: StringOrNumber) -> Self {
        match value {
            StringOrNumber::Text(s) => s,
            StringOrNumber::Int(n) => n.to_string(),
            StringOrNumber::Float(f) => f.to_string(),
        }
    }
}

fn lenient_string<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    StringOrNumber::deserialize(deserializer).map(String::from)
}

fn lenient_opt_string<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<StringOrNumber>::deserialize(deserializer).map(|value| value.map(String::from))
}

#[cfg(test)]
mod tests {
    use super::*;
    use figment::Jail;

    #[test]
    fn test_defaults() {
        Jail::expect_with(|jail| {
            jail.clear_env();
            let config: AppConfig = AppConfig::figment().extract()?;
            assert_eq!(config, AppConfig::default());
            assert_eq!(config.port, 3000);
            assert_eq!(config.csv_path, PathBuf::from("./sample.csv"));
            Ok(())
        });
    }

    #[test]
    fn test_env_overrides() {
        Jail::expect_with(|jail| {
            jail.clear_env();
            jail.set_env("CSV_FILE_PATH", "/data/people.csv");
            jail.set_env("PORT", "8080");
            jail.set_env("PGHOST", "db.internal");
            jail.set_env("PGPASSWORD", "12345");
            jail.set_env("USERS_TABLE", "people");

            let config: AppConfig = AppConfig::figment().extract()?;
            assert_eq!(config.csv_path, PathBuf::from("/data/people.csv"));
            assert_eq!(config.port, 8080);
            assert_eq!(config.table, "people");
            assert_eq!(config.database.host, "db.internal");
            assert_eq!(config.database.password.as_deref(), Some("12345"));
            Ok(())
        });
    }

    #[test]
    fn test_toml_file_then_env() {
        Jail::expect_with(|jail| {
            jail.clear_env();
            jail.create_file(
                DEFAULT_CONFIG_FILE,
                r#"
                port = 4000
                csv_path = "people.csv"

                [database]
                url = "sqlite::memory:"
                "#,
            )?;
            jail.set_env("PORT", "5000");

            let config: AppConfig = AppConfig::figment().extract()?;
            assert_eq!(config.port, 5000);
            assert_eq!(config.csv_path, PathBuf::from("people.csv"));
            assert!(config.database.is_sqlite());
            Ok(())
        });
    }

    #[test]
    fn test_env_key_mapping() {
        assert_eq!(
            map_env_key(UncasedStr::new("pgsslmode")).as_deref(),
            Some(UncasedStr::new("database.ssl_mode"))
        );
        assert_eq!(
            map_env_key(UncasedStr::new("DATABASE_URL")).as_deref(),
            Some(UncasedStr::new("database.url"))
        );
        assert!(map_env_key(UncasedStr::new("HOME")).is_none());
    }

    #[test]
    fn test_load_reads_env() {
        Jail::expect_with(|jail| {
            jail.clear_env();
            jail.set_env("DATABASE_URL", "sqlite::memory:");
            jail.set_env("DB_MAX_CONNECTIONS", "2");

            let config = AppConfig::load().map_err(|e| e.to_string())?;
            assert!(config.database.is_sqlite());
            assert_eq!(config.database.max_connections, 2);
            Ok(())
        });
    }

    #[test]
    fn test_invalid_table_is_rejected() {
        let config = AppConfig {
            table: "users; DROP TABLE users".to_string(),
            ..AppConfig::default()
        };
        assert!(config.validate().is_err());
        assert!(AppConfig::default().validate().is_ok());
    }
}
