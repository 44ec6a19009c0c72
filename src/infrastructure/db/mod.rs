pub mod postgres;
pub mod sqlite;

use std::sync::Arc;

use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::info;

use crate::domain::error::{AppError, Result};
use crate::domain::user::{NewUser, StoredUser};
use crate::infrastructure::config::AppConfig;

pub use postgres::PgUserStore;
pub use sqlite::SqliteUserStore;

static TABLE_NAME_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").unwrap());

/// Persistence for imported user rows.
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Create the users table if it does not exist yet.
    async fn ensure_schema(&self) -> Result<()>;

    /// Insert every row inside one transaction. Either all rows become visible or none do.
    async fn insert_users(&self, users: &[NewUser]) -> Result<u64>;

    /// All stored rows ordered by id.
    async fn list_users(&self) -> Result<Vec<StoredUser>>;

    /// Every non-null stored age.
    async fn list_ages(&self) -> Result<Vec<i64>>;
}

/// The table name is spliced into SQL text, so only plain identifiers are accepted.
pub fn validate_table_name(table: &str) -> Result<()> {
    if TABLE_NAME_PATTERN.is_match(table) {
        Ok(())
    } else {
        Err(AppError::ConfigError(format!(
            "Invalid table name '{}': expected letters, digits and underscores",
            table
        )))
    }
}

/// Connect the backend selected by the configuration.
pub async fn connect_user_store(config: &AppConfig) -> Result<Arc<dyn UserStore>> {
    validate_table_name(&config.table)?;

    let store: Arc<dyn UserStore> = if config.database.is_sqlite() {
        let url = config.database.url.as_deref().unwrap_or("sqlite::memory:");
        info!(table = %config.table, "Using SQLite storage");
        Arc::new(
            SqliteUserStore::connect(url, &config.table, config.database.max_connections).await?,
        )
    } else {
        info!(table = %config.table, "Using PostgreSQL storage");
        Arc::new(PgUserStore::connect(&config.database, &config.table).await?)
    };

    Ok(store)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_table_name() {
        assert!(validate_table_name("users").is_ok());
        assert!(validate_table_name("_import_2024").is_ok());
        assert!(validate_table_name("").is_err());
        assert!(validate_table_name("2users").is_err());
        assert!(validate_table_name("users;drop").is_err());
        assert!(validate_table_name("public.users").is_err());
    }
}
