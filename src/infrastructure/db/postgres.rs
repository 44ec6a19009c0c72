//! PostgreSQL backend for imported users.
//!
//! `address` and `additional_info` are JSONB columns. The pool is built either
//! from `DATABASE_URL` or from the individual `PG*` settings.

use async_trait::async_trait;
use serde_json::Value as JsonValue;
use sqlx::postgres::{PgConnectOptions, PgPool, PgPoolOptions, PgSslMode};
use std::str::FromStr;
use std::time::Duration;
use tracing::{error, info};

use super::{validate_table_name, UserStore};
use crate::domain::error::{AppError, Result};
use crate::domain::user::{NewUser, StoredUser};
use crate::infrastructure::config::DatabaseConfig;

pub struct PgUserStore {
    pool: PgPool,
    table: String,
}

impl PgUserStore {
    pub async fn connect(config: &DatabaseConfig, table: &str) -> Result<Self> {
        let options = build_pg_options(config)?;

        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(Duration::from_secs(config.connect_timeout_secs))
            .idle_timeout(Duration::from_secs(config.idle_timeout_secs))
            .connect_with(options)
            .await
            .map_err(|e| {
                error!("Failed to connect to PostgreSQL: {}", e);
                AppError::DatabaseError(format!("Failed to connect to PostgreSQL: {}", e))
            })?;

        info!(
            host = %config.host,
            database = %config.name,
            "Created PostgreSQL connection pool"
        );

        Self::new(pool, table)
    }

    pub fn new(pool: PgPool, table: &str) -> Result<Self> {
        validate_table_name(table)?;
        Ok(Self {
            pool,
            table: table.to_string(),
        })
    }
}

/// Parse SSL mode string to PgSslMode
fn parse_ssl_mode(ssl_mode: &str) -> PgSslMode {
    match ssl_mode.to_lowercase().as_str() {
        "disable" => PgSslMode::Disable,
        "allow" => PgSslMode::Allow,
        "prefer" => PgSslMode::Prefer,
        "require" => PgSslMode::Require,
        "verify-ca" => PgSslMode::VerifyCa,
        "verify-full" => PgSslMode::VerifyFull,
        _ => PgSslMode::Prefer,
    }
}

fn build_pg_options(config: &DatabaseConfig) -> Result<PgConnectOptions> {
    if let Some(url) = config.url.as_deref() {
        return PgConnectOptions::from_str(url).map_err(|e| {
            AppError::ConfigError(format!("Failed to parse DATABASE_URL: {}", e))
        });
    }

    let mut options = PgConnectOptions::new()
        .host(&config.host)
        .port(config.port)
        .database(&config.name)
        .username(&config.user)
        .ssl_mode(parse_ssl_mode(&config.ssl_mode));

    if let Some(password) = config.password.as_deref() {
        options = options.password(password);
    }

    Ok(options)
}

#[async_trait]
impl UserStore for PgUserStore {
    async fn ensure_schema(&self) -> Result<()> {
        sqlx::query(&format!(
            "CREATE TABLE IF NOT EXISTS {} (
                id SERIAL PRIMARY KEY,
                name TEXT NOT NULL,
                age INTEGER,
                address JSONB,
                additional_info JSONB
            )",
            self.table
        ))
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(format!("Failed to create table: {}", e)))?;

        Ok(())
    }

    async fn insert_users(&self, users: &[NewUser]) -> Result<u64> {
        let sql = format!(
            "INSERT INTO {} (name, age, address, additional_info) VALUES ($1, $2, $3, $4)",
            self.table
        );

        // Dropping the transaction without commit rolls it back and releases the connection.
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| AppError::DatabaseError(format!("Failed to begin transaction: {}", e)))?;

        let mut affected: u64 = 0;
        for user in users {
            let res = sqlx::query(&sql)
                .bind(&user.name)
                .bind(user.age)
                .bind(&user.address)
                .bind(&user.additional_info)
                .execute(&mut *tx)
                .await
                .map_err(|e| AppError::DatabaseError(format!("Failed to insert user: {}", e)))?;
            affected += res.rows_affected();
        }

        tx.commit().await.map_err(|e| {
            AppError::DatabaseError(format!("Failed to commit transaction: {}", e))
        })?;

        Ok(affected)
    }

    async fn list_users(&self) -> Result<Vec<StoredUser>> {
        sqlx::query_as::<_, UserEntity>(&format!(
            "SELECT id::BIGINT AS id, name, age, address, additional_info FROM {} ORDER BY id",
            self.table
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(format!("Failed to fetch users: {}", e)))
        .map(|entities| entities.into_iter().map(|e| e.into()).collect())
    }

    async fn list_ages(&self) -> Result<Vec<i64>> {
        sqlx::query_scalar::<_, i32>(&format!(
            "SELECT age FROM {} WHERE age IS NOT NULL",
            self.table
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(format!("Failed to fetch ages: {}", e)))
        .map(|ages| ages.into_iter().map(i64::from).collect())
    }
}

// Internal entity for database mapping
#[derive(sqlx::FromRow)]
struct UserEntity {
    id: i64,
    name: String,
    age: Option<i32>,
    address: Option<JsonValue>,
    additional_info: Option<JsonValue>,
}

impl From<UserEntity> for StoredUser {
    fn from(e: UserEntity) -> Self {
        Self {
            id: e.id,
            name: e.name,
            age: e.age,
            address: e.address,
            additional_info: e.additional_info,
        }
    }
}
