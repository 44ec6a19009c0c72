use async_trait::async_trait;
use serde_json::Value as JsonValue;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::str::FromStr;

use super::{validate_table_name, UserStore};
use crate::domain::error::{AppError, Result};
use crate::domain::user::{NewUser, StoredUser};

/// SQLite backend. JSON columns are stored as TEXT.
pub struct SqliteUserStore {
    pool: SqlitePool,
    table: String,
}

impl SqliteUserStore {
    pub async fn connect(database_url: &str, table: &str, max_connections: u32) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(database_url)
            .map_err(|e| {
                AppError::DatabaseError(format!("Failed to parse connection string: {}", e))
            })?
            .create_if_missing(true);

        // Each connection to an in-memory database sees its own database.
        let in_memory = database_url.contains(":memory:");
        let max_connections = if in_memory { 1 } else { max_connections.max(1) };

        let mut pool_options = SqlitePoolOptions::new().max_connections(max_connections);
        if in_memory {
            pool_options = pool_options.idle_timeout(None).max_lifetime(None);
        }

        let pool = pool_options
            .connect_with(options)
            .await
            .map_err(|e| AppError::DatabaseError(format!("Failed to connect: {}", e)))?;

        Self::new(pool, table)
    }

    pub fn new(pool: SqlitePool, table: &str) -> Result<Self> {
        validate_table_name(table)?;
        Ok(Self {
            pool,
            table: table.to_string(),
        })
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

#[async_trait]
impl UserStore for SqliteUserStore {
    async fn ensure_schema(&self) -> Result<()> {
        sqlx::query(&format!(
            "CREATE TABLE IF NOT EXISTS {} (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL,
                age INTEGER,
                address TEXT,
                additional_info TEXT
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
            "INSERT INTO {} (name, age, address, additional_info) VALUES (?, ?, ?, ?)",
            self.table
        );

        // Dropping the transaction without commit rolls it back.
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
                .bind(user.address.as_ref().map(JsonValue::to_string))
                .bind(user.additional_info.as_ref().map(JsonValue::to_string))
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
        let rows = sqlx::query_as::<_, UserEntity>(&format!(
            "SELECT id, name, age, address, additional_info FROM {} ORDER BY id",
            self.table
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(format!("Failed to fetch users: {}", e)))?;

        rows.into_iter().map(StoredUser::try_from).collect()
    }

    async fn list_ages(&self) -> Result<Vec<i64>> {
        sqlx::query_scalar::<_, i64>(&format!(
            "SELECT age FROM {} WHERE age IS NOT NULL",
            self.table
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(format!("Failed to fetch ages: {}", e)))
    }
}

// Internal entity for database mapping
#[derive(sqlx::FromRow)]
struct UserEntity {
    id: i64,
    name: String,
    age: Option<i32>,
    address: Option<String>,
    additional_info: Option<String>,
}

impl TryFrom<UserEntity> for StoredUser {
    type Error = AppError;

    fn try_from(e: UserEntity) -> Result<Self> {
        Ok(Self {
            id: e.id,
            name: e.name,
            age: e.age,
            address: parse_json_column(e.address)?,
            additional_info: parse_json_column(e.additional_info)?,
        })
    }
}

fn parse_json_column(raw: Option<String>) -> Result<Option<JsonValue>> {
    raw.map(|text| {
        serde_json::from_str(&text)
            .map_err(|e| AppError::ParseError(format!("Stored JSON is invalid: {}", e)))
    })
    .transpose()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    async fn memory_store() -> SqliteUserStore {
        let store = SqliteUserStore::connect("sqlite::memory:", "users", 5)
            .await
            .unwrap();
        store.ensure_schema().await.unwrap();
        store
    }

    fn user(name: &str, age: Option<i32>) -> NewUser {
        NewUser {
            name: name.to_string(),
            age,
            address: None,
            additional_info: None,
        }
    }

    #[tokio::test]
    async fn test_insert_and_list_in_id_order() {
        let store = memory_store().await;
        let mut ada = user("Ada Lovelace", Some(36));
        ada.address = Some(json!({ "city": "London" }));
        ada.additional_info = Some(json!({ "gender": "female" }));

        let inserted = store
            .insert_users(&[ada, user("Grace Hopper", None)])
            .await
            .unwrap();
        assert_eq!(inserted, 2);

        let users = store.list_users().await.unwrap();
        assert_eq!(users.len(), 2);
        assert!(users[0].id < users[1].id);
        assert_eq!(users[0].name, "Ada Lovelace");
        assert_eq!(users[0].address, Some(json!({ "city": "London" })));
        assert_eq!(users[0].additional_info, Some(json!({ "gender": "female" })));
        assert_eq!(users[1].age, None);
        assert_eq!(users[1].address, None);
    }

    #[tokio::test]
    async fn test_json_text_keeps_column_order() {
        let store = memory_store().await;
        let record = crate::infrastructure::csv::decode("zeta,name,alpha,meta.z,meta.a\n1,Ada,2,x,y")
            .unwrap()
            .remove(0);
        let row = crate::application::use_cases::user_mapping::map_record(&record).unwrap();
        store.insert_users(&[row]).await.unwrap();

        let stored: Option<String> =
            sqlx::query_scalar("SELECT additional_info FROM users")
                .fetch_one(store.pool())
                .await
                .unwrap();
        assert_eq!(
            stored.as_deref(),
            Some(r#"{"zeta":1,"alpha":2,"meta":{"z":"x","a":"y"}}"#)
        );
    }

    #[tokio::test]
    async fn test_list_ages_skips_nulls() {
        let store = memory_store().await;
        store
            .insert_users(&[user("a", Some(10)), user("b", None), user("c", Some(70))])
            .await
            .unwrap();

        let mut ages = store.list_ages().await.unwrap();
        ages.sort();
        assert_eq!(ages, vec![10, 70]);
    }

    #[tokio::test]
    async fn test_failed_insert_rolls_back_whole_batch() {
        let store = memory_store().await;
        sqlx::query(
            "CREATE TRIGGER reject_boom BEFORE INSERT ON users
             WHEN NEW.name = 'boom'
             BEGIN SELECT RAISE(ABORT, 'boom rejected'); END",
        )
        .execute(store.pool())
        .await
        .unwrap();

        let result = store
            .insert_users(&[user("first", Some(20)), user("boom", Some(30)), user("last", Some(40))])
            .await;

        assert!(matches!(result, Err(AppError::DatabaseError(_))));
        assert!(store.list_users().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_rejects_bad_table_name() {
        let pool = SqlitePool::connect_lazy("sqlite::memory:").unwrap();
        assert!(SqliteUserStore::new(pool, "users--").is_err());
    }
}
