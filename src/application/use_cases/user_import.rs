// ============================================================
// USER IMPORT USE CASE
// ============================================================
// Map decoded records, write them as one transaction, then report ages

use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use serde::Serialize;
use tracing::info;

use super::user_mapping::map_record;
use crate::domain::error::{AppError, Result};
use crate::domain::record::Record;
use crate::domain::report::AgeReport;
use crate::domain::user::{NewUser, StoredUser};
use crate::infrastructure::csv::decode_file;
use crate::infrastructure::db::UserStore;

/// Result of a successful import.
#[derive(Debug, Clone, Serialize)]
pub struct ImportOutcome {
    /// Rows the store reports as written.
    pub inserted: u64,
    pub report: AgeReport,
}

pub struct UserImportUseCase {
    store: Arc<dyn UserStore>,
}

impl UserImportUseCase {
    pub fn new(store: Arc<dyn UserStore>) -> Self {
        Self { store }
    }

    /// Decode the CSV file at `path` into records. A missing file yields no records.
    pub async fn load_records(&self, path: &Path) -> Result<Vec<Record>> {
        decode_file(path).await
    }

    /// Map every record and insert them all-or-nothing, then compute the report.
    ///
    /// A mapping failure aborts before anything is written.
    pub async fn import_and_report(&self, records: &[Record]) -> Result<ImportOutcome> {
        if records.is_empty() {
            return Err(AppError::ValidationError("No records to import".to_string()));
        }

        let start = Instant::now();

        let rows = records
            .iter()
            .enumerate()
            .map(|(index, record)| {
                map_record(record).map_err(|e| {
                    AppError::ValidationError(format!("Record {}: {}", index + 1, e))
                })
            })
            .collect::<Result<Vec<NewUser>>>()?;

        let inserted = self.store.insert_users(&rows).await?;

        info!(
            inserted,
            mapped = rows.len(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Imported users"
        );

        let report = self.report().await?;

        Ok(ImportOutcome {
            inserted,
            report,
        })
    }

    /// Age distribution over every stored row, including earlier imports.
    pub async fn report(&self) -> Result<AgeReport> {
        let ages = self.store.list_ages().await?;
        Ok(AgeReport::from_ages(ages.into_iter().map(|age| age as f64)))
    }

    pub async fn list_users(&self) -> Result<Vec<StoredUser>> {
        self.store.list_users().await
    }
}
