//! One-off backfills for rows written before ids and provenance columns existed.

use crate::error::StorageError;
use crate::memory_repo::MemoryRepository;
use crate::models::generate_memory_id;
use tracing::info;

/// Number of rows touched by a backfill.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BackfillReport {
    pub scanned: usize,
    pub updated: usize,
}

/// Guesses `(created_by, tags)` for a legacy row from its text.
pub fn classify_legacy_text(text: &str) -> (&'static str, &'static str) {
    let text = text.to_lowercase();
    if text.contains("weather") {
        ("weather", "weather")
    } else if text.contains("expecting") {
        ("usps", "mail")
    } else {
        ("chat", "")
    }
}

impl MemoryRepository {
    /// Assigns a fresh id and creation timestamp to rows with a missing id.
    pub async fn backfill_ids(&self, now_millis: i64) -> Result<BackfillReport, StorageError> {
        let table = self.table().name();
        let pool = self.pool_manager().pool();

        let rows: Vec<(i64,)> = sqlx::query_as(&format!(
            "SELECT rowid FROM {table} WHERE id IS NULL OR id = ''"
        ))
        .fetch_all(pool)
        .await?;

        info!(count = rows.len(), "Found rows without ids");

        let mut report = BackfillReport {
            scanned: rows.len(),
            updated: 0,
        };
        for (rowid,) in rows {
            sqlx::query(&format!(
                "UPDATE {table} SET id = ?, created_date = COALESCE(created_date, ?) WHERE rowid = ?"
            ))
            .bind(generate_memory_id())
            .bind(now_millis)
            .bind(rowid)
            .execute(pool)
            .await?;
            report.updated += 1;
        }

        info!(updated = report.updated, "Backfilled memory ids");
        Ok(report)
    }

    /// Fills `created_by` / `tags` for rows without a source, using [`classify_legacy_text`].
    pub async fn backfill_created_by(
        &self,
        now_millis: i64,
    ) -> Result<BackfillReport, StorageError> {
        let table = self.table().name();
        let pool = self.pool_manager().pool();

        let rows: Vec<(i64, Option<String>)> = sqlx::query_as(&format!(
            "SELECT rowid, text FROM {table} WHERE created_by IS NULL OR created_by = ''"
        ))
        .fetch_all(pool)
        .await?;

        info!(count = rows.len(), "Found rows without created_by");

        let mut report = BackfillReport {
            scanned: rows.len(),
            updated: 0,
        };
        for (rowid, text) in rows {
            let (created_by, tags) = classify_legacy_text(text.as_deref().unwrap_or(""));
            sqlx::query(&format!(
                r#"
                UPDATE {table}
                SET created_by = ?, tags = ?, created_date = COALESCE(created_date, ?)
                WHERE rowid = ?
                "#
            ))
            .bind(created_by)
            .bind(tags)
            .bind(now_millis)
            .bind(rowid)
            .execute(pool)
            .await?;
            report.updated += 1;
        }

        info!(updated = report.updated, "Backfilled created_by");
        Ok(report)
    }
}
