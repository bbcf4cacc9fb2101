//! Memory repository: persistence and queries for memories.
//!
//! Uses SqlitePoolManager and the Memory models. One repository instance is bound to one
//! table ([`MemoryTable`]); the table name is never taken from user input.

use crate::error::StorageError;
use crate::models::{
    generate_memory_id, now_millis, Memory, MemoryPatch, MemoryTable, NewMemory, RelevanceWindow,
};
use crate::repository::Repository;
use crate::sqlite_pool::SqlitePoolManager;
use async_trait::async_trait;
use chrono::NaiveDate;
use sqlx::{QueryBuilder, Sqlite};
use tracing::{info, instrument};

const MEMORY_COLUMNS: &str =
    "COALESCE(id, '') AS id, date, COALESCE(text, '') AS text, created_by, created_date, tags";

#[derive(Clone)]
pub struct MemoryRepository {
    pool_manager: SqlitePoolManager,
    table: MemoryTable,
}

impl MemoryRepository {
    pub async fn new(database_url: &str, table: MemoryTable) -> Result<Self, StorageError> {
        let pool_manager = SqlitePoolManager::new(database_url).await?;
        Self::with_pool(pool_manager, table).await
    }

    /// Builds a repository on an existing pool (shared with ChatRepository).
    pub async fn with_pool(
        pool_manager: SqlitePoolManager,
        table: MemoryTable,
    ) -> Result<Self, StorageError> {
        let repo = Self {
            pool_manager,
            table,
        };
        repo.init().await?;
        Ok(repo)
    }

    pub fn table(&self) -> MemoryTable {
        self.table
    }

    pub fn pool_manager(&self) -> &SqlitePoolManager {
        &self.pool_manager
    }

    const LEGACY_COLUMNS: [(&'static str, &'static str); 4] = [
        ("id", "TEXT"),
        ("created_by", "TEXT"),
        ("created_date", "INTEGER"),
        ("tags", "TEXT"),
    ];

    async fn init(&self) -> Result<(), StorageError> {
        let table = self.table.name();
        info!(table = %table, "Creating memory table if not exist");

        let pool = self.pool_manager.pool();

        sqlx::query(&format!(
            r#"
            CREATE TABLE IF NOT EXISTS {table} (
                id TEXT PRIMARY KEY,
                date TEXT,
                text TEXT NOT NULL,
                created_by TEXT,
                created_date INTEGER,
                tags TEXT
            )
            "#
        ))
        .execute(pool)
        .await?;

        self.migrate().await?;

        sqlx::query(&format!(
            r#"
            CREATE INDEX IF NOT EXISTS idx_{table}_date ON {table}(date);
            CREATE INDEX IF NOT EXISTS idx_{table}_created_by ON {table}(created_by);
            CREATE INDEX IF NOT EXISTS idx_{table}_tags ON {table}(tags);
            "#
        ))
        .execute(pool)
        .await?;

        Ok(())
    }

    /// Adds the columns a legacy `(date, text)` table lacks. Returns the names added; empty when
    /// the table is already current. Rows keep NULL ids until [`MemoryRepository::backfill_ids`].
    #[instrument(skip(self), fields(table = %self.table.name()))]
    pub async fn migrate(&self) -> Result<Vec<&'static str>, StorageError> {
        let table = self.table.name();
        let pool = self.pool_manager.pool();

        let existing: Vec<(String,)> = sqlx::query_as("SELECT name FROM pragma_table_info(?)")
            .bind(table)
            .fetch_all(pool)
            .await?;
        let has = |column: &str| existing.iter().any(|(name,)| name == column);

        let mut added = Vec::new();
        for (column, sql_type) in Self::LEGACY_COLUMNS {
            if has(column) {
                continue;
            }
            sqlx::query(&format!("ALTER TABLE {table} ADD COLUMN {column} {sql_type}"))
                .execute(pool)
                .await?;
            added.push(column);
        }

        // A legacy table has no primary key; keep ids unique once backfilled.
        if added.contains(&"id") {
            sqlx::query(&format!(
                "CREATE UNIQUE INDEX IF NOT EXISTS idx_{table}_id ON {table}(id)"
            ))
            .execute(pool)
            .await?;
        }

        if !added.is_empty() {
            info!(columns = ?added, "Upgraded legacy memory table");
        }
        Ok(added)
    }

    /// All memories, newest first.
    pub async fn list_all(&self) -> Result<Vec<Memory>, StorageError> {
        let sql = format!(
            "SELECT {MEMORY_COLUMNS} FROM {} ORDER BY created_date DESC",
            self.table.name()
        );
        let memories = sqlx::query_as::<_, Memory>(&sql)
            .fetch_all(self.pool_manager.pool())
            .await?;
        info!(count = memories.len(), "Retrieved all memories");
        Ok(memories)
    }

    pub async fn get(&self, id: &str) -> Result<Option<Memory>, StorageError> {
        let sql = format!(
            "SELECT {MEMORY_COLUMNS} FROM {} WHERE id = ?",
            self.table.name()
        );
        let memory = sqlx::query_as::<_, Memory>(&sql)
            .bind(id)
            .fetch_optional(self.pool_manager.pool())
            .await?;
        Ok(memory)
    }

    /// Inserts a new memory with a generated id. `created_by` defaults to `dashboard`
    /// and `created_date` to now.
    #[instrument(skip(self, memory), fields(table = %self.table.name()))]
    pub async fn create(&self, memory: NewMemory) -> Result<Memory, StorageError> {
        let stored = Memory {
            id: generate_memory_id(),
            date: memory.date,
            text: memory.text,
            created_by: Some(
                memory
                    .created_by
                    .filter(|s| !s.is_empty())
                    .unwrap_or_else(|| "dashboard".to_string()),
            ),
            created_date: Some(memory.created_date.unwrap_or_else(now_millis)),
            tags: memory.tags,
        };
        self.insert(&stored).await?;
        Ok(stored)
    }

    /// Inserts a memory exactly as given (caller chooses the id).
    pub async fn insert(&self, memory: &Memory) -> Result<(), StorageError> {
        let sql = format!(
            "INSERT INTO {} (id, date, text, created_by, created_date, tags) VALUES (?, ?, ?, ?, ?, ?)",
            self.table.name()
        );
        sqlx::query(&sql)
            .bind(&memory.id)
            .bind(&memory.date)
            .bind(&memory.text)
            .bind(&memory.created_by)
            .bind(memory.created_date)
            .bind(&memory.tags)
            .execute(self.pool_manager.pool())
            .await?;

        info!(
            id = %memory.id,
            date = ?memory.date,
            created_by = ?memory.created_by,
            "Saved memory"
        );
        Ok(())
    }

    /// Overwrites only the fields present in `patch`.
    #[instrument(skip(self, patch), fields(table = %self.table.name()))]
    pub async fn update(&self, id: &str, patch: &MemoryPatch) -> Result<(), StorageError> {
        if patch.is_empty() {
            return Err(StorageError::EmptyUpdate);
        }

        let mut qb: QueryBuilder<Sqlite> =
            QueryBuilder::new(format!("UPDATE {} SET ", self.table.name()));
        {
            let mut set = qb.separated(", ");
            if let Some(date) = &patch.date {
                set.push("date = ").push_bind_unseparated(date.clone());
            }
            if let Some(text) = &patch.text {
                set.push("text = ").push_bind_unseparated(text.clone());
            }
            if let Some(created_by) = &patch.created_by {
                set.push("created_by = ")
                    .push_bind_unseparated(created_by.clone());
            }
            if let Some(created_date) = patch.created_date {
                set.push("created_date = ")
                    .push_bind_unseparated(created_date);
            }
            if let Some(tags) = &patch.tags {
                set.push("tags = ").push_bind_unseparated(tags.clone());
            }
        }
        qb.push(" WHERE id = ").push_bind(id.to_string());

        let result = qb.build().execute(self.pool_manager.pool()).await?;
        if result.rows_affected() == 0 {
            return Err(StorageError::NotFound(id.to_string()));
        }

        info!(id = %id, "Updated memory");
        Ok(())
    }

    /// Deletes by id; returns whether a row was removed.
    pub async fn delete(&self, id: &str) -> Result<bool, StorageError> {
        let sql = format!("DELETE FROM {} WHERE id = ?", self.table.name());
        let result = sqlx::query(&sql)
            .bind(id)
            .execute(self.pool_manager.pool())
            .await?;
        info!(id = %id, deleted = result.rows_affected(), "Deleted memory");
        Ok(result.rows_affected() > 0)
    }

    /// Undated memories plus memories dated within `window` around `today`.
    /// Undated first, then by date ascending.
    #[instrument(skip(self), fields(table = %self.table.name()))]
    pub async fn relevant(
        &self,
        today: NaiveDate,
        window: RelevanceWindow,
    ) -> Result<Vec<Memory>, StorageError> {
        let (start, end) = window.bounds(today);
        let sql = format!(
            r#"
            SELECT {MEMORY_COLUMNS} FROM {}
            WHERE date IS NULL OR TRIM(date) = '' OR substr(date, 1, 10) BETWEEN ? AND ?
            ORDER BY
                CASE WHEN date IS NULL OR TRIM(date) = '' THEN 0 ELSE 1 END,
                substr(date, 1, 10) ASC,
                created_date ASC
            "#,
            self.table.name()
        );
        let memories = sqlx::query_as::<_, Memory>(&sql)
            .bind(&start)
            .bind(&end)
            .fetch_all(self.pool_manager.pool())
            .await?;
        info!(
            count = memories.len(),
            start = %start,
            end = %end,
            "Retrieved relevant memories"
        );
        Ok(memories)
    }

    /// Removes every memory from one source (e.g. before a calendar re-import).
    pub async fn delete_by_creator(&self, created_by: &str) -> Result<u64, StorageError> {
        let sql = format!("DELETE FROM {} WHERE created_by = ?", self.table.name());
        let result = sqlx::query(&sql)
            .bind(created_by)
            .execute(self.pool_manager.pool())
            .await?;
        info!(
            created_by = %created_by,
            deleted = result.rows_affected(),
            "Deleted memories by creator"
        );
        Ok(result.rows_affected())
    }

    /// Removes memories on `date` whose text starts with `prefix` (e.g. `weather forecast:`).
    pub async fn delete_by_date_and_text_prefix(
        &self,
        date: &str,
        prefix: &str,
    ) -> Result<u64, StorageError> {
        let sql = format!(
            "DELETE FROM {} WHERE date = ? AND text LIKE ? ESCAPE '\\'",
            self.table.name()
        );
        let pattern = format!("{}%", escape_like(prefix));
        let result = sqlx::query(&sql)
            .bind(date)
            .bind(pattern)
            .execute(self.pool_manager.pool())
            .await?;
        Ok(result.rows_affected())
    }

    pub async fn delete_by_date_and_tag(&self, date: &str, tag: &str) -> Result<u64, StorageError> {
        let sql = format!(
            "DELETE FROM {} WHERE date = ? AND tags = ?",
            self.table.name()
        );
        let result = sqlx::query(&sql)
            .bind(date)
            .bind(tag)
            .execute(self.pool_manager.pool())
            .await?;
        Ok(result.rows_affected())
    }

    /// Most recent `limit` memories carrying `tag`, by date descending.
    pub async fn recent_by_tag(&self, tag: &str, limit: i64) -> Result<Vec<Memory>, StorageError> {
        let sql = format!(
            "SELECT {MEMORY_COLUMNS} FROM {} WHERE tags = ? ORDER BY date DESC LIMIT ?",
            self.table.name()
        );
        let memories = sqlx::query_as::<_, Memory>(&sql)
            .bind(tag)
            .bind(limit)
            .fetch_all(self.pool_manager.pool())
            .await?;
        Ok(memories)
    }

    /// Removes every row in the table.
    pub async fn clear(&self) -> Result<u64, StorageError> {
        let sql = format!("DELETE FROM {}", self.table.name());
        let result = sqlx::query(&sql)
            .execute(self.pool_manager.pool())
            .await?;
        info!(deleted = result.rows_affected(), "Cleared memory table");
        Ok(result.rows_affected())
    }
}

fn escape_like(s: &str) -> String {
    s.replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_")
}

#[async_trait]
impl Repository<Memory> for MemoryRepository {
    async fn save(&self, entity: &Memory) -> Result<(), StorageError> {
        self.insert(entity).await
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<Memory>, StorageError> {
        self.get(id).await
    }

    async fn find_all(&self) -> Result<Vec<Memory>, StorageError> {
        self.list_all().await
    }

    async fn delete(&self, id: &str) -> Result<bool, StorageError> {
        MemoryRepository::delete(self, id).await
    }
}
