//! Demo household data for the `memories_demo` table.

use crate::error::StorageError;
use crate::memory_repo::MemoryRepository;
use crate::models::{generate_memory_id, Memory};
use crate::repository::Repository;
use serde::Deserialize;
use tracing::info;

/// Embedded demo memories (a fictional family, week of 2025-04-11).
const DEMO_JSON: &str = include_str!("seed/demo_memories.json");

/// Creation timestamps are offsets from 2025-04-05T00:00:00Z.
const DEMO_BASE_MILLIS: i64 = 1_743_811_200_000;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DemoMemory {
    date: Option<String>,
    text: String,
    created_by: String,
    tags: String,
    offset_ms: i64,
}

/// Builds the demo memories with fresh ids.
pub fn demo_memories() -> Result<Vec<Memory>, StorageError> {
    let seeds: Vec<DemoMemory> = serde_json::from_str(DEMO_JSON)
        .map_err(|e| StorageError::Database(format!("invalid demo seed: {}", e)))?;
    Ok(seeds
        .into_iter()
        .map(|s| Memory {
            id: generate_memory_id(),
            date: s.date,
            text: s.text,
            created_by: Some(s.created_by),
            created_date: Some(DEMO_BASE_MILLIS + s.offset_ms),
            tags: Some(s.tags),
        })
        .collect())
}

/// Replaces the repository's contents with the demo data; returns the inserted count.
pub async fn populate_demo(repo: &MemoryRepository) -> Result<usize, StorageError> {
    repo.clear().await?;
    let inserted = repo.save_all(&demo_memories()?).await?;
    info!(count = inserted, table = %repo.table().name(), "Inserted demo memories");
    Ok(inserted)
}
