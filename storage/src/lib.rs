//! Storage crate: memory and chat-history persistence.
//!
//! ## Modules
//!
//! - [`error`] – Storage error types
//! - [`models`] – Memory, NewMemory, MemoryPatch, ChatMessageRecord
//! - [`repository`] – Repository trait
//! - [`memory_repo`] – MemoryRepository (SQLite, one table per environment)
//! - [`chat_repo`] – ChatRepository (SQLite, `telegram_chats`)
//! - [`maintenance`] – one-off backfills for legacy rows
//! - [`seed`] – embedded demo household data
//! - [`sqlite_pool`] – SqlitePoolManager

mod chat_repo;
mod error;
mod maintenance;
mod memory_repo;
mod models;
mod repository;
pub mod seed;
mod sqlite_pool;


pub use chat_repo::ChatRepository;
pub use error::StorageError;
pub use maintenance::{classify_legacy_text, BackfillReport};
pub use memory_repo::MemoryRepository;
pub use models::{
    deserialize_nullable, generate_memory_id, ChatMessageRecord, Memory, MemoryPatch,
    MemoryTable, NewMemory, RelevanceWindow, MEMORY_ID_LEN,
};
pub use repository::Repository;
pub use sqlite_pool::SqlitePoolManager;
