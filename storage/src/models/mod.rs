//! Persistence models: memories and chat turns.

mod chat_message;
mod memory;

pub use chat_message::ChatMessageRecord;
pub use memory::{
    deserialize_nullable, generate_memory_id, Memory, MemoryPatch, MemoryTable, NewMemory,
    RelevanceWindow, MEMORY_ID_LEN,
};
pub(crate) use memory::now_millis;
