//! Chat identity type for core messages.

use serde::{Deserialize, Serialize};

/// Chat (group or private) identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chat {
    pub id: i64,
    pub chat_type: String,
}

impl Chat {
    /// A chat known only by id (briefing targets from configuration).
    pub fn with_id(id: i64) -> Self {
        Self {
            id,
            chat_type: "private".to_string(),
        }
    }
}
