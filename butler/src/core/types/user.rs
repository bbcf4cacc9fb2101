//! User identity type for core messages.

use serde::{Deserialize, Serialize};

/// Name used when a sender has neither username nor first name.
pub const FALLBACK_SENDER_NAME: &str = "Sir/Madam";

/// User identity (id, username, names).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub username: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
}

impl User {
    /// Username, else first name, else [`FALLBACK_SENDER_NAME`].
    pub fn display_name(&self) -> String {
        self.username
            .as_deref()
            .filter(|s| !s.is_empty())
            .or_else(|| self.first_name.as_deref().filter(|s| !s.is_empty()))
            .unwrap_or(FALLBACK_SENDER_NAME)
            .to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(username: Option<&str>, first_name: Option<&str>) -> User {
        User {
            id: 1,
            username: username.map(String::from),
            first_name: first_name.map(String::from),
            last_name: None,
        }
    }

    #[test]
    fn test_display_name_fallbacks() {
        assert_eq!(user(Some("alice"), Some("Alice")).display_name(), "alice");
        assert_eq!(user(None, Some("Alice")).display_name(), "Alice");
        assert_eq!(user(Some(""), Some("Alice")).display_name(), "Alice");
        assert_eq!(user(None, None).display_name(), FALLBACK_SENDER_NAME);
    }
}
