//! Memory model: a stored natural-language note plus metadata.
//!
//! Maps to the `memories` / `memories_demo` tables and is used by MemoryRepository.
//! JSON uses camelCase (`createdBy`, `createdDate`) to match the dashboard API.

use chrono::{Duration, NaiveDate, Utc};
use rand::Rng;
use serde::{Deserialize, Deserializer, Serialize};

/// Length of generated memory ids.
pub const MEMORY_ID_LEN: usize = 10;

const ID_ALPHABET: &[u8] = b"useandom-26T198340PX75pxJACKVERYMINDBUSHWOLF_GQZbfghjklqvwyzrict";

/// Generates a short URL-safe id (nanoid alphabet, [`MEMORY_ID_LEN`] chars).
pub fn generate_memory_id() -> String {
    let mut rng = rand::thread_rng();
    (0..MEMORY_ID_LEN)
        .map(|_| ID_ALPHABET[rng.gen_range(0..ID_ALPHABET.len())] as char)
        .collect()
}

/// Deserializes a field that distinguishes "absent" (`None`) from explicit `null` (`Some(None)`).
/// Use together with `#[serde(default)]`.
pub fn deserialize_nullable<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

/// Which memory table a repository reads and writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MemoryTable {
    #[default]
    Production,
    Demo,
}

impl MemoryTable {
    pub fn name(&self) -> &'static str {
        match self {
            MemoryTable::Production => "memories",
            MemoryTable::Demo => "memories_demo",
        }
    }

    /// Parses `production` / `prod` / `memories` and `demo` / `memories_demo`.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "production" | "prod" | "memories" => Some(MemoryTable::Production),
            "demo" | "memories_demo" => Some(MemoryTable::Demo),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Memory {
    pub id: String,
    pub date: Option<String>,
    pub text: String,
    pub created_by: Option<String>,
    pub created_date: Option<i64>,
    pub tags: Option<String>,
}

impl Memory {
    /// True when the memory has no calendar date attached.
    pub fn is_undated(&self) -> bool {
        self.date.as_deref().map_or(true, |d| d.trim().is_empty())
    }

    /// The `YYYY-MM-DD` part of the date, if any.
    pub fn day(&self) -> Option<&str> {
        self.date
            .as_deref()
            .map(str::trim)
            .filter(|d| !d.is_empty())
            .map(|d| d.get(..10).unwrap_or(d))
    }
}

/// Fields for a new memory; id is generated on insert.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewMemory {
    #[serde(default)]
    pub date: Option<String>,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub created_by: Option<String>,
    #[serde(default)]
    pub created_date: Option<i64>,
    #[serde(default)]
    pub tags: Option<String>,
}

impl NewMemory {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Default::default()
        }
    }

    pub fn with_date(mut self, date: Option<String>) -> Self {
        self.date = date;
        self
    }

    pub fn created_by(mut self, source: impl Into<String>) -> Self {
        self.created_by = Some(source.into());
        self
    }

    pub fn with_tags(mut self, tags: impl Into<String>) -> Self {
        self.tags = Some(tags.into());
        self
    }
}

/// Partial update. Outer `None` leaves a column untouched; `Some(None)` sets it to NULL.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemoryPatch {
    #[serde(default, deserialize_with = "deserialize_nullable")]
    pub date: Option<Option<String>>,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default, deserialize_with = "deserialize_nullable")]
    pub created_by: Option<Option<String>>,
    #[serde(default, deserialize_with = "deserialize_nullable")]
    pub created_date: Option<Option<i64>>,
    #[serde(default, deserialize_with = "deserialize_nullable")]
    pub tags: Option<Option<String>>,
}

impl MemoryPatch {
    pub fn is_empty(&self) -> bool {
        self.date.is_none()
            && self.text.is_none()
            && self.created_by.is_none()
            && self.created_date.is_none()
            && self.tags.is_none()
    }
}

/// Date window for relevant-memory retrieval, relative to "today".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RelevanceWindow {
    pub past_days: i64,
    pub future_days: i64,
}

impl Default for RelevanceWindow {
    fn default() -> Self {
        Self {
            past_days: 0,
            future_days: 7,
        }
    }
}

impl RelevanceWindow {
    /// Inclusive `YYYY-MM-DD` bounds around `today`.
    pub fn bounds(&self, today: NaiveDate) -> (String, String) {
        let start = today - Duration::days(self.past_days);
        let end = today + Duration::days(self.future_days);
        (
            start.format("%Y-%m-%d").to_string(),
            end.format("%Y-%m-%d").to_string(),
        )
    }
}

/// Current Unix time in milliseconds.
pub(crate) fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_memory_id_shape() {
        let id = generate_memory_id();
        assert_eq!(id.len(), MEMORY_ID_LEN);
        assert!(id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-'));
        assert_ne!(generate_memory_id(), id);
    }

    #[test]
    fn test_memory_table_parse() {
        assert_eq!(MemoryTable::parse("demo"), Some(MemoryTable::Demo));
        assert_eq!(MemoryTable::parse(" Production "), Some(MemoryTable::Production));
        assert_eq!(MemoryTable::parse("memories; DROP TABLE x"), None);
        assert_eq!(MemoryTable::Demo.name(), "memories_demo");
    }

    #[test]
    fn test_patch_distinguishes_absent_and_null() {
        let patch: MemoryPatch = serde_json::from_str(r#"{"text":"x","date":null}"#).unwrap();
        assert_eq!(patch.text.as_deref(), Some("x"));
        assert_eq!(patch.date, Some(None));
        assert_eq!(patch.tags, None);

        let empty: MemoryPatch = serde_json::from_str(r#"{"unknown": 1}"#).unwrap();
        assert!(empty.is_empty());
    }

    #[test]
    fn test_memory_day_and_undated() {
        let mut m = Memory {
            id: "a".into(),
            date: Some("2025-04-11T09:30:00-04:00".into()),
            text: "t".into(),
            created_by: None,
            created_date: None,
            tags: None,
        };
        assert_eq!(m.day(), Some("2025-04-11"));
        assert!(!m.is_undated());
        m.date = Some("  ".into());
        assert!(m.is_undated());
        assert_eq!(m.day(), None);
    }

    #[test]
    fn test_relevance_window_bounds() {
        let today = NaiveDate::from_ymd_opt(2025, 4, 30).unwrap();
        let window = RelevanceWindow {
            past_days: 1,
            future_days: 7,
        };
        assert_eq!(
            window.bounds(today),
            ("2025-04-29".to_string(), "2025-05-07".to_string())
        );
    }

    #[test]
    fn test_memory_json_is_camel_case() {
        let m = Memory {
            id: "abc".into(),
            date: None,
            text: "hello".into(),
            created_by: Some("dashboard".into()),
            created_date: Some(1),
            tags: None,
        };
        let v = serde_json::to_value(&m).unwrap();
        assert_eq!(v["createdBy"], "dashboard");
        assert_eq!(v["createdDate"], 1);
    }
}
