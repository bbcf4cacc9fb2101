//! # Memory directives
//!
//! Model replies may carry tag-delimited JSON blocks asking for memory changes:
//!
//! - `<createMemories>[{"text": "...", "date": "2025-04-11" | null}]</createMemories>`
//! - `<editMemories>[{"id": "abc", "text": "...", "date": ...}]</editMemories>`
//! - `<deleteMemories>["abc", {"id": "def"}]</deleteMemories>`
//!
//! [`parse_reply`] never fails: malformed blocks are logged, treated as empty and still removed
//! from the user-visible text. [`apply`] writes the operations to a [`MemoryRepository`].

use regex::Regex;
use serde_json::Value;
use std::sync::OnceLock;
use storage::{MemoryPatch, MemoryRepository, NewMemory, StorageError};
use tracing::{error, info, warn};

/// Sent when a reply consisted only of directive blocks.
pub const DEFAULT_ACKNOWLEDGEMENT: &str = "Very good. I have updated my notes accordingly.";

/// A memory the model asked to create.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateDirective {
    pub text: String,
    pub date: Option<String>,
}

/// A memory the model asked to change. Outer `None` leaves a field untouched; `Some(None)` clears it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditDirective {
    pub id: String,
    pub text: Option<String>,
    pub date: Option<Option<String>>,
    pub tags: Option<Option<String>>,
}

impl EditDirective {
    fn to_patch(&self) -> MemoryPatch {
        MemoryPatch {
            text: self.text.clone(),
            date: self.date.clone(),
            tags: self.tags.clone(),
            ..Default::default()
        }
    }
}

/// A model reply split into user-visible text and memory operations.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedReply {
    pub reply: String,
    pub create: Vec<CreateDirective>,
    pub edit: Vec<EditDirective>,
    pub delete: Vec<String>,
}

impl ParsedReply {
    pub fn has_operations(&self) -> bool {
        !(self.create.is_empty() && self.edit.is_empty() && self.delete.is_empty())
    }
}

/// Ids touched by [`apply`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AppliedOps {
    pub created: Vec<String>,
    pub edited: Vec<String>,
    pub deleted: Vec<String>,
}

fn tag_regex(tag: &'static str) -> &'static Regex {
    static CREATE: OnceLock<Regex> = OnceLock::new();
    static EDIT: OnceLock<Regex> = OnceLock::new();
    static DELETE: OnceLock<Regex> = OnceLock::new();
    let cell = match tag {
        "createMemories" => &CREATE,
        "editMemories" => &EDIT,
        _ => &DELETE,
    };
    cell.get_or_init(|| {
        Regex::new(&format!(r"(?s)<{tag}>(.*?)</{tag}>")).expect("static directive regex")
    })
}

fn blank_lines_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\n{3,}").expect("static newline regex"))
}

/// Removes the first `<tag>…</tag>` block from `text` and returns its parsed JSON body.
/// `None` when the tag is absent; `Some(Value::Null)` when present but malformed.
fn take_block(text: &mut String, tag: &'static str) -> Option<Value> {
    let re = tag_regex(tag);
    let (range, body) = {
        let caps = re.captures(text)?;
        let whole = caps.get(0)?;
        let body = caps.get(1).map(|m| m.as_str().to_string()).unwrap_or_default();
        (whole.range(), body)
    };
    text.replace_range(range, "");

    match serde_json::from_str::<Value>(body.trim()) {
        Ok(v) => Some(v),
        Err(e) => {
            error!(tag = tag, error = %e, body = %body, "Malformed directive JSON, ignoring block");
            Some(Value::Null)
        }
    }
}

/// A single object is accepted where a list was expected.
fn as_items(value: Value) -> Vec<Value> {
    match value {
        Value::Array(items) => items,
        Value::Object(_) => vec![value],
        Value::Null => Vec::new(),
        other => {
            warn!(value = %other, "Directive block is neither a list nor an object");
            Vec::new()
        }
    }
}

fn string_field(obj: &serde_json::Map<String, Value>, key: &str) -> Option<String> {
    match obj.get(key) {
        Some(Value::String(s)) => Some(s.clone()),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    }
}

/// `None` if absent, `Some(None)` if null (or blank), `Some(Some(s))` otherwise.
fn nullable_field(obj: &serde_json::Map<String, Value>, key: &str) -> Option<Option<String>> {
    match obj.get(key) {
        None => None,
        Some(Value::Null) => Some(None),
        Some(Value::String(s)) if s.trim().is_empty() => Some(None),
        Some(Value::String(s)) => Some(Some(s.clone())),
        Some(other) => Some(Some(other.to_string())),
    }
}

fn parse_creates(value: Value) -> Vec<CreateDirective> {
    as_items(value)
        .into_iter()
        .filter_map(|item| {
            let obj = match item {
                Value::Object(obj) => obj,
                Value::String(text) if !text.trim().is_empty() => {
                    return Some(CreateDirective { text, date: None });
                }
                other => {
                    warn!(item = %other, "Skipping create directive that is not an object");
                    return None;
                }
            };
            let text = string_field(&obj, "text").filter(|t| !t.trim().is_empty());
            match text {
                Some(text) => Some(CreateDirective {
                    text,
                    date: nullable_field(&obj, "date").flatten(),
                }),
                None => {
                    warn!(item = ?obj, "Skipping create directive without text");
                    None
                }
            }
        })
        .collect()
}

fn parse_edits(value: Value) -> Vec<EditDirective> {
    as_items(value)
        .into_iter()
        .filter_map(|item| {
            let obj = match item {
                Value::Object(obj) => obj,
                other => {
                    warn!(item = %other, "Skipping edit directive that is not an object");
                    return None;
                }
            };
            let Some(id) = string_field(&obj, "id").filter(|id| !id.trim().is_empty()) else {
                error!(item = ?obj, "Cannot edit memory without id");
                return None;
            };
            Some(EditDirective {
                id,
                text: string_field(&obj, "text"),
                date: nullable_field(&obj, "date"),
                tags: nullable_field(&obj, "tags"),
            })
        })
        .collect()
}

fn parse_deletes(value: Value) -> Vec<String> {
    as_items(value)
        .into_iter()
        .filter_map(|item| match item {
            Value::String(id) if !id.trim().is_empty() => Some(id),
            Value::Number(n) => Some(n.to_string()),
            Value::Object(obj) => string_field(&obj, "id"),
            other => {
                warn!(item = %other, "Skipping delete directive without id");
                None
            }
        })
        .collect()
}

/// Splits a model reply into user-visible text and memory operations. Never fails.
pub fn parse_reply(raw: &str) -> ParsedReply {
    let mut text = raw.to_string();

    let create = take_block(&mut text, "createMemories")
        .map(parse_creates)
        .unwrap_or_default();
    let edit = take_block(&mut text, "editMemories")
        .map(parse_edits)
        .unwrap_or_default();
    let delete = take_block(&mut text, "deleteMemories")
        .map(parse_deletes)
        .unwrap_or_default();

    let collapsed = blank_lines_regex().replace_all(&text, "\n\n");
    let mut reply = collapsed.trim().to_string();
    if reply.is_empty() {
        reply = DEFAULT_ACKNOWLEDGEMENT.to_string();
    }

    ParsedReply {
        reply,
        create,
        edit,
        delete,
    }
}

/// Writes the parsed operations to `repo`. Individual failures are logged and skipped.
pub async fn apply(repo: &MemoryRepository, parsed: &ParsedReply, created_by: &str) -> AppliedOps {
    let mut ops = AppliedOps::default();

    for c in &parsed.create {
        let memory = NewMemory::new(c.text.clone())
            .with_date(c.date.clone())
            .created_by(created_by)
            .with_tags("");
        match repo.create(memory).await {
            Ok(stored) => ops.created.push(stored.id),
            Err(e) => error!(error = %e, text = %c.text, "Failed to create memory"),
        }
    }

    for e in &parsed.edit {
        let patch = e.to_patch();
        if patch.is_empty() {
            warn!(id = %e.id, "Edit directive carries no fields, skipping");
            continue;
        }
        match repo.update(&e.id, &patch).await {
            Ok(()) => ops.edited.push(e.id.clone()),
            Err(StorageError::NotFound(id)) => warn!(id = %id, "Edit for unknown memory id"),
            Err(err) => error!(error = %err, id = %e.id, "Failed to edit memory"),
        }
    }

    for id in &parsed.delete {
        match repo.delete(id).await {
            Ok(true) => ops.deleted.push(id.clone()),
            Ok(false) => warn!(id = %id, "Delete for unknown memory id"),
            Err(e) => error!(error = %e, id = %id, "Failed to delete memory"),
        }
    }

    info!(
        created = ?ops.created,
        edited = ?ops.edited,
        deleted = ?ops.deleted,
        created_by = %created_by,
        "Applied memory directives"
    );
    ops
}

fn fence_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?s)```(?:json|JSON)?\s*(.*?)```").expect("static fence regex")
    })
}

/// Best-effort JSON extraction from a model reply: the whole text, then a fenced code block,
/// then the outermost `{…}` or `[…]` span.
pub fn extract_json(raw: &str) -> Option<Value> {
    let trimmed = raw.trim();
    if let Ok(v) = serde_json::from_str::<Value>(trimmed) {
        return Some(v);
    }
    if let Some(caps) = fence_regex().captures(trimmed) {
        if let Ok(v) = serde_json::from_str::<Value>(caps[1].trim()) {
            return Some(v);
        }
    }
    for (open, close) in [('{', '}'), ('[', ']')] {
        if let (Some(start), Some(end)) = (trimmed.find(open), trimmed.rfind(close)) {
            if start < end {
                if let Ok(v) = serde_json::from_str::<Value>(&trimmed[start..=end]) {
                    return Some(v);
                }
            }
        }
    }
    None
}
