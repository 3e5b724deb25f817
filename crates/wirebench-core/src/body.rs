//! Dot-path body builder — flat `(path, value)` field lists to nested trees.
//!
//! A UI that edits one field per row serializes a request body as a flat list
//! of [`BodyField`] entries whose paths address into a nested structure:
//!
//! ```text
//! user.name            → {"user": {"name": ...}}
//! user.emails[1].addr  → {"user": {"emails": [null, {"addr": ...}]}}
//! ```
//!
//! [`build_from_fields`] turns such a list into a `serde_json` object tree,
//! coercing string values into JSON literals along the way so a UI that only
//! speaks strings can still produce booleans, numbers, nulls, and nested
//! structures.
//!
//! # Path grammar
//!
//! Paths are `.`-separated segments. A segment is either a plain map key or
//! `name[index]` for list access under key `name`, where `index` is a
//! non-negative integer. A segment that merely resembles index syntax
//! (`items[-1]`, `items[abc]`, `items[1`) is treated as a literal map key
//! rather than rejected. This leniency is deliberate and observable — keys
//! containing brackets remain addressable.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// One flat body entry: a dot-path plus the value to place there.
///
/// A list of `BodyField`s is the UI's serialization of one body value tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BodyField {
    /// Dot-path into the body tree, e.g. `user.emails[1].address`.
    pub path: String,
    /// Value for that path. String values are coerced by
    /// [`coerce_value`] during [`build_from_fields`]; structured values
    /// pass through untouched.
    pub value: Value,
}

impl BodyField {
    /// Convenience constructor.
    pub fn new(path: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            path: path.into(),
            value: value.into(),
        }
    }
}

/// One parsed path segment.
enum Segment {
    /// Plain map key.
    Key(String),
    /// `name[index]` — list element `index` under key `name`.
    Index { key: String, index: usize },
}

/// Parse one segment, falling back to a literal key on any near-miss.
fn parse_segment(seg: &str) -> Segment {
    if let Some(open) = seg.find('[') {
        if open > 0 && seg.ends_with(']') {
            let digits = &seg[open + 1..seg.len() - 1];
            if !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit()) {
                if let Ok(index) = digits.parse::<usize>() {
                    return Segment::Index {
                        key: seg[..open].to_string(),
                        index,
                    };
                }
            }
        }
    }
    Segment::Key(seg.to_string())
}

/// Set `value` at `path` inside `tree`, creating intermediate maps and lists
/// as needed.
///
/// List segments auto-extend the list with `null` placeholders up to the
/// required index. Setting the empty path is a no-op — no key is created.
/// Intermediate nodes that exist with the wrong shape (a scalar where a map
/// is needed) are replaced, consistent with last-write-wins semantics.
pub fn set_by_path(tree: &mut Map<String, Value>, path: &str, value: Value) {
    if path.is_empty() {
        return;
    }
    let segments: Vec<Segment> = path.split('.').map(parse_segment).collect();
    set_segments(tree, &segments, value);
}

fn set_segments(map: &mut Map<String, Value>, segments: &[Segment], value: Value) {
    let Some((seg, rest)) = segments.split_first() else {
        return;
    };
    match seg {
        Segment::Key(key) => {
            if rest.is_empty() {
                map.insert(key.clone(), value);
                return;
            }
            let entry = map
                .entry(key.clone())
                .or_insert_with(|| Value::Object(Map::new()));
            if !entry.is_object() {
                *entry = Value::Object(Map::new());
            }
            if let Value::Object(child) = entry {
                set_segments(child, rest, value);
            }
        }
        Segment::Index { key, index } => {
            let entry = map
                .entry(key.clone())
                .or_insert_with(|| Value::Array(Vec::new()));
            if !entry.is_array() {
                *entry = Value::Array(Vec::new());
            }
            if let Value::Array(list) = entry {
                while list.len() <= *index {
                    list.push(Value::Null);
                }
                if rest.is_empty() {
                    list[*index] = value;
                    return;
                }
                let elem = &mut list[*index];
                if !elem.is_object() {
                    *elem = Value::Object(Map::new());
                }
                if let Value::Object(child) = elem {
                    set_segments(child, rest, value);
                }
            }
        }
    }
}

/// Read the value at `path` back out of a built tree.
///
/// Returns `None` for the empty path, a missing key, or an out-of-range list
/// index. Intended for tooling and tests; the engine itself only builds.
#[must_use]
pub fn value_at_path<'a>(tree: &'a Map<String, Value>, path: &str) -> Option<&'a Value> {
    if path.is_empty() {
        return None;
    }
    let mut current: Option<&Value> = None;
    let mut map = Some(tree);
    for seg in path.split('.').map(parse_segment) {
        let m = map?;
        let next = match &seg {
            Segment::Key(key) => m.get(key)?,
            Segment::Index { key, index } => m.get(key)?.as_array()?.get(*index)?,
        };
        current = Some(next);
        map = next.as_object();
    }
    current
}

/// Build one body value tree from a flat field list.
///
/// Every value passes through [`coerce_value`] first, then fields are applied
/// in input order via [`set_by_path`]. When the same path appears more than
/// once the later occurrence wins — the ordering contract the oneof resolver
/// in the codec relies on.
#[must_use]
pub fn build_from_fields(fields: &[BodyField]) -> Map<String, Value> {
    let mut tree = Map::new();
    for field in fields {
        set_by_path(&mut tree, &field.path, coerce_value(field.value.clone()));
    }
    tree
}

/// Coerce a string value into the JSON literal it spells, if any.
///
/// Only strings are touched; structured values pass through unchanged. The
/// trimmed string is tried as a JSON object/array when it starts with `{` or
/// `[`, then as a single JSON scalar literal (`true`/`false`/`null`/number/
/// quoted string). When neither parse succeeds the original string is
/// returned as-is, so free-form text survives untouched.
#[must_use]
pub fn coerce_value(value: Value) -> Value {
    let Value::String(s) = value else {
        return value;
    };
    let trimmed = s.trim();
    if trimmed.starts_with('{') || trimmed.starts_with('[') {
        if let Ok(parsed) = serde_json::from_str::<Value>(trimmed) {
            if parsed.is_object() || parsed.is_array() {
                return parsed;
            }
        }
    } else if let Ok(parsed) = serde_json::from_str::<Value>(trimmed) {
        // A bare scalar literal: true/false/null/number/"quoted".
        if !parsed.is_object() && !parsed.is_array() {
            return parsed;
        }
    }
    Value::String(s)
}
