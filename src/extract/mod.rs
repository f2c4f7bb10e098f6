//! Structured extraction
//!
//! Recovers the JSON value a caller asked for from raw model text. Models are
//! not reliable JSON emitters: output arrives wrapped in Markdown fences,
//! surrounded by prose, double-encoded inside chat-completion envelopes, or
//! cut off by a token limit. The [`Extractor`] works through these in order:
//!
//! 1. parse the trimmed text directly; only if that fails, strip the code
//!    fences wrapping it;
//! 2. parse leniently (direct, then a balanced slice, then truncation repair);
//! 3. accept the value if it matches the target shape, otherwise search it:
//!    marker-bearing nested values first, then the known [`WrapperShape`]s in
//!    priority order (string payloads are re-extracted from step 1), then a
//!    generic depth-first descent into nested containers. Without a target,
//!    any object or array is accepted once no known wrapper yields one.
//!
//! The search is bounded by a maximum depth so adversarial input terminates.

mod fence;
mod repair;
mod wrappers;

pub use fence::strip_code_fences;
pub use repair::{parse_lenient, repair_truncated, strip_trailing_commas};
pub use wrappers::WrapperShape;

use crate::error::GenerationError;
use crate::schema::SchemaDescriptor;
use serde_json::Value;

/// Default bound on nesting levels visited while searching.
pub const DEFAULT_MAX_DEPTH: usize = 20;

const REASONING_KEYS: [&str; 3] = ["reasoning_content", "reasoning", "thinking"];

/// Locates the caller's JSON payload inside raw model output.
#[derive(Debug, Clone, Copy)]
pub struct Extractor {
    max_depth: usize,
}

impl Default for Extractor {
    fn default() -> Self {
        Self::new()
    }
}

impl Extractor {
    pub const fn new() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }

    pub const fn with_max_depth(max_depth: usize) -> Self {
        Self { max_depth }
    }

    pub const fn max_depth(&self) -> usize {
        self.max_depth
    }

    /// Extract the value matching `target` from `raw`.
    ///
    /// Without a target, known envelopes are unwrapped and any other JSON
    /// object or array is accepted. Shape matching
    /// only checks marker fields; full validation against the descriptor is
    /// left to the caller.
    pub fn extract(
        &self,
        raw: &str,
        target: Option<&SchemaDescriptor>,
    ) -> Result<Value, GenerationError> {
        let Some(parsed) = parse_payload(raw) else {
            let reason = if strip_code_fences(raw).is_empty() {
                "empty output"
            } else {
                "no JSON value found in output"
            };
            return Err(GenerationError::extraction_failed(reason, raw));
        };

        if let Some(found) = self.search(&parsed, target, 0) {
            return Ok(found);
        }

        let reason = if carries_reasoning(&parsed, self.max_depth) {
            "reasoning-only output"
        } else {
            match target {
                Some(t) => {
                    tracing::debug!(schema = t.name(), "no value with the expected shape");
                    "no value with the expected shape"
                }
                None => "no JSON object or array found",
            }
        };
        Err(GenerationError::extraction_failed(reason, raw))
    }

    fn extract_text(&self, text: &str, target: Option<&SchemaDescriptor>, depth: usize) -> Option<Value> {
        if depth > self.max_depth {
            return None;
        }
        let parsed = parse_payload(text)?;
        self.search(&parsed, target, depth)
    }

    fn search(&self, value: &Value, target: Option<&SchemaDescriptor>, depth: usize) -> Option<Value> {
        if depth > self.max_depth {
            return None;
        }
        if let Value::String(s) = value {
            return self.extract_text(s, target, depth + 1);
        }
        if let Some(t) = target {
            if t.matches_shape(value) {
                return Some(value.clone());
            }
            if let Some(found) = self.find_marked(value, t, depth + 1) {
                return Some(found.clone());
            }
        }

        for shape in WrapperShape::PRIORITY {
            if let Some(inner) = shape.locate(value) {
                if let Some(found) = self.search(inner, target, depth + 1) {
                    tracing::trace!(?shape, "unwrapped known envelope");
                    return Some(found);
                }
            }
        }
        if target.is_none() && is_plausible_payload(value) {
            return Some(value.clone());
        }

        children(value)
            .filter(|child| child.is_object() || child.is_array())
            .find_map(|child| self.search(child, target, depth + 1))
    }

    /// Depth-first search for a nested container carrying the target's markers.
    fn find_marked<'a>(&self, value: &'a Value, target: &SchemaDescriptor, depth: usize) -> Option<&'a Value> {
        if depth > self.max_depth {
            return None;
        }
        for child in children(value) {
            if target.matches_shape(child) {
                return Some(child);
            }
            if let Some(found) = self.find_marked(child, target, depth + 1) {
                return Some(found);
            }
        }
        None
    }
}

/// Extract with the default depth bound.
pub fn extract(raw: &str, target: Option<&SchemaDescriptor>) -> Result<Value, GenerationError> {
    Extractor::new().extract(raw, target)
}

/// Direct parse of the trimmed text, falling back to fence stripping and
/// lenient parsing. Valid JSON is never rewritten.
fn parse_payload(text: &str) -> Option<Value> {
    let trimmed = text.trim();
    if let Ok(value) = serde_json::from_str::<Value>(trimmed) {
        return Some(value);
    }
    let cleaned = strip_code_fences(trimmed);
    if cleaned.is_empty() {
        return None;
    }
    parse_lenient(&cleaned)
}

/// Acceptance rule when no target shape was requested.
fn is_plausible_payload(value: &Value) -> bool {
    match value {
        Value::Object(map) => !map.is_empty() && !is_reasoning_only(map),
        Value::Array(_) => true,
        _ => false,
    }
}

fn is_reasoning_only(map: &serde_json::Map<String, Value>) -> bool {
    map.keys().any(|k| REASONING_KEYS.contains(&k.as_str()))
        && map
            .iter()
            .all(|(k, v)| REASONING_KEYS.contains(&k.as_str()) || k == "role" || is_blank(v))
}

fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.trim().is_empty(),
        _ => false,
    }
}

fn carries_reasoning(value: &Value, depth: usize) -> bool {
    match value {
        Value::Object(map) => {
            map.iter().any(|(k, v)| {
                (REASONING_KEYS.contains(&k.as_str()) && !is_blank(v))
                    || (depth > 0 && carries_reasoning(v, depth - 1))
            })
        }
        Value::Array(items) => depth > 0 && items.iter().any(|v| carries_reasoning(v, depth - 1)),
        _ => false,
    }
}

fn children(value: &Value) -> Box<dyn Iterator<Item = &Value> + '_> {
    match value {
        Value::Object(map) => Box::new(map.values()),
        Value::Array(items) => Box::new(items.iter()),
        _ => Box::new(std::iter::empty()),
    }
}
