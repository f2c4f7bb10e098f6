//! Target schema descriptors.
//!
//! A [`SchemaDescriptor`] tells the extractor what the caller's artifact looks
//! like (its marker fields) and tells the dispatcher how to validate it
//! (required fields with their JSON kinds, plus an optional JSON Schema
//! document).

pub mod catalog;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::sync::Arc;

use crate::error::GenerationError;

/// Upper bound on JSON Schema violations reported per validation.
const MAX_REPORTED_VIOLATIONS: usize = 10;

/// JSON kind a required field must have.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldKind {
    String,
    Number,
    Integer,
    Boolean,
    Array,
    Object,
    Any,
}

impl FieldKind {
    pub fn matches(self, value: &Value) -> bool {
        match self {
            Self::String => value.is_string(),
            Self::Number => value.is_number(),
            Self::Integer => value.is_i64() || value.is_u64(),
            Self::Boolean => value.is_boolean(),
            Self::Array => value.is_array(),
            Self::Object => value.is_object(),
            Self::Any => !value.is_null(),
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Number => "number",
            Self::Integer => "integer",
            Self::Boolean => "boolean",
            Self::Array => "array",
            Self::Object => "object",
            Self::Any => "any",
        }
    }
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// A required top-level field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldSpec {
    pub name: String,
    pub kind: FieldKind,
}

struct CompiledSchema {
    source: Value,
    validator: jsonschema::Validator,
}

/// Describes the JSON artifact a caller expects back.
#[derive(Clone)]
pub struct SchemaDescriptor {
    name: String,
    markers: Vec<String>,
    required: Vec<FieldSpec>,
    json_schema: Option<Arc<CompiledSchema>>,
}

impl fmt::Debug for SchemaDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SchemaDescriptor")
            .field("name", &self.name)
            .field("markers", &self.markers)
            .field("required", &self.required)
            .field(
                "json_schema",
                &self.json_schema.as_ref().map(|s| &s.source),
            )
            .finish()
    }
}

impl SchemaDescriptor {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            markers: Vec::new(),
            required: Vec::new(),
            json_schema: None,
        }
    }

    /// Add a marker field: its presence identifies this artifact in a larger
    /// object graph.
    pub fn marker(mut self, field: impl Into<String>) -> Self {
        self.markers.push(field.into());
        self
    }

    pub fn require(mut self, field: impl Into<String>, kind: FieldKind) -> Self {
        self.required.push(FieldSpec {
            name: field.into(),
            kind,
        });
        self
    }

    /// Attach a JSON Schema document checked after the required fields.
    pub fn with_json_schema(mut self, schema: Value) -> Result<Self, GenerationError> {
        let validator = jsonschema::validator_for(&schema).map_err(|e| {
            GenerationError::ConfigurationError(format!(
                "invalid JSON schema for `{}`: {e}",
                self.name
            ))
        })?;
        self.json_schema = Some(Arc::new(CompiledSchema {
            source: schema,
            validator,
        }));
        Ok(self)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn required(&self) -> &[FieldSpec] {
        &self.required
    }

    /// Marker fields; falls back to the required field names when none were
    /// declared explicitly.
    pub fn markers(&self) -> Vec<&str> {
        if self.markers.is_empty() {
            self.required.iter().map(|f| f.name.as_str()).collect()
        } else {
            self.markers.iter().map(String::as_str).collect()
        }
    }

    /// Whether `value` looks like this artifact: an object carrying at least
    /// one non-null marker field. A descriptor without markers accepts any
    /// object.
    pub fn matches_shape(&self, value: &Value) -> bool {
        let Some(obj) = value.as_object() else {
            return false;
        };
        let markers = self.markers();
        markers.is_empty()
            || markers
                .iter()
                .any(|m| obj.get(*m).is_some_and(|v| !v.is_null()))
    }

    /// Collect every violation of the required fields and JSON Schema.
    pub fn violations(&self, value: &Value) -> Vec<String> {
        let mut out = Vec::new();
        match value.as_object() {
            None => out.push(format!("expected a JSON object, got {}", kind_of(value))),
            Some(obj) => {
                for field in &self.required {
                    match obj.get(&field.name) {
                        None | Some(Value::Null) => {
                            out.push(format!("missing required field `{}`", field.name))
                        }
                        Some(v) if !field.kind.matches(v) => out.push(format!(
                            "field `{}` should be {}, got {}",
                            field.name,
                            field.kind.as_str(),
                            kind_of(v)
                        )),
                        Some(_) => {}
                    }
                }
            }
        }

        if let Some(compiled) = &self.json_schema {
            out.extend(
                compiled
                    .validator
                    .iter_errors(value)
                    .take(MAX_REPORTED_VIOLATIONS)
                    .map(|e| e.to_string()),
            );
        }
        out
    }

    pub fn validate(&self, value: &Value) -> Result<(), GenerationError> {
        let violations = self.violations(value);
        if violations.is_empty() {
            Ok(())
        } else {
            Err(GenerationError::SchemaValidationFailed {
                schema: self.name.clone(),
                violations,
            })
        }
    }
}
