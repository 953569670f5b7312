//! Structured resume data and the schema check applied at the model boundary.
//!
//! The structurer asks for "structured JSON suitable for a resume" and the
//! model chooses the exact shape, so the schema is deliberately loose: the
//! root must be a non-empty object, and the handful of fields every resume
//! template relies on must have a usable type when they are present.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// Fields that must be text (or null) when present.
const TEXT_FIELDS: &[&str] = &["name", "email", "phone", "summary"];

/// Fields that must be a list or a mapping when present.
const COLLECTION_FIELDS: &[&str] = &["experience", "education", "projects", "certifications"];

/// A resume as structured data: field name → value, nesting allowed.
///
/// Always a validated JSON object; construct through
/// [`StructuredResume::from_map`] or [`StructuredResume::from_value`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Value", into = "Value")]
pub struct StructuredResume {
    fields: Map<String, Value>,
}

/// A resume that failed the schema check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaViolation {
    pub field: Option<String>,
    pub reason: String,
}

impl fmt::Display for SchemaViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.field {
            Some(field) => write!(f, "field '{}': {}", field, self.reason),
            None => write!(f, "{}", self.reason),
        }
    }
}

impl std::error::Error for SchemaViolation {}

impl StructuredResume {
    /// Validate `fields` and wrap them.
    pub fn from_map(fields: Map<String, Value>) -> Result<Self, SchemaViolation> {
        validate(&fields)?;
        Ok(Self { fields })
    }

    /// Validate an arbitrary JSON value; only objects are accepted.
    pub fn from_value(value: Value) -> Result<Self, SchemaViolation> {
        match value {
            Value::Object(map) => Self::from_map(map),
            other => Err(SchemaViolation {
                field: None,
                reason: format!("root must be a JSON object, found {}", kind(&other)),
            }),
        }
    }

    /// Top-level fields, the substitution scope for rendering.
    pub fn fields(&self) -> &Map<String, Value> {
        &self.fields
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields.get(field)
    }

    /// The candidate's name, when the model put one at the top level.
    pub fn name(&self) -> Option<&str> {
        self.fields.get("name").and_then(Value::as_str)
    }

    /// Pretty-printed JSON, as sent to the theme and layout prompts and
    /// written to `parser.json`.
    pub fn to_pretty_json(&self) -> String {
        // A Map<String, Value> always serialises.
        serde_json::to_string_pretty(&self.fields).unwrap_or_default()
    }
}

impl TryFrom<Value> for StructuredResume {
    type Error = SchemaViolation;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        Self::from_value(value)
    }
}

impl From<StructuredResume> for Value {
    fn from(resume: StructuredResume) -> Self {
        Value::Object(resume.fields)
    }
}

fn kind(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

fn violation(field: &str, reason: String) -> SchemaViolation {
    SchemaViolation {
        field: Some(field.to_string()),
        reason,
    }
}

fn validate(fields: &Map<String, Value>) -> Result<(), SchemaViolation> {
    if fields.is_empty() {
        return Err(SchemaViolation {
            field: None,
            reason: "resume object has no fields".into(),
        });
    }

    if fields.keys().any(|k| k.trim().is_empty()) {
        return Err(SchemaViolation {
            field: None,
            reason: "resume object has an empty field name".into(),
        });
    }

    for &field in TEXT_FIELDS {
        match fields.get(field) {
            None | Some(Value::Null) | Some(Value::String(_)) => {}
            Some(other) => {
                return Err(violation(field, format!("expected text, found {}", kind(other))))
            }
        }
    }

    for &field in COLLECTION_FIELDS {
        match fields.get(field) {
            None | Some(Value::Null) | Some(Value::Array(_)) | Some(Value::Object(_)) => {}
            Some(other) => {
                return Err(violation(
                    field,
                    format!("expected a list or mapping, found {}", kind(other)),
                ))
            }
        }
    }

    match fields.get("skills") {
        Some(Value::Bool(_)) | Some(Value::Number(_)) => Err(violation(
            "skills",
            "expected a list, mapping or text".into(),
        )),
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn accepts_typical_resume() {
        let r = StructuredResume::from_value(json!({
            "name": "Ann Lee",
            "email": "ann@example.org",
            "skills": {"languages": ["Rust"]},
            "experience": [{"company": "Acme", "role": "SRE"}]
        }))
        .unwrap();
        assert_eq!(r.name(), Some("Ann Lee"));
        assert_eq!(r.fields().len(), 4);
    }

    #[test]
    fn accepts_unknown_fields_of_any_shape() {
        assert!(StructuredResume::from_value(json!({"hobbies": 3, "awards": "none"})).is_ok());
    }

    #[test]
    fn rejects_non_object_root() {
        let err = StructuredResume::from_value(json!(["Ann"])).unwrap_err();
        assert!(err.reason.contains("an array"), "got {err}");
    }

    #[test]
    fn rejects_empty_object() {
        assert!(StructuredResume::from_value(json!({})).is_err());
    }

    #[test]
    fn rejects_mistyped_known_field() {
        let err = StructuredResume::from_value(json!({"name": {"first": "Ann"}})).unwrap_err();
        assert_eq!(err.field.as_deref(), Some("name"));

        let err = StructuredResume::from_value(json!({"experience": "ten years"})).unwrap_err();
        assert_eq!(err.field.as_deref(), Some("experience"));
    }

    #[test]
    fn serde_round_trip_goes_through_validation() {
        let ok: Result<StructuredResume, _> = serde_json::from_str(r#"{"name": "Ann"}"#);
        assert!(ok.is_ok());
        let bad: Result<StructuredResume, _> = serde_json::from_str("[]");
        assert!(bad.is_err());
    }

    #[test]
    fn pretty_json_is_stable() {
        let r = StructuredResume::from_value(json!({"name": "Ann"})).unwrap();
        assert_eq!(r.to_pretty_json(), "{\n  \"name\": \"Ann\"\n}");
    }
}
