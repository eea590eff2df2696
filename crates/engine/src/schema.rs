//! Field table: the single definition of what each column is.
//!
//! Selection reads `editable`, change tracking reads `editable` and `rule`,
//! payload building reads `serializable` and `kind`. A column's editability
//! is defined here once and nowhere else.

use std::collections::HashSet;

use casegrid_core::ColumnKey;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::SchemaError;
use crate::validation::{parse_whole_number, NumericConstraint, ValidationResult, ValidationRule};

/// Wire type of a column's value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldKind {
    /// Free text, sent as a JSON string.
    #[default]
    Text,
    /// Integer, sent as a JSON number (blank is sent as null).
    Integer,
    /// One of a fixed set of strings, sent as a JSON string.
    Enum,
}

impl FieldKind {
    /// Convert cell text to its JSON wire form.
    ///
    /// `None` when the text has no value of this kind. Text that passed
    /// [`FieldSpec::validate`] always converts.
    pub fn to_json(&self, text: &str) -> Option<Value> {
        match self {
            FieldKind::Text | FieldKind::Enum => Some(Value::String(text.to_string())),
            FieldKind::Integer if text.trim().is_empty() => Some(Value::Null),
            FieldKind::Integer => parse_whole_number(text).ok().map(Value::from),
        }
    }
}

fn default_true() -> bool {
    true
}

/// One column of the grid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldSpec {
    pub key: ColumnKey,
    #[serde(default)]
    pub label: String,
    /// Can be selected and edited in the grid.
    #[serde(default = "default_true")]
    pub editable: bool,
    /// Accepted by the update endpoint. Pending values of other columns are dropped from payloads.
    #[serde(default = "default_true")]
    pub serializable: bool,
    /// Accepts a single copied value from a different column.
    #[serde(default = "default_true")]
    pub accepts_broadcast: bool,
    #[serde(default = "default_true")]
    pub allow_blank: bool,
    #[serde(default)]
    pub kind: FieldKind,
    #[serde(default)]
    pub rule: ValidationRule,
}

impl FieldSpec {
    pub fn text(key: &str, label: &str) -> Self {
        Self {
            key: ColumnKey::from(key),
            label: label.to_string(),
            editable: true,
            serializable: true,
            accepts_broadcast: true,
            allow_blank: true,
            kind: FieldKind::Text,
            rule: ValidationRule::AnyValue,
        }
    }

    pub fn enumeration(key: &str, label: &str, values: &[&str]) -> Self {
        Self {
            kind: FieldKind::Enum,
            rule: ValidationRule::list(values.iter().copied()),
            accepts_broadcast: false,
            allow_blank: false,
            ..Self::text(key, label)
        }
    }

    pub fn read_only(key: &str, label: &str) -> Self {
        Self {
            editable: false,
            serializable: false,
            accepts_broadcast: false,
            ..Self::text(key, label)
        }
    }

    pub fn with_rule(mut self, rule: ValidationRule) -> Self {
        self.rule = rule;
        self
    }

    pub fn with_kind(mut self, kind: FieldKind) -> Self {
        self.kind = kind;
        self
    }

    /// Label for display, falling back to the key.
    pub fn display_label(&self) -> &str {
        if self.label.is_empty() {
            self.key.as_str()
        } else {
            &self.label
        }
    }

    pub fn validate(&self, value: &str) -> ValidationResult {
        if self.kind == FieldKind::Integer && !value.trim().is_empty() {
            if let Err(e) = parse_whole_number(value) {
                return ValidationResult::Invalid { reason: e.to_string() };
            }
        }
        self.rule.validate(value, self.allow_blank)
    }

    /// Canonical text for a validated value: list entries and integers are
    /// trimmed, integers lose a leading `+`. Free text is kept as typed.
    pub fn normalize(&self, value: &str) -> String {
        if self.kind == FieldKind::Integer {
            return match parse_whole_number(value) {
                Ok(n) => n.to_string(),
                Err(_) => value.trim().to_string(),
            };
        }
        if self.kind == FieldKind::Enum || self.rule.allowed_values().is_some() {
            return value.trim().to_string();
        }
        value.to_string()
    }
}

fn default_id_field() -> String {
    "id".to_string()
}

/// Ordered column schema of a grid instance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Schema {
    /// JSON field holding the record's primary key.
    #[serde(default = "default_id_field")]
    pub id_field: String,
    /// JSON field holding the human-readable record number (cache key).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_key: Option<String>,
    pub fields: Vec<FieldSpec>,
}

impl Schema {
    pub fn new(fields: Vec<FieldSpec>) -> Self {
        Self {
            id_field: default_id_field(),
            display_key: None,
            fields,
        }
    }

    pub fn with_display_key(mut self, key: impl Into<String>) -> Self {
        self.display_key = Some(key.into());
        self
    }

    /// Built-in schema for test cases.
    ///
    /// `tcg` (the classification tag) is shown but never bulk edited and
    /// never sent; the update endpoint owns it through a separate flow.
    pub fn test_cases() -> Self {
        Self::new(vec![
            FieldSpec::read_only("test_case_number", "Number"),
            FieldSpec::text("title", "Title")
                .with_rule(ValidationRule::TextLength(NumericConstraint::between(1.0, 255.0))),
            FieldSpec::enumeration("priority", "Priority", &["High", "Medium", "Low"]),
            FieldSpec::text("precondition", "Precondition"),
            FieldSpec::text("steps", "Steps"),
            FieldSpec::text("expected_result", "Expected Result"),
            FieldSpec::read_only("tcg", "TCG"),
        ])
        .with_display_key("test_case_number")
    }

    pub fn from_toml(input: &str) -> Result<Self, SchemaError> {
        let schema: Schema =
            toml::from_str(input).map_err(|e| SchemaError::Parse(e.to_string()))?;
        schema.validate()?;
        Ok(schema)
    }

    pub fn to_toml(&self) -> Result<String, SchemaError> {
        toml::to_string(self).map_err(|e| SchemaError::Parse(e.to_string()))
    }

    pub fn validate(&self) -> Result<(), SchemaError> {
        if self.fields.is_empty() {
            return Err(SchemaError::Validation("schema has no fields".into()));
        }

        let mut seen = HashSet::new();
        for field in &self.fields {
            if field.key.as_str().is_empty() {
                return Err(SchemaError::Validation("field with empty key".into()));
            }
            if !seen.insert(field.key.as_str()) {
                return Err(SchemaError::Validation(format!(
                    "duplicate field '{}'",
                    field.key
                )));
            }
            if let ValidationRule::List { values } = &field.rule {
                if values.is_empty() {
                    return Err(SchemaError::Validation(format!(
                        "field '{}': list rule has no values",
                        field.key
                    )));
                }
            }
            if field.kind == FieldKind::Enum && field.rule.allowed_values().is_none() {
                return Err(SchemaError::Validation(format!(
                    "field '{}': enum fields need a list rule",
                    field.key
                )));
            }
            let is_identity = field.key.as_str() == self.id_field
                || self.display_key.as_deref() == Some(field.key.as_str());
            if is_identity && field.editable {
                return Err(SchemaError::Validation(format!(
                    "field '{}' identifies records and cannot be editable",
                    field.key
                )));
            }
        }

        Ok(())
    }

    pub fn field(&self, key: &ColumnKey) -> Option<&FieldSpec> {
        self.fields.iter().find(|f| &f.key == key)
    }

    /// Position of a column in the schema order.
    pub fn column_index(&self, key: &ColumnKey) -> Option<usize> {
        self.fields.iter().position(|f| &f.key == key)
    }

    pub fn is_editable(&self, key: &ColumnKey) -> bool {
        self.field(key).is_some_and(|f| f.editable)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl Default for Schema {
    fn default() -> Self {
        Self::test_cases()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_schema_is_valid() {
        let schema = Schema::test_cases();
        schema.validate().unwrap();

        assert!(schema.is_editable(&"priority".into()));
        assert!(!schema.is_editable(&"test_case_number".into()));
        assert!(!schema.is_editable(&"tcg".into()));
        assert!(!schema.field(&"tcg".into()).unwrap().serializable);
        assert_eq!(schema.column_index(&"title".into()), Some(1));
    }

    #[test]
    fn test_from_toml_with_defaults() {
        let schema = Schema::from_toml(
            r#"
display_key = "number"

[[fields]]
key = "number"
editable = false
serializable = false

[[fields]]
key = "title"

[[fields]]
key = "priority"
kind = "enum"
accepts_broadcast = false
rule = { type = "list", values = ["P1", "P2"] }

[[fields]]
key = "estimate"
kind = "integer"
rule = { type = "whole_number", operator = "greater_than_or_equal", value1 = 0 }
"#,
        )
        .unwrap();

        assert_eq!(schema.id_field, "id");
        assert_eq!(schema.len(), 4);

        let title = schema.field(&"title".into()).unwrap();
        assert!(title.editable && title.serializable && title.accepts_broadcast);
        assert_eq!(title.display_label(), "title");

        let priority = schema.field(&"priority".into()).unwrap();
        assert!(priority.validate("P1").is_valid());
        assert!(priority.validate("P3").is_invalid());

        let estimate = schema.field(&"estimate".into()).unwrap();
        assert!(estimate.validate("4").is_valid());
        assert!(estimate.validate("-1").is_invalid());
        assert!(estimate.validate("four").is_invalid());
        for junk in ["NaN", "inf", "1e3", "99999999999999999999"] {
            assert!(estimate.validate(junk).is_invalid(), "{junk} accepted");
        }
    }

    #[test]
    fn test_normalize_trims_list_and_integer_values() {
        let priority = FieldSpec::enumeration("priority", "Priority", &["High", "Low"]);
        assert_eq!(priority.normalize(" Low "), "Low");

        let estimate = FieldSpec::text("estimate", "Estimate").with_kind(FieldKind::Integer);
        assert_eq!(estimate.normalize(" +042 "), "42");
        assert_eq!(estimate.normalize(" "), "");

        let title = FieldSpec::text("title", "Title");
        assert_eq!(title.normalize("  padded "), "  padded ");
    }

    #[test]
    fn test_rejects_duplicate_keys() {
        let err = Schema::from_toml(
            r#"
[[fields]]
key = "title"

[[fields]]
key = "title"
"#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("duplicate field 'title'"));
    }

    #[test]
    fn test_rejects_enum_without_list() {
        let err = Schema::from_toml(
            r#"
[[fields]]
key = "priority"
kind = "enum"
"#,
        )
        .unwrap_err();
        assert!(matches!(err, SchemaError::Validation(_)));
    }

    #[test]
    fn test_rejects_editable_identity_field() {
        let err = Schema::from_toml(
            r#"
[[fields]]
key = "id"
"#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("identifies records"));
    }

    #[test]
    fn test_toml_round_trip_of_default() {
        let schema = Schema::test_cases();
        let text = schema.to_toml().unwrap();
        let parsed = Schema::from_toml(&text).unwrap();
        assert_eq!(parsed, schema);
    }

    #[test]
    fn test_integer_to_json() {
        assert_eq!(FieldKind::Integer.to_json("12"), Some(serde_json::json!(12)));
        assert_eq!(FieldKind::Integer.to_json(" +3 "), Some(serde_json::json!(3)));
        assert_eq!(FieldKind::Integer.to_json(" "), Some(Value::Null));
        assert_eq!(FieldKind::Integer.to_json("1e3"), None);
        assert_eq!(FieldKind::Text.to_json("12"), Some(serde_json::json!("12")));
    }
}
