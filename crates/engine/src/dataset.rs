//! Loaded records and the order they are currently rendered in.

use std::collections::HashMap;

use casegrid_core::{ColumnKey, RecordId};
use serde_json::{Map, Value};

/// One backend record. `fields` is the last-known server snapshot.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    pub id: RecordId,
    pub fields: Map<String, Value>,
}

impl Record {
    pub fn new(id: impl Into<RecordId>, fields: Map<String, Value>) -> Self {
        Self { id: id.into(), fields }
    }

    /// Build a record from a JSON object, reading its key from `id_field`.
    pub fn from_json(value: Value, id_field: &str) -> Option<Self> {
        let Value::Object(fields) = value else {
            return None;
        };
        let id = record_id_from_json(fields.get(id_field)?)?;
        Some(Self { id, fields })
    }

    /// Display text of a field in the snapshot.
    pub fn text(&self, column: &ColumnKey) -> String {
        self.fields.get(column.as_str()).map(value_text).unwrap_or_default()
    }
}

/// Normalize a JSON primary key (number or string) to a `RecordId`.
pub fn record_id_from_json(value: &Value) -> Option<RecordId> {
    match value {
        Value::String(s) if !s.is_empty() => Some(RecordId::from(s.as_str())),
        Value::Number(n) => Some(RecordId::from(n.to_string())),
        _ => None,
    }
}

/// Text shown in a cell for a JSON value. Null is blank.
pub fn value_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Records indexed by id, plus the rendered row order.
#[derive(Debug, Clone, Default)]
pub struct Dataset {
    records: Vec<Record>,
    index: HashMap<RecordId, usize>,
    view: Vec<RecordId>,
}

impl Dataset {
    /// Build a dataset. Later duplicates of an id are dropped.
    pub fn new(records: Vec<Record>) -> Self {
        let mut dataset = Self::default();
        for record in records {
            if dataset.index.contains_key(&record.id) {
                log::warn!("Dropping duplicate record {}", record.id);
                continue;
            }
            dataset.index.insert(record.id.clone(), dataset.records.len());
            dataset.view.push(record.id.clone());
            dataset.records.push(record);
        }
        dataset
    }

    pub fn get(&self, id: &RecordId) -> Option<&Record> {
        self.index.get(id).map(|&i| &self.records[i])
    }

    pub fn contains(&self, id: &RecordId) -> bool {
        self.index.contains_key(id)
    }

    /// Replace a record's snapshot fields. The local id is kept as-is.
    pub fn replace_fields(&mut self, id: &RecordId, fields: Map<String, Value>) -> bool {
        match self.index.get(id) {
            Some(&i) => {
                self.records[i].fields = fields;
                true
            }
            None => false,
        }
    }

    /// Set the rendered row order (after a filter or sort). Unknown ids are ignored.
    pub fn set_view_order(&mut self, order: Vec<RecordId>) {
        let mut seen = std::collections::HashSet::new();
        self.view = order
            .into_iter()
            .filter(|id| self.index.contains_key(id) && seen.insert(id.clone()))
            .collect();
    }

    /// Rendered rows, top to bottom.
    pub fn view_order(&self) -> &[RecordId] {
        &self.view
    }

    /// Position of a record among the rendered rows, looked up in the live view.
    pub fn row_position(&self, id: &RecordId) -> Option<usize> {
        self.view.iter().position(|r| r == id)
    }

    pub fn row_at(&self, position: usize) -> Option<&RecordId> {
        self.view.get(position)
    }

    pub fn records(&self) -> impl Iterator<Item = &Record> {
        self.records.iter()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(id: i64, title: &str) -> Record {
        Record::from_json(json!({ "id": id, "title": title }), "id").unwrap()
    }

    #[test]
    fn test_from_json_normalizes_numeric_ids() {
        let r = record(7, "Login");
        assert_eq!(r.id, RecordId::from("7"));
        assert_eq!(r.text(&"title".into()), "Login");
        assert_eq!(r.text(&"missing".into()), "");
    }

    #[test]
    fn test_from_json_requires_id() {
        assert!(Record::from_json(json!({ "title": "x" }), "id").is_none());
        assert!(Record::from_json(json!([1, 2]), "id").is_none());
        assert!(Record::from_json(json!({ "id": null }), "id").is_none());
    }

    #[test]
    fn test_value_text() {
        assert_eq!(value_text(&json!(null)), "");
        assert_eq!(value_text(&json!("High")), "High");
        assert_eq!(value_text(&json!(3)), "3");
        assert_eq!(value_text(&json!(true)), "true");
    }

    #[test]
    fn test_view_order_filters_unknown_and_duplicates() {
        let mut data = Dataset::new(vec![record(1, "a"), record(2, "b"), record(3, "c")]);
        assert_eq!(data.row_position(&"3".into()), Some(2));

        data.set_view_order(vec!["3".into(), "9".into(), "1".into(), "3".into()]);
        assert_eq!(data.view_order(), &[RecordId::from("3"), RecordId::from("1")]);
        assert_eq!(data.row_position(&"2".into()), None);
        assert_eq!(data.row_at(1), Some(&RecordId::from("1")));
        // Hidden rows stay loaded
        assert!(data.contains(&"2".into()));
    }

    #[test]
    fn test_duplicate_ids_are_dropped() {
        let data = Dataset::new(vec![record(1, "first"), record(1, "second")]);
        assert_eq!(data.len(), 1);
        assert_eq!(data.get(&"1".into()).unwrap().text(&"title".into()), "first");
    }
}
