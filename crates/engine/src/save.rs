//! Save batches: pending changes turned into per-record update requests.
//!
//! A batch is detached from the grid that built it, so it can be executed
//! on another thread while the grid keeps accepting edits. Every record is
//! sent on its own; one failure never stops the rest.

use std::collections::BTreeMap;
use std::fmt;

use casegrid_core::RecordId;
use serde_json::{Map, Value};

use crate::pending::RecordChanges;

/// Backend that persists one record at a time.
pub trait RecordStore {
    type Error: fmt::Display;

    /// Apply a partial update and return the full updated record.
    fn update_record(
        &self,
        id: &RecordId,
        payload: &Map<String, Value>,
    ) -> Result<Map<String, Value>, Self::Error>;
}

/// One record's update request.
#[derive(Debug, Clone, PartialEq)]
pub struct SaveEntry {
    pub id: RecordId,
    pub payload: Map<String, Value>,
    /// Pending texts as they were when the batch was built.
    pub sent: RecordChanges,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SaveBatch {
    pub entries: Vec<SaveEntry>,
}

impl SaveBatch {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Send every entry in order, capturing each result independently.
    pub fn execute<S: RecordStore>(self, store: &S) -> Vec<RecordOutcome> {
        self.entries
            .into_iter()
            .map(|entry| {
                log::debug!("saving record {} ({} field(s))", entry.id, entry.payload.len());
                let result = store
                    .update_record(&entry.id, &entry.payload)
                    .map_err(|e| e.to_string());
                if let Err(e) = &result {
                    log::warn!("save failed for record {}: {}", entry.id, e);
                }
                RecordOutcome {
                    id: entry.id,
                    sent: entry.sent,
                    result,
                }
            })
            .collect()
    }
}

/// Result of sending one record.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordOutcome {
    pub id: RecordId,
    pub sent: RecordChanges,
    /// Server record on success, error message on failure.
    pub result: Result<Map<String, Value>, String>,
}

/// Summary of a finished save.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SaveReport {
    pub succeeded: Vec<RecordId>,
    pub failed: BTreeMap<RecordId, String>,
}

impl SaveReport {
    pub fn success_count(&self) -> usize {
        self.succeeded.len()
    }

    pub fn failure_count(&self) -> usize {
        self.failed.len()
    }

    pub fn all_succeeded(&self) -> bool {
        self.failed.is_empty()
    }

    /// Some records saved, some did not.
    pub fn is_partial(&self) -> bool {
        !self.succeeded.is_empty() && !self.failed.is_empty()
    }
}

impl fmt::Display for SaveReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.failed.is_empty() {
            write!(f, "Saved {} test case(s)", self.succeeded.len())
        } else if self.succeeded.is_empty() {
            write!(f, "Failed to save {} test case(s)", self.failed.len())
        } else {
            write!(
                f,
                "Saved {} test case(s), {} failed",
                self.succeeded.len(),
                self.failed.len()
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::cell::RefCell;

    struct Recorder {
        calls: RefCell<Vec<RecordId>>,
        fail: &'static str,
    }

    impl RecordStore for Recorder {
        type Error = String;

        fn update_record(
            &self,
            id: &RecordId,
            payload: &Map<String, Value>,
        ) -> Result<Map<String, Value>, String> {
            self.calls.borrow_mut().push(id.clone());
            if id.as_str() == self.fail {
                return Err("HTTP 500".to_string());
            }
            let mut record = payload.clone();
            record.insert("id".into(), json!(id.as_str()));
            Ok(record)
        }
    }

    fn entry(id: &str) -> SaveEntry {
        let mut payload = Map::new();
        payload.insert("title".into(), json!(format!("T{id}")));
        SaveEntry {
            id: id.into(),
            payload,
            sent: RecordChanges::new(),
        }
    }

    #[test]
    fn test_execute_continues_after_failure() {
        let store = Recorder { calls: RefCell::new(Vec::new()), fail: "2" };
        let batch = SaveBatch { entries: vec![entry("1"), entry("2"), entry("3")] };

        let outcomes = batch.execute(&store);
        assert_eq!(store.calls.borrow().len(), 3);
        assert!(outcomes[0].result.is_ok());
        assert_eq!(outcomes[1].result, Err("HTTP 500".to_string()));
        assert_eq!(outcomes[2].result.as_ref().unwrap()["title"], json!("T3"));
    }

    #[test]
    fn test_report_display() {
        let mut report = SaveReport {
            succeeded: vec!["1".into(), "3".into()],
            failed: BTreeMap::new(),
        };
        assert_eq!(report.to_string(), "Saved 2 test case(s)");
        assert!(report.all_succeeded());

        report.failed.insert("2".into(), "HTTP 500".into());
        assert!(report.is_partial());
        assert_eq!(report.to_string(), "Saved 2 test case(s), 1 failed");
    }
}
