//! Update types

use crate::error::Result;
use crate::types::Row;
use serde::{Deserialize, Serialize};

/// One row-level edit
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RowEdit {
    /// Row as last synced (empty for a new record)
    #[serde(default)]
    pub previous: Row,
    /// Row as edited
    pub new: Row,
    /// Keys whose value differs between `previous` and `new`
    #[serde(default)]
    pub changed_fields: Vec<String>,
}

impl RowEdit {
    /// Build an edit, deriving the changed keys
    pub fn diff(previous: Row, new: Row) -> Self {
        let changed_fields = new
            .iter()
            .filter(|(k, v)| previous.get(*k) != Some(*v))
            .map(|(k, _)| k.clone())
            .collect();
        Self {
            previous,
            new,
            changed_fields,
        }
    }

    /// Changed keys, derived from the rows when none were given
    pub fn changed(&self) -> Vec<String> {
        if self.changed_fields.is_empty() {
            Self::diff(self.previous.clone(), self.new.clone()).changed_fields
        } else {
            self.changed_fields.clone()
        }
    }
}

/// Success/failure counts of a batch
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct UpdateSummary {
    pub succeeded: usize,
    pub failed: usize,
}

impl UpdateSummary {
    /// Count the outcomes of a batch
    pub fn from_results(results: &[Result<Row>]) -> Self {
        let succeeded = results.iter().filter(|r| r.is_ok()).count();
        Self {
            succeeded,
            failed: results.len() - succeeded,
        }
    }

    /// Check if every item succeeded
    pub fn is_clean(&self) -> bool {
        self.failed == 0
    }
}
