//! Per-batch session snapshot
//!
//! Writes replace the whole record. Two writers that each read, modify and
//! write the same batch will lose one of the modifications; the last write
//! wins.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionState {
    pub batch_id: String,
    #[serde(default)]
    pub current_step: Option<String>,
    #[serde(default)]
    pub completed_steps: BTreeSet<String>,
    /// Free-form measurements keyed by name
    #[serde(default)]
    pub measurements: BTreeMap<String, serde_json::Value>,
    #[serde(default)]
    pub notes: Option<String>,
    /// Epoch ms of the last write, stamped by the store
    #[serde(default)]
    pub updated_at: i64,
}

impl SessionState {
    pub fn new(batch_id: impl Into<String>) -> Self {
        Self { batch_id: batch_id.into(), ..Self::default() }
    }

    /// Mark `step` done and clear it as the current step.
    pub fn complete_step(&mut self, step: impl Into<String>) {
        let step = step.into();
        if self.current_step.as_deref() == Some(step.as_str()) {
            self.current_step = None;
        }
        self.completed_steps.insert(step);
    }

    pub fn record_measurement(&mut self, name: impl Into<String>, value: serde_json::Value) {
        self.measurements.insert(name.into(), value);
    }
}
