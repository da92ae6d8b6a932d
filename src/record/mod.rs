//! Sweep Record Schema
//!
//! Typed view over the nested records a hyperparameter sweep produces.
//!
//! ## Schema Overview
//!
//! ```text
//! SweepRecord:  trial seed ──> TrialRecord
//! TrialRecord:  hparam seed ──> RunRecord
//! RunRecord:    flags, hparams, step ──> CheckpointMetrics
//! ```
//!
//! Every level keeps its keys in the order they were logged.
//!
//! ## Usage
//!
//! ```rust
//! use woods_select::record::{CheckpointMetrics, RunFlags, RunRecord, SweepRecord, TrialRecord};
//!
//! let run = RunRecord::builder(RunFlags::new("TMNIST"))
//!     .checkpoint(0, CheckpointMetrics::new().with("grey_out_acc", 0.9))
//!     .build();
//!
//! let mut trial = TrialRecord::new();
//! trial.insert("0", run);
//!
//! let mut sweep = SweepRecord::new();
//! sweep.insert("0", trial);
//! assert_eq!(sweep.len(), 1);
//! ```

mod ordered_map;
mod run_record;

pub use ordered_map::OrderedMap;
pub use run_record::{parse_step, CheckpointMetrics, Hparams, RunFlags, RunRecord, RunRecordBuilder};

use crate::Result;

/// Runs of one trial seed, keyed by hyperparameter seed.
pub type TrialRecord = OrderedMap<RunRecord>;

/// Trials of a sweep, keyed by trial seed.
pub type SweepRecord = OrderedMap<TrialRecord>;

impl SweepRecord {
    /// Decode a sweep from JSON text, keeping document order.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Json`] if the text is not a valid sweep record.
    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Decode a sweep from an already-parsed JSON value.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Json`] if the value is not a valid sweep record.
    pub fn from_json_value(value: serde_json::Value) -> Result<Self> {
        Ok(serde_json::from_value(value)?)
    }

    /// Total number of runs across all trial seeds.
    #[must_use]
    pub fn run_count(&self) -> usize {
        self.values().map(OrderedMap::len).sum()
    }
}
