//! Run Record - one training run (one hyperparameter sample of one trial seed)

use std::collections::HashMap;
use std::fmt;

use serde::de::{self, MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use super::OrderedMap;
use crate::{Error, Result};

/// Sampled hyperparameter values of a run, kept as free-form JSON.
pub type Hparams = serde_json::Map<String, serde_json::Value>;

/// Configuration flags a run was launched with.
///
/// Only `dataset` and `test_env` drive model selection. Any other flag the
/// harness recorded (objective, sample count, paths, ...) is preserved
/// verbatim so it can be reported back with the chosen run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunFlags {
    dataset: String,
    #[serde(default)]
    test_env: Option<usize>,
    #[serde(flatten)]
    extra: serde_json::Map<String, serde_json::Value>,
}

impl RunFlags {
    /// Create flags for a run on `dataset` with no held-out environment.
    #[must_use]
    pub fn new(dataset: impl Into<String>) -> Self {
        Self {
            dataset: dataset.into(),
            test_env: None,
            extra: serde_json::Map::new(),
        }
    }

    /// Set the index of the held-out test environment.
    #[must_use]
    pub const fn with_test_env(mut self, test_env: usize) -> Self {
        self.test_env = Some(test_env);
        self
    }

    /// Record an additional flag.
    #[must_use]
    pub fn with_flag(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.extra.insert(key.into(), value);
        self
    }

    /// Get the dataset name.
    #[must_use]
    pub fn dataset(&self) -> &str {
        &self.dataset
    }

    /// Get the held-out test environment index, if any.
    #[must_use]
    pub const fn test_env(&self) -> Option<usize> {
        self.test_env
    }

    /// Get an additional flag by name.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&serde_json::Value> {
        self.extra.get(key)
    }
}

/// Metrics logged at one checkpoint, e.g. `"env_in_acc"` / `"env_out_acc"`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CheckpointMetrics {
    values: HashMap<String, f64>,
}

impl CheckpointMetrics {
    /// Create an empty metrics set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a metric (builder style).
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: f64) -> Self {
        self.values.insert(key.into(), value);
        self
    }

    /// Insert or overwrite a metric.
    pub fn insert(&mut self, key: impl Into<String>, value: f64) {
        self.values.insert(key.into(), value);
    }

    /// Get a metric by key.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<f64> {
        self.values.get(key).copied()
    }

    /// Number of metrics at this checkpoint.
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Check if no metric was logged.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Get a metric that must be present.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MissingMetric`] naming `step` and `key` if absent.
    pub fn require(&self, step: &str, key: &str) -> Result<f64> {
        self.get(key).ok_or_else(|| Error::MissingMetric {
            step: step.to_string(),
            key: key.to_string(),
        })
    }
}

/// Run Record holds everything one training run logged.
///
/// The harness writes a run as a single JSON object where `flags` and
/// `hparams` sit next to one entry per checkpoint step:
///
/// ```json
/// {"flags": {"dataset": "Spurious_Fourier", "test_env": 2},
///  "hparams": {"lr": 0.001},
///  "0":   {"10%_in_acc": 0.5, "10%_out_acc": 0.48},
///  "500": {"10%_in_acc": 0.7, "10%_out_acc": 0.69}}
/// ```
///
/// Decoding splits that object into typed parts, so checkpoints can be
/// iterated without touching the configuration keys.
#[derive(Debug, Clone, PartialEq)]
pub struct RunRecord {
    flags: RunFlags,
    hparams: Hparams,
    checkpoints: OrderedMap<CheckpointMetrics>,
}

impl RunRecord {
    /// Create a run record with no hyperparameters and no checkpoints.
    #[must_use]
    pub fn new(flags: RunFlags) -> Self {
        Self {
            flags,
            hparams: Hparams::new(),
            checkpoints: OrderedMap::new(),
        }
    }

    /// Create a builder for constructing a run record.
    #[must_use]
    pub fn builder(flags: RunFlags) -> RunRecordBuilder {
        RunRecordBuilder::new(flags)
    }

    /// Get the run flags.
    #[must_use]
    pub const fn flags(&self) -> &RunFlags {
        &self.flags
    }

    /// Get the sampled hyperparameters.
    #[must_use]
    pub const fn hparams(&self) -> &Hparams {
        &self.hparams
    }

    /// Get the checkpoints, keyed by step, in logged order.
    #[must_use]
    pub const fn checkpoints(&self) -> &OrderedMap<CheckpointMetrics> {
        &self.checkpoints
    }

    /// Add or replace a checkpoint.
    pub fn add_checkpoint(&mut self, step: impl Into<String>, metrics: CheckpointMetrics) {
        self.checkpoints.insert(step, metrics);
    }

    /// Get the last checkpoint: the one whose step key is the largest integer.
    ///
    /// Returns `(step, step_key, metrics)`.
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidRecord`] if a step key is not a non-negative integer
    /// - [`Error::EmptySelection`] if the run has no checkpoints
    pub fn last_checkpoint(&self) -> Result<(u64, &str, &CheckpointMetrics)> {
        let mut last: Option<(u64, &str, &CheckpointMetrics)> = None;
        for (key, metrics) in self.checkpoints.iter() {
            let step = parse_step(key)?;
            if last.map_or(true, |(best, _, _)| step > best) {
                last = Some((step, key, metrics));
            }
        }
        last.ok_or_else(|| Error::EmptySelection("run has no checkpoints".to_string()))
    }
}

/// Parse a checkpoint step key.
///
/// # Errors
///
/// Returns [`Error::InvalidRecord`] if `key` is not a non-negative integer.
pub fn parse_step(key: &str) -> Result<u64> {
    key.parse::<u64>().map_err(|_| {
        Error::InvalidRecord(format!(
            "checkpoint key '{key}' is not a non-negative integer step"
        ))
    })
}

/// Builder for `RunRecord`.
#[derive(Debug)]
pub struct RunRecordBuilder {
    record: RunRecord,
}

impl RunRecordBuilder {
    /// Create a new builder with required fields.
    #[must_use]
    pub fn new(flags: RunFlags) -> Self {
        Self {
            record: RunRecord::new(flags),
        }
    }

    /// Set the sampled hyperparameters.
    #[must_use]
    pub fn hparams(mut self, hparams: Hparams) -> Self {
        self.record.hparams = hparams;
        self
    }

    /// Append a checkpoint for `step`.
    #[must_use]
    pub fn checkpoint(mut self, step: impl ToString, metrics: CheckpointMetrics) -> Self {
        self.record.add_checkpoint(step.to_string(), metrics);
        self
    }

    /// Build the `RunRecord`.
    #[must_use]
    pub fn build(self) -> RunRecord {
        self.record
    }
}

const FLAGS_KEY: &str = "flags";
const HPARAMS_KEY: &str = "hparams";

impl Serialize for RunRecord {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.checkpoints.len() + 2))?;
        map.serialize_entry(FLAGS_KEY, &self.flags)?;
        map.serialize_entry(HPARAMS_KEY, &self.hparams)?;
        for (step, metrics) in self.checkpoints.iter() {
            map.serialize_entry(step, metrics)?;
        }
        map.end()
    }
}

struct RunRecordVisitor;

impl<'de> Visitor<'de> for RunRecordVisitor {
    type Value = RunRecord;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("a run record with flags, hparams and checkpoint entries")
    }

    fn visit_map<A: MapAccess<'de>>(
        self,
        mut access: A,
    ) -> std::result::Result<Self::Value, A::Error> {
        let mut flags: Option<RunFlags> = None;
        let mut hparams: Option<Hparams> = None;
        let mut checkpoints = OrderedMap::new();

        while let Some(key) = access.next_key::<String>()? {
            match key.as_str() {
                FLAGS_KEY => {
                    if flags.is_some() {
                        return Err(de::Error::duplicate_field(FLAGS_KEY));
                    }
                    flags = Some(access.next_value()?);
                }
                HPARAMS_KEY => {
                    if hparams.is_some() {
                        return Err(de::Error::duplicate_field(HPARAMS_KEY));
                    }
                    hparams = Some(access.next_value()?);
                }
                _ => {
                    let metrics: CheckpointMetrics = access.next_value()?;
                    checkpoints.insert(key, metrics);
                }
            }
        }

        Ok(RunRecord {
            flags: flags.ok_or_else(|| de::Error::missing_field(FLAGS_KEY))?,
            hparams: hparams.ok_or_else(|| de::Error::missing_field(HPARAMS_KEY))?,
            checkpoints,
        })
    }
}

impl<'de> Deserialize<'de> for RunRecord {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        deserializer.deserialize_map(RunRecordVisitor)
    }
}
