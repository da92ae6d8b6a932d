//! Selection Report - serializable outcome of model selection over a sweep

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::record::Hparams;
use crate::selection::{AggregateAccuracy, SelectionPolicy, TrialChoice};
use crate::score::Score;

/// Run chosen for one trial seed, owned so it can outlive the sweep.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChosenRun {
    /// Trial seed.
    pub trial_seed: String,
    /// Winning hyperparameter seed.
    pub hparam_seed: String,
    /// Hyperparameters of the winning run.
    pub hparams: Hparams,
    /// Validation score of the winning run.
    pub validation: Score,
    /// Test score of the winning run.
    pub test: Score,
}

impl From<TrialChoice<'_>> for ChosenRun {
    fn from(choice: TrialChoice<'_>) -> Self {
        Self {
            trial_seed: choice.trial_seed.to_string(),
            hparam_seed: choice.hparam_seed.to_string(),
            hparams: choice.run.hparams().clone(),
            validation: choice.validation,
            test: choice.test,
        }
    }
}

/// Selection Report bundles the per-seed choices and their aggregate.
///
/// Reports are stamped with their creation time so results from repeated
/// selections over a growing sweep can be told apart.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SelectionReport {
    policy: SelectionPolicy,
    created_at: DateTime<Utc>,
    chosen: Vec<ChosenRun>,
    aggregate: AggregateAccuracy,
}

impl SelectionReport {
    /// Create a report stamped with the current time.
    #[must_use]
    pub fn new(policy: SelectionPolicy, chosen: Vec<ChosenRun>, aggregate: AggregateAccuracy) -> Self {
        Self {
            policy,
            created_at: Utc::now(),
            chosen,
            aggregate,
        }
    }

    /// Set a custom creation timestamp (useful for deserialization/testing).
    #[must_use]
    pub const fn with_created_at(mut self, created_at: DateTime<Utc>) -> Self {
        self.created_at = created_at;
        self
    }

    /// Get the policy the report was produced with.
    #[must_use]
    pub const fn policy(&self) -> SelectionPolicy {
        self.policy
    }

    /// Get the creation timestamp.
    #[must_use]
    pub const fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Get the chosen run of every trial seed, in sweep order.
    #[must_use]
    pub fn chosen(&self) -> &[ChosenRun] {
        &self.chosen
    }

    /// Get the aggregate over trial seeds.
    #[must_use]
    pub const fn aggregate(&self) -> &AggregateAccuracy {
        &self.aggregate
    }

    /// Serialize the report as pretty-printed JSON.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Json`] if serialization fails.
    pub fn to_json_pretty(&self) -> crate::Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}
