//! Selection policies and their dispatch table

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::checkpoint;
use crate::record::RunRecord;
use crate::score::Score;
use crate::{Error, Result};

/// Picks a checkpoint of one run and returns `(validation, test)` scores.
///
/// The second argument is the ordered environment list of the run's dataset.
pub type CheckpointSelector = fn(&RunRecord, &[String]) -> Result<(Score, Score)>;

/// Model selection policy.
///
/// Parsed from the names the sweep harness uses; anything else is rejected
/// with [`Error::UnknownPolicy`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SelectionPolicy {
    /// No held-out environment; validate on the out split of every environment.
    #[serde(rename = "IID_validation")]
    IidValidation,
    /// Validate on the out split of the training environments.
    #[serde(rename = "train_domain_validation")]
    TrainDomainValidation,
    /// Oracle: report the last checkpoint on the test environment.
    #[serde(rename = "test_domain_validation")]
    TestDomainValidation,
}

impl SelectionPolicy {
    /// Every policy.
    pub const ALL: [Self; 3] = [
        Self::IidValidation,
        Self::TrainDomainValidation,
        Self::TestDomainValidation,
    ];

    /// Name used by the sweep harness.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::IidValidation => "IID_validation",
            Self::TrainDomainValidation => "train_domain_validation",
            Self::TestDomainValidation => "test_domain_validation",
        }
    }

    /// Checkpoint-selection function implementing this policy.
    #[must_use]
    pub fn selector(self) -> CheckpointSelector {
        match self {
            Self::IidValidation => checkpoint::iid_validation,
            Self::TrainDomainValidation => checkpoint::train_domain_validation,
            Self::TestDomainValidation => checkpoint::test_domain_validation,
        }
    }

    /// Whether runs must declare a held-out test environment.
    #[must_use]
    pub const fn requires_test_env(self) -> bool {
        !matches!(self, Self::IidValidation)
    }
}

impl fmt::Display for SelectionPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for SelectionPolicy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|p| p.name() == s)
            .ok_or_else(|| Error::UnknownPolicy(s.to_string()))
    }
}
