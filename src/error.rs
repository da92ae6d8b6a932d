//! Error types for woods-select
//!
//! Every failure is fatal to the caller: unknown names are configuration
//! mistakes and malformed records are sweep-data bugs. Messages name the
//! offending key so the operator can fix the sweep.

use thiserror::Error;

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// woods-select error types
#[derive(Error, Debug)]
pub enum Error {
    /// Selection policy name is not one of the known policies
    #[error("Selection policy not found: {0}\nExpected one of: IID_validation, train_domain_validation, test_domain_validation")]
    UnknownPolicy(String),

    /// Dataset name has no registered environments / hyperparameters
    #[error("Dataset not found: {0}")]
    UnknownDataset(String),

    /// Objective name has no hyperparameter definition
    #[error("Objective not found: {0}")]
    UnknownObjective(String),

    /// A checkpoint lacks a metric the policy needs
    #[error("Missing metric '{key}' at checkpoint step '{step}'")]
    MissingMetric {
        /// Checkpoint step key
        step: String,
        /// Metric key that was looked up
        key: String,
    },

    /// Policy requires a test environment but the run flags have none
    #[error("Run flags have no test_env but policy {0} requires one")]
    MissingTestEnv(String),

    /// Record does not conform to the sweep schema
    #[error("Invalid record: {0}")]
    InvalidRecord(String),

    /// Arg-max over an empty (or all-NaN) candidate set
    #[error("Empty selection: {0}\nThe sweep has no candidates to select from")]
    EmptySelection(String),

    /// Scores with incompatible shapes were reduced together
    #[error("Score shape mismatch: {0}")]
    ShapeMismatch(String),

    /// JSON decoding error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic error
    #[error("{0}")]
    Other(String),
}
