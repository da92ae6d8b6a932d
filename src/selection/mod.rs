//! Model selection over sweep records
//!
//! Three policies decide which checkpoint of a run counts:
//!
//! | Policy                    | Validation score                      | Test score                 |
//! |---------------------------|---------------------------------------|----------------------------|
//! | `IID_validation`          | out acc. of every env (best mean step) | same vector                |
//! | `train_domain_validation` | mean out acc. of training envs        | test env in acc., same step |
//! | `test_domain_validation`  | test env out acc., last step          | test env in acc., last step |
//!
//! The engine then keeps the best hyperparameter seed of every trial seed
//! and can reduce the chosen scores across trial seeds.

mod checkpoint;
mod engine;
mod policy;

pub use checkpoint::{iid_validation, test_domain_validation, train_domain_validation};
pub use engine::{AggregateAccuracy, BestTrials, SelectionEngine, SelectionEngineBuilder, TrialChoice};
pub use policy::{CheckpointSelector, SelectionPolicy};
