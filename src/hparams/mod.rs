//! Hyperparameter spaces for sweeps
//!
//! Declarative tables keyed by [`Dataset`](crate::datasets::Dataset) and
//! [`Objective`]. Each table maps a hyperparameter name to a
//! [`Distribution`]; sampled spaces draw from ranges, default spaces hold
//! fixed values.
//!
//! ```rust
//! use woods_select::datasets::Dataset;
//! use woods_select::hparams::{training_space, objective_hparams};
//!
//! let defaults = training_space(Dataset::Cap, false).resolve(0);
//! assert_eq!(defaults["batch_size"], 8);
//!
//! let sampled = objective_hparams("IRM", 3, true)?;
//! assert!(sampled.contains_key("penalty_weight"));
//! # Ok::<(), woods_select::Error>(())
//! ```

mod space;
mod tables;

pub use space::{Distribution, HyperparameterSpace};
pub use tables::{
    model_hparams, model_hparams_for, objective_hparams, objective_space, training_hparams,
    training_space, Objective,
};
