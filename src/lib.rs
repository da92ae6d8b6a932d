//! # woods-select: Model Selection for Domain-Generalization Sweeps
//!
//! Given the records of a hyperparameter sweep (trial seed → hyperparameter
//! seed → run → checkpoints), pick the checkpoint and hyperparameters a
//! selection policy would report, and aggregate the chosen accuracies
//! across trial seeds.
//!
//! ## Design Principles
//!
//! - **Closed policy set**: policies are an enum dispatched through an
//!   explicit function table, never looked up by name at runtime
//! - **Borrow, don't pop**: records are typed at decode time; selection
//!   borrows them and returns fresh results
//! - **Fail loudly**: missing metrics, unknown names and empty sweeps are
//!   errors, never silent defaults
//!
//! ## Example Usage
//!
//! ```rust
//! use woods_select::{SelectionEngine, SelectionPolicy, SweepRecord};
//!
//! let sweep = SweepRecord::from_json_str(r#"{
//!   "0": {
//!     "0": {"flags": {"dataset": "TMNIST"}, "hparams": {"lr": 0.001},
//!           "0":   {"grey_in_acc": 0.60, "grey_out_acc": 0.55},
//!           "100": {"grey_in_acc": 0.80, "grey_out_acc": 0.75}},
//!     "1": {"flags": {"dataset": "TMNIST"}, "hparams": {"lr": 0.01},
//!           "0":   {"grey_in_acc": 0.70, "grey_out_acc": 0.65}}
//!   }
//! }"#)?;
//!
//! let engine = SelectionEngine::new();
//! let best = engine.select_best_trial(&sweep, SelectionPolicy::IidValidation)?;
//! assert_eq!(best.hparam_seeds.get("0").map(String::as_str), Some("0"));
//! # Ok::<(), woods_select::Error>(())
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

pub mod datasets;
pub mod error;
pub mod hparams;
pub mod record;
pub mod report;
pub mod score;
pub mod selection;

pub use datasets::{Dataset, DatasetRegistry, EnvironmentLookup};
pub use error::{Error, Result};
pub use record::{RunRecord, SweepRecord, TrialRecord};
pub use report::SelectionReport;
pub use score::Score;
pub use selection::{AggregateAccuracy, BestTrials, SelectionEngine, SelectionPolicy};
