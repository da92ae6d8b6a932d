//! Selection engine: best trial per seed and aggregation across seeds

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::SelectionPolicy;
use crate::datasets::{DatasetRegistry, EnvironmentLookup};
use crate::record::{Hparams, OrderedMap, RunFlags, RunRecord, SweepRecord, TrialRecord};
use crate::report::{ChosenRun, SelectionReport};
use crate::score::{arg_max, reduce_scores, Score};
use crate::{Error, Result};

/// Run chosen within one trial seed, borrowed from the sweep.
#[derive(Debug, Clone)]
pub struct TrialChoice<'s> {
    /// Trial seed the choice was made for.
    pub trial_seed: &'s str,
    /// Winning hyperparameter seed.
    pub hparam_seed: &'s str,
    /// Winning run.
    pub run: &'s RunRecord,
    /// Validation score of the winning run.
    pub validation: Score,
    /// Test score of the winning run.
    pub test: Score,
}

/// Best run per trial seed, as four mappings keyed by trial seed.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BestTrials {
    /// Flags of the chosen run.
    pub flags: OrderedMap<RunFlags>,
    /// Hyperparameters of the chosen run.
    pub hparams: OrderedMap<Hparams>,
    /// Validation score of the chosen run.
    pub validation: OrderedMap<Score>,
    /// Test score of the chosen run.
    pub test: OrderedMap<Score>,
    /// Hyperparameter seed of the chosen run.
    pub hparam_seeds: OrderedMap<String>,
}

/// Chosen accuracies reduced across trial seeds.
///
/// Standard errors use the population standard deviation, so a sweep with
/// a single trial seed reports `0.0`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregateAccuracy {
    /// Mean validation score.
    pub mean_validation: Score,
    /// Standard error of the validation score.
    pub stderr_validation: Score,
    /// Mean test score.
    pub mean_test: Score,
    /// Standard error of the test score.
    pub stderr_test: Score,
    /// Number of trial seeds reduced.
    pub trial_count: usize,
}

/// Model selection over sweep records.
///
/// Pure queries over borrowed records: nothing is mutated and results are
/// freshly allocated.
///
/// ```rust
/// use woods_select::record::{CheckpointMetrics, RunFlags, RunRecord};
/// use woods_select::{DatasetRegistry, SelectionEngine, SelectionPolicy, Score};
///
/// let engine = SelectionEngine::builder()
///     .registry(DatasetRegistry::empty().with_dataset("Toy", ["A", "B"]))
///     .build();
///
/// let run = RunRecord::builder(RunFlags::new("Toy").with_test_env(1))
///     .checkpoint(0, CheckpointMetrics::new().with("A_out_acc", 0.5).with("B_in_acc", 0.6))
///     .checkpoint(1, CheckpointMetrics::new().with("A_out_acc", 0.7).with("B_in_acc", 0.8))
///     .build();
///
/// let (val, test) = engine.select_best_checkpoint(&run, SelectionPolicy::TrainDomainValidation)?;
/// assert_eq!(val, Score::Scalar(0.7));
/// assert_eq!(test, Score::Scalar(0.8));
/// # Ok::<(), woods_select::Error>(())
/// ```
#[derive(Debug, Clone)]
pub struct SelectionEngine<L = DatasetRegistry> {
    lookup: L,
    parallel: bool,
}

impl SelectionEngine {
    /// Create an engine over the built-in dataset registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a builder.
    #[must_use]
    pub fn builder() -> SelectionEngineBuilder {
        SelectionEngineBuilder::default()
    }
}

impl Default for SelectionEngine {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl<L: EnvironmentLookup> SelectionEngine<L> {
    /// Get the environment lookup.
    #[must_use]
    pub const fn lookup(&self) -> &L {
        &self.lookup
    }

    /// Whether trial seeds are processed in parallel.
    #[must_use]
    pub const fn is_parallel(&self) -> bool {
        self.parallel
    }

    /// Pick the best checkpoint of one run under `policy`.
    ///
    /// Returns `(validation, test)`.
    ///
    /// # Errors
    ///
    /// - [`Error::UnknownDataset`] if the run's dataset is not in the registry
    /// - any error of the policy's checkpoint selector
    pub fn select_best_checkpoint(
        &self,
        run: &RunRecord,
        policy: SelectionPolicy,
    ) -> Result<(Score, Score)> {
        let envs = self.lookup.environments(run.flags().dataset())?;
        (policy.selector())(run, envs)
    }

    /// Pick the best run of one trial seed: highest validation score, first on ties.
    ///
    /// # Errors
    ///
    /// - [`Error::EmptySelection`] if the trial has no runs, or every
    ///   validation score is NaN
    /// - any error of [`SelectionEngine::select_best_checkpoint`]
    pub fn select_in_trial<'s>(
        &self,
        trial_seed: &'s str,
        trial: &'s TrialRecord,
        policy: SelectionPolicy,
    ) -> Result<TrialChoice<'s>> {
        let mut scored = Vec::with_capacity(trial.len());
        for (hparam_seed, run) in trial.iter() {
            let (validation, test) = self.select_best_checkpoint(run, policy)?;
            debug!(trial_seed, hparam_seed, %validation, %test, "scored run");
            scored.push((hparam_seed, run, validation, test));
        }

        let found = arg_max(scored.iter().map(|(_, _, validation, _)| validation)).ok_or_else(
            || {
                Error::EmptySelection(format!(
                    "trial seed '{trial_seed}' has no run with a comparable validation score"
                ))
            },
        )?;
        if found.skipped > 0 {
            warn!(
                trial_seed,
                skipped = found.skipped,
                "skipped runs with NaN validation score"
            );
        }

        let (hparam_seed, run, validation, test) = scored.swap_remove(found.index);
        debug!(trial_seed, hparam_seed, %validation, "selected run");
        Ok(TrialChoice {
            trial_seed,
            hparam_seed,
            run,
            validation,
            test,
        })
    }

    /// Choose the best run of every trial seed, in sweep order.
    ///
    /// # Errors
    ///
    /// - [`Error::EmptySelection`] if the sweep has no trial seeds
    /// - any error of [`SelectionEngine::select_in_trial`]
    pub fn choose_runs<'s>(
        &self,
        sweep: &'s SweepRecord,
        policy: SelectionPolicy,
    ) -> Result<Vec<TrialChoice<'s>>> {
        if sweep.is_empty() {
            return Err(Error::EmptySelection(
                "sweep has no trial seeds".to_string(),
            ));
        }
        let trials: Vec<(&'s str, &'s TrialRecord)> = sweep.iter().collect();
        self.map_trials(&trials, policy)
    }

    #[cfg(feature = "rayon")]
    fn map_trials<'s>(
        &self,
        trials: &[(&'s str, &'s TrialRecord)],
        policy: SelectionPolicy,
    ) -> Result<Vec<TrialChoice<'s>>> {
        use rayon::prelude::*;

        if self.parallel {
            trials
                .par_iter()
                .map(|&(seed, trial)| self.select_in_trial(seed, trial, policy))
                .collect()
        } else {
            trials
                .iter()
                .map(|&(seed, trial)| self.select_in_trial(seed, trial, policy))
                .collect()
        }
    }

    #[cfg(not(feature = "rayon"))]
    fn map_trials<'s>(
        &self,
        trials: &[(&'s str, &'s TrialRecord)],
        policy: SelectionPolicy,
    ) -> Result<Vec<TrialChoice<'s>>> {
        trials
            .iter()
            .map(|&(seed, trial)| self.select_in_trial(seed, trial, policy))
            .collect()
    }

    /// Best hyperparameters per trial seed.
    ///
    /// For each trial seed, every run is scored with `policy` and the run
    /// with the highest validation score wins (first on ties). Returns its
    /// flags, hyperparameters, validation and test scores keyed by trial seed.
    ///
    /// # Errors
    ///
    /// See [`SelectionEngine::choose_runs`].
    pub fn select_best_trial(
        &self,
        sweep: &SweepRecord,
        policy: SelectionPolicy,
    ) -> Result<BestTrials> {
        let choices = self.choose_runs(sweep, policy)?;

        let mut best = BestTrials::default();
        for choice in choices {
            let seed = choice.trial_seed;
            best.flags.insert(seed, choice.run.flags().clone());
            best.hparams.insert(seed, choice.run.hparams().clone());
            best.validation.insert(seed, choice.validation);
            best.test.insert(seed, choice.test);
            best.hparam_seeds.insert(seed, choice.hparam_seed.to_string());
        }

        info!(
            policy = policy.name(),
            trial_seeds = best.flags.len(),
            "selected best hyperparameters"
        );
        Ok(best)
    }

    /// Mean and standard error of the chosen scores across trial seeds.
    ///
    /// Vector scores (IID validation) are reduced per environment.
    ///
    /// # Errors
    ///
    /// - any error of [`SelectionEngine::choose_runs`]
    /// - [`Error::ShapeMismatch`] if chosen scores have different shapes
    pub fn aggregate_test_accuracy(
        &self,
        sweep: &SweepRecord,
        policy: SelectionPolicy,
    ) -> Result<AggregateAccuracy> {
        let choices = self.choose_runs(sweep, policy)?;
        let aggregate = aggregate(&choices)?;
        info!(
            policy = policy.name(),
            trial_seeds = aggregate.trial_count,
            mean_test = %aggregate.mean_test,
            stderr_test = %aggregate.stderr_test,
            "aggregated chosen accuracy"
        );
        Ok(aggregate)
    }

    /// Per-seed choices and their aggregate, bundled as a report.
    ///
    /// # Errors
    ///
    /// Same as [`SelectionEngine::aggregate_test_accuracy`].
    pub fn report(&self, sweep: &SweepRecord, policy: SelectionPolicy) -> Result<SelectionReport> {
        let choices = self.choose_runs(sweep, policy)?;
        let aggregate = aggregate(&choices)?;
        let chosen = choices.into_iter().map(ChosenRun::from).collect();
        Ok(SelectionReport::new(policy, chosen, aggregate))
    }
}

fn aggregate(choices: &[TrialChoice<'_>]) -> Result<AggregateAccuracy> {
    let validation: Vec<Score> = choices.iter().map(|c| c.validation.clone()).collect();
    let test: Vec<Score> = choices.iter().map(|c| c.test.clone()).collect();

    let (mean_validation, stderr_validation) = reduce_scores(&validation)?;
    let (mean_test, stderr_test) = reduce_scores(&test)?;

    Ok(AggregateAccuracy {
        mean_validation,
        stderr_validation,
        mean_test,
        stderr_test,
        trial_count: choices.len(),
    })
}

/// Builder for `SelectionEngine`.
#[derive(Debug)]
pub struct SelectionEngineBuilder<L = DatasetRegistry> {
    lookup: L,
    parallel: bool,
}

impl Default for SelectionEngineBuilder {
    fn default() -> Self {
        Self {
            lookup: DatasetRegistry::default(),
            parallel: false,
        }
    }
}

impl<L: EnvironmentLookup> SelectionEngineBuilder<L> {
    /// Use a different environment lookup.
    #[must_use]
    pub fn registry<M: EnvironmentLookup>(self, lookup: M) -> SelectionEngineBuilder<M> {
        SelectionEngineBuilder {
            lookup,
            parallel: self.parallel,
        }
    }

    /// Process trial seeds in parallel (needs the `rayon` feature; ignored otherwise).
    #[must_use]
    pub fn parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Build the engine.
    #[must_use]
    pub fn build(self) -> SelectionEngine<L> {
        SelectionEngine {
            lookup: self.lookup,
            parallel: self.parallel,
        }
    }
}
