//! Checkpoint selection within a single run
//!
//! Each function borrows one run and the ordered environment names of its
//! dataset, and returns `(validation, test)` for the checkpoint it picks.

use tracing::{debug, warn};

use super::SelectionPolicy;
use crate::record::{CheckpointMetrics, RunRecord};
use crate::score::{arg_max, mean, Score};
use crate::{Error, Result};

fn in_acc_key(env: &str) -> String {
    format!("{env}_in_acc")
}

fn out_acc_key(env: &str) -> String {
    format!("{env}_out_acc")
}

/// Resolve `flags.test_env` against the environment list.
fn test_env<'e>(
    run: &RunRecord,
    envs: &'e [String],
    policy: SelectionPolicy,
) -> Result<(usize, &'e str)> {
    let index = run
        .flags()
        .test_env()
        .ok_or_else(|| Error::MissingTestEnv(policy.name().to_string()))?;
    let env = envs.get(index).ok_or_else(|| {
        Error::InvalidRecord(format!(
            "test_env {index} out of range for dataset '{}' with {} environments",
            run.flags().dataset(),
            envs.len()
        ))
    })?;
    Ok((index, env.as_str()))
}

/// Pick the step with the highest validation mean.
///
/// `validation_keys` are averaged at each step; returns the winning step,
/// its metrics and its per-key values.
fn best_step<'r>(
    run: &'r RunRecord,
    validation_keys: &[String],
    policy: SelectionPolicy,
) -> Result<(&'r str, &'r CheckpointMetrics, Vec<f64>)> {
    let mut scored = Vec::with_capacity(run.checkpoints().len());
    for (step, metrics) in run.checkpoints().iter() {
        let values = validation_keys
            .iter()
            .map(|key| metrics.require(step, key))
            .collect::<Result<Vec<f64>>>()?;
        scored.push((step, metrics, values));
    }

    let found = arg_max(scored.iter().map(|(_, _, values)| mean(values))).ok_or_else(|| {
        Error::EmptySelection(format!(
            "{policy}: no checkpoint with a finite validation accuracy in run on '{}'",
            run.flags().dataset()
        ))
    })?;
    if found.skipped > 0 {
        warn!(
            policy = policy.name(),
            skipped = found.skipped,
            "skipped checkpoints with NaN validation accuracy"
        );
    }

    Ok(scored.swap_remove(found.index))
}

/// IID validation: no test environment.
///
/// Validation accuracy of a step is the mean out-split accuracy over every
/// environment. The per-environment accuracies of the best step are returned
/// as both the validation and the test score.
///
/// # Errors
///
/// - [`Error::MissingMetric`] if a step lacks an environment's out accuracy
/// - [`Error::EmptySelection`] if the run has no usable checkpoint
pub fn iid_validation(run: &RunRecord, envs: &[String]) -> Result<(Score, Score)> {
    let policy = SelectionPolicy::IidValidation;
    let keys: Vec<String> = envs.iter().map(|e| out_acc_key(e)).collect();

    let (step, _, values) = best_step(run, &keys, policy)?;
    debug!(
        policy = policy.name(),
        step,
        validation = mean(&values),
        "selected checkpoint"
    );

    Ok((Score::Vector(values.clone()), Score::Vector(values)))
}

/// Train-domain validation.
///
/// Validation accuracy of a step is the mean out-split accuracy over every
/// environment except `flags.test_env`; the test score is the in-split
/// accuracy of the test environment at the best step.
///
/// # Errors
///
/// - [`Error::MissingTestEnv`] / [`Error::InvalidRecord`] for a missing or
///   out-of-range `test_env`
/// - [`Error::MissingMetric`] if a step lacks a needed accuracy
/// - [`Error::EmptySelection`] if the run has no usable checkpoint
pub fn train_domain_validation(run: &RunRecord, envs: &[String]) -> Result<(Score, Score)> {
    let policy = SelectionPolicy::TrainDomainValidation;
    let (test_index, test_env) = test_env(run, envs, policy)?;

    let keys: Vec<String> = envs
        .iter()
        .enumerate()
        .filter(|(i, _)| *i != test_index)
        .map(|(_, e)| out_acc_key(e))
        .collect();
    let test_key = in_acc_key(test_env);

    let (step, metrics, values) = best_step(run, &keys, policy)?;
    let validation = mean(&values);
    let test = metrics.require(step, &test_key)?;

    debug!(policy = policy.name(), step, validation, test, "selected checkpoint");
    Ok((Score::Scalar(validation), Score::Scalar(test)))
}

/// Test-domain validation (oracle).
///
/// Only the last checkpoint (largest integer step) is considered; returns
/// the test environment's out- and in-split accuracies at that step.
///
/// # Errors
///
/// - [`Error::MissingTestEnv`] / [`Error::InvalidRecord`] for a missing or
///   out-of-range `test_env`, or a non-integer step key
/// - [`Error::MissingMetric`] if the last step lacks a needed accuracy
/// - [`Error::EmptySelection`] if the run has no checkpoints
pub fn test_domain_validation(run: &RunRecord, envs: &[String]) -> Result<(Score, Score)> {
    let policy = SelectionPolicy::TestDomainValidation;
    let (_, test_env) = test_env(run, envs, policy)?;

    let (_, step, metrics) = run.last_checkpoint()?;
    let validation = metrics.require(step, &out_acc_key(test_env))?;
    let test = metrics.require(step, &in_acc_key(test_env))?;

    debug!(policy = policy.name(), step, validation, test, "selected last checkpoint");
    Ok((Score::Scalar(validation), Score::Scalar(test)))
}
