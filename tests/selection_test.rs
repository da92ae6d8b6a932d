//! Model selection scenarios
//!
//! Sweeps are built by hand over a two-environment toy dataset so every
//! expected value can be read straight off the fixture.

use woods_select::record::{CheckpointMetrics, RunFlags, RunRecord, SweepRecord, TrialRecord};
use woods_select::{DatasetRegistry, Error, Score, SelectionEngine, SelectionPolicy};

fn engine() -> SelectionEngine {
    SelectionEngine::builder()
        .registry(DatasetRegistry::empty().with_dataset("Toy", ["A", "B"]))
        .build()
}

fn metrics(a_out: f64, b_out: f64, b_in: f64) -> CheckpointMetrics {
    CheckpointMetrics::new()
        .with("A_out_acc", a_out)
        .with("B_out_acc", b_out)
        .with("B_in_acc", b_in)
        .with("A_in_acc", 0.0)
}

/// Run with test_env = B and the given `(a_out, b_out, b_in)` per step.
fn run(lr: f64, steps: &[(u64, f64, f64, f64)]) -> RunRecord {
    run_with_flags(RunFlags::new("Toy").with_test_env(1), lr, steps)
}

/// Run whose flags record the seeds it was launched with, as the harness does.
fn seeded_run(
    trial_seed: u64,
    hparams_seed: u64,
    lr: f64,
    steps: &[(u64, f64, f64, f64)],
) -> RunRecord {
    let flags = RunFlags::new("Toy")
        .with_test_env(1)
        .with_flag("trial_seed", serde_json::json!(trial_seed))
        .with_flag("hparams_seed", serde_json::json!(hparams_seed));
    run_with_flags(flags, lr, steps)
}

fn run_with_flags(flags: RunFlags, lr: f64, steps: &[(u64, f64, f64, f64)]) -> RunRecord {
    let mut hparams = woods_select::record::Hparams::new();
    hparams.insert("lr".to_string(), serde_json::json!(lr));

    let mut builder = RunRecord::builder(flags).hparams(hparams);
    for &(step, a_out, b_out, b_in) in steps {
        builder = builder.checkpoint(step, metrics(a_out, b_out, b_in));
    }
    builder.build()
}

fn spec_run() -> RunRecord {
    run(0.001, &[(0, 0.5, 0.4, 0.6), (1, 0.7, 0.3, 0.8)])
}

fn two_by_two_sweep() -> SweepRecord {
    let trial_0: TrialRecord = [
        ("h0", seeded_run(0, 0, 0.1, &[(0, 0.4, 0.1, 0.2)])),
        ("h1", seeded_run(0, 1, 0.2, &[(0, 0.9, 0.1, 0.3)])),
    ]
    .into_iter()
    .collect();
    let trial_1: TrialRecord = [
        ("h0", seeded_run(1, 0, 0.3, &[(0, 0.8, 0.1, 0.5)])),
        ("h1", seeded_run(1, 1, 0.4, &[(0, 0.6, 0.1, 0.9)])),
    ]
    .into_iter()
    .collect();

    [("t0", trial_0), ("t1", trial_1)].into_iter().collect()
}

// =============================================================================
// select_best_checkpoint
// =============================================================================

#[test]
fn test_train_domain_validation_scenario() {
    let (val, test) = engine()
        .select_best_checkpoint(&spec_run(), SelectionPolicy::TrainDomainValidation)
        .unwrap();
    assert_eq!(val, Score::Scalar(0.7));
    assert_eq!(test, Score::Scalar(0.8));
}

#[test]
fn test_test_domain_validation_scenario() {
    let (val, test) = engine()
        .select_best_checkpoint(&spec_run(), SelectionPolicy::TestDomainValidation)
        .unwrap();
    assert_eq!(val, Score::Scalar(0.3));
    assert_eq!(test, Score::Scalar(0.8));
}

#[test]
fn test_test_domain_uses_numeric_not_lexical_last_step() {
    // "900" > "1000" lexically; the last checkpoint is 1000
    let run = run(0.1, &[(900, 0.9, 0.9, 0.9), (1000, 0.1, 0.2, 0.3), (50, 0.5, 0.5, 0.5)]);
    let (val, test) = engine()
        .select_best_checkpoint(&run, SelectionPolicy::TestDomainValidation)
        .unwrap();
    assert_eq!(val, Score::Scalar(0.2));
    assert_eq!(test, Score::Scalar(0.3));
}

#[test]
fn test_iid_validation_scenario() {
    let (val, test) = engine()
        .select_best_checkpoint(&spec_run(), SelectionPolicy::IidValidation)
        .unwrap();
    assert_eq!(val, Score::Vector(vec![0.7, 0.3]));
    assert_eq!(val, test);
}

#[test]
fn test_policy_from_name() {
    let policy: SelectionPolicy = "train_domain_validation".parse().unwrap();
    let (val, _) = engine().select_best_checkpoint(&spec_run(), policy).unwrap();
    assert_eq!(val, Score::Scalar(0.7));

    let err = "best_guess".parse::<SelectionPolicy>().unwrap_err();
    assert!(matches!(err, Error::UnknownPolicy(ref name) if name == "best_guess"));
}

#[test]
fn test_engine_does_not_mutate_input() {
    let sweep = two_by_two_sweep();
    let before = sweep.clone();
    for policy in SelectionPolicy::ALL {
        engine().select_best_trial(&sweep, policy).unwrap();
        engine().aggregate_test_accuracy(&sweep, policy).unwrap();
    }
    assert_eq!(sweep, before);
}

// =============================================================================
// select_best_trial
// =============================================================================

#[test]
fn test_select_best_trial_two_by_two() {
    let best = engine()
        .select_best_trial(&two_by_two_sweep(), SelectionPolicy::TrainDomainValidation)
        .unwrap();

    assert_eq!(best.flags.len(), 2);
    assert_eq!(best.flags.keys().collect::<Vec<_>>(), vec!["t0", "t1"]);

    assert_eq!(best.hparam_seeds.get("t0").map(String::as_str), Some("h1"));
    assert_eq!(best.hparam_seeds.get("t1").map(String::as_str), Some("h0"));

    assert_eq!(best.hparams.get("t0").unwrap()["lr"], serde_json::json!(0.2));
    assert_eq!(best.hparams.get("t1").unwrap()["lr"], serde_json::json!(0.3));

    assert_eq!(best.validation.get("t0"), Some(&Score::Scalar(0.9)));
    assert_eq!(best.test.get("t0"), Some(&Score::Scalar(0.3)));
    assert_eq!(best.validation.get("t1"), Some(&Score::Scalar(0.8)));
    assert_eq!(best.test.get("t1"), Some(&Score::Scalar(0.5)));

    // flags come from the winning run of each trial seed
    let t0 = best.flags.get("t0").unwrap();
    assert_eq!(t0.dataset(), "Toy");
    assert_eq!(t0.get("trial_seed"), Some(&serde_json::json!(0)));
    assert_eq!(t0.get("hparams_seed"), Some(&serde_json::json!(1)));
    let t1 = best.flags.get("t1").unwrap();
    assert_eq!(t1.get("trial_seed"), Some(&serde_json::json!(1)));
    assert_eq!(t1.get("hparams_seed"), Some(&serde_json::json!(0)));
}

#[test]
fn test_select_best_trial_iid_lexicographic() {
    // IID scores are vectors [A_out, B_out]; [0.6, 0.0] beats [0.5, 0.9]
    let trial: TrialRecord = [
        ("h0", run(0.1, &[(0, 0.5, 0.9, 0.0)])),
        ("h1", run(0.2, &[(0, 0.6, 0.0, 0.0)])),
    ]
    .into_iter()
    .collect();
    let sweep: SweepRecord = [("t0", trial)].into_iter().collect();

    let best = engine()
        .select_best_trial(&sweep, SelectionPolicy::IidValidation)
        .unwrap();
    assert_eq!(best.hparam_seeds.get("t0").map(String::as_str), Some("h1"));
    assert_eq!(best.validation.get("t0"), best.test.get("t0"));
}

#[test]
fn test_parallel_matches_sequential() {
    let sweep = two_by_two_sweep();
    let parallel = SelectionEngine::builder()
        .registry(DatasetRegistry::empty().with_dataset("Toy", ["A", "B"]))
        .parallel(true)
        .build();

    for policy in SelectionPolicy::ALL {
        assert_eq!(
            parallel.select_best_trial(&sweep, policy).unwrap(),
            engine().select_best_trial(&sweep, policy).unwrap()
        );
    }
}

// =============================================================================
// aggregate_test_accuracy
// =============================================================================

#[test]
fn test_aggregate_scalar() {
    let agg = engine()
        .aggregate_test_accuracy(&two_by_two_sweep(), SelectionPolicy::TrainDomainValidation)
        .unwrap();

    assert_eq!(agg.trial_count, 2);
    // chosen validation: 0.9, 0.8 ; chosen test: 0.3, 0.5
    let mean_val = agg.mean_validation.as_scalar().unwrap();
    let se_val = agg.stderr_validation.as_scalar().unwrap();
    let mean_test = agg.mean_test.as_scalar().unwrap();
    let se_test = agg.stderr_test.as_scalar().unwrap();

    assert!((mean_val - 0.85).abs() < 1e-12);
    assert!((se_val - 0.05 / 2f64.sqrt()).abs() < 1e-12);
    assert!((mean_test - 0.4).abs() < 1e-12);
    assert!((se_test - 0.1 / 2f64.sqrt()).abs() < 1e-12);
}

#[test]
fn test_aggregate_vector_broadcasts() {
    let agg = engine()
        .aggregate_test_accuracy(&two_by_two_sweep(), SelectionPolicy::IidValidation)
        .unwrap();

    // chosen: t0 -> h1 [0.9, 0.1], t1 -> h0 [0.8, 0.1]
    let mean = agg.mean_validation.as_vector().unwrap();
    let se = agg.stderr_validation.as_vector().unwrap();
    assert_eq!(mean.len(), 2);
    assert!((mean[0] - 0.85).abs() < 1e-12);
    assert!((mean[1] - 0.1).abs() < 1e-12);
    assert!(se[1].abs() < 1e-12);
    assert_eq!(agg.mean_validation, agg.mean_test);
}

#[test]
fn test_aggregate_single_seed_has_zero_stderr() {
    let trial: TrialRecord = [("h0", spec_run())].into_iter().collect();
    let sweep: SweepRecord = [("t0", trial)].into_iter().collect();

    let agg = engine()
        .aggregate_test_accuracy(&sweep, SelectionPolicy::TrainDomainValidation)
        .unwrap();
    assert_eq!(agg.stderr_validation, Score::Scalar(0.0));
    assert_eq!(agg.stderr_test, Score::Scalar(0.0));
    assert_eq!(agg.mean_test, Score::Scalar(0.8));
}

// =============================================================================
// report
// =============================================================================

#[test]
fn test_report_bundles_choices_and_aggregate() {
    let sweep = two_by_two_sweep();
    let report = engine()
        .report(&sweep, SelectionPolicy::TrainDomainValidation)
        .unwrap();

    assert_eq!(report.policy(), SelectionPolicy::TrainDomainValidation);
    assert_eq!(report.chosen().len(), 2);
    assert_eq!(report.chosen()[0].trial_seed, "t0");
    assert_eq!(report.chosen()[0].hparam_seed, "h1");
    assert_eq!(
        report.aggregate(),
        &engine()
            .aggregate_test_accuracy(&sweep, SelectionPolicy::TrainDomainValidation)
            .unwrap()
    );
}

// =============================================================================
// Failure modes
// =============================================================================

#[test]
fn test_missing_metric_propagates_from_sweep() {
    let broken = RunRecord::builder(RunFlags::new("Toy").with_test_env(1))
        .checkpoint(0, CheckpointMetrics::new().with("A_out_acc", 0.5))
        .build();
    let trial: TrialRecord = [("h0", spec_run()), ("h1", broken)].into_iter().collect();
    let sweep: SweepRecord = [("t0", trial)].into_iter().collect();

    let err = engine()
        .select_best_trial(&sweep, SelectionPolicy::TrainDomainValidation)
        .unwrap_err();
    assert!(matches!(err, Error::MissingMetric { ref key, .. } if key == "B_in_acc"));
}

#[test]
fn test_empty_trial_in_sweep_fails() {
    let sweep: SweepRecord = [("t0", TrialRecord::new())].into_iter().collect();
    assert!(matches!(
        engine().aggregate_test_accuracy(&sweep, SelectionPolicy::TestDomainValidation),
        Err(Error::EmptySelection(_))
    ));
}

#[test]
fn test_builtin_registry_dataset() {
    let run = RunRecord::builder(RunFlags::new("Spurious_Fourier").with_test_env(2))
        .checkpoint(
            0,
            CheckpointMetrics::new()
                .with("10%_out_acc", 0.6)
                .with("80%_out_acc", 0.8)
                .with("90%_in_acc", 0.3),
        )
        .build();

    let (val, test) = SelectionEngine::new()
        .select_best_checkpoint(&run, SelectionPolicy::TrainDomainValidation)
        .unwrap();
    assert!((val.as_scalar().unwrap() - 0.7).abs() < 1e-12);
    assert_eq!(test, Score::Scalar(0.3));
}
