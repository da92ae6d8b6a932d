//! Model Selection Example
//!
//! Builds a small synthetic sweep on Spurious_Fourier, then picks the best
//! hyperparameters per trial seed under every selection policy.
//!
//! Run with: RUST_LOG=info cargo run --example model_selection

use anyhow::Result;
use tracing_subscriber::EnvFilter;
use woods_select::hparams::{objective_hparams, training_hparams};
use woods_select::record::{CheckpointMetrics, RunFlags, RunRecord, SweepRecord, TrialRecord};
use woods_select::{SelectionEngine, SelectionPolicy};

const ENVS: [&str; 3] = ["10%", "80%", "90%"];

/// Accuracy curve for one environment: rises then saturates, offset per run
fn accuracy(step: u64, hparam_seed: u64, env: usize) -> f64 {
    let progress = step as f64 / 2000.0;
    let ceiling = 0.6 + 0.05 * ((hparam_seed * 3 + env as u64) % 7) as f64;
    (ceiling * (1.0 - (-3.0 * progress).exp())).min(1.0)
}

fn synthetic_sweep() -> Result<SweepRecord> {
    let mut sweep = SweepRecord::new();
    for trial_seed in 0..3u64 {
        let mut trial = TrialRecord::new();
        for hparam_seed in 0..4u64 {
            let mut hparams = training_hparams("Spurious_Fourier", hparam_seed, true)?;
            hparams.extend(objective_hparams("VREx", hparam_seed, true)?);

            let flags = RunFlags::new("Spurious_Fourier")
                .with_test_env(0)
                .with_flag("objective", serde_json::json!("VREx"))
                .with_flag("trial_seed", serde_json::json!(trial_seed))
                .with_flag("hparams_seed", serde_json::json!(hparam_seed));

            let mut builder = RunRecord::builder(flags).hparams(hparams);
            for step in (0..=2000).step_by(500) {
                let mut metrics = CheckpointMetrics::new();
                for (e, env) in ENVS.iter().enumerate() {
                    let acc = accuracy(step, hparam_seed + trial_seed, e);
                    metrics.insert(format!("{env}_in_acc"), acc);
                    metrics.insert(format!("{env}_out_acc"), acc - 0.02);
                }
                builder = builder.checkpoint(step, metrics);
            }
            trial.insert(hparam_seed.to_string(), builder.build());
        }
        sweep.insert(trial_seed.to_string(), trial);
    }
    Ok(sweep)
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    println!("=== Woods Model Selection ===\n");

    // -------------------------------------------------------------------------
    // 1. Build a sweep
    // -------------------------------------------------------------------------
    println!("1. Building synthetic sweep...");
    let sweep = synthetic_sweep()?;
    println!("   Trial seeds: {}", sweep.len());
    println!("   Runs: {}", sweep.run_count());

    let engine = SelectionEngine::builder().parallel(true).build();

    // -------------------------------------------------------------------------
    // 2. Best hyperparameters per trial seed
    // -------------------------------------------------------------------------
    for policy in SelectionPolicy::ALL {
        println!("\n2. Selecting with {policy}...");
        let best = engine.select_best_trial(&sweep, policy)?;
        for (trial_seed, hparam_seed) in best.hparam_seeds.iter() {
            let validation = best.validation.get(trial_seed);
            let test = best.test.get(trial_seed);
            if let (Some(validation), Some(test)) = (validation, test) {
                println!(
                    "   trial {trial_seed}: hparams {hparam_seed} (val {validation}, test {test})"
                );
            }
        }

        let aggregate = engine.aggregate_test_accuracy(&sweep, policy)?;
        println!(
            "   Test accuracy: {} +/- {}",
            aggregate.mean_test, aggregate.stderr_test
        );
    }

    // -------------------------------------------------------------------------
    // 3. Full report
    // -------------------------------------------------------------------------
    println!("\n3. Report (train_domain_validation):");
    let report = engine.report(&sweep, SelectionPolicy::TrainDomainValidation)?;
    println!("{}", report.to_json_pretty()?);

    println!("\n=== Done ===");
    Ok(())
}
