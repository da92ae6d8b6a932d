//! Tests for top-level SelectionEngine API

use woods_select::{Dataset, DatasetRegistry, EnvironmentLookup, Error, Result, SelectionEngine};

/// Lookup that knows a single dataset, to exercise the trait seam
struct SingleDataset;

impl EnvironmentLookup for SingleDataset {
    fn environments(&self, dataset: &str) -> Result<&[String]> {
        static ENVS: std::sync::OnceLock<Vec<String>> = std::sync::OnceLock::new();
        if dataset == "Only" {
            Ok(ENVS.get_or_init(|| vec!["x".to_string(), "y".to_string()]))
        } else {
            Err(Error::UnknownDataset(dataset.to_string()))
        }
    }
}

#[test]
fn test_engine_builder_chain() {
    let engine = SelectionEngine::builder()
        .parallel(true)
        .registry(DatasetRegistry::empty().with_dataset("Toy", ["A"]))
        .build();

    assert!(engine.is_parallel());
    assert_eq!(engine.lookup().environments("Toy").unwrap(), ["A"]);
    assert!(matches!(
        engine.lookup().environments("TMNIST"),
        Err(Error::UnknownDataset(_))
    ));

    // parallel is off unless asked for, and survives a registry swap
    assert!(!SelectionEngine::builder().build().is_parallel());
    let swapped = SelectionEngine::builder()
        .parallel(true)
        .registry(SingleDataset)
        .build();
    assert!(swapped.is_parallel());
}

#[test]
fn test_engine_default_uses_builtin_registry() {
    let engine = SelectionEngine::default();
    for dataset in Dataset::ALL {
        let envs = engine.lookup().environments(dataset.name()).unwrap();
        assert_eq!(envs.len(), dataset.environments().len());
    }
}

#[test]
fn test_engine_with_custom_lookup() {
    let engine = SelectionEngine::builder().registry(SingleDataset).build();
    assert!(engine.lookup().environments("Only").is_ok());
    assert!(matches!(
        engine.lookup().environments("Other"),
        Err(Error::UnknownDataset(_))
    ));
}
