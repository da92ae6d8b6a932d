//! Dataset environment registry
//!
//! Model selection needs the ordered environment names of a run's dataset to
//! build metric keys such as `"90%_out_acc"`. The lookup sits behind the
//! [`EnvironmentLookup`] trait so callers can plug in their own registry;
//! [`DatasetRegistry`] ships the environments of the built-in datasets.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Source of environment names for a dataset.
pub trait EnvironmentLookup: Send + Sync {
    /// Get the ordered environment names of `dataset`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownDataset`] if the dataset is not known.
    fn environments(&self, dataset: &str) -> Result<&[String]>;
}

/// Built-in datasets of the sweep harness.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Dataset {
    /// Basic Fourier synthetic sequences
    #[serde(rename = "Basic_Fourier")]
    BasicFourier,
    /// Fourier sequences with a spurious feature
    #[serde(rename = "Spurious_Fourier")]
    SpuriousFourier,
    /// Temporal MNIST
    #[serde(rename = "TMNIST")]
    Tmnist,
    /// Temporal colored MNIST, sequence-level environments
    #[serde(rename = "TCMNIST_seq")]
    TcmnistSeq,
    /// Temporal colored MNIST, step-level environments
    #[serde(rename = "TCMNIST_step")]
    TcmnistStep,
    /// CAP sleep EEG, one environment per recording machine
    #[serde(rename = "CAP")]
    Cap,
    /// Sleep-EDF, one environment per age group
    #[serde(rename = "SEDFx")]
    Sedfx,
    /// Motor imagery EEG, one environment per source study
    #[serde(rename = "PCL")]
    Pcl,
    /// Heterogeneity human activity recognition, one environment per device
    #[serde(rename = "HHAR")]
    Hhar,
    /// Argentinian sign language videos, one environment per signer pair
    #[serde(rename = "LSA64")]
    Lsa64,
}

impl Dataset {
    /// Every built-in dataset.
    pub const ALL: [Self; 10] = [
        Self::BasicFourier,
        Self::SpuriousFourier,
        Self::Tmnist,
        Self::TcmnistSeq,
        Self::TcmnistStep,
        Self::Cap,
        Self::Sedfx,
        Self::Pcl,
        Self::Hhar,
        Self::Lsa64,
    ];

    /// Name used in run flags.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::BasicFourier => "Basic_Fourier",
            Self::SpuriousFourier => "Spurious_Fourier",
            Self::Tmnist => "TMNIST",
            Self::TcmnistSeq => "TCMNIST_seq",
            Self::TcmnistStep => "TCMNIST_step",
            Self::Cap => "CAP",
            Self::Sedfx => "SEDFx",
            Self::Pcl => "PCL",
            Self::Hhar => "HHAR",
            Self::Lsa64 => "LSA64",
        }
    }

    /// Ordered environment names.
    #[must_use]
    pub const fn environments(self) -> &'static [&'static str] {
        match self {
            Self::BasicFourier => &["no_spur"],
            Self::SpuriousFourier => &["10%", "80%", "90%"],
            Self::Tmnist => &["grey"],
            Self::TcmnistSeq | Self::TcmnistStep => &["-90%", "80%", "90%"],
            Self::Cap => &["Machine0", "Machine1", "Machine2", "Machine3", "Machine4"],
            Self::Sedfx => &["Age 20-40", "Age 40-60", "Age 60-80", "Age 80-100"],
            Self::Pcl => &["PhysionetMI", "Cho2017", "Lee2019_MI"],
            Self::Hhar => &["nexus4", "s3", "s3mini", "lgwatch", "gear"],
            Self::Lsa64 => &["001-002", "003-004", "005-006", "007-008", "009-010"],
        }
    }
}

impl fmt::Display for Dataset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Dataset {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|d| d.name() == s)
            .ok_or_else(|| Error::UnknownDataset(s.to_string()))
    }
}

/// Table of dataset name → ordered environment names.
///
/// `DatasetRegistry::default()` holds every [`Dataset`]; use
/// [`DatasetRegistry::register`] to add or override entries.
#[derive(Debug, Clone)]
pub struct DatasetRegistry {
    environments: HashMap<String, Vec<String>>,
}

impl Default for DatasetRegistry {
    fn default() -> Self {
        let environments = Dataset::ALL
            .into_iter()
            .map(|d| {
                let envs = d.environments().iter().map(|e| (*e).to_string()).collect();
                (d.name().to_string(), envs)
            })
            .collect();
        Self { environments }
    }
}

impl DatasetRegistry {
    /// Create a registry with the built-in datasets.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry with no datasets.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            environments: HashMap::new(),
        }
    }

    /// Register (or replace) the environments of a dataset.
    pub fn register<I, S>(&mut self, dataset: impl Into<String>, environments: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.environments.insert(
            dataset.into(),
            environments.into_iter().map(Into::into).collect(),
        );
    }

    /// Builder-style variant of [`DatasetRegistry::register`].
    #[must_use]
    pub fn with_dataset<I, S>(mut self, dataset: impl Into<String>, environments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.register(dataset, environments);
        self
    }

    /// Number of registered datasets.
    #[must_use]
    pub fn len(&self) -> usize {
        self.environments.len()
    }

    /// Check if no dataset is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.environments.is_empty()
    }
}

impl EnvironmentLookup for DatasetRegistry {
    fn environments(&self, dataset: &str) -> Result<&[String]> {
        self.environments
            .get(dataset)
            .map(Vec::as_slice)
            .ok_or_else(|| Error::UnknownDataset(dataset.to_string()))
    }
}
