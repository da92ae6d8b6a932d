//! Hyperparameter tables per dataset and per objective

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::json;

use super::space::{Distribution, HyperparameterSpace};
use crate::datasets::Dataset;
use crate::record::Hparams;
use crate::{Error, Result};

/// Training objectives of the sweep harness.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[allow(clippy::upper_case_acronyms)]
pub enum Objective {
    /// Empirical risk minimization
    ERM,
    /// Invariant risk minimization
    IRM,
    /// Variance risk extrapolation
    VREx,
    /// Spectral decoupling
    SD,
    /// Inter-environment gradient alignment
    IGA,
    /// AND-mask gradient masking
    ANDMask,
    /// Fish gradient matching
    Fish,
    /// Smoothed AND-mask
    SANDMask,
    /// Information bottleneck on features
    #[serde(rename = "IB_ERM_features")]
    IbErmFeatures,
    /// Information bottleneck on logits
    #[serde(rename = "IB_ERM_logits")]
    IbErmLogits,
    /// Information bottleneck with IRM penalty
    #[serde(rename = "IB_IRM")]
    IbIrm,
    /// Domain-adversarial training
    DANN,
}

impl Objective {
    /// Every objective.
    pub const ALL: [Self; 12] = [
        Self::ERM,
        Self::IRM,
        Self::VREx,
        Self::SD,
        Self::IGA,
        Self::ANDMask,
        Self::Fish,
        Self::SANDMask,
        Self::IbErmFeatures,
        Self::IbErmLogits,
        Self::IbIrm,
        Self::DANN,
    ];

    /// Name used in run flags.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::ERM => "ERM",
            Self::IRM => "IRM",
            Self::VREx => "VREx",
            Self::SD => "SD",
            Self::IGA => "IGA",
            Self::ANDMask => "ANDMask",
            Self::Fish => "Fish",
            Self::SANDMask => "SANDMask",
            Self::IbErmFeatures => "IB_ERM_features",
            Self::IbErmLogits => "IB_ERM_logits",
            Self::IbIrm => "IB_IRM",
            Self::DANN => "DANN",
        }
    }
}

impl fmt::Display for Objective {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Objective {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|o| o.name() == s)
            .ok_or_else(|| Error::UnknownObjective(s.to_string()))
    }
}

fn log10(low: f64, high: f64) -> Distribution {
    Distribution::LogUniform10 { low, high }
}

fn log2_int(low: f64, high: f64) -> Distribution {
    Distribution::LogUniform2Int { low, high }
}

fn uniform(low: f64, high: f64) -> Distribution {
    Distribution::Uniform { low, high }
}

/// Training hyperparameters (class balance, weight decay, lr, batch size).
///
/// With `sample == false` every entry is the dataset's default value.
#[must_use]
pub fn training_space(dataset: Dataset, sample: bool) -> HyperparameterSpace {
    // (sampled lr exponents, sampled batch-size exponents, default lr, default batch size)
    let (lr_range, batch_range, lr, batch_size) = match dataset {
        Dataset::BasicFourier
        | Dataset::SpuriousFourier
        | Dataset::Tmnist
        | Dataset::TcmnistSeq
        | Dataset::TcmnistStep => ((-4.5, -2.5), (3.0, 9.0), 1e-3, 64),
        Dataset::Cap | Dataset::Sedfx => ((-5.0, -3.0), (3.0, 4.0), 1e-4, 8),
        Dataset::Pcl => ((-5.0, -3.0), (3.0, 5.0), 1e-3, 32),
        Dataset::Hhar => ((-4.0, -2.0), (3.0, 4.0), 1e-4, 8),
        Dataset::Lsa64 => ((-5.0, -3.0), (3.0, 4.0), 1e-4, 2),
    };

    let space = HyperparameterSpace::new().with("class_balance", Distribution::fixed(true));
    if sample {
        space
            .with("weight_decay", Distribution::fixed(0.0))
            .with("lr", log10(lr_range.0, lr_range.1))
            .with("batch_size", log2_int(batch_range.0, batch_range.1))
    } else {
        let weight_decay = if dataset == Dataset::Pcl {
            Distribution::fixed(0.0)
        } else {
            Distribution::fixed(0)
        };
        space
            .with("weight_decay", weight_decay)
            .with("lr", Distribution::fixed(lr))
            .with("batch_size", Distribution::fixed(batch_size))
    }
}

/// Model architecture hyperparameters (never sampled).
#[must_use]
pub fn model_hparams(dataset: Dataset) -> Hparams {
    let value = match dataset {
        Dataset::BasicFourier | Dataset::SpuriousFourier => json!({
            "model": "LSTM",
            "hidden_depth": 1,
            "hidden_width": 20,
            "recurrent_layers": 2,
            "state_size": 32
        }),
        Dataset::Tmnist | Dataset::TcmnistSeq | Dataset::TcmnistStep => json!({
            "model": "MNIST_LSTM",
            "hidden_depth": 3,
            "hidden_width": 64,
            "recurrent_layers": 1,
            "state_size": 128
        }),
        Dataset::Cap | Dataset::Sedfx | Dataset::Hhar => json!({"model": "deep4"}),
        Dataset::Pcl => json!({"model": "EEGNet"}),
        Dataset::Lsa64 => json!({
            "model": "CRNN",
            "hidden_depth": 1,
            "hidden_width": 64,
            "recurrent_layers": 2,
            "state_size": 128,
            "fc_hidden": [512, 512],
            "CNN_embed_dim": 256
        }),
    };
    match value {
        serde_json::Value::Object(map) => map,
        _ => Hparams::new(),
    }
}

/// Objective-specific hyperparameters.
#[must_use]
pub fn objective_space(objective: Objective, sample: bool) -> HyperparameterSpace {
    let space = HyperparameterSpace::new();
    match (objective, sample) {
        (Objective::ERM, _) => space,
        (Objective::IRM | Objective::VREx, true) => space
            .with("penalty_weight", log10(-1.0, 5.0))
            .with("anneal_iters", uniform(0.0, 2000.0)),
        (Objective::IRM | Objective::VREx, false) => space
            .with("penalty_weight", Distribution::fixed(1e2))
            .with("anneal_iters", Distribution::fixed(500)),
        (Objective::SD, true) => space.with("penalty_weight", log10(-5.0, -1.0)),
        (Objective::SD, false) => space.with("penalty_weight", Distribution::fixed(1)),
        (Objective::IGA, true) => space.with("penalty_weight", log10(-1.0, 5.0)),
        (Objective::IGA, false) => space.with("penalty_weight", Distribution::fixed(1e1)),
        (Objective::ANDMask, true) => space.with("tau", uniform(0.0, 1.0)),
        (Objective::ANDMask, false) => space.with("tau", Distribution::fixed(1)),
        // The harness fixes meta_lr when sampling and draws it by default; kept as-is.
        (Objective::Fish, true) => space.with("meta_lr", Distribution::fixed(0.5)),
        (Objective::Fish, false) => {
            space.with("meta_lr", Distribution::choice([0.05, 0.1, 0.5]))
        }
        (Objective::SANDMask, true) => space
            .with("tau", uniform(0.0, 1.0))
            .with("k", log10(-3.0, 5.0))
            .with("betas", uniform(0.9, 0.999)),
        (Objective::SANDMask, false) => space
            .with("tau", Distribution::fixed(0.5))
            .with("k", Distribution::fixed(1e1))
            .with("betas", Distribution::fixed(0.9)),
        (Objective::IbErmFeatures | Objective::IbErmLogits, true) => {
            space.with("ib_weight", log10(-3.0, 0.0))
        }
        (Objective::IbErmFeatures | Objective::IbErmLogits, false) => {
            space.with("ib_weight", Distribution::fixed(0.1))
        }
        (Objective::IbIrm, true) => space
            .with("ib_weight", log10(-1.0, 5.0))
            .with("ib_anneal", uniform(0.0, 2000.0))
            .with("irm_weight", log10(-1.0, 5.0))
            .with("irm_anneal", uniform(0.0, 2000.0)),
        (Objective::IbIrm, false) => space
            .with("ib_weight", Distribution::fixed(1e2))
            .with("ib_anneal", Distribution::fixed(500))
            .with("irm_weight", Distribution::fixed(1e2))
            .with("irm_anneal", Distribution::fixed(500)),
        (Objective::DANN, true) => space
            .with("lambda", log10(-2.0, 2.0))
            .with("weight_decay_d", log10(-6.0, -2.0))
            .with("d_steps_per_g_step", log2_int(0.0, 3.0))
            .with("grad_penalty", log10(-1.0, 1.0))
            .with("beta1", Distribution::choice([0.0, 0.5]))
            .with("mlp_width", log2_int(6.0, 10.0))
            .with("mlp_depth", Distribution::choice([3, 4, 5]))
            .with("mlp_dropout", Distribution::choice([0.0, 0.1]))
            .with("label_smooth", Distribution::fixed(true))
            .with("eps", uniform(0.0, 1.0))
            .with("lr_d", log10(-4.5, -2.5)),
        (Objective::DANN, false) => space
            .with("lambda", Distribution::fixed(0.1))
            .with("weight_decay_d", Distribution::fixed(0.0))
            .with("d_steps_per_g_step", Distribution::fixed(2))
            .with("grad_penalty", Distribution::fixed(0.0))
            .with("beta1", Distribution::fixed(0.5))
            .with("mlp_width", Distribution::fixed(64))
            .with("mlp_depth", Distribution::fixed(2))
            .with("mlp_dropout", Distribution::fixed(0.0))
            .with("label_smooth", Distribution::fixed(false))
            .with("eps", Distribution::fixed(0.1))
            .with("lr_d", Distribution::fixed(1e-3)),
    }
}

/// Resolve the training hyperparameters of a dataset by name.
///
/// # Errors
///
/// Returns [`Error::UnknownDataset`] if `dataset` is not a built-in dataset.
pub fn training_hparams(dataset: &str, seed: u64, sample: bool) -> Result<Hparams> {
    let dataset: Dataset = dataset.parse()?;
    Ok(training_space(dataset, sample).resolve(seed))
}

/// Resolve the model hyperparameters of a dataset by name.
///
/// # Errors
///
/// Returns [`Error::UnknownDataset`] if `dataset` is not a built-in dataset.
pub fn model_hparams_for(dataset: &str) -> Result<Hparams> {
    Ok(model_hparams(dataset.parse()?))
}

/// Resolve the hyperparameters of an objective by name.
///
/// # Errors
///
/// Returns [`Error::UnknownObjective`] if `objective` is not known.
pub fn objective_hparams(objective: &str, seed: u64, sample: bool) -> Result<Hparams> {
    let objective: Objective = objective.parse()?;
    Ok(objective_space(objective, sample).resolve(seed))
}
