//! Hyperparameter distributions and search spaces

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::record::Hparams;

/// How one hyperparameter value is produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Distribution {
    /// Always the same value.
    Fixed(Value),
    /// `U(low, high)`
    Uniform {
        /// Lower bound
        low: f64,
        /// Upper bound
        high: f64,
    },
    /// `10^U(low, high)`
    LogUniform10 {
        /// Lower exponent
        low: f64,
        /// Upper exponent
        high: f64,
    },
    /// `floor(2^U(low, high))` as an integer
    LogUniform2Int {
        /// Lower exponent
        low: f64,
        /// Upper exponent
        high: f64,
    },
    /// One of the listed values, uniformly.
    Choice(Vec<Value>),
}

impl Distribution {
    /// Fixed value shorthand.
    #[must_use]
    pub fn fixed(value: impl Into<Value>) -> Self {
        Self::Fixed(value.into())
    }

    /// Choice shorthand.
    #[must_use]
    pub fn choice<V: Into<Value>>(values: impl IntoIterator<Item = V>) -> Self {
        Self::Choice(values.into_iter().map(Into::into).collect())
    }

    /// Draw a value.
    pub fn sample<R: Rng>(&self, rng: &mut R) -> Value {
        match self {
            Self::Fixed(value) => value.clone(),
            Self::Uniform { low, high } => Value::from(uniform(rng, *low, *high)),
            Self::LogUniform10 { low, high } => Value::from(10f64.powf(uniform(rng, *low, *high))),
            #[allow(clippy::cast_possible_truncation)]
            Self::LogUniform2Int { low, high } => {
                Value::from(2f64.powf(uniform(rng, *low, *high)).floor() as i64)
            }
            Self::Choice(values) => values.choose(rng).cloned().unwrap_or(Value::Null),
        }
    }

    /// Whether the value depends on the RNG.
    #[must_use]
    pub const fn is_random(&self) -> bool {
        !matches!(self, Self::Fixed(_))
    }
}

fn uniform<R: Rng>(rng: &mut R, low: f64, high: f64) -> f64 {
    if low < high {
        rng.gen_range(low..high)
    } else {
        low
    }
}

/// Ordered table of hyperparameter name → distribution.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HyperparameterSpace {
    entries: Vec<(String, Distribution)>,
}

impl HyperparameterSpace {
    /// Create an empty space.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add (or replace) a hyperparameter.
    #[must_use]
    pub fn with(mut self, name: impl Into<String>, distribution: Distribution) -> Self {
        let name = name.into();
        if let Some(slot) = self.entries.iter_mut().find(|(n, _)| *n == name) {
            slot.1 = distribution;
        } else {
            self.entries.push((name, distribution));
        }
        self
    }

    /// Get a distribution by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Distribution> {
        self.entries.iter().find(|(n, _)| n == name).map(|(_, d)| d)
    }

    /// Number of hyperparameters.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if the space is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate over `(name, distribution)` in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Distribution)> {
        self.entries.iter().map(|(n, d)| (n.as_str(), d))
    }

    /// Draw every hyperparameter for `seed`.
    ///
    /// Each entry gets its own RNG seeded with `seed`, so adding or removing
    /// an entry never shifts the values drawn for the others.
    #[must_use]
    pub fn resolve(&self, seed: u64) -> Hparams {
        self.entries
            .iter()
            .map(|(name, distribution)| {
                let mut rng = StdRng::seed_from_u64(seed);
                (name.clone(), distribution.sample(&mut rng))
            })
            .collect()
    }
}
