//! Selection scores and their reduction across trial seeds
//!
//! Most policies produce one accuracy per run. IID validation has no held-out
//! environment and reports one accuracy per environment instead, so a score
//! is either a scalar or a vector and every reduction broadcasts over the
//! environment dimension.

use std::cmp::Ordering;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Accuracy reported for a selected checkpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Score {
    /// Single accuracy value.
    Scalar(f64),
    /// One accuracy per environment, in registry order.
    Vector(Vec<f64>),
}

impl Score {
    /// Get the value of a scalar score.
    #[must_use]
    pub const fn as_scalar(&self) -> Option<f64> {
        match self {
            Self::Scalar(v) => Some(*v),
            Self::Vector(_) => None,
        }
    }

    /// Get the values of a vector score.
    #[must_use]
    pub fn as_vector(&self) -> Option<&[f64]> {
        match self {
            Self::Scalar(_) => None,
            Self::Vector(v) => Some(v),
        }
    }

    /// Check if any component is NaN.
    #[must_use]
    pub fn is_nan(&self) -> bool {
        match self {
            Self::Scalar(v) => v.is_nan(),
            Self::Vector(v) => v.iter().any(|x| x.is_nan()),
        }
    }

    fn shape(&self) -> Option<usize> {
        match self {
            Self::Scalar(_) => None,
            Self::Vector(v) => Some(v.len()),
        }
    }
}

/// Scalars compare numerically. Vectors compare lexicographically, element
/// by element, which is how per-environment arrays are ranked when picking
/// the best hyperparameter seed. A scalar and a vector are not comparable.
impl PartialOrd for Score {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        match (self, other) {
            (Self::Scalar(a), Self::Scalar(b)) => a.partial_cmp(b),
            (Self::Vector(a), Self::Vector(b)) => a.as_slice().partial_cmp(b.as_slice()),
            _ => None,
        }
    }
}

impl fmt::Display for Score {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Scalar(v) => write!(f, "{v:.4}"),
            Self::Vector(values) => {
                f.write_str("[")?;
                for (i, v) in values.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{v:.4}")?;
                }
                f.write_str("]")
            }
        }
    }
}

/// Outcome of an arg-max scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct ArgMax {
    /// Index of the first maximal candidate.
    pub index: usize,
    /// Candidates skipped because they compare unordered with themselves (NaN).
    pub skipped: usize,
}

/// Index of the first maximal item.
///
/// Later items only win when strictly greater, so ties go to the earliest.
/// Items that are unordered with themselves (NaN) are skipped. Returns
/// `None` when nothing is left to choose from.
pub(crate) fn arg_max<T, I>(items: I) -> Option<ArgMax>
where
    T: PartialOrd,
    I: IntoIterator<Item = T>,
{
    let mut best: Option<(usize, T)> = None;
    let mut skipped = 0;

    for (index, item) in items.into_iter().enumerate() {
        if item.partial_cmp(&item).is_none() {
            skipped += 1;
            continue;
        }
        let replace = match &best {
            Some((_, current)) => item.partial_cmp(current) == Some(Ordering::Greater),
            None => true,
        };
        if replace {
            best = Some((index, item));
        }
    }

    best.map(|(index, _)| ArgMax { index, skipped })
}

/// Arithmetic mean of a slice (NaN for an empty slice).
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn mean(values: &[f64]) -> f64 {
    values.iter().sum::<f64>() / values.len() as f64
}

/// Mean and standard error of the mean.
///
/// The standard deviation is the population one (divide by `n`), so a
/// single value has a standard error of exactly `0.0`.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn mean_and_stderr(values: &[f64]) -> (f64, f64) {
    let n = values.len() as f64;
    let m = mean(values);
    let variance = values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / n;
    (m, variance.sqrt() / n.sqrt())
}

/// Reduce scores of several trial seeds to `(mean, standard error)`.
///
/// Vector scores are reduced per component.
///
/// # Errors
///
/// - [`Error::EmptySelection`] if `scores` is empty
/// - [`Error::ShapeMismatch`] if scalars and vectors are mixed, or vectors
///   differ in length
pub fn reduce_scores(scores: &[Score]) -> Result<(Score, Score)> {
    let first = scores
        .first()
        .ok_or_else(|| Error::EmptySelection("no scores to aggregate".to_string()))?;
    let shape = first.shape();

    if let Some(bad) = scores.iter().find(|s| s.shape() != shape) {
        return Err(Error::ShapeMismatch(format!(
            "cannot aggregate {} with {}",
            describe_shape(shape),
            describe_shape(bad.shape())
        )));
    }

    match shape {
        None => {
            let values: Vec<f64> = scores.iter().filter_map(Score::as_scalar).collect();
            let (m, se) = mean_and_stderr(&values);
            Ok((Score::Scalar(m), Score::Scalar(se)))
        }
        Some(width) => {
            let mut means = Vec::with_capacity(width);
            let mut stderrs = Vec::with_capacity(width);
            for column in 0..width {
                let values: Vec<f64> = scores
                    .iter()
                    .filter_map(Score::as_vector)
                    .map(|v| v[column])
                    .collect();
                let (m, se) = mean_and_stderr(&values);
                means.push(m);
                stderrs.push(se);
            }
            Ok((Score::Vector(means), Score::Vector(stderrs)))
        }
    }
}

fn describe_shape(shape: Option<usize>) -> String {
    shape.map_or_else(|| "scalar".to_string(), |n| format!("vector of length {n}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_arg_max_first_on_ties() {
        let found = arg_max([0.5, 0.7, 0.7, 0.1]).unwrap();
        assert_eq!(found.index, 1);
        assert_eq!(found.skipped, 0);
    }

    #[test]
    fn test_arg_max_skips_nan() {
        let found = arg_max([f64::NAN, 0.2, f64::NAN, 0.1]).unwrap();
        assert_eq!(found.index, 1);
        assert_eq!(found.skipped, 2);
    }

    #[test]
    fn test_arg_max_empty_and_all_nan() {
        assert!(arg_max(Vec::<f64>::new()).is_none());
        assert!(arg_max([f64::NAN, f64::NAN]).is_none());
    }

    #[test]
    fn test_vector_scores_compare_lexicographically() {
        let a = Score::Vector(vec![0.5, 0.9]);
        let b = Score::Vector(vec![0.6, 0.1]);
        assert!(b > a);
        assert_eq!(Score::Scalar(1.0).partial_cmp(&a), None);
    }

    #[test]
    fn test_stderr_single_value_is_zero() {
        let (m, se) = mean_and_stderr(&[0.42]);
        assert!((m - 0.42).abs() < 1e-12);
        assert!(se.abs() < f64::EPSILON);
    }

    #[test]
    fn test_stderr_population_convention() {
        // population std of [1, 3] is 1, stderr = 1 / sqrt(2)
        let (m, se) = mean_and_stderr(&[1.0, 3.0]);
        assert!((m - 2.0).abs() < 1e-12);
        assert!((se - 1.0 / 2f64.sqrt()).abs() < 1e-12);
    }

    #[test]
    fn test_reduce_vector_scores_broadcasts() {
        let scores = vec![Score::Vector(vec![1.0, 0.0]), Score::Vector(vec![3.0, 0.0])];
        let (m, se) = reduce_scores(&scores).unwrap();
        assert_eq!(m, Score::Vector(vec![2.0, 0.0]));
        let se = se.as_vector().unwrap().to_vec();
        assert!((se[0] - 1.0 / 2f64.sqrt()).abs() < 1e-12);
        assert!(se[1].abs() < f64::EPSILON);
    }

    #[test]
    fn test_reduce_rejects_mixed_shapes() {
        let scores = vec![Score::Scalar(1.0), Score::Vector(vec![1.0])];
        assert!(matches!(reduce_scores(&scores), Err(Error::ShapeMismatch(_))));

        let scores = vec![Score::Vector(vec![1.0]), Score::Vector(vec![1.0, 2.0])];
        assert!(matches!(reduce_scores(&scores), Err(Error::ShapeMismatch(_))));
    }

    #[test]
    fn test_reduce_empty_fails() {
        assert!(matches!(reduce_scores(&[]), Err(Error::EmptySelection(_))));
    }

    #[test]
    fn test_display() {
        assert_eq!(Score::Scalar(0.5).to_string(), "0.5000");
        assert_eq!(Score::Vector(vec![0.5, 0.25]).to_string(), "[0.5000, 0.2500]");
    }
}
