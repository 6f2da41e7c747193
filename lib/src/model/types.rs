use std::{fmt, str::FromStr};

use serde::Deserialize;

use crate::error::{ClassifierError, Result};

/// One row of the dataset. After normalization `attributes[0]` is the bias feature.
#[derive(Debug, Clone, PartialEq)]
pub struct Example {
  pub attributes: Vec<f64>,
  pub label: u8,
}

impl Example {
  pub fn new(attributes: Vec<f64>, label: u8) -> Self {
    Self { attributes, label }
  }
}

pub type Dataset = Vec<Example>;

/// Disjoint training and testing partitions of a normalized dataset.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Split {
  pub training: Vec<Example>,
  pub testing: Vec<Example>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Subset {
  Training,
  Testing,
}

/// Random seed: either fixed for reproducible runs or unset.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(try_from = "SeedRepr")]
pub enum Seed {
  #[default]
  Unset,
  Fixed(u64),
}

impl FromStr for Seed {
  type Err = ClassifierError;

  fn from_str(s: &str) -> Result<Self> {
    let s = s.trim();
    if s.eq_ignore_ascii_case("none") {
      return Ok(Seed::Unset);
    }
    s.parse::<u64>().map(Seed::Fixed).map_err(|_| {
      ClassifierError::InvalidArgument(format!(
        "seed must be a non-negative integer or 'None', got {s:?}"
      ))
    })
  }
}

impl fmt::Display for Seed {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Seed::Unset => write!(f, "None"),
      Seed::Fixed(n) => write!(f, "{n}"),
    }
  }
}

// seeds in config files may be written as `seed: 7` or `seed: none`
#[derive(Deserialize)]
#[serde(untagged)]
enum SeedRepr {
  Int(u64),
  Text(String),
}

impl TryFrom<SeedRepr> for Seed {
  type Error = ClassifierError;

  fn try_from(repr: SeedRepr) -> Result<Self> {
    match repr {
      SeedRepr::Int(n) => Ok(Seed::Fixed(n)),
      SeedRepr::Text(s) => s.parse(),
    }
  }
}

/// Hyperparameters of a training run.
#[derive(Debug, Clone, PartialEq)]
pub struct TrainingParams {
  /// Fraction of rows used for training, 0 < train_fraction < 1.
  pub train_fraction: f64,
  /// Accuracy to reach, as a fraction in (0, 1].
  pub threshold: f64,
  pub learning_rate: f64,
  pub seed: Seed,
  pub max_epochs: usize,
  pub verbose: bool,
}

impl Default for TrainingParams {
  fn default() -> Self {
    Self {
      train_fraction: 0.75,
      threshold: 0.9,
      learning_rate: 0.1,
      seed: Seed::Unset,
      max_epochs: 100,
      verbose: true,
    }
  }
}

impl TrainingParams {
  pub fn validate(&self) -> Result<()> {
    check_train_fraction(self.train_fraction)?;
    check_threshold(self.threshold)?;
    check_learning_rate(self.learning_rate)?;
    check_max_epochs(self.max_epochs)
  }

  /// Threshold as a percentage, comparable with `Score::accuracy`.
  pub fn threshold_percent(&self) -> f64 {
    self.threshold * 100.0
  }
}

pub(crate) fn check_train_fraction(fraction: f64) -> Result<()> {
  if fraction > 0.0 && fraction < 1.0 {
    Ok(())
  } else {
    Err(ClassifierError::InvalidArgument(format!(
      "train fraction must lie in (0, 1), got {fraction}"
    )))
  }
}

pub(crate) fn check_threshold(threshold: f64) -> Result<()> {
  if threshold > 0.0 && threshold <= 1.0 {
    Ok(())
  } else {
    Err(ClassifierError::InvalidArgument(format!(
      "threshold must lie in (0, 1], got {threshold}"
    )))
  }
}

pub(crate) fn check_learning_rate(lr: f64) -> Result<()> {
  if lr.is_finite() && lr > 0.0 {
    Ok(())
  } else {
    Err(ClassifierError::InvalidArgument(format!(
      "learning rate must be positive and finite, got {lr}"
    )))
  }
}

pub(crate) fn check_max_epochs(max_epochs: usize) -> Result<()> {
  if max_epochs > 0 {
    Ok(())
  } else {
    Err(ClassifierError::InvalidArgument(
      "max_epochs must be at least 1".to_string(),
    ))
  }
}

/// Accuracy and error percentages, each rounded to 3 decimals.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Score {
  pub accuracy: f64,
  pub error: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrainingState {
  Untrained,
  Training,
  Converged,
  NonConverged,
}

/// Outcome of a converged training run.
#[derive(Debug, Clone, PartialEq)]
pub struct TrainReport {
  /// Epochs run before the stopping policy was satisfied.
  pub epochs: usize,
  pub train: Score,
  /// `None` when no examples were left for testing.
  pub test: Option<Score>,
  /// Training accuracy before the first epoch and after each epoch.
  pub history: Vec<f64>,
}
