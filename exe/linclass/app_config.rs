use std::{error::Error, path::Path, path::PathBuf};

use linear_classifier::{Seed, TrainingParams};
use serde::Deserialize;

/// Run configuration. Also defines the config file format (every field can be omitted).
#[derive(Debug, Default, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AppConfig {
  /// CSV file to operate on
  pub data: Option<PathBuf>,
  /// Fraction of data used for training
  pub train: Option<f64>,
  /// Minimum acceptable training accuracy (fraction)
  pub threshold: Option<f64>,
  /// Learning rate for weight adjustment
  pub lr: Option<f64>,
  /// Seed for reproducible shuffling and weight initialization
  pub seed: Option<Seed>,
  /// Maximum number of training epochs allowed
  pub max_epochs: Option<usize>,
  /// Print training status after each epoch
  pub verbose: Option<bool>,
}

impl AppConfig {
  /// Defaults of the command line, lower priority than any config file or flag.
  pub fn cli_defaults() -> Self {
    Self {
      data: None,
      train: Some(0.75),
      threshold: Some(0.9),
      lr: Some(0.01),
      seed: Some(Seed::Unset),
      max_epochs: Some(100),
      verbose: Some(false),
    }
  }

  pub fn from_yaml(content: &str) -> Result<Self, serde_yaml::Error> {
    serde_yaml::from_str(content)
  }

  pub fn from_file(path: &Path) -> Result<Self, Box<dyn Error>> {
    let content = std::fs::read_to_string(path)
      .map_err(|e| format!("failed to read config {}: {}", path.display(), e))?;
    Ok(Self::from_yaml(&content)?)
  }

  // merge configs where the second overwrites the first
  pub fn merge(self, other: Self) -> Self {
    Self {
      data: other.data.or(self.data),
      train: other.train.or(self.train),
      threshold: other.threshold.or(self.threshold),
      lr: other.lr.or(self.lr),
      seed: other.seed.or(self.seed),
      max_epochs: other.max_epochs.or(self.max_epochs),
      verbose: other.verbose.or(self.verbose),
    }
  }

  pub fn into_params(self) -> Result<(PathBuf, TrainingParams), Box<dyn Error>> {
    let data = self
      .data
      .ok_or("no dataset given: pass -d/--data or set `data` in the config file")?;
    let defaults = TrainingParams::default();
    let params = TrainingParams {
      train_fraction: self.train.unwrap_or(defaults.train_fraction),
      threshold: self.threshold.unwrap_or(defaults.threshold),
      learning_rate: self.lr.unwrap_or(defaults.learning_rate),
      seed: self.seed.unwrap_or(defaults.seed),
      max_epochs: self.max_epochs.unwrap_or(defaults.max_epochs),
      verbose: self.verbose.unwrap_or(defaults.verbose),
    };
    params.validate()?;
    Ok((data, params))
  }
}
