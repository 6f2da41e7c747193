use std::path::PathBuf;

/// Everything the classifier can fail with.
#[derive(Debug, thiserror::Error)]
pub enum ClassifierError {
  #[error("failed to read dataset {path:?}: {source}")]
  Io {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },

  #[error("line {line}, column {column}: {value:?} is not a number")]
  Parse {
    line: usize,
    column: usize,
    value: String,
  },

  #[error("line {line}: expected {expected} columns, found {found}")]
  RaggedRow {
    line: usize,
    expected: usize,
    found: usize,
  },

  #[error("line {line}: class label must be 0 or 1, got {value}")]
  InvalidLabel { line: usize, value: f64 },

  #[error("dataset needs at least one row with one attribute and a label")]
  EmptyDataset,

  #[error("invalid argument: {0}")]
  InvalidArgument(String),

  /// The epoch budget ran out before the accuracy threshold was met.
  /// `weights` are the best weights seen during the run.
  #[error(
    "stopping for non-convergence after {epochs} max_epochs (best training accuracy {best_accuracy}%). \
     Try increasing \"max_epochs\", decreasing \"threshold\", or adjusting learning rate \"lr\"."
  )]
  NonConvergence {
    epochs: usize,
    best_accuracy: f64,
    weights: Vec<f64>,
  },
}

pub type Result<T> = std::result::Result<T, ClassifierError>;
