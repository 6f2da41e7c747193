/// Decides from the training accuracy history whether training can stop.
pub trait StoppingPolicy {
  /// `history` holds the accuracy before the first epoch followed by one entry per epoch.
  /// `threshold` is a percentage.
  fn converged(&self, history: &[f64], threshold: f64) -> bool;
}

/// Stops once the mean of the last `window` accuracies reaches the threshold.
/// Shorter histories are averaged over what exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrailingMean {
  pub window: usize,
}

impl Default for TrailingMean {
  fn default() -> Self {
    Self { window: 3 }
  }
}

impl TrailingMean {
  pub fn mean(&self, history: &[f64]) -> Option<f64> {
    let tail = &history[history.len().saturating_sub(self.window.max(1))..];
    if tail.is_empty() {
      return None;
    }
    Some(tail.iter().sum::<f64>() / tail.len() as f64)
  }
}

impl StoppingPolicy for TrailingMean {
  fn converged(&self, history: &[f64], threshold: f64) -> bool {
    self.mean(history).is_some_and(|m| m >= threshold)
  }
}
