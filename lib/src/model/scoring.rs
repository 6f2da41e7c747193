use super::{run_model, Example, Score};

// half to even on the last kept digit
fn round3(x: f64) -> f64 {
  (x * 1000.0).round_ties_even() / 1000.0
}

fn percent_where(weights: &[f64], examples: &[Example], correct: bool) -> f64 {
  let hits = run_model(weights, examples)
    .into_iter()
    .zip(examples)
    .filter(|(h, ex)| (*h == ex.label) == correct)
    .count();
  round3(hits as f64 / examples.len() as f64 * 100.0)
}

/// Percentage of examples whose class is predicted correctly. NaN for an empty slice.
pub fn accuracy(weights: &[f64], examples: &[Example]) -> f64 {
  percent_where(weights, examples, true)
}

/// Percentage of misclassified examples, counted independently of `accuracy`.
pub fn error(weights: &[f64], examples: &[Example]) -> f64 {
  percent_where(weights, examples, false)
}

pub fn score(weights: &[f64], examples: &[Example]) -> Score {
  Score {
    accuracy: accuracy(weights, examples),
    error: error(weights, examples),
  }
}
