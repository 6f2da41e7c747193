use itertools::Itertools;

use super::Example;

/// Weighted sum of one example's attributes (bias included).
pub fn weighted_sum(weights: &[f64], attributes: &[f64]) -> f64 {
  weights
    .iter()
    .zip_eq(attributes)
    .map(|(w, a)| w * a)
    .sum()
}

/// 1 if the weighted sum is strictly positive, otherwise 0.
pub fn hypothesis(weights: &[f64], attributes: &[f64]) -> u8 {
  u8::from(weighted_sum(weights, attributes) > 0.0)
}

/// Classifies every example with the same weights.
pub fn run_model(weights: &[f64], examples: &[Example]) -> Vec<u8> {
  examples
    .iter()
    .map(|ex| hypothesis(weights, &ex.attributes))
    .collect()
}

/// Perceptron delta rule: `w_i += lr * (target - hypothesis) * x_i`, applied in place.
pub fn adjust_weights(weights: &mut [f64], attributes: &[f64], target: u8, hypothesis: u8, lr: f64) {
  let delta = lr * (f64::from(target) - f64::from(hypothesis));
  if delta == 0.0 {
    return;
  }
  for (w, a) in weights.iter_mut().zip_eq(attributes) {
    *w += delta * a;
  }
}
