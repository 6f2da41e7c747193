use std::{fmt, path::Path};

use rand::{rngs::StdRng, Rng, SeedableRng};
use tracing::{debug, info, warn};

use super::{
  adjust_weights, check_learning_rate, check_max_epochs, check_threshold, check_train_fraction,
  hypothesis, normalize_data, read_dataset, score, shuffle_dataset, split_dataset, Dataset,
  Example, Score, Seed, Split, StoppingPolicy, Subset, TrainReport, TrainingParams, TrainingState,
  TrailingMean,
};
use crate::error::{ClassifierError, Result};

// keeps the shuffle stream apart from the weight stream drawn from the same seed
const SHUFFLE_SALT: u64 = 0x9e37_79b9_7f4a_7c15;

fn shuffle_rng(seed: Seed) -> StdRng {
  match seed {
    Seed::Fixed(n) => StdRng::seed_from_u64(n ^ SHUFFLE_SALT),
    Seed::Unset => StdRng::from_entropy(),
  }
}

fn weights_rng(seed: Seed) -> StdRng {
  match seed {
    Seed::Fixed(n) => StdRng::seed_from_u64(n),
    Seed::Unset => StdRng::from_entropy(),
  }
}

/// Linear classifier trained with the perceptron learning rule.
///
/// Owns the normalized data, its training/testing split, the weight vector and the
/// state of the last training run.
#[derive(Debug)]
pub struct Linear<P: StoppingPolicy = TrailingMean> {
  source: String,
  params: TrainingParams,
  policy: P,
  normalized: Dataset,
  split: Split,
  weights: Vec<f64>,
  shuffle_rng: StdRng,
  epoch: usize,
  history: Vec<f64>,
  state: TrainingState,
}

impl Linear<TrailingMean> {
  pub fn new(dataset: Dataset, params: TrainingParams) -> Result<Self> {
    Self::with_policy(dataset, params, TrailingMean::default())
  }

  pub fn from_path(path: &Path, params: TrainingParams) -> Result<Self> {
    let dataset = read_dataset(path)?;
    let mut model = Self::new(dataset, params)?;
    model.source = path.display().to_string();
    Ok(model)
  }
}

impl<P: StoppingPolicy> Linear<P> {
  /// Normalizes `dataset`, shuffles and splits it and draws initial weights.
  pub fn with_policy(dataset: Dataset, params: TrainingParams, policy: P) -> Result<Self> {
    params.validate()?;
    if dataset.is_empty() {
      return Err(ClassifierError::EmptyDataset);
    }
    let width = dataset[0].attributes.len();
    if width == 0 {
      return Err(ClassifierError::EmptyDataset);
    }
    if let Some(pos) = dataset.iter().position(|ex| ex.attributes.len() != width) {
      return Err(ClassifierError::RaggedRow {
        line: pos + 1,
        expected: width + 1,
        found: dataset[pos].attributes.len() + 1,
      });
    }

    let mut model = Self {
      source: "in-memory data".to_string(),
      shuffle_rng: shuffle_rng(params.seed),
      params,
      policy,
      normalized: normalize_data(&dataset),
      split: Split::default(),
      weights: Vec::new(),
      epoch: 0,
      history: Vec::new(),
      state: TrainingState::Untrained,
    };
    model.initialize(true)?;
    Ok(model)
  }

  /// Draws fresh weights in [0, 1), first reshuffling and resplitting the data if `shuffle`.
  pub fn initialize(&mut self, shuffle: bool) -> Result<()> {
    if shuffle {
      debug!("Shuffling examples");
      let mut shuffled = self.normalized.clone();
      shuffle_dataset(&mut shuffled, &mut self.shuffle_rng);
      debug!("Splitting shuffled data into training and testing subsets");
      self.split = split_dataset(&shuffled, self.params.train_fraction)?;
    }

    let mut rng = weights_rng(self.params.seed);
    let num_weights = self.normalized[0].attributes.len();
    self.weights = (0..num_weights).map(|_| rng.gen::<f64>()).collect();

    self.epoch = 0;
    self.history.clear();
    self.state = TrainingState::Untrained;
    Ok(())
  }

  /// Reinitializes for retraining, optionally switching to a new seed first.
  pub fn reset(&mut self, shuffle: bool, seed: Option<Seed>) -> Result<()> {
    if let Some(seed) = seed {
      self.set_seed(seed);
    }
    self.initialize(shuffle)
  }

  pub fn set_train_subset(&mut self, fraction: f64) -> Result<()> {
    check_train_fraction(fraction)?;
    self.params.train_fraction = fraction;
    Ok(())
  }

  /// `threshold` is a fraction in (0, 1].
  pub fn set_threshold(&mut self, threshold: f64) -> Result<()> {
    check_threshold(threshold)?;
    self.params.threshold = threshold;
    Ok(())
  }

  pub fn set_lr(&mut self, lr: f64) -> Result<()> {
    check_learning_rate(lr)?;
    self.params.learning_rate = lr;
    Ok(())
  }

  pub fn set_max_epochs(&mut self, max_epochs: usize) -> Result<()> {
    check_max_epochs(max_epochs)?;
    self.params.max_epochs = max_epochs;
    Ok(())
  }

  pub fn set_seed(&mut self, seed: Seed) {
    self.params.seed = seed;
    self.shuffle_rng = shuffle_rng(seed);
    warn!(
      %seed,
      "Random seed has been set and may be different than what was used to initiate this model."
    );
  }

  pub fn set_verbose(&mut self, verbose: bool) {
    self.params.verbose = verbose;
  }

  pub fn weights(&self) -> &[f64] {
    &self.weights
  }

  pub fn epoch(&self) -> usize {
    self.epoch
  }

  /// Training accuracy before the first epoch and after each completed epoch of the last run.
  pub fn accuracy_history(&self) -> &[f64] {
    &self.history
  }

  pub fn state(&self) -> TrainingState {
    self.state
  }

  pub fn params(&self) -> &TrainingParams {
    &self.params
  }

  pub fn training(&self) -> &[Example] {
    &self.split.training
  }

  pub fn testing(&self) -> &[Example] {
    &self.split.testing
  }

  pub fn source(&self) -> &str {
    &self.source
  }

  /// Accuracy and error of the current weights on one subset. NaN for an empty subset.
  pub fn test(&self, subset: Subset) -> Score {
    match subset {
      Subset::Training => score(&self.weights, &self.split.training),
      Subset::Testing => score(&self.weights, &self.split.testing),
    }
  }

  /// Runs epochs of online perceptron updates until the stopping policy accepts the
  /// training accuracy history.
  ///
  /// Running out of `max_epochs` first yields `ClassifierError::NonConvergence` holding the
  /// best weights seen; the model itself keeps the weights of the last epoch.
  #[tracing::instrument(skip(self), fields(source = %self.source))]
  pub fn train(&mut self) -> Result<TrainReport> {
    if self.params.verbose {
      info!("Training...");
    }
    self.state = TrainingState::Training;
    self.epoch = 0;
    self.history.clear();

    let threshold = self.params.threshold_percent();
    let mut current = self.test(Subset::Training);
    self.history.push(current.accuracy);
    let (mut best_accuracy, mut best_weights) = (current.accuracy, self.weights.clone());

    while !self.policy.converged(&self.history, threshold) {
      self.report_epoch(current.error);

      self.epoch += 1;
      if self.epoch > self.params.max_epochs {
        self.state = TrainingState::NonConverged;
        return Err(ClassifierError::NonConvergence {
          epochs: self.params.max_epochs,
          best_accuracy,
          weights: best_weights,
        });
      }

      self.run_epoch();

      current = self.test(Subset::Training);
      self.history.push(current.accuracy);
      if current.accuracy > best_accuracy {
        best_accuracy = current.accuracy;
        best_weights.clone_from(&self.weights);
      }
    }

    self.report_epoch(current.error);
    if self.params.verbose {
      info!("Done!");
    }
    self.state = TrainingState::Converged;

    let test = (!self.split.testing.is_empty()).then(|| self.test(Subset::Testing));
    debug!("Final accuracy on training data: {}%", current.accuracy);
    if let Some(test) = test {
      debug!("Accuracy on testing data: {}%", test.accuracy);
    }

    Ok(TrainReport {
      epochs: self.epoch,
      train: current,
      test,
      history: self.history.clone(),
    })
  }

  // one pass over the training subset in its fixed order; each update is visible to the next example
  fn run_epoch(&mut self) {
    let lr = self.params.learning_rate;
    for ex in &self.split.training {
      let h = hypothesis(&self.weights, &ex.attributes);
      adjust_weights(&mut self.weights, &ex.attributes, ex.label, h, lr);
    }
  }

  fn report_epoch(&self, error: f64) {
    if self.params.verbose {
      info!(
        "Epoch {} of {} allowed: Percent Error {}%",
        self.epoch, self.params.max_epochs, error
      );
    }
  }
}

impl<P: StoppingPolicy> fmt::Display for Linear<P> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(
      f,
      "Embarrassingly simple linear classifier trained on {}",
      self.source
    )
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::utils;

  fn separable() -> Dataset {
    // label 1 iff attribute1 > attribute2, with a gap around the boundary
    let mut ds = Dataset::new();
    for i in 0..=12 {
      for j in 0..=12 {
        if (i as i32 - j as i32).abs() >= 3 {
          ds.push(Example::new(vec![i as f64, j as f64], u8::from(i > j)));
        }
      }
    }
    ds
  }

  fn contradictory() -> Dataset {
    // every point appears once with each label
    let mut rng = StdRng::seed_from_u64(11);
    let mut ds = Dataset::new();
    for _ in 0..40 {
      let a = vec![rng.gen_range(0.0..10.0), rng.gen_range(0.0..10.0)];
      ds.push(Example::new(a.clone(), 0));
      ds.push(Example::new(a, 1));
    }
    ds
  }

  fn seeded(seed: u64) -> TrainingParams {
    TrainingParams {
      seed: Seed::Fixed(seed),
      verbose: false,
      ..Default::default()
    }
  }

  #[test]
  fn test_seeded_models_start_identical() {
    let a = Linear::new(separable(), seeded(7)).unwrap();
    let b = Linear::new(separable(), seeded(7)).unwrap();
    assert_eq!(a.weights(), b.weights());
    assert_eq!(a.training(), b.training());
    assert_eq!(a.testing(), b.testing());

    let c = Linear::new(separable(), seeded(8)).unwrap();
    assert_ne!(a.weights(), c.weights());
  }

  #[test]
  fn test_initial_weights_shape() {
    let model = Linear::new(separable(), seeded(1)).unwrap();
    assert_eq!(model.weights().len(), 3);
    assert!(model.weights().iter().all(|w| (0.0..1.0).contains(w)));
    assert_eq!(model.state(), TrainingState::Untrained);
    let n = separable().len();
    assert_eq!(
      model.training().len(),
      (0.75 * n as f64).round_ties_even() as usize
    );
    assert_eq!(model.training().len() + model.testing().len(), n);
  }

  #[test]
  fn test_reset_keeps_or_reshuffles_split() {
    let mut model = Linear::new(separable(), seeded(3)).unwrap();
    let weights = model.weights().to_vec();
    let training = model.training().to_vec();

    model.reset(false, None).unwrap();
    assert_eq!(model.weights(), &weights[..]);
    assert_eq!(model.training(), &training[..]);

    model.reset(true, None).unwrap();
    assert_eq!(model.weights(), &weights[..]);
    assert_ne!(model.training(), &training[..]);

    model.reset(false, Some(Seed::Fixed(4))).unwrap();
    assert_ne!(model.weights(), &weights[..]);
    assert_eq!(model.params().seed, Seed::Fixed(4));
  }

  #[test]
  fn test_setters_validate_and_defer() {
    let mut model = Linear::new(separable(), seeded(3)).unwrap();
    let training_len = model.training().len();

    assert!(model.set_train_subset(1.2).is_err());
    assert!(model.set_threshold(0.0).is_err());
    assert!(model.set_lr(-0.1).is_err());
    assert!(model.set_max_epochs(0).is_err());

    model.set_train_subset(0.5).unwrap();
    model.set_threshold(0.8).unwrap();
    model.set_lr(0.05).unwrap();
    model.set_max_epochs(10).unwrap();
    model.set_verbose(true);
    assert_eq!(model.params().threshold_percent(), 80.0);
    assert_eq!(model.training().len(), training_len);

    model.reset(true, None).unwrap();
    assert_eq!(
      model.training().len(),
      (0.5 * separable().len() as f64).round_ties_even() as usize
    );
  }

  #[test]
  fn test_separable_data_converges() {
    let scope = utils::init_logging_tests();
    let params = TrainingParams {
      threshold: 0.9,
      learning_rate: 0.1,
      max_epochs: 50,
      seed: Seed::Fixed(42),
      verbose: true,
      ..Default::default()
    };
    let mut model = Linear::new(separable(), params).unwrap();
    let report = model.train().unwrap();

    assert_eq!(model.state(), TrainingState::Converged);
    assert!(report.train.accuracy >= 90.0, "{:?}", report);
    assert!(report.epochs <= 50);
    assert_eq!(report.history.len(), report.epochs + 1);
    assert_eq!(model.accuracy_history(), &report.history[..]);
    let test = report.test.unwrap();
    assert!((test.accuracy + test.error - 100.0).abs() <= 0.001 + 1e-9);
    drop(scope);
  }

  #[test]
  fn test_contradictory_labels_do_not_converge() {
    let params = TrainingParams {
      max_epochs: 5,
      ..seeded(5)
    };
    let mut model = Linear::new(contradictory(), params).unwrap();
    match model.train() {
      Err(ClassifierError::NonConvergence {
        epochs,
        best_accuracy,
        weights,
      }) => {
        assert_eq!(epochs, 5);
        assert_eq!(weights.len(), 3);
        assert!(best_accuracy < 90.0);
      }
      other => panic!("expected non-convergence, got {other:?}"),
    }
    assert_eq!(model.state(), TrainingState::NonConverged);
    assert_eq!(model.epoch(), 6);
    assert_eq!(model.accuracy_history().len(), 6);
  }

  #[test]
  fn test_already_good_weights_stop_before_first_epoch() {
    let params = TrainingParams {
      threshold: 0.01,
      ..seeded(9)
    };
    let mut model = Linear::new(separable(), params).unwrap();
    let before = model.weights().to_vec();
    let report = model.train().unwrap();
    // accuracy is at least 1% unless every training example is misclassified
    if report.history[0] >= 1.0 {
      assert_eq!(report.epochs, 0);
      assert_eq!(model.weights(), &before[..]);
    }
  }

  #[test]
  fn test_trains_without_testing_rows() {
    let ds = vec![
      Example::new(vec![0.0, 1.0], 0),
      Example::new(vec![1.0, 0.0], 1),
    ];
    let params = TrainingParams {
      threshold: 0.5,
      max_epochs: 20,
      ..seeded(4)
    };
    let mut model = Linear::new(ds, params).unwrap();
    assert_eq!(model.training().len(), 2);
    assert!(model.testing().is_empty());
    let report = model.train().unwrap();
    assert_eq!(report.test, None);
    assert!(report.train.accuracy >= 50.0);
  }

  #[derive(Clone, Default)]
  struct Captured(std::sync::Arc<std::sync::Mutex<Vec<u8>>>);

  impl std::io::Write for Captured {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
      self.0.lock().unwrap().extend_from_slice(buf);
      Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
      Ok(())
    }
  }

  #[test]
  fn test_reseeding_warns() {
    let captured = Captured::default();
    let writer = captured.clone();
    let subscriber = tracing_subscriber::fmt()
      .compact()
      .with_ansi(false)
      .with_max_level(tracing::Level::WARN)
      .with_writer(move || writer.clone())
      .finish();
    let scope = tracing::subscriber::set_default(subscriber);

    let mut model = Linear::new(separable(), seeded(3)).unwrap();
    assert!(captured.0.lock().unwrap().is_empty());
    model.reset(false, Some(Seed::Fixed(4))).unwrap();
    model.set_seed(Seed::Unset);
    drop(scope);

    let logs = String::from_utf8(captured.0.lock().unwrap().clone()).unwrap();
    assert_eq!(logs.matches("Random seed has been set").count(), 2, "{logs}");
    assert!(logs.contains("seed=4"), "{logs}");
    assert!(logs.contains("seed=None"), "{logs}");
  }

  struct Never;

  impl StoppingPolicy for Never {
    fn converged(&self, _: &[f64], _: f64) -> bool {
      false
    }
  }

  #[test]
  fn test_epoch_counter_is_bounded_by_budget() {
    let params = TrainingParams {
      max_epochs: 7,
      ..seeded(2)
    };
    let mut model = Linear::with_policy(separable(), params, Never).unwrap();
    let err = model.train().unwrap_err();
    assert!(matches!(err, ClassifierError::NonConvergence { epochs: 7, .. }));
    assert_eq!(model.accuracy_history().len(), 8);

    // a second run starts from scratch
    let _ = model.train();
    assert_eq!(model.accuracy_history().len(), 8);
  }

  #[test]
  fn test_retraining_after_reset_reproduces_seeded_run() {
    let mut model = Linear::new(separable(), seeded(21)).unwrap();
    let first = model.train().unwrap();
    let trained = model.weights().to_vec();
    model.reset(false, None).unwrap();
    let second = model.train().unwrap();
    assert_eq!(first, second);
    assert_eq!(model.weights(), &trained[..]);
  }

  #[test]
  fn test_rejects_bad_input() {
    assert!(matches!(
      Linear::new(Dataset::new(), seeded(1)),
      Err(ClassifierError::EmptyDataset)
    ));
    let ragged = vec![Example::new(vec![1.0], 0), Example::new(vec![1.0, 2.0], 1)];
    assert!(matches!(
      Linear::new(ragged, seeded(1)),
      Err(ClassifierError::RaggedRow { line: 2, .. })
    ));
    let bad = TrainingParams {
      train_fraction: 1.5,
      ..seeded(1)
    };
    assert!(matches!(
      Linear::new(separable(), bad),
      Err(ClassifierError::InvalidArgument(_))
    ));
  }

  #[test]
  fn test_display_names_source() {
    let path = std::env::temp_dir().join(format!("linclass-display-{}.csv", std::process::id()));
    std::fs::write(&path, "1,2,1\n2,1,0\n3,3,1\n0,5,0\n").unwrap();
    let model = Linear::from_path(&path, seeded(1));
    std::fs::remove_file(&path).unwrap();
    let model = model.unwrap();
    assert_eq!(
      model.to_string(),
      format!(
        "Embarrassingly simple linear classifier trained on {}",
        path.display()
      )
    );
  }
}
