use std::path::Path;

use rand::{seq::SliceRandom, Rng};
use tracing::{debug, warn};

use super::{check_train_fraction, Dataset, Example, Split};
use crate::error::{ClassifierError, Result};

/// Parses comma separated numeric rows, one example per line, class label in the last column.
/// Blank lines are skipped. There is no header row. `nan` and `inf` cells are rejected.
pub fn parse_dataset(content: &str) -> Result<Dataset> {
  let mut dataset = Dataset::new();
  let mut width: Option<usize> = None;

  for (idx, line) in content.lines().enumerate() {
    let line_no = idx + 1;
    if line.trim().is_empty() {
      continue;
    }
    let values = line
      .split(',')
      .enumerate()
      .map(|(col, raw)| {
        let raw = raw.trim();
        raw
          .parse::<f64>()
          .ok()
          .filter(|v| v.is_finite())
          .ok_or_else(|| ClassifierError::Parse {
            line: line_no,
            column: col + 1,
            value: raw.to_string(),
          })
      })
      .collect::<Result<Vec<f64>>>()?;

    match width {
      None if values.len() < 2 => return Err(ClassifierError::EmptyDataset),
      None => width = Some(values.len()),
      Some(expected) if expected != values.len() => {
        return Err(ClassifierError::RaggedRow {
          line: line_no,
          expected,
          found: values.len(),
        })
      }
      Some(_) => {}
    }

    let (label, attributes) = values.split_last().ok_or(ClassifierError::EmptyDataset)?;
    let label = match *label {
      l if l == 0.0 => 0,
      l if l == 1.0 => 1,
      value => {
        return Err(ClassifierError::InvalidLabel {
          line: line_no,
          value,
        })
      }
    };
    dataset.push(Example::new(attributes.to_vec(), label));
  }

  if dataset.is_empty() {
    return Err(ClassifierError::EmptyDataset);
  }
  Ok(dataset)
}

pub fn read_dataset(path: &Path) -> Result<Dataset> {
  let content = std::fs::read_to_string(path).map_err(|source| ClassifierError::Io {
    path: path.to_path_buf(),
    source,
  })?;
  let dataset = parse_dataset(&content)?;
  debug!("read {} examples from {:?}", dataset.len(), path);
  Ok(dataset)
}

/// Min-max scales every attribute column to [0, 1] and prepends the constant bias feature 1.0.
///
/// A column whose max equals its min has no range to scale by and is mapped to 0.0.
pub fn normalize_data(dataset: &[Example]) -> Dataset {
  let width = dataset.first().map_or(0, |ex| ex.attributes.len());
  let mut mins = vec![f64::INFINITY; width];
  let mut maxs = vec![f64::NEG_INFINITY; width];

  for ex in dataset {
    for (i, a) in ex.attributes.iter().enumerate() {
      mins[i] = mins[i].min(*a);
      maxs[i] = maxs[i].max(*a);
    }
  }

  let ranges: Vec<Option<f64>> = mins
    .iter()
    .zip(&maxs)
    .enumerate()
    .map(|(i, (min, max))| {
      let range = max - min;
      if range > 0.0 {
        Some(range)
      } else {
        warn!("attribute column {} has zero range; mapping it to 0", i + 1);
        None
      }
    })
    .collect();

  dataset
    .iter()
    .map(|ex| {
      let mut attributes = Vec::with_capacity(width + 1);
      attributes.push(1.0);
      attributes.extend(ex.attributes.iter().zip(&mins).zip(&ranges).map(
        |((a, min), range)| match range {
          Some(range) => (a - min) / range,
          None => 0.0,
        },
      ));
      Example::new(attributes, ex.label)
    })
    .collect()
}

pub fn shuffle_dataset<R: Rng + ?Sized>(dataset: &mut [Example], rng: &mut R) {
  dataset.shuffle(rng);
}

/// Splits in order: the first `fraction * n` rows (rounded half to even) train, the rest test.
/// The training subset must be non-empty; the testing subset may be empty.
pub fn split_dataset(dataset: &[Example], fraction: f64) -> Result<Split> {
  check_train_fraction(fraction)?;
  let splitting_point = (fraction * dataset.len() as f64).round_ties_even() as usize;
  if splitting_point == 0 {
    return Err(ClassifierError::InvalidArgument(format!(
      "train fraction {fraction} of {} examples leaves the training subset empty",
      dataset.len()
    )));
  }
  if splitting_point >= dataset.len() {
    warn!("no examples left for testing; test scores are undefined");
  }

  let (training, testing) = dataset.split_at(splitting_point);
  Ok(Split {
    training: training.to_vec(),
    testing: testing.to_vec(),
  })
}
