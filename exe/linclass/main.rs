mod app_config;

use std::{error::Error, path::PathBuf};

use app_config::AppConfig;
use clap::Parser;
use linear_classifier::{utils, ClassifierError, Linear, Seed};
use tracing::{info, Level};

/// Linear model control parameters.
#[derive(Parser, Debug)]
#[command(version, about)]
struct Cli {
  /// CSV file to operate on
  #[arg(short, long, value_name = "PATH")]
  data: Option<PathBuf>,
  /// Fraction of data to be used for training
  #[arg(short, long, value_name = "FRACTION")]
  train: Option<f64>,
  /// Minimum acceptable accuracy for training (fraction)
  #[arg(short = 'a', long, value_name = "FRACTION")]
  threshold: Option<f64>,
  /// Learning rate for weight adjustment during training
  #[arg(short, long, value_name = "RATE")]
  lr: Option<f64>,
  /// Seed for reproducibility of random initiations, or `none`
  #[arg(short, long, value_name = "INT")]
  seed: Option<Seed>,
  /// Maximum number of training epochs allowed
  #[arg(short, long = "max_epochs", value_name = "INT")]
  max_epochs: Option<usize>,
  /// Print training status after each epoch
  #[arg(short, long)]
  verbose: bool,
  /// YAML file with any of the options above
  #[arg(short, long, value_name = "PATH")]
  config: Option<PathBuf>,
}

impl Cli {
  fn overrides(&self) -> AppConfig {
    AppConfig {
      data: self.data.clone(),
      train: self.train,
      threshold: self.threshold,
      lr: self.lr,
      seed: self.seed,
      max_epochs: self.max_epochs,
      verbose: self.verbose.then_some(true),
    }
  }

  fn resolve(&self) -> Result<AppConfig, Box<dyn Error>> {
    let mut config = AppConfig::cli_defaults();
    if let Some(path) = &self.config {
      config = config.merge(AppConfig::from_file(path)?);
    }
    Ok(config.merge(self.overrides()))
  }
}

fn main() -> Result<(), Box<dyn Error>> {
  let args = Cli::parse();
  let config = args.resolve()?;

  let level = if config.verbose == Some(true) {
    Level::INFO
  } else {
    Level::WARN
  };
  utils::init_logging(level)?;

  let (data, params) = config.into_params()?;
  let mut model = Linear::from_path(&data, params)?;
  info!("{}", model);

  match model.train() {
    Ok(report) => {
      println!("Final accuracy on training data: {}%", report.train.accuracy);
      match report.test {
        Some(test) => println!("Accuracy on testing data: {}%", test.accuracy),
        None => println!("Accuracy on testing data: n/a (no testing examples)"),
      }
      Ok(())
    }
    Err(e @ ClassifierError::NonConvergence { .. }) => {
      eprintln!("{}", e);
      std::process::exit(1);
    }
    Err(e) => Err(e.into()),
  }
}
