pub mod error;
pub mod model;
pub mod utils;

pub use error::{ClassifierError, Result};
pub use model::{Linear, Seed, TrainReport, TrainingParams};
