pub mod inference;
pub mod linear;
pub mod policy;
pub mod scoring;
pub mod types;
pub mod utils;

pub use inference::*;
pub use linear::*;
pub use policy::*;
pub use scoring::*;
pub use types::*;
pub use utils::*;
