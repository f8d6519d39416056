pub mod error;
pub mod model;

pub use error::PageError;
pub use model::{Batch, Record};
