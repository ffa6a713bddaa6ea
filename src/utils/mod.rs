// Utility functions
pub mod duplicates;
pub mod error;

pub use duplicates::*;
pub use error::*;
