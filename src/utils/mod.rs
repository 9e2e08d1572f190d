// Utility functions
pub mod error;
pub mod otp;
pub mod validation;

pub use error::*;
pub use validation::*;
