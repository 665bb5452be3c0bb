//! Utility modules for bag tooling.

pub mod errors;
pub mod logger;

pub use errors::{BagError, BagStep, IoContext, Result, StepContext};
