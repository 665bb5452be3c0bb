//! BagIt Library
//!
//! Packages directories into BagIt bags and verifies their completeness and
//! checksums.

pub mod bag;
pub mod bagger;
pub mod checksum;
pub mod config;
pub mod fs;
pub mod utils;
pub mod validate;

// Re-export commonly used types
pub use bag::{Bag, FetchItem, Manifest, Version};
pub use bagger::{BagOptions, BagOutcome, Bagger};
pub use checksum::Algorithm;
pub use config::Config;
pub use utils::errors::BagError;
pub use validate::{check_complete, check_valid, is_complete, is_valid, CheckReport, Violation};
pub type Result<T> = std::result::Result<T, BagError>;
