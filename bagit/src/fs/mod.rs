//! File system helpers for bag operations.

pub mod walker;
