//! Test utilities for the corax crates.
//!
//! - Synthetic data generation: sorted id sets and random documents
//! - Naive reference implementations of the set algebra the query layer performs

pub mod data_gen;
pub mod reference;
