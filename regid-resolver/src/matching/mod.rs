//! Fuzzy company-name matching
//!
//! normalizer → similarity → matcher. All three are pure functions of their
//! inputs and configuration.

pub mod matcher;
pub mod normalizer;
pub mod similarity;

pub use matcher::Matcher;
