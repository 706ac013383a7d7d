//! # regid Common Library
//!
//! Shared code for the regid crates:
//! - Error and result types
//! - Canonical registry identifier (CNPJ)
//! - Configuration file resolution and TOML loading

pub mod config;
pub mod error;
pub mod identifier;

pub use error::{Error, Result};
pub use identifier::Cnpj;
