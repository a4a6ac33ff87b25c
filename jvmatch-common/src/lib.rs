//! # jvmatch Common Library
//!
//! Shared code for the jvmatch enrichment services:
//! - Error and result types
//! - Configuration file resolution and TOML loading

pub mod config;
pub mod error;

pub use error::{Error, Result};
