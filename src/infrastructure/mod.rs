//! Infrastructure layer module
//!
//! Cross-cutting infrastructure that is not a domain adapter:
//! configuration loading and validation.

pub mod config;
