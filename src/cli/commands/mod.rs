//! CLI command handlers.

pub mod assign;
pub mod migrate;
pub mod serve;
