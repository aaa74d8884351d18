//! Command-line interface.

pub mod commands;
pub mod types;

pub use types::{Cli, Commands};

/// Print a top-level error and exit non-zero.
pub fn handle_error(err: anyhow::Error, json: bool) -> ! {
    if json {
        eprintln!("{}", serde_json::json!({ "error": err.to_string() }));
    } else {
        eprintln!("Error: {err:#}");
    }
    std::process::exit(1);
}
