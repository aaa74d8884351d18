//! CLI type definitions
//!
//! This module contains clap command structures that define the CLI interface.

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use uuid::Uuid;

#[derive(Parser)]
#[command(name = "proctor")]
#[command(about = "Proctor - Assessment Execution & Scoring Engine", long_about = None)]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Path to a configuration file (overrides the default lookup)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Output in JSON format
    #[arg(short, long, global = true)]
    pub json: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run database migrations and exit
    Migrate,

    /// Start the assessment HTTP server
    Serve {
        /// Override the configured listen port
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Assign a new assessment to a candidate for a job role
    Assign {
        /// Candidate subject ID
        candidate_id: Uuid,

        /// Job role ID whose game package the assessment will run
        job_role_id: Uuid,
    },
}
