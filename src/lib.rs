//! Proctor - Assessment Execution & Scoring Engine
//!
//! Proctor administers timed cognitive-assessment sessions: a sequence of
//! short games, each under a server-enforced deadline, with telemetry
//! capture, integrity monitoring, and conversion of raw trial data into
//! calibrated trait scores.
//!
//! # Architecture
//!
//! This crate follows Hexagonal Architecture principles:
//!
//! - **Domain Layer** (`domain`): models, ports, and errors
//! - **Service Layer** (`services`): orchestration, item lifecycle, scoring
//! - **Adapters** (`adapters`): SQLite persistence, HTTP API, webhook notify
//! - **Infrastructure** (`infrastructure`): configuration loading
//! - **CLI Layer** (`cli`): command-line entry points

pub mod adapters;
pub mod cli;
pub mod domain;
pub mod infrastructure;
pub mod services;

// Re-export commonly used types for convenience
pub use domain::errors::{EngineError, EngineResult};
pub use domain::models::{
    Assessment, AssessmentItem, AssessmentStatus, Config, GameScore, IntegrityEvent,
    IntegritySummary, ItemStatus, TraitScore, Trial, TrialInput,
};
pub use domain::ports::{
    AssessmentRepository, Clock, CompletionNotifier, ItemRepository, PackageLookup, SystemClock,
    TraitWeights,
};
pub use infrastructure::config::{ConfigError, ConfigLoader};
pub use services::{AssessmentOrchestrator, IntegrityMonitor, ItemLifecycle, TrialScorer};
