//! Domain models for the assessment engine.

pub mod assessment;
pub mod config;
pub mod integrity;
pub mod item;
pub mod package;
pub mod trial;

pub use assessment::{Assessment, AssessmentStatus};
pub use config::{Config, DatabaseConfig, HttpConfig, LoggingConfig, NotifyConfig};
pub use integrity::{IntegrityEvent, IntegrityEventKind, IntegritySummary};
pub use item::{AssessmentItem, ItemStatus};
pub use package::GamePackageEntry;
pub use trial::{GameScore, TraitScore, Trial, TrialInput};
