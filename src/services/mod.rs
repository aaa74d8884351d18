pub mod integrity_monitor;
pub mod item_lifecycle;
pub mod locks;
pub mod orchestrator;
pub mod timers;
pub mod trait_aggregator;
pub mod trial_scorer;

pub use integrity_monitor::{IntegrityMonitor, IntegrityReport};
pub use item_lifecycle::{ItemLifecycle, SubmitOutcome};
pub use locks::AssessmentLocks;
pub use orchestrator::AssessmentOrchestrator;
pub use timers::DeadlineTimers;
pub use trait_aggregator::{aggregate, AggregateScore};
pub use trial_scorer::TrialScorer;
