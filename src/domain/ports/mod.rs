//! Ports (trait boundaries) between the engine and its collaborators.

pub mod assessment_repository;
pub mod clock;
pub mod item_repository;
pub mod notifier;
pub mod package_lookup;
pub mod trait_weights;

pub use assessment_repository::AssessmentRepository;
pub use clock::{Clock, ManualClock, SystemClock};
pub use item_repository::ItemRepository;
pub use notifier::{CompletionNotifier, NullNotifier};
pub use package_lookup::PackageLookup;
pub use trait_weights::TraitWeights;
