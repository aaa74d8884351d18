//! Domain errors for the assessment engine.

use thiserror::Error;
use uuid::Uuid;

/// Engine-level errors surfaced by services and adapters.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Missing or invalid identity")]
    Unauthorized,

    #[error("Subject {0} is not permitted to act on this assessment")]
    Forbidden(Uuid),

    #[error("Assessment not found: {0}")]
    AssessmentNotFound(Uuid),

    #[error("Assessment item not found: {0}")]
    ItemNotFound(Uuid),

    #[error("Already started: {id}")]
    AlreadyStarted { id: Uuid },

    #[error("Item {id} is not the current item for its assessment")]
    NotCurrentItem { id: Uuid },

    #[error("Invalid {entity} state for {action}: currently {status}")]
    InvalidState {
        entity: &'static str,
        action: &'static str,
        status: String,
    },

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Dependency unavailable: {0}")]
    DependencyUnavailable(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

pub type EngineResult<T> = Result<T, EngineError>;

impl From<sqlx::Error> for EngineError {
    fn from(err: sqlx::Error) -> Self {
        EngineError::Database(err.to_string())
    }
}

impl From<serde_json::Error> for EngineError {
    fn from(err: serde_json::Error) -> Self {
        EngineError::Serialization(err.to_string())
    }
}
