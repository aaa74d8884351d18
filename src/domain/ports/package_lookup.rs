use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::errors::EngineResult;
use crate::domain::models::GamePackageEntry;

/// Job-role-to-game-package lookup (external collaborator).
///
/// Returns the ordered game list with per-item configuration from which
/// an assessment's items are materialized at start.
#[async_trait]
pub trait PackageLookup: Send + Sync {
    async fn games_for_role(&self, job_role_id: Uuid) -> EngineResult<Vec<GamePackageEntry>>;
}
