use async_trait::async_trait;

use crate::domain::errors::EngineResult;

/// Trait→weight mapping per game (injected capability).
///
/// The trial scorer is otherwise pure; when this lookup fails it
/// degrades to a single synthetic accuracy trait rather than aborting.
#[async_trait]
pub trait TraitWeights: Send + Sync {
    async fn weights_for(&self, game_code: &str) -> EngineResult<Vec<(String, f64)>>;
}
