//! SQLite-backed game package and trait weight lookups.
//!
//! These tables are owned by the admin collaborator; the engine only
//! reads them.

use async_trait::async_trait;
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::domain::errors::{EngineError, EngineResult};
use crate::domain::models::GamePackageEntry;
use crate::domain::ports::{PackageLookup, TraitWeights};

#[derive(Clone)]
pub struct SqlitePackageLookup {
    pool: SqlitePool,
}

impl SqlitePackageLookup {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl PackageLookup for SqlitePackageLookup {
    async fn games_for_role(&self, job_role_id: Uuid) -> EngineResult<Vec<GamePackageEntry>> {
        let rows: Vec<(String, i64, i64, String)> = sqlx::query_as(
            r#"SELECT game_code, order_index, timer_seconds, config
               FROM job_role_games WHERE job_role_id = ? ORDER BY order_index"#,
        )
        .bind(job_role_id.to_string())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|(game_code, order_index, timer_seconds, config)| {
                let config = serde_json::from_str(&config)
                    .map_err(|e| EngineError::Serialization(e.to_string()))?;
                Ok(GamePackageEntry {
                    game_code,
                    order_index: order_index as u32,
                    timer_seconds: timer_seconds as u32,
                    config,
                })
            })
            .collect()
    }
}

#[derive(Clone)]
pub struct SqliteTraitWeights {
    pool: SqlitePool,
}

impl SqliteTraitWeights {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl TraitWeights for SqliteTraitWeights {
    async fn weights_for(&self, game_code: &str) -> EngineResult<Vec<(String, f64)>> {
        let rows: Vec<(String, f64)> = sqlx::query_as(
            r#"SELECT trait_name, weight FROM game_trait_weights
               WHERE game_code = ? ORDER BY trait_name"#,
        )
        .bind(game_code)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }
}
