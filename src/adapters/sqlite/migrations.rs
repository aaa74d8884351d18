//! Embedded schema migrations.
//!
//! Migrations ship inside the binary and are applied in version order,
//! each inside its own transaction, with the applied set tracked in a
//! `schema_migrations` table.

use sqlx::SqlitePool;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum MigrationError {
    #[error("Migration {version} failed: {source}")]
    Apply {
        version: i64,
        #[source]
        source: sqlx::Error,
    },
    #[error("Failed to read schema version: {0}")]
    VersionCheck(#[source] sqlx::Error),
}

/// One versioned schema change, embedded at compile time.
#[derive(Debug, Clone, Copy)]
pub struct Migration {
    pub version: i64,
    pub description: &'static str,
    pub sql: &'static str,
}

pub fn all_embedded_migrations() -> Vec<Migration> {
    vec![Migration {
        version: 1,
        description: "initial schema",
        sql: include_str!("../../../migrations/001_initial_schema.sql"),
    }]
}

pub struct Migrator {
    pool: SqlitePool,
}

impl Migrator {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Apply every migration newer than the recorded schema version.
    /// Returns the number applied. `migrations` must be in ascending
    /// version order.
    pub async fn run_embedded_migrations(
        &self,
        migrations: Vec<Migration>,
    ) -> Result<usize, MigrationError> {
        self.ensure_version_table().await?;
        let current = self.get_current_version().await?;

        let mut applied = 0;
        for migration in migrations {
            if migration.version > current {
                self.apply(&migration).await?;
                applied += 1;
            }
        }
        Ok(applied)
    }

    pub async fn get_current_version(&self) -> Result<i64, MigrationError> {
        let (version,): (i64,) =
            sqlx::query_as("SELECT COALESCE(MAX(version), 0) FROM schema_migrations")
                .fetch_one(&self.pool)
                .await
                .map_err(MigrationError::VersionCheck)?;
        Ok(version)
    }

    async fn ensure_version_table(&self) -> Result<(), MigrationError> {
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS schema_migrations (
                version INTEGER PRIMARY KEY,
                description TEXT NOT NULL,
                applied_at TEXT NOT NULL DEFAULT (datetime('now'))
            )",
        )
        .execute(&self.pool)
        .await
        .map_err(MigrationError::VersionCheck)?;
        Ok(())
    }

    /// The schema change and its version row commit or roll back
    /// together.
    async fn apply(&self, migration: &Migration) -> Result<(), MigrationError> {
        let mut tx = self.pool.begin().await.map_err(|e| MigrationError::Apply {
            version: migration.version,
            source: e,
        })?;

        sqlx::raw_sql(migration.sql)
            .execute(&mut *tx)
            .await
            .map_err(|e| MigrationError::Apply {
                version: migration.version,
                source: e,
            })?;

        sqlx::query("INSERT INTO schema_migrations (version, description) VALUES (?, ?)")
            .bind(migration.version)
            .bind(migration.description)
            .execute(&mut *tx)
            .await
            .map_err(|e| MigrationError::Apply {
                version: migration.version,
                source: e,
            })?;

        tx.commit().await.map_err(|e| MigrationError::Apply {
            version: migration.version,
            source: e,
        })
    }
}
