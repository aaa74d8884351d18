//! Database migration command.

use anyhow::Result;

use crate::adapters::sqlite::{all_embedded_migrations, create_pool, Migrator, PoolConfig};
use crate::domain::models::config::Config;

pub async fn execute(config: &Config, json: bool) -> Result<()> {
    let database_url = format!("sqlite:{}", config.database.path);
    let pool = create_pool(&database_url, Some(PoolConfig::default())).await?;

    let migrator = Migrator::new(pool.clone());
    let applied = migrator
        .run_embedded_migrations(all_embedded_migrations())
        .await?;
    let version = migrator.get_current_version().await?;

    if json {
        println!(
            "{}",
            serde_json::json!({ "applied": applied, "version": version })
        );
    } else if applied == 0 {
        println!("Database already at version {version}");
    } else {
        println!("Applied {applied} migration(s), now at version {version}");
    }

    pool.close().await;
    Ok(())
}
