//! Assessment assignment command.

use anyhow::{bail, Result};
use uuid::Uuid;

use crate::adapters::sqlite::{initialize_database, SqliteAssessmentRepository, SqlitePackageLookup};
use crate::domain::models::{config::Config, Assessment};
use crate::domain::ports::{AssessmentRepository, PackageLookup};

pub async fn execute(
    config: &Config,
    candidate_id: Uuid,
    job_role_id: Uuid,
    json: bool,
) -> Result<()> {
    let database_url = format!("sqlite:{}", config.database.path);
    let pool = initialize_database(&database_url, None).await?;

    // Refuse an assignment that could never start.
    let packages = SqlitePackageLookup::new(pool.clone());
    let games = packages.games_for_role(job_role_id).await?;
    if games.is_empty() {
        bail!("Job role {job_role_id} has no game package configured");
    }

    let assessment = Assessment::new(candidate_id, job_role_id);
    let repo = SqliteAssessmentRepository::new(pool.clone());
    repo.insert(&assessment).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&assessment)?);
    } else {
        println!(
            "Assigned assessment {} to candidate {} ({} game(s))",
            assessment.id,
            candidate_id,
            games.len()
        );
    }

    pool.close().await;
    Ok(())
}
