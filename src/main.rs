//! Proctor CLI entry point.

use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use proctor::cli::{Cli, Commands};
use proctor::infrastructure::config::ConfigLoader;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config = match cli.config.as_ref() {
        Some(path) => ConfigLoader::load_from_file(path),
        None => ConfigLoader::load(),
    };
    let config = match config {
        Ok(config) => config,
        Err(err) => proctor::cli::handle_error(err, cli.json),
    };

    init_tracing(&config.logging.level, &config.logging.format);

    let result = match cli.command {
        Commands::Migrate => proctor::cli::commands::migrate::execute(&config, cli.json).await,
        Commands::Serve { port } => proctor::cli::commands::serve::execute(&config, port).await,
        Commands::Assign {
            candidate_id,
            job_role_id,
        } => {
            proctor::cli::commands::assign::execute(&config, candidate_id, job_role_id, cli.json)
                .await
        }
    };

    if let Err(err) = result {
        proctor::cli::handle_error(err, cli.json);
    }
}

fn init_tracing(level: &str, format: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let registry = tracing_subscriber::registry().with(filter);

    if format == "json" {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(std::io::stderr),
            )
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}
