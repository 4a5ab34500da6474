mod cli;

use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::cli::{Cli, Commands};

// Re-export from lib for internal use
use code_assistant::{client, config, error, model, render};

use crate::config::ClientConfig;
use crate::model::{ChatRequest, SearchRequest};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "code_assistant=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    let cli = Cli::parse();
    let config = ClientConfig::from_env().with_server_path(cli.server_path.clone());

    match cli.command {
        Commands::Search {
            query,
            repos,
            languages,
            top_k,
        } => {
            cli::run_search(
                config,
                SearchRequest {
                    query,
                    repo_names: repos,
                    languages,
                    top_k,
                },
            )
            .await?;
        }
        Commands::Chat {
            message,
            repos,
            languages,
            context,
            model,
            interactive,
        } => {
            let template = ChatRequest {
                message: String::new(),
                repo_names: repos,
                languages,
                max_context_chunks: context,
                model,
            };
            cli::run_chat(config, message, template, interactive).await?;
        }
        Commands::Stats => {
            cli::run_stats(config).await?;
        }
        Commands::Ingest { repo_name, force } => {
            cli::run_ingest(config, &repo_name, force).await?;
        }
    }

    Ok(())
}
