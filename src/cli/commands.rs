use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, Subcommand};
use indicatif::ProgressBar;

use crate::client::RpcClient;
use crate::config::ClientConfig;
use crate::error::Result;
use crate::model::{ChatRequest, SearchRequest};
use crate::render;

#[derive(Parser)]
#[command(name = "code-assistant")]
#[command(about = "CLI assistant for code exploration using RAG and MCP")]
#[command(version)]
#[command(after_long_help = r#"
EXAMPLES:
    # Search for code semantically
    code-assistant search "jwt token validation"

    # Restrict a search to one repository and language
    code-assistant search "retry logic" --repos backend --languages rust

    # Ask a one-off question about the codebase
    code-assistant chat "How does authentication work?"

    # Interactive chat session
    code-assistant chat --interactive

    # Show index statistics
    code-assistant stats

    # Re-ingest a repository from scratch
    code-assistant ingest backend --force
"#)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Working directory of the MCP server
    #[arg(long, short = 's')]
    pub server_path: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Search for code using semantic similarity
    Search {
        /// Search query
        query: String,

        /// Filter by repository names
        #[arg(long, short = 'r', num_args = 1..)]
        repos: Option<Vec<String>>,

        /// Filter by programming languages
        #[arg(long, short = 'l', num_args = 1..)]
        languages: Option<Vec<String>>,

        /// Number of results to return
        #[arg(long, short = 'k')]
        top_k: Option<usize>,
    },

    /// Chat with AI about your codebase
    Chat {
        /// Initial message (omit to start interactive mode)
        message: Option<String>,

        /// Filter by repository names
        #[arg(long, short = 'r', num_args = 1..)]
        repos: Option<Vec<String>>,

        /// Filter by programming languages
        #[arg(long, short = 'l', num_args = 1..)]
        languages: Option<Vec<String>>,

        /// Maximum context chunks
        #[arg(long, short = 'c')]
        context: Option<usize>,

        /// Model to use
        #[arg(long, short = 'm')]
        model: Option<String>,

        /// Start interactive chat mode
        #[arg(long, short = 'i')]
        interactive: bool,
    },

    /// Show repository statistics
    Stats,

    /// Trigger repository ingestion
    Ingest {
        /// Repository name to ingest
        repo_name: String,

        /// Force full re-indexing
        #[arg(long, short = 'f')]
        force: bool,
    },
}

pub async fn run_search(config: ClientConfig, request: SearchRequest) -> Result<()> {
    let mut client = RpcClient::new(config);

    let spinner = spinner("Connecting to code search server...");
    let outcome = async {
        client.connect().await?;
        spinner.set_message("Searching code...");
        client.search(&request).await
    }
    .await;
    spinner.finish_and_clear();

    let disconnect = client.disconnect().await;
    let results = outcome?;
    disconnect?;

    println!("{}", render::render_matches(&results));
    Ok(())
}

pub async fn run_chat(
    config: ClientConfig,
    message: Option<String>,
    template: ChatRequest,
    interactive: bool,
) -> Result<()> {
    let mut client = RpcClient::new(config);

    let spinner = spinner("Connecting to code search server...");
    let connected = client.connect().await;
    spinner.finish_and_clear();
    if let Err(e) = connected {
        let _ = client.disconnect().await;
        return Err(e);
    }

    let outcome = match (interactive, message) {
        (false, Some(message)) => {
            let request = ChatRequest { message, ..template };
            send_message(&client, &request).await
        }
        _ => interactive_chat(&client, &template).await,
    };

    let disconnect = client.disconnect().await;
    outcome?;
    disconnect?;
    Ok(())
}

pub async fn run_stats(config: ClientConfig) -> Result<()> {
    let mut client = RpcClient::new(config);

    let spinner = spinner("Connecting to code search server...");
    let outcome = async {
        client.connect().await?;
        spinner.set_message("Getting repository statistics...");
        client.stats().await
    }
    .await;
    spinner.finish_and_clear();

    let disconnect = client.disconnect().await;
    let stats = outcome?;
    disconnect?;

    println!("{}", render::render_stats(&stats));
    Ok(())
}

pub async fn run_ingest(config: ClientConfig, repo_name: &str, force: bool) -> Result<()> {
    let mut client = RpcClient::new(config);

    let spinner = spinner("Connecting to code search server...");
    let outcome = async {
        client.connect().await?;
        spinner.set_message(format!("Ingesting repository: {repo_name}..."));
        client.ingest(repo_name, force).await
    }
    .await;
    spinner.finish_and_clear();

    let disconnect = client.disconnect().await;
    let status = outcome?;
    disconnect?;

    println!("{status}");
    Ok(())
}

async fn send_message(client: &RpcClient, request: &ChatRequest) -> Result<()> {
    let spinner = spinner("Waiting for the assistant...");
    let answer = client.chat(request).await;
    spinner.finish_and_clear();

    let answer = answer?;
    println!("{}", render::render_chat_answer(&answer));
    Ok(())
}

async fn interactive_chat(client: &RpcClient, template: &ChatRequest) -> Result<()> {
    println!("Interactive chat mode. Type \"exit\" to quit.\n");

    let stdin = io::stdin();
    loop {
        print!("You: ");
        io::stdout().flush()?;

        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            break;
        }
        let message = line.trim();
        if message.is_empty() {
            continue;
        }
        if message.eq_ignore_ascii_case("exit") {
            println!("Goodbye!");
            break;
        }

        let request = ChatRequest {
            message: message.to_string(),
            ..template.clone()
        };

        let spinner = spinner("Waiting for the assistant...");
        let answer = client.chat(&request).await;
        spinner.finish_and_clear();

        // One failed turn should not end the session
        match answer {
            Ok(answer) => println!("{}", render::render_chat_answer(&answer)),
            Err(e) => eprintln!("Error: {e}"),
        }
    }

    Ok(())
}

fn spinner(message: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_message(message.to_string());
    pb.enable_steady_tick(Duration::from_millis(100));
    pb
}
