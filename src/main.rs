//! Poliscope CLI - main entry point
//!
//! Command-line interface for the citizen assistant pipeline.

use clap::{Parser, Subcommand};
use std::net::SocketAddr;
use std::time::Instant;
use tracing_subscriber::EnvFilter;

use poliscope::{commands, config::Config, metrics};
use tracing::warn;

#[derive(Parser)]
#[command(name = "poliscope")]
#[command(about = "Citizen assistant over French political open data", long_about = None)]
#[command(version)]
struct Cli {
    /// Address to expose Prometheus metrics (e.g., 0.0.0.0:9898)
    #[arg(long, env = "METRICS_ADDR")]
    metrics_addr: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Ask a civic question and get a sourced answer
    Ask {
        /// The question, quoted
        question: String,

        /// OpenAI model to use
        #[arg(short, long)]
        model: Option<String>,
    },

    /// Print the retrieved context for a query, without the model call
    Context {
        /// The query, quoted
        query: String,
    },

    /// Show dataset and index statistics
    Stats,
}

impl Commands {
    fn name(&self) -> &'static str {
        match self {
            Commands::Ask { .. } => "ask",
            Commands::Context { .. } => "context",
            Commands::Stats => "stats",
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env for local development
    let _ = dotenvy::dotenv();

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("poliscope=info".parse()?))
        .init();

    let cli = Cli::parse();

    if let Some(addr) = cli.metrics_addr.as_deref() {
        match addr.parse::<SocketAddr>() {
            Ok(socket) => metrics::spawn_metrics_server(socket),
            Err(err) => warn!(%addr, "Invalid metrics address: {}", err),
        }
    }

    let command_name = cli.command.name();
    metrics::record_command_start(command_name);
    let start = Instant::now();

    let result = execute_command(cli.command).await;

    metrics::record_command_result(command_name, start.elapsed(), result.is_ok());

    result
}

async fn execute_command(command: Commands) -> anyhow::Result<()> {
    match command {
        Commands::Ask { question, model } => {
            let answer = commands::ask::run(&question, model).await?;
            println!("{}", answer);
        }
        Commands::Context { query } => {
            let context = commands::context::run(&query).await?;
            println!("{}", context);
        }
        Commands::Stats => {
            let config = Config::new();
            let stats = commands::stats::run(&config).await?;
            println!("Députés : {}", stats.deputies);
            println!("Sénateurs : {}", stats.senators);
            println!("Partis : {}", stats.parties);
            println!("Dossiers législatifs : {}", stats.dossiers);
            println!("Scrutins : {}", stats.vote_events);
            match (stats.vector_points, stats.vector_dimension) {
                (Some(points), Some(dimension)) => {
                    println!(
                        "Index sémantique : {} points ({} dimensions)",
                        points, dimension
                    );
                }
                _ => println!("Index sémantique : non configuré"),
            }
        }
    }

    Ok(())
}
