//! DocForge CLI, the main entry point.
//!
//! Commands:
//! - `generate` Research, draft and render one document
//! - `serve`    Start the HTTP API
//! - `onboard`  Write a default config file
//! - `status`   Show the effective configuration

use clap::{Parser, Subcommand};
use docforge_core::ModelProvider;

mod commands;

#[derive(Parser)]
#[command(
    name = "docforge",
    about = "DocForge: research, draft and render formal documents",
    version,
    author
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate a PDF document
    Generate {
        /// Main topic of the document
        #[arg(short, long)]
        topic: String,

        /// Subtopic or focus area
        #[arg(short, long)]
        subtopic: Option<String>,

        /// Key points to cover, in order
        #[arg(short, long, num_args = 1..)]
        key_points: Vec<String>,

        /// Drafting backend (openai or anthropic)
        #[arg(short, long)]
        model: Option<ModelProvider>,

        /// Research the topic before drafting
        #[arg(short, long)]
        research: bool,

        /// Output PDF file name, written into `render.output_dir`
        #[arg(short, long)]
        output: Option<String>,
    },

    /// Start the HTTP API server
    Serve {
        /// Override the port
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Initialize configuration
    Onboard,

    /// Show effective configuration
    Status,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize tracing
    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .with_target(false)
        .init();

    match cli.command {
        Commands::Generate {
            topic,
            subtopic,
            key_points,
            model,
            research,
            output,
        } => {
            let args = commands::generate::GenerateArgs {
                topic,
                subtopic,
                key_points,
                model,
                research,
                output,
            };
            let ok = commands::generate::run(args).await?;
            if !ok {
                std::process::exit(1);
            }
        }
        Commands::Serve { port } => commands::serve::run(port).await?,
        Commands::Onboard => commands::onboard::run().await?,
        Commands::Status => commands::status::run().await?,
    }

    Ok(())
}
