mod lookup;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "exammine-cli")]
#[command(about = "Exam Mine command line interface")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Look up medication information on the drug-information sources
    Info {
        /// Medication name (e.g., dipirona)
        name: String,
        /// Print the scraped record as JSON
        #[arg(long)]
        json: bool,
    },
    /// Compare medication prices across the pharmacy sources
    Prices {
        /// Medication name (e.g., paracetamol)
        name: String,
        /// Print the merged result as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show the effective source profiles
    Sources,
    /// List the models available to the configured Gemini key
    Models,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let Some(command) = cli.command else {
        println!("exammine-cli ready; run with --help to list commands");
        return Ok(());
    };

    let config = exammine_core::load_app_config()?;
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();

    match command {
        Commands::Info { name, json } => lookup::run_info(&config, &name, json).await,
        Commands::Prices { name, json } => lookup::run_prices(&config, &name, json).await,
        Commands::Sources => lookup::run_sources(&config),
        Commands::Models => lookup::run_models(&config).await,
    }
}

#[cfg(test)]
mod tests;
