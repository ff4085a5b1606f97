mod commands;
mod output;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::filter::{Directive, EnvFilter};

use crate::output::OutputFormat;

#[derive(Parser)]
#[command(name = "replycase")]
#[command(about = "Harvest and harmonize published regulatory reply cases")]
struct Cli {
    /// Output format: table, json, csv or markdown
    #[arg(long, default_value = "table", global = true)]
    output: String,

    /// TOML file layered over the built-in configuration
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List one source family and fetch its detail pages
    Harvest(commands::harvest::HarvestArgs),
    /// Merge three family exports into the harmonized table
    Harmonize(commands::harmonize::HarmonizeArgs),
    /// Harvest every family, then harmonize
    Run(commands::run::RunArgs),
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let mut filter = EnvFilter::from_default_env();
    if let Ok(directive) = "replycase=info".parse::<Directive>() {
        filter = filter.add_directive(directive);
    }
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let format = OutputFormat::from_name(&cli.output)?;
    let config_path = cli.config.as_deref();

    match &cli.command {
        Commands::Harvest(args) => commands::harvest::run(args, config_path, &format).await?,
        Commands::Harmonize(args) => commands::harmonize::run(args, &format)?,
        Commands::Run(args) => commands::run::run(args, config_path, &format).await?,
    }

    Ok(())
}
