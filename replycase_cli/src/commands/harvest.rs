//! The `harvest` subcommand: list one family and fetch its detail pages.

use std::path::{Path, PathBuf};

use anyhow::Result;
use clap::Args;
use replycase_lib::SourceFamily;

use crate::commands::{cancel_on_ctrl_c, harvest_family, load_config, write_export, HarvestOpts};
use crate::output::{self, OutputFormat};

/// Arguments for the `harvest` subcommand.
#[derive(Args)]
pub struct HarvestArgs {
    /// Source family: past, late or integ
    #[arg(long)]
    pub family: SourceFamily,

    #[command(flatten)]
    pub opts: HarvestOpts,

    /// List records without fetching detail pages
    #[arg(long)]
    pub list_only: bool,

    /// JSON export path (default: <family>.json)
    #[arg(long)]
    pub out: Option<PathBuf>,
}

pub async fn run(args: &HarvestArgs, config_path: Option<&Path>, format: &OutputFormat) -> Result<()> {
    let config = load_config(config_path, &args.opts)?;
    let client = config.client()?;
    let cancel = cancel_on_ctrl_c();

    let run = harvest_family(&config, &client, args.family, args.list_only, &cancel).await;

    let out = args
        .out
        .clone()
        .unwrap_or_else(|| PathBuf::from(format!("{}.json", args.family)));
    write_export(&out, &run.records)?;
    eprintln!("Wrote {} records to {}", run.records.len(), out.display());
    if run.cancelled {
        eprintln!(
            "Harvest was interrupted; {} records were not processed",
            run.summary.unprocessed
        );
    }

    output::write_summaries(&mut std::io::stdout().lock(), &[run.summary], format)?;
    Ok(())
}
