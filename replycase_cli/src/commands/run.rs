//! The `run` subcommand: harvest every family, then harmonize.

use std::path::{Path, PathBuf};

use anyhow::Result;
use clap::Args;
use replycase_lib::replycase_api::Client;
use replycase_lib::{harmonize, FamilyTable, HarvestConfig, SourceFamily};
use tokio_util::sync::CancellationToken;

use crate::commands::harmonize::{print_report, write_table};
use crate::commands::{
    cancel_on_ctrl_c, ensure_dir, harvest_family, load_config, write_export, HarvestOpts,
};
use crate::output::{self, FamilySummary, OutputFormat};

/// Arguments for the `run` subcommand.
#[derive(Args)]
pub struct RunArgs {
    #[command(flatten)]
    pub opts: HarvestOpts,

    /// Directory for the per-family JSON exports
    #[arg(long, default_value = ".")]
    pub out_dir: PathBuf,

    /// Write the harmonized table here instead of stdout; .csv/.json/.md pick the format
    #[arg(long)]
    pub out: Option<PathBuf>,
}

pub async fn run(args: &RunArgs, config_path: Option<&Path>, format: &OutputFormat) -> Result<()> {
    let config = load_config(config_path, &args.opts)?;
    ensure_dir(&args.out_dir)?;
    let client = config.client()?;
    let cancel = cancel_on_ctrl_c();
    let mut summaries = Vec::with_capacity(SourceFamily::ALL.len());

    let past = harvest_table(&config, &client, SourceFamily::Past, args, &cancel, &mut summaries).await?;
    let late = harvest_table(&config, &client, SourceFamily::Late, args, &cancel, &mut summaries).await?;
    let integ =
        harvest_table(&config, &client, SourceFamily::Integ, args, &cancel, &mut summaries).await?;

    output::write_summaries(&mut std::io::stderr().lock(), &summaries, &OutputFormat::Table)?;

    let (records, report) = harmonize(&past, &late, &integ);
    write_table(args.out.as_deref(), format, &records)?;
    print_report(&report);
    Ok(())
}

/// Harvests one family into its export file and table. Families reached
/// after an interrupt are left empty.
async fn harvest_table(
    config: &HarvestConfig,
    client: &Client,
    family: SourceFamily,
    args: &RunArgs,
    cancel: &CancellationToken,
    summaries: &mut Vec<FamilySummary>,
) -> Result<FamilyTable> {
    if cancel.is_cancelled() {
        eprintln!("Skipping {} after interrupt", family);
        return Ok(FamilyTable::new(family));
    }
    let run = harvest_family(config, client, family, false, cancel).await;
    let path = args.out_dir.join(format!("{}.json", family));
    write_export(&path, &run.records)?;
    eprintln!("Wrote {} records to {}", run.records.len(), path.display());
    summaries.push(run.summary);
    Ok(FamilyTable::from_combined(family, &run.records))
}
