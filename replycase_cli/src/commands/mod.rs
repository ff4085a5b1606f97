//! CLI subcommand implementations.

pub mod harmonize;
pub mod harvest;
pub mod run;

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use clap::Args;
use indicatif::{ProgressBar, ProgressStyle};
use replycase_lib::replycase_api::Client;
use replycase_lib::{
    CombinedRecord, DetailFetcher, HarvestConfig, Harvester, ListPager, ListingFilter,
    SourceFamily, StopReason,
};
use tokio_util::sync::CancellationToken;

use crate::output::{self, FamilySummary, OutputFormat};

/// Flags shared by `harvest` and `run`. Unset flags keep the configured value.
#[derive(Args, Debug, Default, Clone)]
pub struct HarvestOpts {
    /// Earliest registration date (YYYY-MM-DD)
    #[arg(long)]
    pub date_start: Option<String>,

    /// Latest registration date (YYYY-MM-DD, default today)
    #[arg(long)]
    pub date_end: Option<String>,

    /// Rows requested per listing page
    #[arg(long)]
    pub batch_size: Option<u64>,

    /// Stop listing after this many rows per family
    #[arg(long)]
    pub max_items: Option<u64>,

    /// Concurrent detail-page workers
    #[arg(long)]
    pub workers: Option<usize>,

    /// Minimum random delay before each request, in milliseconds
    #[arg(long)]
    pub delay_min_ms: Option<u64>,

    /// Maximum random delay before each request, in milliseconds
    #[arg(long)]
    pub delay_max_ms: Option<u64>,
}

impl HarvestOpts {
    pub fn apply(&self, config: &mut HarvestConfig) -> Result<()> {
        if let Some(ref date) = self.date_start {
            validate_date(date)?;
            config.date_start = date.clone();
        }
        if let Some(ref date) = self.date_end {
            validate_date(date)?;
            config.date_end = Some(date.clone());
        }
        if let Some(n) = self.batch_size {
            config.page_size = n;
        }
        if let Some(n) = self.max_items {
            config.max_items = Some(n);
        }
        if let Some(n) = self.workers {
            config.concurrency = n;
        }
        if let Some(ms) = self.delay_min_ms {
            config.delay_min_ms = ms;
        }
        if let Some(ms) = self.delay_max_ms {
            config.delay_max_ms = ms;
        }
        Ok(())
    }
}

fn validate_date(date: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(date, "%Y-%m-%d")
        .with_context(|| format!("invalid date {:?}, expected YYYY-MM-DD", date))
}

/// Embedded defaults, then the config file, then `REPLYCASE_*` variables,
/// then command-line flags.
pub fn load_config(path: Option<&Path>, opts: &HarvestOpts) -> Result<HarvestConfig> {
    let mut config = HarvestConfig::load(path)?;
    opts.apply(&mut config)?;
    config.validate()?;
    Ok(config)
}

/// Cancels the returned token on the first Ctrl-C.
pub fn cancel_on_ctrl_c() -> CancellationToken {
    let token = CancellationToken::new();
    let trigger = token.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            eprintln!("Interrupted, waiting for in-flight requests to finish...");
            trigger.cancel();
        }
    });
    token
}

/// Records harvested for one family plus the numbers shown to the operator.
pub struct FamilyRun {
    pub records: Vec<CombinedRecord>,
    pub summary: FamilySummary,
    pub cancelled: bool,
}

/// Lists one family and, unless `list_only`, fetches every detail page.
pub async fn harvest_family(
    config: &HarvestConfig,
    client: &Client,
    family: SourceFamily,
    list_only: bool,
    cancel: &CancellationToken,
) -> FamilyRun {
    let (min, max) = config.delay_range();
    let pager = ListPager::new(client.clone(), config.endpoints.clone())
        .with_delay(min, max)
        .with_cancellation(cancel.clone());
    let filter = ListingFilter::from_config(config);

    eprintln!("Listing {} records...", family);
    let mut listing = pager
        .list_all(family, config.page_size, config.max_items, &filter)
        .await;
    let skipped = listing.retain_types(family.record_types()) + listing.unrecognized;
    if skipped > 0 {
        tracing::info!(
            "Skipped {} {} rows of other record types",
            skipped,
            family
        );
    }

    let mut summary = FamilySummary {
        family: family.to_string(),
        listed: listing.records.len(),
        pages: listing.pages_requested,
        skipped,
        stop_reason: stop_label(&listing.stop_reason),
        ..FamilySummary::default()
    };

    if list_only || listing.records.is_empty() {
        return FamilyRun {
            records: listing
                .records
                .into_iter()
                .map(CombinedRecord::list_only)
                .collect(),
            summary,
            cancelled: cancel.is_cancelled(),
        };
    }

    let fetcher = DetailFetcher::new(client.clone(), config.endpoints.clone());
    let harvester = Harvester::from_config(fetcher, config);

    let pb = ProgressBar::new(listing.records.len() as u64);
    pb.set_style(
        ProgressStyle::with_template(
            "[{elapsed_precise}] {bar:40.cyan/blue} {pos:>7}/{len:7} ({eta}) {msg}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar()),
    );
    pb.set_message(format!("fetching {} details...", family));

    let (mut ok, mut failed) = (0usize, 0usize);
    let mut outcome = harvester
        .harvest_with_progress(listing.records, cancel.clone(), |record| {
            if record.is_failed() {
                failed += 1;
            } else {
                ok += 1;
            }
            pb.set_message(format!("{} ok, {} err", ok, failed));
            pb.inc(1);
        })
        .await;
    outcome.sort_by_sequence();

    pb.finish_with_message(format!(
        "{} done: {} ok, {} failed, {} unprocessed",
        family,
        outcome.report.succeeded,
        outcome.report.failed,
        outcome.unprocessed.len()
    ));

    summary.succeeded = outcome.report.succeeded;
    summary.failed = outcome.report.failed;
    summary.recovered_by_regex = outcome.report.recovered_by_regex;
    summary.unprocessed = outcome.unprocessed.len();

    FamilyRun {
        records: outcome.records,
        summary,
        cancelled: outcome.cancelled,
    }
}

fn stop_label(reason: &StopReason) -> String {
    match reason {
        StopReason::EmptyPage => "empty_page".to_string(),
        StopReason::ShortPage => "short_page".to_string(),
        StopReason::ReachedTotal => "reached_total".to_string(),
        StopReason::MaxItems => "max_items".to_string(),
        StopReason::Cancelled => "cancelled".to_string(),
        StopReason::Error(e) => format!("error: {}", e),
    }
}

/// Writes records as a JSON array of flat rows, the shape `harmonize` reads back.
pub fn write_export(path: &Path, records: &[CombinedRecord]) -> Result<()> {
    let rows: Vec<_> = records.iter().map(CombinedRecord::to_row).collect();
    let file = File::create(path).with_context(|| format!("creating {}", path.display()))?;
    let mut writer = BufWriter::new(file);
    output::write_json(&mut writer, &rows)?;
    writer.flush()?;
    Ok(())
}

/// Writes to `out` when given (format taken from its extension), else stdout.
pub fn emit<F>(out: Option<&Path>, format: &OutputFormat, write: F) -> Result<()>
where
    F: FnOnce(&mut dyn Write, &OutputFormat) -> Result<()>,
{
    match out {
        Some(path) => {
            let file =
                File::create(path).with_context(|| format!("creating {}", path.display()))?;
            let mut writer = BufWriter::new(file);
            write(&mut writer, &format.for_path(path))?;
            writer.flush()?;
            eprintln!("Wrote {}", path.display());
        }
        None => {
            let stdout = std::io::stdout();
            let mut lock = stdout.lock();
            write(&mut lock, format)?;
        }
    }
    Ok(())
}

pub fn ensure_dir(dir: &Path) -> Result<()> {
    if dir.exists() && !dir.is_dir() {
        bail!("{} is not a directory", dir.display());
    }
    std::fs::create_dir_all(dir).with_context(|| format!("creating {}", dir.display()))
}
