//! The `harmonize` subcommand: merge three family exports into one table.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Args;
use replycase_lib::{harmonize, FamilyTable, HarmonizeReport, HarmonizedRecord, SourceFamily};

use crate::commands::emit;
use crate::output::{self, OutputFormat};

/// Arguments for the `harmonize` subcommand.
#[derive(Args)]
pub struct HarmonizeArgs {
    /// Export of the past family
    #[arg(long, default_value = "past.json")]
    pub past: PathBuf,

    /// Export of the late family
    #[arg(long, default_value = "late.json")]
    pub late: PathBuf,

    /// Export of the integ family
    #[arg(long, default_value = "integ.json")]
    pub integ: PathBuf,

    /// Write the harmonized table here instead of stdout; .csv/.json/.md pick the format
    #[arg(long)]
    pub out: Option<PathBuf>,
}

pub fn run(args: &HarmonizeArgs, format: &OutputFormat) -> Result<()> {
    let past = load_table(SourceFamily::Past, &args.past)?;
    let late = load_table(SourceFamily::Late, &args.late)?;
    let integ = load_table(SourceFamily::Integ, &args.integ)?;

    let (records, report) = harmonize(&past, &late, &integ);
    write_table(args.out.as_deref(), format, &records)?;
    print_report(&report);
    Ok(())
}

pub fn load_table(family: SourceFamily, path: &Path) -> Result<FamilyTable> {
    let table = FamilyTable::from_json_file(family, path)
        .with_context(|| format!("loading {} table from {}", family, path.display()))?;
    Ok(table)
}

pub fn write_table(out: Option<&Path>, format: &OutputFormat, records: &[HarmonizedRecord]) -> Result<()> {
    emit(out, format, |w, f| output::write_harmonized(w, records, f))
}

pub fn print_report(report: &HarmonizeReport) {
    eprintln!(
        "Harmonized {} rows (past {}, late {}, integ {}): {} dated, {} undated",
        report.past_rows + report.late_rows + report.integ_rows,
        report.past_rows,
        report.late_rows,
        report.integ_rows,
        report.dated,
        report.undated
    );
    for warning in &report.warnings {
        eprintln!("  Warning: {}", warning);
    }
}
