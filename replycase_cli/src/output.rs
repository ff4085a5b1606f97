use std::io::Write;
use std::path::Path;

use anyhow::{bail, Result};
use replycase_lib::HarmonizedRecord;
use serde::Serialize;
use tabled::settings::Style;
use tabled::{Table, Tabled};

/// Longest cell shown in table and markdown views; CSV and JSON carry full text.
const PREVIEW_CHARS: usize = 40;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum OutputFormat {
    Table,
    Json,
    Csv,
    Markdown,
}

impl OutputFormat {
    pub fn from_name(name: &str) -> Result<Self> {
        match name {
            "table" => Ok(OutputFormat::Table),
            "json" => Ok(OutputFormat::Json),
            "csv" => Ok(OutputFormat::Csv),
            "markdown" | "md" => Ok(OutputFormat::Markdown),
            other => bail!("unknown output format: {}", other),
        }
    }

    /// Picks the format from a file extension, falling back to `self`.
    pub fn for_path(&self, path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some("csv") => OutputFormat::Csv,
            Some("json") => OutputFormat::Json,
            Some("md") => OutputFormat::Markdown,
            _ => self.clone(),
        }
    }
}

#[derive(Tabled)]
struct HarmonizedRow {
    #[tabled(rename = "id")]
    id: u64,
    #[tabled(rename = "구분")]
    category: String,
    #[tabled(rename = "분야")]
    field: String,
    #[tabled(rename = "제목")]
    title: String,
    #[tabled(rename = "회신부서")]
    reply_department: String,
    #[tabled(rename = "회신일자")]
    reply_date: String,
    #[tabled(rename = "일련번호")]
    serial_number: String,
    #[tabled(rename = "질의요지")]
    inquiry_summary: String,
}

fn build_harmonized_rows(records: &[HarmonizedRecord]) -> Vec<HarmonizedRow> {
    records
        .iter()
        .map(|r| HarmonizedRow {
            id: r.id,
            category: r.category.clone(),
            field: r.field.clone(),
            title: preview(&r.title),
            reply_department: r.reply_department.clone(),
            reply_date: r
                .reply_date
                .map(|d| d.format("%Y-%m-%d").to_string())
                .unwrap_or_default(),
            serial_number: r.serial_number.clone(),
            inquiry_summary: preview(&r.inquiry_summary),
        })
        .collect()
}

/// Per-family run statistics.
#[derive(Tabled, Serialize, Clone, Debug, Default, PartialEq, Eq)]
pub struct FamilySummary {
    #[tabled(rename = "Family")]
    #[serde(rename = "Family")]
    pub family: String,
    #[tabled(rename = "Listed")]
    #[serde(rename = "Listed")]
    pub listed: usize,
    #[tabled(rename = "Pages")]
    #[serde(rename = "Pages")]
    pub pages: usize,
    #[tabled(rename = "Skipped")]
    #[serde(rename = "Skipped")]
    pub skipped: usize,
    #[tabled(rename = "Stop")]
    #[serde(rename = "Stop")]
    pub stop_reason: String,
    #[tabled(rename = "Succeeded")]
    #[serde(rename = "Succeeded")]
    pub succeeded: usize,
    #[tabled(rename = "Failed")]
    #[serde(rename = "Failed")]
    pub failed: usize,
    #[tabled(rename = "Regex")]
    #[serde(rename = "Regex")]
    pub recovered_by_regex: usize,
    #[tabled(rename = "Unprocessed")]
    #[serde(rename = "Unprocessed")]
    pub unprocessed: usize,
}

pub fn write_harmonized<W: Write + ?Sized>(
    w: &mut W,
    records: &[HarmonizedRecord],
    format: &OutputFormat,
) -> Result<()> {
    match format {
        OutputFormat::Table => {
            writeln!(w, "{}", Table::new(build_harmonized_rows(records)))?;
        }
        OutputFormat::Markdown => {
            let mut table = Table::new(build_harmonized_rows(records));
            table.with(Style::markdown());
            writeln!(w, "{}", table)?;
        }
        OutputFormat::Csv => write_csv(w, records)?,
        OutputFormat::Json => write_json(w, &records)?,
    }
    Ok(())
}

pub fn write_summaries<W: Write + ?Sized>(
    w: &mut W,
    summaries: &[FamilySummary],
    format: &OutputFormat,
) -> Result<()> {
    match format {
        OutputFormat::Table => {
            writeln!(w, "{}", Table::new(summaries.iter().cloned()))?;
        }
        OutputFormat::Markdown => {
            let mut table = Table::new(summaries.iter().cloned());
            table.with(Style::markdown());
            writeln!(w, "{}", table)?;
        }
        OutputFormat::Csv => write_csv(w, summaries)?,
        OutputFormat::Json => write_json(w, &summaries)?,
    }
    Ok(())
}

fn write_csv<W: Write + ?Sized, T: Serialize>(w: &mut W, rows: &[T]) -> Result<()> {
    let mut wtr = csv::Writer::from_writer(w);
    for row in rows {
        wtr.serialize(row)?;
    }
    wtr.flush()?;
    Ok(())
}

pub fn write_json<W: Write + ?Sized, T: Serialize + ?Sized>(w: &mut W, data: &T) -> Result<()> {
    serde_json::to_writer_pretty(&mut *w, data)?;
    writeln!(w)?;
    Ok(())
}

fn preview(text: &str) -> String {
    let flat = text.replace('\n', " ");
    if flat.chars().count() <= PREVIEW_CHARS {
        return flat;
    }
    let mut cut: String = flat.chars().take(PREVIEW_CHARS).collect();
    cut.push('…');
    cut
}
