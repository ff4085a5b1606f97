//! Harmonization of the three family tables into one canonical table.
//!
//! Each family has a fixed mapping from its source columns onto the ten
//! canonical columns. Some canonical columns concatenate several source
//! columns with a blank line between them. A mapped column that is absent
//! from a table is a warning and reads as null.

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;
use std::sync::OnceLock;

use chrono::NaiveDate;
use regex::Regex;
use replycase_api::types::SourceFamily;
use serde::Serialize;
use serde_json::Value;

use crate::error::ReplyCaseError;
use crate::model::{CombinedRecord, HarmonizedRecord};

const COMBINE_SEPARATOR: &str = "\n\n";

/// A column-oriented table of one family's records.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FamilyTable {
    pub family: SourceFamily,
    columns: BTreeMap<String, Vec<Option<String>>>,
    len: usize,
}

impl FamilyTable {
    pub fn new(family: SourceFamily) -> Self {
        Self {
            family,
            columns: BTreeMap::new(),
            len: 0,
        }
    }

    /// Builds a table from row maps. The column set is the union of all row
    /// keys; rows lacking a column hold null there.
    pub fn from_rows<I>(family: SourceFamily, rows: I) -> Self
    where
        I: IntoIterator<Item = BTreeMap<String, Option<String>>>,
    {
        let rows: Vec<_> = rows.into_iter().collect();
        let names: BTreeSet<&String> = rows.iter().flat_map(|r| r.keys()).collect();
        let columns = names
            .into_iter()
            .map(|name| {
                let values = rows
                    .iter()
                    .map(|r| r.get(name).cloned().flatten())
                    .collect();
                (name.clone(), values)
            })
            .collect();
        Self {
            family,
            columns,
            len: rows.len(),
        }
    }

    pub fn from_combined(family: SourceFamily, records: &[CombinedRecord]) -> Self {
        Self::from_rows(family, records.iter().map(CombinedRecord::to_row))
    }

    /// Reads a table exported by `harvest` from a JSON file.
    pub fn from_json_file(family: SourceFamily, path: &Path) -> Result<Self, ReplyCaseError> {
        let content = std::fs::read_to_string(path)?;
        let value: Value = serde_json::from_str(&content)?;
        Self::from_json(family, value)
    }

    /// Builds a table from a JSON array of flat objects, as written by a
    /// harvest export. Numbers and booleans become text; nested values are
    /// kept as their JSON text.
    pub fn from_json(family: SourceFamily, value: Value) -> Result<Self, ReplyCaseError> {
        let Value::Array(items) = value else {
            return Err(ReplyCaseError::InvalidInput(format!(
                "{} table must be a JSON array",
                family
            )));
        };
        let mut rows = Vec::with_capacity(items.len());
        for (i, item) in items.into_iter().enumerate() {
            let Value::Object(map) = item else {
                return Err(ReplyCaseError::InvalidInput(format!(
                    "{} row {} is not an object",
                    family, i
                )));
            };
            let row = map
                .into_iter()
                .map(|(k, v)| {
                    let text = match v {
                        Value::Null => None,
                        Value::String(s) => Some(s),
                        Value::Number(n) => Some(n.to_string()),
                        Value::Bool(b) => Some(b.to_string()),
                        other => Some(other.to_string()),
                    };
                    (k, text)
                })
                .collect();
            rows.push(row);
        }
        Ok(Self::from_rows(family, rows))
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.columns.contains_key(name)
    }

    pub fn column(&self, name: &str) -> Option<&[Option<String>]> {
        self.columns.get(name).map(Vec::as_slice)
    }

    fn value(&self, name: &str, row: usize) -> Option<&str> {
        self.columns
            .get(name)
            .and_then(|col| col.get(row))
            .and_then(|v| v.as_deref())
    }
}

/// Where one canonical column's value comes from.
#[derive(Clone, Copy, Debug)]
enum Source {
    Null,
    Column(&'static str),
    /// Non-blank values joined by a blank line.
    Combine(&'static [&'static str]),
}

impl Source {
    fn columns(&self) -> &[&'static str] {
        match self {
            Source::Null => &[],
            Source::Column(c) => std::slice::from_ref(c),
            Source::Combine(cs) => *cs,
        }
    }

    fn resolve(&self, table: &FamilyTable, row: usize) -> Option<String> {
        match self {
            Source::Null => None,
            Source::Column(c) => table.value(c, row).map(str::to_string),
            Source::Combine(cs) => combine_fields(cs.iter().map(|c| table.value(c, row))),
        }
    }
}

/// Per-family sources, in canonical column order: 구분, 분야, 제목, 회신부서,
/// 담당자, 회신일자, 일련번호, 질의요지, 회답, 이유.
struct FamilyMapping([Source; 10]);

fn mapping(family: SourceFamily) -> FamilyMapping {
    use Source::*;
    match family {
        SourceFamily::Past => FamilyMapping([
            Column("type_label"),
            Null,
            Column("title"),
            Null,
            Null,
            Column("registration_date"),
            Column("serial_number"),
            Combine(&["inquiry", "fact", "base_law"]),
            Combine(&["answer"]),
            Combine(&["reason"]),
        ]),
        SourceFamily::Late => FamilyMapping([
            Column("type_label"),
            Column("category"),
            Column("title"),
            Column("registrant"),
            Null,
            Column("reply_date"),
            Column("serial_number"),
            Column("inquiry"),
            Combine(&["answer"]),
            Combine(&["reason"]),
        ]),
        SourceFamily::Integ => FamilyMapping([
            Column("type_label"),
            Column("category_detail"),
            Column("title"),
            Column("department"),
            Null,
            Column("reply_date"),
            Column("record_id"),
            Column("proposal"),
            Combine(&["review_opinion", "review_reason"]),
            Combine(&["future_plan"]),
        ]),
    }
}

/// Joins the non-blank values with a blank line; `None` when none qualify.
pub fn combine_fields<'a, I>(values: I) -> Option<String>
where
    I: IntoIterator<Item = Option<&'a str>>,
{
    let parts: Vec<&str> = values
        .into_iter()
        .flatten()
        .filter(|v| !v.trim().is_empty())
        .collect();
    (!parts.is_empty()).then(|| parts.join(COMBINE_SEPARATOR))
}

static DATE_SEPARATED: OnceLock<Option<Regex>> = OnceLock::new();
static DATE_COMPACT: OnceLock<Option<Regex>> = OnceLock::new();

/// Parses the date formats the registry uses: `2025-03-10`, `2025.03.10`,
/// `2025. 3. 10.`, `2025/03/10`, `20250310`, `2025년 3월 10일`, each
/// optionally followed by a time. Anything else is `None`.
pub fn parse_reply_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    let separated = DATE_SEPARATED
        .get_or_init(|| {
            Regex::new(r"^(\d{4})\s*[-./년]\s*(\d{1,2})\s*[-./월]\s*(\d{1,2})(?:\s*[.일])?(?:$|[\sT])")
                .ok()
        })
        .as_ref();
    let compact = DATE_COMPACT
        .get_or_init(|| Regex::new(r"^(\d{4})(\d{2})(\d{2})(?:$|[\sT])").ok())
        .as_ref();

    let caps = separated
        .and_then(|re| re.captures(raw))
        .or_else(|| compact.and_then(|re| re.captures(raw)))?;
    let year = caps.get(1)?.as_str().parse().ok()?;
    let month = caps.get(2)?.as_str().parse().ok()?;
    let day = caps.get(3)?.as_str().parse().ok()?;
    NaiveDate::from_ymd_opt(year, month, day)
}

/// What the harmonizer noticed along the way.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct HarmonizeReport {
    pub past_rows: usize,
    pub late_rows: usize,
    pub integ_rows: usize,
    pub dated: usize,
    pub undated: usize,
    /// Mapped columns absent from their table.
    pub warnings: Vec<String>,
}

fn harmonize_table(
    table: &FamilyTable,
    report: &mut HarmonizeReport,
    out: &mut Vec<(Option<NaiveDate>, HarmonizedRecord)>,
) {
    let FamilyMapping(sources) = mapping(table.family);

    if !table.is_empty() {
        let mut missing: Vec<&str> = sources
            .iter()
            .flat_map(|s| s.columns().iter().copied())
            .filter(|c| !table.has_column(c))
            .collect();
        missing.sort_unstable();
        missing.dedup();
        for column in missing {
            let warning = format!(
                "{} table has no column {:?}; treating as empty",
                table.family, column
            );
            tracing::warn!("{}", warning);
            report.warnings.push(warning);
        }
    }

    for row in 0..table.len() {
        let [category, field, title, department, handler, reply_date, serial, inquiry, answer, reason] =
            sources.map(|s| s.resolve(table, row));
        let parsed_date = reply_date.as_deref().and_then(parse_reply_date);
        out.push((
            parsed_date,
            HarmonizedRecord {
                id: 0,
                category: category.unwrap_or_default(),
                field: field.unwrap_or_default(),
                title: title.unwrap_or_default(),
                reply_department: department.unwrap_or_default(),
                handler: handler.unwrap_or_default(),
                reply_date: parsed_date,
                serial_number: serial.unwrap_or_default(),
                inquiry_summary: inquiry.unwrap_or_default(),
                answer: answer.unwrap_or_default(),
                reason: reason.unwrap_or_default(),
            },
        ));
    }
}

/// Maps the three family tables onto the canonical table.
///
/// Rows with a parseable reply date come first, stable-sorted ascending by
/// date; undated rows follow in their original order (past, late, integ).
/// Ids run 1..N after sorting.
pub fn harmonize(
    past: &FamilyTable,
    late: &FamilyTable,
    integ: &FamilyTable,
) -> (Vec<HarmonizedRecord>, HarmonizeReport) {
    let mut report = HarmonizeReport {
        past_rows: past.len(),
        late_rows: late.len(),
        integ_rows: integ.len(),
        ..HarmonizeReport::default()
    };

    let mut rows = Vec::with_capacity(past.len() + late.len() + integ.len());
    for table in [past, late, integ] {
        harmonize_table(table, &mut report, &mut rows);
    }

    let (mut dated, undated): (Vec<_>, Vec<_>) = rows.into_iter().partition(|(d, _)| d.is_some());
    dated.sort_by_key(|(d, _)| *d);
    report.dated = dated.len();
    report.undated = undated.len();

    let records: Vec<HarmonizedRecord> = dated
        .into_iter()
        .chain(undated)
        .enumerate()
        .map(|(i, (_, mut rec))| {
            rec.id = i as u64 + 1;
            rec
        })
        .collect();

    tracing::info!(
        "Harmonized {} rows ({} dated, {} undated)",
        records.len(),
        report.dated,
        report.undated
    );
    (records, report)
}
