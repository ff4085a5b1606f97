//! Labeled-value extraction from detail pages.
//!
//! Detail pages lay their fields out as `<th>label</th><td>value</td>` rows,
//! but the exact markup drifts between record types and page generations.
//! [`FieldExtractor`] runs an ordered list of [`ExtractionStrategy`]s and
//! stops at the first hit. The last strategy works on the raw source with
//! regular expressions and is reported separately as recovery.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, OnceLock};

use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use serde::{Deserialize, Serialize};

use crate::text;

static HWPJSON_ATTR: OnceLock<Option<Regex>> = OnceLock::new();

/// A parsed detail page plus the cleaned source it was parsed from.
pub struct PageModel {
    document: Html,
    source: String,
}

impl PageModel {
    /// Parses a detail page. Embedded `data-hwpjson` attributes (editor
    /// state, often hundreds of kilobytes) are removed first.
    pub fn parse(raw: &str) -> Self {
        let source = strip_hwpjson(raw);
        let document = Html::parse_document(&source);
        Self { document, source }
    }

    pub fn document(&self) -> &Html {
        &self.document
    }

    /// Page source after attribute stripping.
    pub fn source(&self) -> &str {
        &self.source
    }

    fn select(&self, css: &str) -> Vec<ElementRef<'_>> {
        match Selector::parse(css) {
            Ok(sel) => self.document.select(&sel).collect(),
            Err(_) => Vec::new(),
        }
    }

    /// Value of the first label cell accepted by `is_label` that has a value
    /// cell after it. The value cell is the next `td` in document order.
    fn value_after<F>(&self, candidates: &[ElementRef<'_>], is_label: F) -> Option<String>
    where
        F: Fn(&ElementRef<'_>) -> bool,
    {
        let cells = self.select("th, td");
        for label in candidates.iter().filter(|c| is_label(c)) {
            let position = cells.iter().position(|c| c.id() == label.id());
            let value = position.and_then(|pos| {
                cells[pos + 1..]
                    .iter()
                    .find(|c| c.value().name() == "td")
            });
            if let Some(td) = value {
                return Some(cell_text(td));
            }
        }
        None
    }
}

fn strip_hwpjson(raw: &str) -> String {
    if !raw.contains("data-hwpjson") {
        return raw.to_string();
    }
    match HWPJSON_ATTR.get_or_init(|| Regex::new(r#"data-hwpjson="[^"]*""#).ok()) {
        Some(re) => re.replace_all(raw, "").into_owned(),
        None => raw.to_string(),
    }
}

/// Normalized text of a value cell, entities decoded.
fn cell_text(cell: &ElementRef<'_>) -> String {
    text::decode_entities(&text::normalize(&cell.html()))
}

/// Text of the cell's own text children, ignoring nested elements.
fn own_text(cell: &ElementRef<'_>) -> String {
    cell.children()
        .filter_map(|node| node.value().as_text())
        .map(|t| &**t)
        .collect::<String>()
        .trim()
        .to_string()
}

/// All descendant text of the cell.
fn full_text(cell: &ElementRef<'_>) -> String {
    cell.text().collect::<String>().trim().to_string()
}

/// Whether a match came from the parsed document or from regex recovery.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchKind {
    Structural,
    Recovery,
}

/// One way of locating a labeled value on a page.
pub trait ExtractionStrategy: Send + Sync {
    fn name(&self) -> &'static str;

    fn kind(&self) -> MatchKind {
        MatchKind::Structural
    }

    fn find(&self, page: &PageModel, label: &str) -> Option<String>;
}

/// Label cell whose own text equals the label.
pub struct ExactLabel;

impl ExtractionStrategy for ExactLabel {
    fn name(&self) -> &'static str {
        "exact_label"
    }

    fn find(&self, page: &PageModel, label: &str) -> Option<String> {
        let headers = page.select("th");
        page.value_after(&headers, |th| own_text(th) == label)
    }
}

/// Label cell whose own text contains the label.
pub struct ContainsLabel;

impl ExtractionStrategy for ContainsLabel {
    fn name(&self) -> &'static str {
        "contains_label"
    }

    fn find(&self, page: &PageModel, label: &str) -> Option<String> {
        let headers = page.select("th");
        page.value_after(&headers, |th| own_text(th).contains(label))
    }
}

/// Row-header cells (`scope="row"`), plain or with one of the
/// presentational classes the registry uses for highlighted rows.
pub struct RowHeaderScoped {
    classes: Vec<&'static str>,
}

impl Default for RowHeaderScoped {
    fn default() -> Self {
        Self {
            classes: vec!["", "bc-blue", "bc-yellow"],
        }
    }
}

impl ExtractionStrategy for RowHeaderScoped {
    fn name(&self) -> &'static str {
        "row_header_scoped"
    }

    fn find(&self, page: &PageModel, label: &str) -> Option<String> {
        self.classes.iter().find_map(|class| {
            let css = if class.is_empty() {
                r#"th[scope="row"]"#.to_string()
            } else {
                format!(r#"th[scope="row"].{}"#, class)
            };
            let headers = page.select(&css);
            page.value_after(&headers, |th| full_text(th) == label)
        })
    }
}

/// Every label cell, compared on its full descendant text.
pub struct ExhaustiveScan;

impl ExtractionStrategy for ExhaustiveScan {
    fn name(&self) -> &'static str {
        "exhaustive_scan"
    }

    fn find(&self, page: &PageModel, label: &str) -> Option<String> {
        let headers = page.select("th");
        page.value_after(&headers, |th| full_text(th) == label)
    }
}

/// Regular expressions over the raw source: `th`/`td` adjacency,
/// `div`/`div` adjacency, then a loose `label : value` form.
///
/// Patterns are compiled once per label and kept for the life of the
/// strategy, which the harvester shares across workers.
#[derive(Default)]
pub struct RegexRecovery {
    compiled: Mutex<HashMap<String, Arc<[Regex]>>>,
}

impl RegexRecovery {
    fn patterns(label: &str) -> Vec<String> {
        let label = regex::escape(label);
        vec![
            format!(r"(?is)<th[^>]*>\s*{}\s*</th>\s*<td[^>]*>(.*?)</td>", label),
            format!(r"(?is)<div[^>]*>\s*{}\s*</div>\s*<div[^>]*>(.*?)</div>", label),
            format!(r"(?s){}\s*[:：]\s*([^<]*)", label),
        ]
    }

    fn compile(label: &str) -> Arc<[Regex]> {
        Self::patterns(label)
            .iter()
            .filter_map(|p| Regex::new(p).ok())
            .collect()
    }

    fn regexes(&self, label: &str) -> Arc<[Regex]> {
        let Ok(mut compiled) = self.compiled.lock() else {
            return Self::compile(label);
        };
        compiled
            .entry(label.to_string())
            .or_insert_with(|| Self::compile(label))
            .clone()
    }

    /// Number of labels with compiled patterns.
    pub fn cached_labels(&self) -> usize {
        self.compiled.lock().map(|c| c.len()).unwrap_or(0)
    }
}

impl ExtractionStrategy for RegexRecovery {
    fn name(&self) -> &'static str {
        "regex_recovery"
    }

    fn kind(&self) -> MatchKind {
        MatchKind::Recovery
    }

    fn find(&self, page: &PageModel, label: &str) -> Option<String> {
        self.regexes(label).iter().find_map(|re| {
            let captured = re.captures(page.source())?.get(1)?.as_str();
            let value = text::decode_entities(&text::normalize(captured));
            (!value.is_empty()).then_some(value)
        })
    }
}

/// A located value and the strategy that found it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FieldMatch {
    pub value: String,
    pub strategy: &'static str,
    pub kind: MatchKind,
}

/// Runs extraction strategies in order, short-circuiting on the first hit.
pub struct FieldExtractor {
    strategies: Vec<Box<dyn ExtractionStrategy>>,
}

impl Default for FieldExtractor {
    fn default() -> Self {
        Self::with_strategies(vec![
            Box::new(ExactLabel),
            Box::new(ContainsLabel),
            Box::new(RowHeaderScoped::default()),
            Box::new(ExhaustiveScan),
            Box::new(RegexRecovery::default()),
        ])
    }
}

impl FieldExtractor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_strategies(strategies: Vec<Box<dyn ExtractionStrategy>>) -> Self {
        Self { strategies }
    }

    pub fn strategy_names(&self) -> Vec<&'static str> {
        self.strategies.iter().map(|s| s.name()).collect()
    }

    /// Locates the value for `label`, returning which strategy matched.
    pub fn find(&self, page: &PageModel, label: &str) -> Option<FieldMatch> {
        self.strategies.iter().find_map(|strategy| {
            strategy.find(page, label).map(|value| {
                if strategy.kind() == MatchKind::Recovery {
                    tracing::warn!("Field {:?} recovered by {}", label, strategy.name());
                }
                FieldMatch {
                    value,
                    strategy: strategy.name(),
                    kind: strategy.kind(),
                }
            })
        })
    }

    /// Locates the value for `label`.
    pub fn extract(&self, page: &PageModel, label: &str) -> Option<String> {
        self.find(page, label).map(|m| m.value)
    }

    /// Title lookup: the `subject` cell, then a `제목`/`건명` label, then the
    /// board header, then the first non-empty `h1`/`h2`.
    pub fn extract_title(&self, page: &PageModel) -> Option<String> {
        let non_empty = |s: String| (!s.is_empty()).then_some(s);

        if let Some(title) = page
            .select("td.subject")
            .first()
            .and_then(|td| non_empty(cell_text(td)))
        {
            return Some(title);
        }
        for label in ["제목", "건명"] {
            if let Some(title) = self.extract(page, label).and_then(non_empty) {
                return Some(title);
            }
        }
        if let Some(title) = page
            .select("div.board_view_header")
            .first()
            .and_then(|div| non_empty(full_text(div)))
        {
            return Some(title);
        }
        page.select("h1, h2")
            .iter()
            .find_map(|h| non_empty(full_text(h)))
    }
}

/// Per-page account of how each requested field was found.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractionReport {
    pub structural: Vec<String>,
    pub recovered: Vec<String>,
    pub missing: Vec<String>,
}

impl ExtractionReport {
    pub fn record(&mut self, field: &str, found: Option<&FieldMatch>) {
        let bucket = match found.map(|m| m.kind) {
            Some(MatchKind::Structural) => &mut self.structural,
            Some(MatchKind::Recovery) => &mut self.recovered,
            None => &mut self.missing,
        };
        bucket.push(field.to_string());
    }

    pub fn used_recovery(&self) -> bool {
        !self.recovered.is_empty()
    }
}
