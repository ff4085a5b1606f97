//! Records flowing through the pipeline: listing rows, parsed detail
//! payloads, their combination, and the harmonized output row.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use replycase_api::types::{IntegListRow, LateListRow, PastListRow, RecordType, SourceFamily};
use serde::{Deserialize, Serialize, Serializer};

use crate::extract::ExtractionReport;

/// One row of a listing, tagged with its record type.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct ListRecord {
    /// 1-based position in the listing, in server order.
    pub sequence_number: u64,
    pub record_id: i64,
    pub record_type: RecordType,
    /// Type label exactly as the listing printed it.
    pub type_label: String,
    pub title: String,
    pub registration_date: String,
    pub category: Option<String>,
    pub serial_number: Option<String>,
}

impl ListRecord {
    pub fn from_past(sequence_number: u64, row: &PastListRow) -> Self {
        let record_type = RecordType::LegacyPastCase;
        Self {
            sequence_number,
            record_id: row.pastreq_idx,
            record_type,
            type_label: row
                .pastreq_type
                .clone()
                .unwrap_or_else(|| record_type.label().to_string()),
            title: row.pastreq_subject.clone().unwrap_or_default(),
            registration_date: row.reg_date.clone().unwrap_or_default(),
            category: None,
            serial_number: row.serial_num.clone(),
        }
    }

    /// `None` when `gubun` names neither late-family type.
    pub fn from_late(sequence_number: u64, row: &LateListRow) -> Option<Self> {
        let label = row.gubun.as_deref()?;
        let record_type = RecordType::from_label(label)?;
        if record_type.family() != SourceFamily::Late {
            return None;
        }
        Some(Self {
            sequence_number,
            record_id: row.idx,
            record_type,
            type_label: label.trim().to_string(),
            title: row.title.clone().unwrap_or_default(),
            registration_date: row.reg_date.clone().unwrap_or_default(),
            category: row.category.clone(),
            serial_number: row.number.clone(),
        })
    }

    /// `None` when the type label is not a known record type.
    pub fn from_integ(sequence_number: u64, row: &IntegListRow) -> Option<Self> {
        let label = row.pastreq_type.as_deref()?;
        let record_type = RecordType::from_label(label)?;
        Some(Self {
            sequence_number,
            record_id: row.data_idx,
            record_type,
            type_label: label.trim().to_string(),
            title: row.title.clone().unwrap_or_default(),
            registration_date: row.reply_reg_date.clone().unwrap_or_default(),
            category: None,
            serial_number: Some(row.data_idx.to_string()),
        })
    }
}

/// Detail fields of law interpretations and no-action opinions.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct ReplyDetail {
    pub title: Option<String>,
    pub registrant: Option<String>,
    pub reply_date: Option<String>,
    pub inquiry: Option<String>,
    pub answer: Option<String>,
    pub reason: Option<String>,
}

/// Detail fields of field proposals.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct ProposalDetail {
    pub title: Option<String>,
    pub department: Option<String>,
    pub category_detail: Option<String>,
    pub reply_date: Option<String>,
    pub proposal: Option<String>,
    pub review_opinion: Option<String>,
    pub review_reason: Option<String>,
    pub future_plan: Option<String>,
}

/// Detail fields of pre-2014 reply cases.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct PastCaseDetail {
    pub title: Option<String>,
    pub inquiry: Option<String>,
    pub fact: Option<String>,
    pub base_law: Option<String>,
    pub answer: Option<String>,
    pub reason: Option<String>,
}

/// A parsed detail page; each variant carries only its own type's fields.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DetailRecord {
    LawInterpretation(ReplyDetail),
    NoActionOpinion(ReplyDetail),
    FieldProposal(ProposalDetail),
    LegacyPastCase(PastCaseDetail),
}

impl DetailRecord {
    pub fn record_type(&self) -> RecordType {
        match self {
            DetailRecord::LawInterpretation(_) => RecordType::LawInterpretation,
            DetailRecord::NoActionOpinion(_) => RecordType::NoActionOpinion,
            DetailRecord::FieldProposal(_) => RecordType::FieldProposal,
            DetailRecord::LegacyPastCase(_) => RecordType::LegacyPastCase,
        }
    }

    /// Detail columns as `(name, value)` pairs.
    pub fn columns(&self) -> Vec<(&'static str, Option<String>)> {
        match self {
            DetailRecord::LawInterpretation(d) | DetailRecord::NoActionOpinion(d) => vec![
                ("detail_title", d.title.clone()),
                ("registrant", d.registrant.clone()),
                ("reply_date", d.reply_date.clone()),
                ("inquiry", d.inquiry.clone()),
                ("answer", d.answer.clone()),
                ("reason", d.reason.clone()),
            ],
            DetailRecord::FieldProposal(d) => vec![
                ("detail_title", d.title.clone()),
                ("department", d.department.clone()),
                ("category_detail", d.category_detail.clone()),
                ("reply_date", d.reply_date.clone()),
                ("proposal", d.proposal.clone()),
                ("review_opinion", d.review_opinion.clone()),
                ("review_reason", d.review_reason.clone()),
                ("future_plan", d.future_plan.clone()),
            ],
            DetailRecord::LegacyPastCase(d) => vec![
                ("detail_title", d.title.clone()),
                ("inquiry", d.inquiry.clone()),
                ("fact", d.fact.clone()),
                ("base_law", d.base_law.clone()),
                ("answer", d.answer.clone()),
                ("reason", d.reason.clone()),
            ],
        }
    }

    /// Names of the detail columns a record type produces.
    pub fn column_names(record_type: RecordType) -> &'static [&'static str] {
        match record_type {
            RecordType::LawInterpretation | RecordType::NoActionOpinion => &[
                "detail_title",
                "registrant",
                "reply_date",
                "inquiry",
                "answer",
                "reason",
            ],
            RecordType::FieldProposal => &[
                "detail_title",
                "department",
                "category_detail",
                "reply_date",
                "proposal",
                "review_opinion",
                "review_reason",
                "future_plan",
            ],
            RecordType::LegacyPastCase => &[
                "detail_title",
                "inquiry",
                "fact",
                "base_law",
                "answer",
                "reason",
            ],
        }
    }
}

/// A listing row joined with the outcome of its detail fetch.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct CombinedRecord {
    #[serde(flatten)]
    pub list: ListRecord,
    /// Absent when the fetch or parse failed.
    pub detail: Option<DetailRecord>,
    /// Why the detail is absent.
    pub failure: Option<String>,
    #[serde(default)]
    pub extraction: Option<ExtractionReport>,
}

impl CombinedRecord {
    pub fn succeeded(list: ListRecord, detail: DetailRecord, extraction: ExtractionReport) -> Self {
        Self {
            list,
            detail: Some(detail),
            failure: None,
            extraction: Some(extraction),
        }
    }

    pub fn failed(list: ListRecord, reason: impl Into<String>) -> Self {
        Self {
            list,
            detail: None,
            failure: Some(reason.into()),
            extraction: None,
        }
    }

    /// A record from a list-only run: no fetch was attempted.
    pub fn list_only(list: ListRecord) -> Self {
        Self {
            list,
            detail: None,
            failure: None,
            extraction: None,
        }
    }

    pub fn is_failed(&self) -> bool {
        self.failure.is_some()
    }

    /// Flat column view used for export and harmonization. Every detail
    /// column of the record's type is present, null when the detail is absent.
    pub fn to_row(&self) -> BTreeMap<String, Option<String>> {
        let l = &self.list;
        let mut row = BTreeMap::new();
        row.insert("sequence_number".to_string(), Some(l.sequence_number.to_string()));
        row.insert("record_id".to_string(), Some(l.record_id.to_string()));
        row.insert("record_type".to_string(), Some(l.record_type.to_string()));
        row.insert("type_label".to_string(), Some(l.type_label.clone()));
        row.insert("title".to_string(), Some(l.title.clone()));
        row.insert("registration_date".to_string(), Some(l.registration_date.clone()));
        row.insert("category".to_string(), l.category.clone());
        row.insert("serial_number".to_string(), l.serial_number.clone());
        row.insert("failure".to_string(), self.failure.clone());
        match &self.detail {
            Some(detail) => {
                for (name, value) in detail.columns() {
                    row.insert(name.to_string(), value);
                }
            }
            None => {
                for name in DetailRecord::column_names(l.record_type) {
                    row.insert(name.to_string(), None);
                }
            }
        }
        row
    }
}

/// One row of the harmonized table.
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct HarmonizedRecord {
    pub id: u64,
    #[serde(rename = "구분")]
    pub category: String,
    #[serde(rename = "분야")]
    pub field: String,
    #[serde(rename = "제목")]
    pub title: String,
    #[serde(rename = "회신부서")]
    pub reply_department: String,
    #[serde(rename = "담당자")]
    pub handler: String,
    #[serde(rename = "회신일자", serialize_with = "date_or_blank")]
    pub reply_date: Option<NaiveDate>,
    #[serde(rename = "일련번호")]
    pub serial_number: String,
    #[serde(rename = "질의요지")]
    pub inquiry_summary: String,
    #[serde(rename = "회답")]
    pub answer: String,
    #[serde(rename = "이유")]
    pub reason: String,
}

impl HarmonizedRecord {
    pub const HEADERS: [&'static str; 11] = [
        "id", "구분", "분야", "제목", "회신부서", "담당자", "회신일자", "일련번호", "질의요지", "회답",
        "이유",
    ];
}

fn date_or_blank<S: Serializer>(date: &Option<NaiveDate>, s: S) -> Result<S::Ok, S::Error> {
    match date {
        Some(d) => s.serialize_str(&d.format("%Y-%m-%d").to_string()),
        None => s.serialize_str(""),
    }
}
