//! Per-record-type detail page parsers.
//!
//! Each field has an ordered list of label candidates; the first label that
//! locates a value wins. This absorbs label drift between page generations.

use replycase_api::types::RecordType;
use thiserror::Error;

use crate::extract::{ExtractionReport, FieldExtractor, PageModel};
use crate::model::{DetailRecord, PastCaseDetail, ProposalDetail, ReplyDetail};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("empty detail page")]
    EmptyPage,
    #[error("no title found on {0} detail page")]
    MissingTitle(RecordType),
}

/// A parsed detail page and how its fields were located.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedDetail {
    pub detail: DetailRecord,
    pub report: ExtractionReport,
}

type LabelSet = (&'static str, &'static [&'static str]);

const REPLY_LABELS: [LabelSet; 5] = [
    ("registrant", &["등록자", "신청인"]),
    ("reply_date", &["회신일"]),
    ("inquiry", &["질의요지", "질의내용"]),
    ("answer", &["회답", "회신내용"]),
    ("reason", &["이유", "판단이유"]),
];

const PROPOSAL_LABELS: [LabelSet; 7] = [
    ("department", &["소관부서"]),
    ("category_detail", &["과제분류"]),
    ("reply_date", &["회신일"]),
    ("proposal", &["건의내용"]),
    ("review_opinion", &["검토의견"]),
    ("review_reason", &["사유"]),
    ("future_plan", &["향후계획"]),
];

const PAST_CASE_LABELS: [LabelSet; 5] = [
    ("inquiry", &["질의요지"]),
    ("fact", &["법령해석요청의 원인이 되는 사실관계"]),
    ("base_law", &["해석대상 법령 조문 및 관련법령"]),
    ("answer", &["회답"]),
    ("reason", &["이유"]),
];

struct Lookup<'a> {
    extractor: &'a FieldExtractor,
    page: &'a PageModel,
    report: ExtractionReport,
}

impl<'a> Lookup<'a> {
    fn field(&mut self, (name, labels): LabelSet) -> Option<String> {
        let found = labels
            .iter()
            .find_map(|label| self.extractor.find(self.page, label));
        self.report.record(name, found.as_ref());
        found.map(|m| m.value).filter(|v| !v.is_empty())
    }

    fn fields<const N: usize>(&mut self, sets: [LabelSet; N]) -> [Option<String>; N] {
        sets.map(|set| self.field(set))
    }
}

/// Parses one detail page into the variant for `record_type`.
///
/// A missing title is fatal for law interpretations and no-action opinions;
/// every other missing field just stays empty.
pub fn parse_detail(
    extractor: &FieldExtractor,
    record_type: RecordType,
    html: &str,
) -> Result<ParsedDetail, ParseError> {
    if html.trim().is_empty() {
        return Err(ParseError::EmptyPage);
    }
    let page = PageModel::parse(html);
    let title = extractor.extract_title(&page);
    let mut lookup = Lookup {
        extractor,
        page: &page,
        report: ExtractionReport::default(),
    };

    let detail = match record_type {
        RecordType::LawInterpretation | RecordType::NoActionOpinion => {
            let title = title.ok_or(ParseError::MissingTitle(record_type))?;
            let [registrant, reply_date, inquiry, answer, reason] = lookup.fields(REPLY_LABELS);
            let detail = ReplyDetail {
                title: Some(title),
                registrant,
                reply_date,
                inquiry,
                answer,
                reason,
            };
            if record_type == RecordType::LawInterpretation {
                DetailRecord::LawInterpretation(detail)
            } else {
                DetailRecord::NoActionOpinion(detail)
            }
        }
        RecordType::FieldProposal => {
            let [department, category_detail, reply_date, proposal, review_opinion, review_reason, future_plan] =
                lookup.fields(PROPOSAL_LABELS);
            DetailRecord::FieldProposal(ProposalDetail {
                title,
                department,
                category_detail,
                reply_date,
                proposal,
                review_opinion,
                review_reason,
                future_plan,
            })
        }
        RecordType::LegacyPastCase => {
            let [inquiry, fact, base_law, answer, reason] = lookup.fields(PAST_CASE_LABELS);
            DetailRecord::LegacyPastCase(PastCaseDetail {
                title,
                inquiry,
                fact,
                base_law,
                answer,
                reason,
            })
        }
    };

    Ok(ParsedDetail {
        detail,
        report: lookup.report,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rows(pairs: &[(&str, &str)]) -> String {
        let body: String = pairs
            .iter()
            .map(|(th, td)| format!("<tr><th scope=\"row\">{}</th><td>{}</td></tr>", th, td))
            .collect();
        format!("<html><body><table>{}</table></body></html>", body)
    }

    #[test]
    fn law_interpretation_fields() {
        let html = rows(&[
            ("제목", "금리 산정 방식"),
            ("등록자", "은행과"),
            ("회신일", "2025-03-10"),
            ("질의요지", "<p>질의 1</p><p>질의 2</p>"),
            ("회답", "가능"),
            ("이유", "법 제5조"),
        ]);
        let parsed = parse_detail(&FieldExtractor::default(), RecordType::LawInterpretation, &html)
            .unwrap();
        let DetailRecord::LawInterpretation(d) = parsed.detail else {
            panic!("wrong variant");
        };
        assert_eq!(d.title.as_deref(), Some("금리 산정 방식"));
        assert_eq!(d.reply_date.as_deref(), Some("2025-03-10"));
        assert_eq!(d.inquiry.as_deref(), Some("질의 1\n질의 2"));
        assert_eq!(parsed.report.structural.len(), 5);
        assert!(parsed.report.missing.is_empty());
    }

    #[test]
    fn drifted_labels_use_alternates() {
        let html = rows(&[
            ("제목", "설명의무"),
            ("신청인", "OO증권"),
            ("질의내용", "질의"),
            ("회신내용", "회신"),
        ]);
        let parsed =
            parse_detail(&FieldExtractor::default(), RecordType::NoActionOpinion, &html).unwrap();
        let DetailRecord::NoActionOpinion(d) = parsed.detail else {
            panic!("wrong variant");
        };
        assert_eq!(d.registrant.as_deref(), Some("OO증권"));
        assert_eq!(d.inquiry.as_deref(), Some("질의"));
        assert_eq!(d.answer.as_deref(), Some("회신"));
        assert_eq!(d.reason, None);
        assert_eq!(parsed.report.missing, vec!["reply_date", "reason"]);
    }

    #[test]
    fn missing_title_is_fatal_for_replies_only() {
        let html = rows(&[("회답", "가능")]);
        let ex = FieldExtractor::default();
        assert_eq!(
            parse_detail(&ex, RecordType::LawInterpretation, &html).unwrap_err(),
            ParseError::MissingTitle(RecordType::LawInterpretation)
        );
        let parsed = parse_detail(&ex, RecordType::LegacyPastCase, &html).unwrap();
        assert_eq!(parsed.detail.record_type(), RecordType::LegacyPastCase);
    }

    #[test]
    fn field_proposal_fields() {
        let html = rows(&[
            ("소관부서", "전자금융과"),
            ("과제분류", "전자금융"),
            ("회신일", "2024.11.02"),
            ("건의내용", "본인확인 간소화"),
            ("검토의견", "수용"),
            ("사유", "이용자 편의"),
            ("향후계획", "시행령 개정"),
        ]);
        let parsed =
            parse_detail(&FieldExtractor::default(), RecordType::FieldProposal, &html).unwrap();
        let DetailRecord::FieldProposal(d) = parsed.detail else {
            panic!("wrong variant");
        };
        assert_eq!(d.title, None);
        assert_eq!(d.department.as_deref(), Some("전자금융과"));
        assert_eq!(d.future_plan.as_deref(), Some("시행령 개정"));
        assert_eq!(parsed.report.structural.len(), 7);
    }

    #[test]
    fn past_case_long_labels() {
        let html = rows(&[
            ("질의요지", "q"),
            ("법령해석요청의 원인이 되는 사실관계", "f"),
            ("해석대상 법령 조문 및 관련법령", "l"),
            ("회답", "a"),
            ("이유", "r"),
        ]);
        let parsed =
            parse_detail(&FieldExtractor::default(), RecordType::LegacyPastCase, &html).unwrap();
        assert_eq!(
            parsed.detail,
            DetailRecord::LegacyPastCase(PastCaseDetail {
                title: None,
                inquiry: Some("q".into()),
                fact: Some("f".into()),
                base_law: Some("l".into()),
                answer: Some("a".into()),
                reason: Some("r".into()),
            })
        );
    }

    #[test]
    fn empty_page_is_an_error() {
        assert_eq!(
            parse_detail(&FieldExtractor::default(), RecordType::FieldProposal, "  "),
            Err(ParseError::EmptyPage)
        );
    }
}
