use std::collections::BTreeMap;

use chrono::NaiveDate;
use replycase_lib::model::{PastCaseDetail, ProposalDetail, ReplyDetail};
use replycase_lib::{
    harmonize, CombinedRecord, DetailRecord, ExtractionReport, FamilyTable, ListRecord,
    RecordType, SourceFamily,
};

fn list(seq: u64, id: i64, record_type: RecordType, title: &str) -> ListRecord {
    ListRecord {
        sequence_number: seq,
        record_id: id,
        record_type,
        type_label: record_type.label().to_string(),
        title: title.to_string(),
        registration_date: String::new(),
        category: None,
        serial_number: None,
    }
}

fn undated_table(family: SourceFamily, prefix: &str, n: usize) -> FamilyTable {
    let rows = (0..n).map(|i| {
        let mut row = BTreeMap::new();
        row.insert("title".to_string(), Some(format!("{}{}", prefix, i + 1)));
        row
    });
    FamilyTable::from_rows(family, rows)
}

#[test]
fn undated_rows_keep_concatenation_order() {
    let past = undated_table(SourceFamily::Past, "p", 2);
    let late = undated_table(SourceFamily::Late, "l", 3);
    let integ = undated_table(SourceFamily::Integ, "i", 1);

    let (records, report) = harmonize(&past, &late, &integ);

    let ids: Vec<u64> = records.iter().map(|r| r.id).collect();
    assert_eq!(ids, vec![1, 2, 3, 4, 5, 6]);
    let titles: Vec<&str> = records.iter().map(|r| r.title.as_str()).collect();
    assert_eq!(titles, vec!["p1", "p2", "l1", "l2", "l3", "i1"]);
    assert_eq!(report.undated, 6);
    assert_eq!(report.dated, 0);
    // every family table lacks most mapped columns
    assert!(!report.warnings.is_empty());
}

fn dated_table(family: SourceFamily, date_column: &str, rows: &[(&str, &str)]) -> FamilyTable {
    let rows = rows.iter().map(|(title, date)| {
        let mut row = BTreeMap::new();
        row.insert("title".to_string(), Some(title.to_string()));
        row.insert(date_column.to_string(), Some(date.to_string()));
        row
    });
    FamilyTable::from_rows(family, rows)
}

#[test]
fn equal_dates_keep_family_order_and_undated_rows_trail() {
    let past = dated_table(
        SourceFamily::Past,
        "registration_date",
        &[("p1", "2024-01-05"), ("p2", ""), ("p3", "2023-06-01")],
    );
    let late = dated_table(
        SourceFamily::Late,
        "reply_date",
        &[("l1", "2024. 1. 5."), ("l2", "2023.06.01"), ("l3", "미정")],
    );
    let integ = dated_table(SourceFamily::Integ, "reply_date", &[("i1", "2024-01-05")]);

    let (records, report) = harmonize(&past, &late, &integ);

    let titles: Vec<&str> = records.iter().map(|r| r.title.as_str()).collect();
    assert_eq!(titles, vec!["p3", "l2", "p1", "l1", "i1", "p2", "l3"]);
    let ids: Vec<u64> = records.iter().map(|r| r.id).collect();
    assert_eq!(ids, (1..=7).collect::<Vec<u64>>());
    assert_eq!(report.dated, 5);
    assert_eq!(report.undated, 2);

    let dates: Vec<Option<NaiveDate>> = records.iter().map(|r| r.reply_date).collect();
    assert!(dates[..5].windows(2).all(|w| w[0] <= w[1]));
    assert!(dates[5..].iter().all(Option::is_none));
}

fn harvested() -> (Vec<CombinedRecord>, Vec<CombinedRecord>, Vec<CombinedRecord>) {
    let mut past_list = list(1, 11, RecordType::LegacyPastCase, "과거 사례");
    past_list.registration_date = "2012-07-01".into();
    past_list.serial_number = Some("2012-101".into());
    let past = vec![CombinedRecord::succeeded(
        past_list,
        DetailRecord::LegacyPastCase(PastCaseDetail {
            title: None,
            inquiry: Some("질의".into()),
            fact: Some("사실관계".into()),
            base_law: None,
            answer: Some("회답".into()),
            reason: Some("이유".into()),
        }),
        ExtractionReport::default(),
    )];

    let mut late_list = list(1, 5107, RecordType::LawInterpretation, "금리 산정");
    late_list.category = Some("은행".into());
    late_list.serial_number = Some("250031".into());
    let late = vec![
        CombinedRecord::succeeded(
            late_list,
            DetailRecord::LawInterpretation(ReplyDetail {
                title: Some("금리 산정".into()),
                registrant: Some("은행과".into()),
                reply_date: Some("2025-03-10".into()),
                inquiry: Some("금리 질의".into()),
                answer: Some("가능".into()),
                reason: None,
            }),
            ExtractionReport::default(),
        ),
        CombinedRecord::failed(
            list(2, 2210, RecordType::NoActionOpinion, "설명의무"),
            "fetch failed: unexpected status 404",
        ),
    ];

    let integ = vec![CombinedRecord::succeeded(
        list(1, 734, RecordType::FieldProposal, "본인확인 간소화"),
        DetailRecord::FieldProposal(ProposalDetail {
            title: None,
            department: Some("전자금융과".into()),
            category_detail: Some("전자금융".into()),
            reply_date: Some("2024. 11. 02.".into()),
            proposal: Some("건의".into()),
            review_opinion: Some("수용".into()),
            review_reason: Some("편의".into()),
            future_plan: Some("규정 개정".into()),
        }),
        ExtractionReport::default(),
    )];
    (past, late, integ)
}

#[test]
fn harvested_records_map_onto_canonical_columns() {
    let (past, late, integ) = harvested();
    let (records, report) = harmonize(
        &FamilyTable::from_combined(SourceFamily::Past, &past),
        &FamilyTable::from_combined(SourceFamily::Late, &late),
        &FamilyTable::from_combined(SourceFamily::Integ, &integ),
    );

    assert!(report.warnings.is_empty(), "{:?}", report.warnings);
    assert_eq!(report.dated, 3);
    assert_eq!(report.undated, 1);

    let dates: Vec<Option<NaiveDate>> = records.iter().map(|r| r.reply_date).collect();
    assert_eq!(
        dates,
        vec![
            NaiveDate::from_ymd_opt(2012, 7, 1),
            NaiveDate::from_ymd_opt(2024, 11, 2),
            NaiveDate::from_ymd_opt(2025, 3, 10),
            None,
        ]
    );

    let past_row = &records[0];
    assert_eq!(past_row.id, 1);
    assert_eq!(past_row.category, "과거회신사례");
    assert_eq!(past_row.field, "");
    assert_eq!(past_row.serial_number, "2012-101");
    assert_eq!(past_row.inquiry_summary, "질의\n\n사실관계");

    let integ_row = &records[1];
    assert_eq!(integ_row.field, "전자금융");
    assert_eq!(integ_row.reply_department, "전자금융과");
    assert_eq!(integ_row.serial_number, "734");
    assert_eq!(integ_row.answer, "수용\n\n편의");
    assert_eq!(integ_row.reason, "규정 개정");

    let late_row = &records[2];
    assert_eq!(late_row.category, "법령해석");
    assert_eq!(late_row.field, "은행");
    assert_eq!(late_row.reply_department, "은행과");
    assert_eq!(late_row.reason, "");

    // the failed record is kept with empty detail columns
    let failed_row = &records[3];
    assert_eq!(failed_row.id, 4);
    assert_eq!(failed_row.title, "설명의무");
    assert_eq!(failed_row.inquiry_summary, "");
}

#[test]
fn exported_json_harmonizes_like_in_memory_records() {
    let (past, late, integ) = harvested();
    let export = |records: &[CombinedRecord]| {
        let rows: Vec<_> = records.iter().map(CombinedRecord::to_row).collect();
        let text = serde_json::to_string(&rows).unwrap();
        serde_json::from_str::<serde_json::Value>(&text).unwrap()
    };

    let from_json = harmonize(
        &FamilyTable::from_json(SourceFamily::Past, export(&past)).unwrap(),
        &FamilyTable::from_json(SourceFamily::Late, export(&late)).unwrap(),
        &FamilyTable::from_json(SourceFamily::Integ, export(&integ)).unwrap(),
    );
    let in_memory = harmonize(
        &FamilyTable::from_combined(SourceFamily::Past, &past),
        &FamilyTable::from_combined(SourceFamily::Late, &late),
        &FamilyTable::from_combined(SourceFamily::Integ, &integ),
    );

    assert_eq!(from_json, in_memory);
}

#[test]
fn empty_families_harmonize_to_nothing() {
    let (records, report) = harmonize(
        &FamilyTable::new(SourceFamily::Past),
        &FamilyTable::new(SourceFamily::Late),
        &FamilyTable::new(SourceFamily::Integ),
    );
    assert!(records.is_empty());
    assert!(report.warnings.is_empty());
}
