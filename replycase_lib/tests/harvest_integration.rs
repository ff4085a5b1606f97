use std::time::Duration;

use replycase_lib::replycase_api::{Client, Endpoints};
use replycase_lib::{
    CombinedRecord, DetailFetcher, DetailRecord, Harvester, ListRecord, RecordType, RetryPolicy,
};
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{body_string_contains, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn load_fixture(name: &str) -> String {
    std::fs::read_to_string(format!("tests/fixtures/{}", name)).unwrap()
}

fn list_record(seq: u64, id: i64, record_type: RecordType) -> ListRecord {
    ListRecord {
        sequence_number: seq,
        record_id: id,
        record_type,
        type_label: record_type.label().to_string(),
        title: format!("record {}", id),
        registration_date: "2013-05-01".to_string(),
        category: None,
        serial_number: None,
    }
}

fn past_case_page(id: i64) -> String {
    format!(
        "<html><body><table>\
         <tr><th>질의요지</th><td>질의 {id}</td></tr>\
         <tr><th>회답</th><td>회답 {id}</td></tr>\
         <tr><th>이유</th><td>이유 {id}</td></tr>\
         </table></body></html>"
    )
}

fn harvester(server: &MockServer) -> Harvester {
    let client = Client::with_base_url(&server.uri()).unwrap();
    let fetcher = DetailFetcher::new(client, Endpoints::default());
    Harvester::new(fetcher)
        .with_concurrency(4)
        .with_delay(Duration::ZERO, Duration::ZERO)
        .with_retry(RetryPolicy {
            max_retries: 2,
            base_delay_ms: 1,
            max_delay_ms: 5,
        })
}

fn reply_detail(record: &CombinedRecord) -> &replycase_lib::model::ReplyDetail {
    match record.detail.as_ref() {
        Some(DetailRecord::LawInterpretation(d)) | Some(DetailRecord::NoActionOpinion(d)) => d,
        other => panic!("expected a reply detail, got {:?}", other),
    }
}

#[tokio::test]
async fn law_interpretation_detail_is_fetched_and_parsed() {
    let server = MockServer::start().await;
    let endpoints = Endpoints::default();

    Mock::given(method("POST"))
        .and(path(endpoints.details.law_interpretation.path.as_str()))
        .and(body_string_contains("muNo=171"))
        .and(body_string_contains("stNo=11"))
        .and(body_string_contains("lawreqIdx=5107"))
        .and(body_string_contains("actCd=R"))
        .respond_with(ResponseTemplate::new(200).set_body_string(load_fixture("law_5107.html")))
        .expect(1)
        .mount(&server)
        .await;

    let records = vec![list_record(1, 5107, RecordType::LawInterpretation)];
    let outcome = harvester(&server)
        .harvest(records, CancellationToken::new())
        .await;

    assert_eq!(outcome.records.len(), 1);
    assert_eq!(outcome.report.succeeded, 1);
    let record = &outcome.records[0];
    assert!(record.failure.is_none());
    let detail = reply_detail(record);
    assert_eq!(detail.title.as_deref(), Some("예금담보대출 시 금리 산정 방식"));
    assert_eq!(detail.registrant.as_deref(), Some("은행과"));
    assert_eq!(detail.reply_date.as_deref(), Some("2025-03-10"));
    assert_eq!(
        detail.inquiry.as_deref(),
        Some("예금을 담보로 한 대출의 금리를\n예금 금리에 연동할 수 있는지")
    );
    assert_eq!(detail.answer.as_deref(), Some("가능합니다."));
    assert_eq!(
        detail.reason.as_deref(),
        Some("「은행법」 제52조의2에 따라 불공정영업행위에 해당하지 않습니다.")
    );
    assert_eq!(outcome.report.recovered_by_regex, 0);
}

#[tokio::test]
async fn opinion_page_with_div_layout_uses_recovery() {
    let server = MockServer::start().await;
    let endpoints = Endpoints::default();

    Mock::given(method("POST"))
        .and(path(endpoints.details.no_action_opinion.path.as_str()))
        .and(body_string_contains("opinionIdx=2210"))
        .respond_with(ResponseTemplate::new(200).set_body_string(load_fixture("opinion_2210.html")))
        .mount(&server)
        .await;

    let records = vec![list_record(1, 2210, RecordType::NoActionOpinion)];
    let outcome = harvester(&server)
        .harvest(records, CancellationToken::new())
        .await;

    let record = &outcome.records[0];
    let detail = reply_detail(record);
    assert_eq!(detail.title.as_deref(), Some("투자일임 계약 체결 전 설명의무"));
    assert_eq!(detail.registrant.as_deref(), Some("OO투자자문"));
    assert_eq!(detail.reply_date.as_deref(), Some("2025.03.07"));
    assert_eq!(detail.inquiry.as_deref(), Some("일임계약 체결 전 설명서 교부 시점"));
    assert_eq!(detail.answer.as_deref(), Some("비조치"));
    assert_eq!(detail.reason.as_deref(), Some("투자자 보호에 지장이 없음"));

    let extraction = record.extraction.as_ref().unwrap();
    assert_eq!(extraction.recovered, vec!["registrant", "reply_date"]);
    assert_eq!(outcome.report.recovered_by_regex, 1);
    assert_eq!(outcome.report.regex_fields, 2);
}

#[tokio::test]
async fn field_proposal_request_carries_discriminator() {
    let server = MockServer::start().await;
    let endpoints = Endpoints::default();

    Mock::given(method("POST"))
        .and(path(endpoints.details.field_proposal.path.as_str()))
        .and(body_string_contains("checkplaceNo=734"))
        .and(body_string_contains("checkplaceSetIdx=2"))
        .respond_with(ResponseTemplate::new(200).set_body_string(load_fixture("proposal_734.html")))
        .expect(1)
        .mount(&server)
        .await;

    let records = vec![list_record(1, 734, RecordType::FieldProposal)];
    let outcome = harvester(&server)
        .harvest(records, CancellationToken::new())
        .await;

    match outcome.records[0].detail.as_ref() {
        Some(DetailRecord::FieldProposal(d)) => {
            assert_eq!(d.department.as_deref(), Some("전자금융과"));
            assert_eq!(d.category_detail.as_deref(), Some("전자금융"));
            assert_eq!(d.proposal.as_deref(), Some("비대면 계좌개설 시\n본인확인 절차 간소화"));
            assert_eq!(d.review_reason.as_deref(), Some("이용자 편의 제고"));
        }
        other => panic!("expected a proposal detail, got {:?}", other),
    }
}

#[tokio::test]
async fn detail_fetch_sends_listing_referer() {
    let server = MockServer::start().await;
    let endpoints = Endpoints::default();

    Mock::given(method("POST"))
        .and(path(endpoints.details.legacy_past_case.path.as_str()))
        .and(body_string_contains("pastreqIdx=7"))
        .and(header("referer", endpoints.lists.past.referer.as_str()))
        .respond_with(ResponseTemplate::new(200).set_body_string(past_case_page(7)))
        .expect(1)
        .mount(&server)
        .await;

    let client = Client::with_base_url(&server.uri()).unwrap();
    let fetcher = DetailFetcher::new(client, endpoints.clone());
    let html = fetcher.fetch(7, RecordType::LegacyPastCase).await.unwrap();
    assert!(html.contains("질의 7"));

    let received = server.received_requests().await.unwrap();
    let referer = received[0].headers.get("referer").unwrap();
    assert_eq!(referer.to_str().unwrap(), endpoints.lists.past.referer);
}

#[tokio::test]
async fn oversized_worker_count_is_capped() {
    let server = MockServer::start().await;
    let endpoints = Endpoints::default();
    Mock::given(method("POST"))
        .and(path(endpoints.details.legacy_past_case.path.as_str()))
        .respond_with(ResponseTemplate::new(200).set_body_string(past_case_page(3)))
        .mount(&server)
        .await;

    let records: Vec<ListRecord> = (1..=3)
        .map(|i| list_record(i, i as i64, RecordType::LegacyPastCase))
        .collect();
    let outcome = harvester(&server)
        .with_concurrency(usize::MAX)
        .harvest(records, CancellationToken::new())
        .await;

    assert_eq!(outcome.records.len(), 3);
    assert_eq!(outcome.report.failed, 0);
}

#[tokio::test]
async fn failures_are_isolated_per_record() {
    let server = MockServer::start().await;
    let endpoints = Endpoints::default();
    let detail_path = endpoints.details.legacy_past_case.path.as_str();

    for id in [3, 6, 9] {
        Mock::given(method("POST"))
            .and(path(detail_path))
            .and(body_string_contains(format!("pastreqIdx={}&", id).as_str()))
            .respond_with(ResponseTemplate::new(404).set_body_string("not found"))
            .with_priority(1)
            // 404 is not retried
            .expect(1)
            .mount(&server)
            .await;
    }
    for id in [1, 2, 4, 5, 7, 8, 10] {
        Mock::given(method("POST"))
            .and(path(detail_path))
            .and(body_string_contains(format!("pastreqIdx={}&", id).as_str()))
            .respond_with(ResponseTemplate::new(200).set_body_string(past_case_page(id)))
            .mount(&server)
            .await;
    }

    let records: Vec<ListRecord> = (1..=10)
        .map(|id| list_record(id as u64, id, RecordType::LegacyPastCase))
        .collect();
    let mut outcome = harvester(&server)
        .harvest(records, CancellationToken::new())
        .await;
    outcome.sort_by_sequence();

    assert_eq!(outcome.records.len(), 10);
    assert!(!outcome.cancelled);
    assert!(outcome.unprocessed.is_empty());
    assert_eq!(outcome.report.total, 10);
    assert_eq!(outcome.report.succeeded, 7);
    assert_eq!(outcome.report.failed, 3);
    assert_eq!(outcome.report.samples.len(), 3);

    for record in &outcome.records {
        let id = record.list.record_id;
        assert_eq!(record.list.sequence_number, id as u64);
        if id % 3 == 0 {
            assert!(record.detail.is_none());
            let reason = record.failure.as_deref().unwrap();
            assert!(reason.contains("404"), "unexpected reason: {}", reason);
        } else {
            match record.detail.as_ref() {
                Some(DetailRecord::LegacyPastCase(d)) => {
                    assert_eq!(d.inquiry.as_deref(), Some(format!("질의 {}", id).as_str()));
                }
                other => panic!("record {} has {:?}", id, other),
            }
        }
    }
}

#[tokio::test]
async fn transient_error_is_retried() {
    let server = MockServer::start().await;
    let endpoints = Endpoints::default();
    let detail_path = endpoints.details.legacy_past_case.path.as_str();

    Mock::given(method("POST"))
        .and(path(detail_path))
        .respond_with(ResponseTemplate::new(503).set_body_string("busy"))
        .up_to_n_times(1)
        .with_priority(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(detail_path))
        .respond_with(ResponseTemplate::new(200).set_body_string(past_case_page(42)))
        .mount(&server)
        .await;

    let records = vec![list_record(1, 42, RecordType::LegacyPastCase)];
    let outcome = harvester(&server)
        .harvest(records, CancellationToken::new())
        .await;

    assert_eq!(outcome.report.succeeded, 1);
    assert!(outcome.records[0].failure.is_none());
    assert_eq!(server.received_requests().await.unwrap().len(), 2);
}

#[tokio::test]
async fn retries_stop_after_policy_limit() {
    let server = MockServer::start().await;
    let endpoints = Endpoints::default();

    Mock::given(method("POST"))
        .and(path(endpoints.details.legacy_past_case.path.as_str()))
        .respond_with(ResponseTemplate::new(503).set_body_string("busy"))
        // first attempt plus two retries
        .expect(3)
        .mount(&server)
        .await;

    let records = vec![list_record(1, 42, RecordType::LegacyPastCase)];
    let outcome = harvester(&server)
        .harvest(records, CancellationToken::new())
        .await;

    assert_eq!(outcome.report.failed, 1);
    let reason = outcome.records[0].failure.as_deref().unwrap();
    assert!(reason.contains("503"), "unexpected reason: {}", reason);
}

#[tokio::test]
async fn missing_title_fails_the_record() {
    let server = MockServer::start().await;
    let endpoints = Endpoints::default();

    Mock::given(method("POST"))
        .and(path(endpoints.details.law_interpretation.path.as_str()))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string("<html><body><p>요청하신 게시물이 없습니다</p></body></html>"),
        )
        .mount(&server)
        .await;

    let records = vec![list_record(1, 1, RecordType::LawInterpretation)];
    let outcome = harvester(&server)
        .harvest(records, CancellationToken::new())
        .await;

    assert_eq!(outcome.report.failed, 1);
    let record = &outcome.records[0];
    assert!(record.detail.is_none());
    assert!(record.failure.as_deref().unwrap().starts_with("parse failed"));
}

#[tokio::test]
async fn cancelled_run_leaves_records_unprocessed() {
    let server = MockServer::start().await;
    let cancel = CancellationToken::new();
    cancel.cancel();

    let records: Vec<ListRecord> = (1..=5)
        .map(|id| list_record(id as u64, id, RecordType::LegacyPastCase))
        .collect();
    let outcome = harvester(&server).harvest(records, cancel).await;

    assert!(outcome.cancelled);
    assert!(outcome.records.is_empty());
    assert_eq!(outcome.unprocessed.len(), 5);
    assert_eq!(server.received_requests().await.unwrap().len(), 0);
}

#[tokio::test]
async fn progress_callback_sees_every_record() {
    let server = MockServer::start().await;
    let endpoints = Endpoints::default();
    Mock::given(method("POST"))
        .and(path(endpoints.details.legacy_past_case.path.as_str()))
        .respond_with(ResponseTemplate::new(200).set_body_string(past_case_page(1)))
        .mount(&server)
        .await;

    let records: Vec<ListRecord> = (1..=6)
        .map(|id| list_record(id as u64, id, RecordType::LegacyPastCase))
        .collect();
    let mut seen = Vec::new();
    let outcome = harvester(&server)
        .harvest_with_progress(records, CancellationToken::new(), |r| {
            seen.push(r.list.record_id)
        })
        .await;

    seen.sort_unstable();
    assert_eq!(seen, vec![1, 2, 3, 4, 5, 6]);
    assert_eq!(outcome.report.succeeded, 6);
}
