use std::time::Duration;

use replycase_api::types::{LateListRow, PastListRow, RecordType};
use replycase_api::{Client, Endpoints, Error, Query, ReplyListQuery};
use wiremock::matchers::{body_string_contains, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn load_fixture(name: &str) -> String {
    std::fs::read_to_string(format!("tests/fixtures/{}", name)).unwrap()
}

#[tokio::test]
async fn list_page_success() {
    let mock_server = MockServer::start().await;
    let endpoints = Endpoints::default();

    Mock::given(method("POST"))
        .and(path(endpoints.lists.late.path.as_str()))
        .and(body_string_contains("start=0"))
        .and(body_string_contains("length=2"))
        .and(header("referer", endpoints.lists.late.referer.as_str()))
        .respond_with(ResponseTemplate::new(200).set_body_string(load_fixture("late_list.json")))
        .mount(&mock_server)
        .await;

    let client = Client::with_base_url(&mock_server.uri()).unwrap();
    let query = ReplyListQuery::default().with_length(2);
    let resp = client
        .list_page::<LateListRow, _>(&endpoints.lists.late, &query)
        .await
        .unwrap();
    assert_eq!(resp.records_total, 2);
    assert_eq!(resp.data[1].idx, 2210);
}

#[tokio::test]
async fn list_page_server_error() {
    let mock_server = MockServer::start().await;
    let endpoints = Endpoints::default();

    Mock::given(method("POST"))
        .and(path(endpoints.lists.past.path.as_str()))
        .respond_with(ResponseTemplate::new(503).set_body_string("Service Unavailable"))
        .mount(&mock_server)
        .await;

    let client = Client::with_base_url(&mock_server.uri()).unwrap();
    let result = client
        .list_page::<PastListRow, _>(&endpoints.lists.past, &ReplyListQuery::default())
        .await;
    match result {
        Err(Error::HttpStatus { status, body }) => {
            assert_eq!(status, 503);
            assert_eq!(body, "Service Unavailable");
        }
        other => panic!("expected HttpStatus, got {:?}", other.map(|r| r.data.len())),
    }
}

#[tokio::test]
async fn list_page_malformed_json() {
    let mock_server = MockServer::start().await;
    let endpoints = Endpoints::default();

    Mock::given(method("POST"))
        .and(path(endpoints.lists.past.path.as_str()))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>login</html>"))
        .mount(&mock_server)
        .await;

    let client = Client::with_base_url(&mock_server.uri()).unwrap();
    let result = client
        .list_page::<PastListRow, _>(&endpoints.lists.past, &ReplyListQuery::default())
        .await;
    assert!(matches!(result, Err(Error::Decode(_))));
}

#[tokio::test]
async fn detail_request_is_shaped_per_type() {
    let mock_server = MockServer::start().await;
    let endpoints = Endpoints::default();

    Mock::given(method("POST"))
        .and(path("/fsc_new/ExmntTaskDetail.do"))
        .and(body_string_contains("checkplaceNo=734"))
        .and(body_string_contains("checkplaceSetIdx=2"))
        .and(body_string_contains("muNo=117"))
        .and(body_string_contains("actCd=R"))
        .and(header(
            "referer",
            endpoints.lists.integ.referer.as_str(),
        ))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>ok</html>"))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = Client::with_base_url(&mock_server.uri()).unwrap();
    let req = endpoints.detail_request(RecordType::FieldProposal, 734);
    let html = client.get_detail(&req).await.unwrap();
    assert_eq!(html, "<html>ok</html>");
}

#[tokio::test]
async fn detail_not_found_is_status_error() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/fsc_new/replyCase/LawreqDetail.do"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&mock_server)
        .await;

    let client = Client::with_base_url(&mock_server.uri()).unwrap();
    let req = Endpoints::default().detail_request(RecordType::LawInterpretation, 1);
    let err = client.get_detail(&req).await.unwrap_err();
    assert!(matches!(err, Error::HttpStatus { status: 404, .. }));
    assert!(!err.is_transient());
}

#[tokio::test]
async fn slow_detail_times_out() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/fsc_new/replyCase/OpinionDetail.do"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(2)))
        .mount(&mock_server)
        .await;

    let client = Client::builder()
        .base_url(&mock_server.uri())
        .timeout(Duration::from_millis(200))
        .build()
        .unwrap();
    let req = Endpoints::default().detail_request(RecordType::NoActionOpinion, 9);
    let err = client.get_detail(&req).await.unwrap_err();
    assert!(matches!(err, Error::Timeout));
    assert!(err.is_transient());
}

#[tokio::test]
async fn static_headers_are_sent() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/fsc_new/replyCase/PastReqDetail.do"))
        .and(header("x-custom", "yes"))
        .respond_with(ResponseTemplate::new(200).set_body_string("page"))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = Client::builder()
        .base_url(&mock_server.uri())
        .headers([("X-Custom", "yes")])
        .build()
        .unwrap();
    let req = Endpoints::default().detail_request(RecordType::LegacyPastCase, 3);
    assert_eq!(client.get_detail(&req).await.unwrap(), "page");
}
