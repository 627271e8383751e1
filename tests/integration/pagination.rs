//! Multi-page DescribeAlarms fetches

use crate::helpers::*;
use assert_matches::assert_matches;
use cloudwatch_alarms::{AlarmsError, AlarmsInput, CloudWatchError, CycleReport, MemoryAccumulator};
use serde_json::json;
use wiremock::matchers::{body_json, header, method};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn mount_page(
    server: &MockServer,
    request: serde_json::Value,
    response: ResponseTemplate,
) {
    Mock::given(method("POST"))
        .and(header("x-amz-target", TARGET))
        .and(body_json(request))
        .respond_with(response)
        .expect(1)
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_all_pages_are_fetched() {
    let server = MockServer::start().await;

    mount_page(
        &server,
        json!({ "StateValue": "ALARM" }),
        ResponseTemplate::new(200).set_body_json(page(
            vec![alarm_json("a1", &[]), alarm_json("a2", &[])],
            Some("page-2"),
        )),
    )
    .await;
    mount_page(
        &server,
        json!({ "StateValue": "ALARM", "NextToken": "page-2" }),
        ResponseTemplate::new(200).set_body_json(page(
            vec![alarm_json("b1", &[]), alarm_json("b2", &[])],
            Some("page-3"),
        )),
    )
    .await;
    mount_page(
        &server,
        json!({ "StateValue": "ALARM", "NextToken": "page-3" }),
        ResponseTemplate::new(200).set_body_json(page(
            vec![alarm_json("c1", &[]), alarm_json("c2", &[])],
            None,
        )),
    )
    .await;

    let input = AlarmsInput::from_config(&config_for(&server)).unwrap();
    let acc = MemoryAccumulator::new();

    let report = input.gather(&acc).await;

    assert_eq!(report, CycleReport { points: 6, errors: 0 });
    for name in ["a1", "a2", "b1", "b2", "c1", "c2"] {
        assert!(acc.has_measurement(name), "missing point for {name}");
    }
}

#[tokio::test]
async fn test_failing_page_discards_whole_batch() {
    let server = MockServer::start().await;

    mount_page(
        &server,
        json!({ "StateValue": "ALARM" }),
        ResponseTemplate::new(200)
            .set_body_json(page(vec![alarm_json("a1", &[])], Some("page-2"))),
    )
    .await;
    mount_page(
        &server,
        json!({ "StateValue": "ALARM", "NextToken": "page-2" }),
        ResponseTemplate::new(500).set_body_string("internal failure"),
    )
    .await;

    let input = AlarmsInput::from_config(&config_for(&server)).unwrap();
    let acc = MemoryAccumulator::new();

    let report = input.gather(&acc).await;

    assert_eq!(report, CycleReport { points: 0, errors: 1 });
    assert_eq!(acc.metric_count(), 0);
    assert_matches!(
        acc.take_errors().as_slice(),
        [AlarmsError::Fetch(CloudWatchError::Http { status: 500, .. })]
    );
}

#[tokio::test]
async fn test_next_cycle_starts_from_first_page() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(body_json(json!({ "StateValue": "ALARM" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(page(vec![alarm_json("a1", &[])], None)))
        .expect(2)
        .mount(&server)
        .await;

    let input = AlarmsInput::from_config(&config_for(&server)).unwrap();

    let first = input.gather(&MemoryAccumulator::new()).await;
    let second = input.gather(&MemoryAccumulator::new()).await;

    assert_eq!(first, CycleReport { points: 1, errors: 0 });
    assert_eq!(first, second);
}
