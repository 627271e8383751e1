//! End-to-end poll cycles over HTTP

use std::collections::BTreeMap;

use crate::helpers::*;
use assert_matches::assert_matches;
use chrono::{TimeZone, Utc};
use cloudwatch_alarms::{
    AlarmsError, AlarmsInput, CloudWatchError, CycleReport, FieldValue, MemoryAccumulator,
};
use pretty_assertions::assert_eq;
use serde_json::json;
use wiremock::matchers::{body_json, header, header_exists, method};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[tokio::test]
async fn test_single_alarm_becomes_tagged_point() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(header("content-type", "application/x-amz-json-1.0"))
        .and(header("x-amz-target", TARGET))
        .and(header_exists("authorization"))
        .and(header_exists("x-amz-date"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "MetricAlarms": [{
                "AlarmName": "alarm",
                "AlarmDescription": "alarm",
                "Namespace": "AWS/RDS",
                "StateValue": "ALARM",
                "AlarmArn": "arn:TEST",
                "MetricName": "memory",
                "Dimensions": [{ "Name": "vm-instance", "Value": "vm1" }],
                "StateUpdatedTimestamp": 1714564800
            }]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let input = AlarmsInput::from_config(&config_for(&server)).unwrap();
    let acc = MemoryAccumulator::new();

    let report = input.gather(&acc).await;

    assert_eq!(report, CycleReport { points: 1, errors: 0 });
    let point = acc.find("alarm").unwrap();
    assert_eq!(
        point.tags,
        BTreeMap::from([
            ("region".to_string(), "us-east-1".to_string()),
            ("namespace".to_string(), "AWS/RDS".to_string()),
            ("alarmArn".to_string(), "arn:TEST".to_string()),
            ("metricName".to_string(), "memory".to_string()),
            ("vm-instance".to_string(), "vm1".to_string()),
        ])
    );
    assert_eq!(
        point.fields,
        BTreeMap::from([("State".to_string(), FieldValue::from("ALARM"))])
    );
    assert_eq!(point.timestamp, Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap());
}

#[tokio::test]
async fn test_empty_result_emits_nothing() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "MetricAlarms": [] })))
        .mount(&server)
        .await;

    let input = AlarmsInput::from_config(&config_for(&server)).unwrap();
    let acc = MemoryAccumulator::new();

    let report = input.gather(&acc).await;

    assert_eq!(report, CycleReport::default());
    assert_eq!(acc.metric_count(), 0);
    assert_eq!(acc.error_count(), 0);
}

#[tokio::test]
async fn test_configured_state_is_sent() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(body_json(json!({ "StateValue": "OK" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(page(vec![], None)))
        .expect(1)
        .mount(&server)
        .await;

    let mut config = config_for(&server);
    config.state_value = "OK".to_string();
    let input = AlarmsInput::from_config(&config).unwrap();

    let report = input.gather(&MemoryAccumulator::new()).await;
    assert_eq!(report.errors, 0);
}

#[tokio::test]
async fn test_tag_filter_applies_to_every_point() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(page(
            vec![
                alarm_json("cpu", &[("vm-instance", "vm1"), ("az", "us-east-1a")]),
                alarm_json("disk", &[("vm-instance", "vm2")]),
            ],
            None,
        )))
        .mount(&server)
        .await;

    let mut config = config_for(&server);
    config.tags_include = vec!["vm-*".to_string(), "region".to_string(), "az".to_string()];
    config.tags_exclude = vec!["a?".to_string()];
    let input = AlarmsInput::from_config(&config).unwrap();
    let acc = MemoryAccumulator::new();

    let report = input.gather(&acc).await;
    assert_eq!(report.points, 2);

    let cpu = acc.find("cpu").unwrap();
    assert_eq!(
        cpu.tags,
        BTreeMap::from([
            ("region".to_string(), "us-east-1".to_string()),
            ("vm-instance".to_string(), "vm1".to_string()),
        ])
    );
    let disk = acc.find("disk").unwrap();
    assert_eq!(disk.tag("vm-instance"), Some("vm2"));
    assert!(disk.tag("alarmArn").is_none());
}

#[tokio::test]
async fn test_malformed_alarm_is_reported_and_rest_emitted() {
    let server = MockServer::start().await;
    let mut broken = alarm_json("broken", &[]);
    broken
        .as_object_mut()
        .unwrap()
        .remove("Namespace");

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(page(
            vec![broken, alarm_json("fine", &[])],
            None,
        )))
        .mount(&server)
        .await;

    let input = AlarmsInput::from_config(&config_for(&server)).unwrap();
    let acc = MemoryAccumulator::new();

    let report = input.gather(&acc).await;

    assert_eq!(report, CycleReport { points: 1, errors: 1 });
    assert!(acc.has_measurement("fine"));
    assert!(!acc.has_measurement("broken"));
    assert_matches!(
        acc.take_errors().as_slice(),
        [AlarmsError::MalformedRecord { field: "Namespace", .. }]
    );
}

#[tokio::test]
async fn test_api_error_is_reported() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "__type": "com.amazon.coral.service#AccessDeniedException",
            "message": "not authorized"
        })))
        .mount(&server)
        .await;

    let input = AlarmsInput::from_config(&config_for(&server)).unwrap();
    let acc = MemoryAccumulator::new();

    let report = input.gather(&acc).await;

    assert_eq!(report, CycleReport { points: 0, errors: 1 });
    let errors = acc.take_errors();
    assert_matches!(
        &errors[0],
        AlarmsError::Fetch(CloudWatchError::Api { code, .. }) if code == "AccessDeniedException"
    );
    assert!(errors[0].to_string().starts_with("failed to get Alarm data"));
}
