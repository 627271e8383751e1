//! Full pipeline: PollerHandle → gather → BroadcastAccumulator → subscribers

use std::sync::Arc;
use std::time::Duration;

use crate::helpers::*;
use cloudwatch_alarms::actors::poller::PollerHandle;
use cloudwatch_alarms::{AlarmsInput, BroadcastAccumulator, CycleReport, CycleState, MemoryAccumulator};
use tokio::sync::broadcast;
use tokio::time::timeout;
use wiremock::matchers::method;
use wiremock::{Mock, MockServer, ResponseTemplate};

#[tokio::test]
async fn test_poll_now_broadcasts_every_point() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(page(
            vec![
                alarm_json("c", &[]),
                alarm_json("a", &[("host", "h1")]),
                alarm_json("b", &[]),
            ],
            None,
        )))
        .mount(&server)
        .await;

    let input = Arc::new(AlarmsInput::from_config(&config_for(&server)).unwrap());
    let (metric_tx, mut metric_rx) = broadcast::channel(16);
    let mut second_rx = metric_tx.subscribe();
    let accumulator = Arc::new(BroadcastAccumulator::new(metric_tx));
    let handle = PollerHandle::spawn(input, accumulator.clone(), Duration::from_secs(3600));

    let report = handle.poll_now().await.unwrap();
    assert_eq!(report, CycleReport { points: 3, errors: 0 });

    let mut names = vec![];
    for _ in 0..3 {
        let event = timeout(Duration::from_secs(1), metric_rx.recv())
            .await
            .expect("timeout waiting for metric")
            .unwrap();
        names.push(event.point.name);
    }
    // emitted in series order
    assert_eq!(names, vec!["a", "b", "c"]);

    let event = timeout(Duration::from_secs(1), second_rx.recv())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(event.point.name, "a");
    assert_eq!(event.point.tag("host"), Some("h1"));

    assert_eq!(accumulator.error_count(), 0);
    assert_eq!(handle.cycle_state(), CycleState::Idle);

    handle.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_failed_cycle_does_not_stop_poller() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(page(vec![alarm_json("a", &[])], None)))
        .mount(&server)
        .await;

    let input = Arc::new(AlarmsInput::from_config(&config_for(&server)).unwrap());
    let accumulator = Arc::new(MemoryAccumulator::new());
    let handle = PollerHandle::spawn(input, accumulator.clone(), Duration::from_secs(3600));

    let first = handle.poll_now().await.unwrap();
    assert_eq!(first, CycleReport { points: 0, errors: 1 });

    let second = handle.poll_now().await.unwrap();
    assert_eq!(second, CycleReport { points: 1, errors: 0 });

    assert_eq!(accumulator.metric_count(), 1);
    assert_eq!(accumulator.error_count(), 1);

    handle.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_shared_handle_across_tasks() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(page(vec![alarm_json("a", &[])], None)))
        .mount(&server)
        .await;

    let input = Arc::new(AlarmsInput::from_config(&config_for(&server)).unwrap());
    let accumulator = Arc::new(MemoryAccumulator::new());
    let handle = PollerHandle::spawn(input, accumulator.clone(), Duration::from_secs(3600));

    let mut tasks = vec![];
    for _ in 0..4 {
        let handle = handle.clone();
        tasks.push(tokio::spawn(async move { handle.poll_now().await }));
    }
    for task in tasks {
        let report = task.await.unwrap().unwrap();
        assert_eq!(report.points, 1);
    }

    // cycles run one at a time, each emitting the same alarm
    assert_eq!(accumulator.metric_count(), 4);

    handle.shutdown().await.unwrap();
}
