mod common;

use common::CollectingSink;
use sqlmetrics_core::storage::DuckDbExecutor;
use sqlmetrics_core::{Error, MetricKind, MonitorConfig, MetricSpec, Querier, QuerySpec, SqlValue};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use tempfile::tempdir;
use tokio_util::sync::CancellationToken;

fn create_test_executor() -> DuckDbExecutor {
    let executor = DuckDbExecutor::open(":memory:").unwrap();
    executor
        .execute_batch(
            "CREATE TABLE load (host VARCHAR, region VARCHAR, cpu DOUBLE, requests BIGINT);
             INSERT INTO load VALUES
                ('node1', 'us-east', 0.25, 100),
                ('node2', NULL, NULL, 200),
                ('node3', 'us-west', 0.75, 300);",
        )
        .unwrap();
    executor
}

#[test]
fn test_query_to_events() {
    let mut executor = create_test_executor();
    let spec = QuerySpec::new(
        "SELECT host, region AS Region, cpu, requests FROM load ORDER BY host",
        vec![
            MetricSpec::gauge("host.cpu", "CPU").with_labels(["host", "region"]),
            MetricSpec::counter("host.requests", "requests").with_labels(["host"]),
        ],
    );
    let mut querier = Querier::new(Arc::new(spec), false);
    let sink = CollectingSink::default();

    let stats = querier
        .run(&mut executor, &sink, &CancellationToken::new())
        .unwrap();

    assert_eq!(stats.rows, 3);
    assert_eq!(stats.candidates, 6);
    assert_eq!(stats.emitted, 5);
    assert_eq!(stats.dropped, 1);

    let events = sink.events();
    let first = &events[0];
    assert_eq!(first.name, "host.cpu");
    assert_eq!(first.value, Some(0.25));
    assert_eq!(first.labels.get("Region").map(String::as_str), Some("us-east"));
    assert_eq!(first.labels.get("host").map(String::as_str), Some("node1"));

    let node2: Vec<_> = events
        .iter()
        .filter(|e| e.labels.get("host").map(String::as_str) == Some("node2"))
        .collect();
    assert_eq!(node2.len(), 1);
    assert_eq!(node2[0].kind, MetricKind::Counter);
    assert_eq!(node2[0].value, Some(200.0));
}

#[test]
fn test_positional_parameters() {
    let mut executor = create_test_executor();
    let spec = QuerySpec::new(
        "SELECT host, requests FROM load WHERE requests > ? AND host <> ?",
        vec![MetricSpec::gauge("requests", "requests").with_labels(["host"])],
    )
    .with_params(vec![SqlValue::Int(150), SqlValue::Text("node3".to_string())]);
    let mut querier = Querier::new(Arc::new(spec), false);
    let sink = CollectingSink::default();

    querier
        .run(&mut executor, &sink, &CancellationToken::new())
        .unwrap();

    let events = sink.events();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].labels.get("host").map(String::as_str), Some("node2"));
}

#[test]
fn test_rejected_statement() {
    let mut executor = create_test_executor();
    let spec = QuerySpec::new("SELECT * FROM no_such_table", vec![MetricSpec::gauge("x", "x")]);
    let mut querier = Querier::new(Arc::new(spec), false);
    let sink = CollectingSink::default();

    let err = querier
        .run(&mut executor, &sink, &CancellationToken::new())
        .unwrap_err();

    assert!(matches!(&err, Error::Execution { statement, .. } if statement == "SELECT * FROM no_such_table"));
    assert_eq!(sink.len(), 0);
}

#[test]
fn test_text_value_column_is_decode_error() {
    let mut executor = create_test_executor();
    let spec = QuerySpec::new(
        "SELECT host AS v FROM load ORDER BY host",
        vec![MetricSpec::gauge("v", "v")],
    );
    let mut querier = Querier::new(Arc::new(spec), false);
    let sink = CollectingSink::default();

    let err = querier
        .run(&mut executor, &sink, &CancellationToken::new())
        .unwrap_err();

    assert!(matches!(err, Error::Decode { column: Some(0), .. }));
}

#[test]
fn test_on_disk_database_shared_between_connections() {
    let temp_dir = tempdir().unwrap();
    let db_path = temp_dir.path().join("metrics.db");
    let primary = DuckDbExecutor::open(db_path.to_str().unwrap()).unwrap();
    primary
        .execute_batch("CREATE TABLE t (v INTEGER); INSERT INTO t VALUES (1), (2), (3);")
        .unwrap();

    let mut executor = primary.try_clone().unwrap();
    let spec = QuerySpec::new("SELECT sum(v) AS total FROM t", vec![MetricSpec::counter("total", "total")]);
    let mut querier = Querier::new(Arc::new(spec), true);
    let sink = CollectingSink::default();

    querier
        .run(&mut executor, &sink, &CancellationToken::new())
        .unwrap();

    assert_eq!(sink.events()[0].value, Some(6.0));
}

#[test]
fn test_cancel_interrupts_running_statement() {
    let mut executor = DuckDbExecutor::open(":memory:").unwrap();
    let spec = QuerySpec::new(
        "SELECT sum(a.range * b.range) AS v FROM range(60000) a, range(60000) b",
        vec![MetricSpec::gauge("v", "v")],
    );
    let mut querier = Querier::new(Arc::new(spec), false);
    let sink = CollectingSink::default();
    let cancel = CancellationToken::new();

    let canceller = {
        let cancel = cancel.clone();
        thread::spawn(move || {
            thread::sleep(Duration::from_millis(100));
            cancel.cancel();
        })
    };
    let started = Instant::now();
    let result = querier.run(&mut executor, &sink, &cancel);
    canceller.join().unwrap();

    assert!(matches!(result, Err(Error::Cancelled)));
    assert!(
        started.elapsed() < Duration::from_secs(5),
        "statement ran for {:?} after cancellation",
        started.elapsed()
    );
    assert_eq!(sink.len(), 0);
}

#[test]
fn test_completed_statement_is_not_interrupted() {
    let mut executor = create_test_executor();
    let spec = QuerySpec::new("SELECT count(*) AS n FROM load", vec![MetricSpec::gauge("n", "n")]);
    let mut querier = Querier::new(Arc::new(spec), false);
    let sink = CollectingSink::default();
    let cancel = CancellationToken::new();

    for _ in 0..3 {
        querier.run(&mut executor, &sink, &cancel).unwrap();
    }

    assert_eq!(sink.len(), 3);
    assert!(sink.events().iter().all(|e| e.value == Some(3.0)));
}

#[test]
fn test_database_options_from_config() {
    let config = MonitorConfig::from_toml_str(
        r#"
        [database]
        setup = ["CREATE TABLE t (v INTEGER)"]

        [database.options]
        threads = "2"
        "#,
    )
    .unwrap();
    let mut executor = DuckDbExecutor::from_config(&config.database).unwrap();
    let spec = QuerySpec::new(
        "SELECT current_setting('threads') AS threads",
        vec![MetricSpec::gauge("threads", "threads")],
    );
    let mut querier = Querier::new(Arc::new(spec), false);
    let sink = CollectingSink::default();

    querier
        .run(&mut executor, &sink, &CancellationToken::new())
        .unwrap();

    assert_eq!(sink.events()[0].value, Some(2.0));
}
