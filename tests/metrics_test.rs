//! Tests for session metrics.
//!
//! Uses `metrics_util::debugging::DebuggingRecorder` to capture and assert
//! on emitted metrics without needing a real exporter.

#![cfg(feature = "server")]

use futures_util::{FutureExt, stream};
use metrics_util::MetricKind;
use metrics_util::debugging::{DebugValue, DebuggingRecorder};
use tonic::Status;

use telemetry_server::server::StreamSession;
#[cfg(feature = "client")]
use telemetry_server::server::config::ServerConfig;
#[cfg(feature = "client")]
use telemetry_server::server::{TelemetryServer, TelemetryService};
use telemetry_server::{ParticleState, telemetry};

// ============================================================================
// Snapshot type alias for readability
// ============================================================================

type SnapshotVec = Vec<(
    metrics_util::CompositeKey,
    Option<metrics::Unit>,
    Option<metrics::SharedString>,
    DebugValue,
)>;

// ============================================================================
// Helpers
// ============================================================================

/// Sum counter values for `name` whose `status` label (if any) matches.
fn counter_total(snapshot: &SnapshotVec, name: &str, status: Option<&str>) -> u64 {
    snapshot
        .iter()
        .filter(|(key, _, _, _)| key.kind() == MetricKind::Counter && key.key().name() == name)
        .filter(|(key, _, _, _)| match status {
            Some(status) => key
                .key()
                .labels()
                .any(|l| l.key() == "status" && l.value() == status),
            None => true,
        })
        .map(|(_, _, _, value)| match value {
            DebugValue::Counter(v) => *v,
            _ => 0,
        })
        .sum()
}

fn has_histogram(snapshot: &SnapshotVec, name: &str) -> bool {
    snapshot
        .iter()
        .any(|(key, _, _, _)| key.kind() == MetricKind::Histogram && key.key().name() == name)
}

fn records(n: u64) -> Vec<Result<ParticleState, Status>> {
    (0..n).map(|_| Ok(ParticleState::default())).collect()
}

/// Drive one session under a local recorder and return the snapshot.
fn run_recorded(items: Vec<Result<ParticleState, Status>>) -> SnapshotVec {
    let recorder = DebuggingRecorder::new();
    let snapshotter = recorder.snapshotter();
    let runtime = tokio::runtime::Builder::new_current_thread()
        .build()
        .unwrap();

    let _ = metrics::with_local_recorder(&recorder, || {
        runtime.block_on(StreamSession::new().run(stream::iter(items)))
    });

    snapshotter.snapshot().into_vec()
}

// ============================================================================
// Tests
// ============================================================================

#[test]
fn closed_session_records_success_and_state_count() {
    let snapshot = run_recorded(records(5));

    assert_eq!(counter_total(&snapshot, telemetry::SESSIONS_TOTAL, Some("ok")), 1);
    assert_eq!(counter_total(&snapshot, telemetry::SESSIONS_TOTAL, Some("error")), 0);
    assert_eq!(counter_total(&snapshot, telemetry::STATES_TOTAL, None), 5);
    assert!(has_histogram(&snapshot, telemetry::SESSION_DURATION_SECONDS));
}

#[test]
fn failed_session_records_error_and_no_states() {
    let mut items = records(2);
    items.push(Err(Status::cancelled("client disconnected")));
    let snapshot = run_recorded(items);

    assert_eq!(counter_total(&snapshot, telemetry::SESSIONS_TOTAL, Some("error")), 1);
    assert_eq!(counter_total(&snapshot, telemetry::SESSIONS_TOTAL, Some("ok")), 0);
    assert_eq!(counter_total(&snapshot, telemetry::STATES_TOTAL, None), 0);
}

#[test]
fn empty_session_is_a_success() {
    let snapshot = run_recorded(Vec::new());

    assert_eq!(counter_total(&snapshot, telemetry::SESSIONS_TOTAL, Some("ok")), 1);
    assert_eq!(counter_total(&snapshot, telemetry::STATES_TOTAL, None), 0);
}

#[test]
fn session_dropped_at_end_of_body_records_error() {
    // What hyper does to a call whose peer reset the stream: the body ends,
    // then the handler is dropped at its next pending point.
    let recorder = DebuggingRecorder::new();
    let snapshotter = recorder.snapshotter();

    metrics::with_local_recorder(&recorder, || {
        let pending = StreamSession::new()
            .run(stream::iter(records(2)))
            .now_or_never();
        assert!(pending.is_none());
    });

    let snapshot = snapshotter.snapshot().into_vec();
    assert_eq!(counter_total(&snapshot, telemetry::SESSIONS_TOTAL, Some("error")), 1);
    assert_eq!(counter_total(&snapshot, telemetry::SESSIONS_TOTAL, Some("ok")), 0);
    assert_eq!(counter_total(&snapshot, telemetry::STATES_TOTAL, None), 0);
}

#[cfg(feature = "client")]
#[test]
fn client_disconnect_records_error_not_success() {
    use std::time::Duration;

    use futures_util::StreamExt;
    use telemetry_server::client::TelemetryClient;

    let recorder = DebuggingRecorder::new();
    let snapshotter = recorder.snapshotter();
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap();

    metrics::with_local_recorder(&recorder, || {
        runtime.block_on(async {
            let config = ServerConfig {
                port: 0,
                ..Default::default()
            };
            let server = TelemetryServer::bind(&config, TelemetryService::without_store())
                .await
                .unwrap();
            let addr = format!("http://{}", server.local_addr());
            tokio::spawn(server.serve());

            let client = TelemetryClient::connect(addr).await.unwrap();
            let states = stream::iter(vec![ParticleState::default(); 2]).chain(stream::pending());
            let call = tokio::spawn(async move { client.cast_stream(states).await });
            tokio::time::sleep(Duration::from_millis(100)).await;

            call.abort();
            assert!(call.await.unwrap_err().is_cancelled());
            tokio::time::sleep(Duration::from_millis(100)).await;
        })
    });

    let snapshot = snapshotter.snapshot().into_vec();
    assert_eq!(counter_total(&snapshot, telemetry::SESSIONS_TOTAL, Some("error")), 1);
    assert_eq!(counter_total(&snapshot, telemetry::SESSIONS_TOTAL, Some("ok")), 0);
    assert_eq!(counter_total(&snapshot, telemetry::STATES_TOTAL, None), 0);
}
