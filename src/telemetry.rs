//! Metric name constants.
//!
//! Centralised metric names for the ingestion service. Operators install
//! their own `metrics` recorder (e.g. prometheus, statsd); without a
//! recorder installed, all metric calls are no-ops.
//!
//! # Metric naming conventions
//!
//! All metrics are prefixed with `telemetry_`. Counters end in `_total`,
//! histograms use meaningful units (e.g. `_seconds`).

/// Total cast sessions that reached a terminal state.
///
/// Labels: `status` ("ok" | "error").
pub const SESSIONS_TOTAL: &str = "telemetry_sessions_total";

/// Total particle states counted across all sessions.
pub const STATES_TOTAL: &str = "telemetry_states_total";

/// Wall-clock duration of a cast session, open to terminal state.
///
/// Labels: `status` ("ok" | "error").
pub const SESSION_DURATION_SECONDS: &str = "telemetry_session_duration_seconds";

/// Total failed writes to the summary store.
pub const STORE_ERRORS_TOTAL: &str = "telemetry_store_errors_total";
