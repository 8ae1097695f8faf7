//! Per-call state for one `CastParticleState` stream.
//!
//! A [`StreamSession`] is created fresh for every call and owned by the task
//! serving it. Nothing is shared between sessions, so counting needs no
//! locking.
//!
//! ```text
//!   Open ──record──▶ Receiving ──record──▶ Receiving
//!    │                  │
//!    │ end-of-stream    ├── end-of-stream ──▶ Closed  (summary sent)
//!    └──────────────────┤
//!                       ├── transport error ─▶ Failed (status propagated)
//!                       └── peer reset ──────▶ Failed (call dropped)
//! ```
//!
//! hyper ends the request body quietly when the peer resets the stream
//! (`RST_STREAM` or `GOAWAY`), so end-of-body alone does not mean the client
//! half-closed. The reset only surfaces once the handler is pending, at which
//! point hyper drops the call. [`StreamSession::run`] therefore yields once
//! between end-of-body and [`StreamSession::close`], and a session dropped
//! before reaching a terminal state counts as failed.
//!
//! A client that never half-closes keeps its session open indefinitely;
//! there is no per-stream timeout or record cap.

use std::time::Instant;

use futures_util::{Stream, StreamExt};
use tonic::Status;
use tracing::{debug, warn};

use super::proto::{CastSummary, ParticleState};
use crate::telemetry;

/// Lifecycle of a stream session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// No record received yet.
    Open,
    /// At least one record counted; more may follow.
    Receiving,
    /// Client ended the stream and the summary was produced.
    Closed,
    /// The transport failed before end-of-stream. No summary.
    Failed,
}

impl SessionState {
    /// `Closed` or `Failed`; no further transitions.
    pub fn is_terminal(self) -> bool {
        matches!(self, SessionState::Closed | SessionState::Failed)
    }
}

/// Tally for a single client stream.
#[derive(Debug)]
pub struct StreamSession {
    point_count: u64,
    state: SessionState,
    started: Instant,
}

impl Default for StreamSession {
    fn default() -> Self {
        Self::new()
    }
}

impl StreamSession {
    /// Fresh session in [`SessionState::Open`] with nothing counted.
    pub fn new() -> Self {
        Self {
            point_count: 0,
            state: SessionState::Open,
            started: Instant::now(),
        }
    }

    /// Current lifecycle state.
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Records counted so far.
    pub fn point_count(&self) -> u64 {
        self.point_count
    }

    /// Count one record. The record itself is not inspected.
    pub fn accept(&mut self, _record: &ParticleState) -> Result<(), Status> {
        if self.state.is_terminal() {
            return Err(Status::failed_precondition(format!(
                "session is {:?}; no further records accepted",
                self.state
            )));
        }
        self.point_count += 1;
        self.state = SessionState::Receiving;
        Ok(())
    }

    /// Handle end-of-stream and produce the one summary for this session.
    pub fn close(&mut self) -> Result<CastSummary, Status> {
        if self.state.is_terminal() {
            return Err(Status::failed_precondition(format!(
                "session already {:?}",
                self.state
            )));
        }
        self.state = SessionState::Closed;
        self.record_outcome("ok");
        metrics::counter!(telemetry::STATES_TOTAL).increment(self.point_count);
        Ok(CastSummary {
            num_states: self.point_count,
        })
    }

    /// Abort on a transport error. The status is handed back for propagation.
    pub fn fail(&mut self, status: Status) -> Status {
        if !self.state.is_terminal() {
            self.state = SessionState::Failed;
            self.record_outcome("error");
        }
        status
    }

    fn record_outcome(&self, status: &'static str) {
        metrics::counter!(telemetry::SESSIONS_TOTAL, "status" => status).increment(1);
        metrics::histogram!(telemetry::SESSION_DURATION_SECONDS, "status" => status)
            .record(self.started.elapsed().as_secs_f64());
    }

    /// Drain `records` in arrival order until end-of-stream or the first error.
    pub async fn run<S>(mut self, records: S) -> Result<CastSummary, Status>
    where
        S: Stream<Item = Result<ParticleState, Status>>,
    {
        let mut records = std::pin::pin!(records);
        while let Some(item) = records.next().await {
            match item {
                Ok(record) => self.accept(&record)?,
                Err(status) => {
                    warn!(
                        code = ?status.code(),
                        message = status.message(),
                        received = self.point_count,
                        "cast stream failed before end-of-stream"
                    );
                    return Err(self.fail(status));
                }
            }
        }

        // A reset peer gets the call dropped here, before anything commits.
        tokio::task::yield_now().await;

        let summary = self.close()?;
        debug!(
            num_states = summary.num_states,
            elapsed_ms = self.started.elapsed().as_millis() as u64,
            "cast stream closed"
        );
        Ok(summary)
    }
}

impl Drop for StreamSession {
    fn drop(&mut self) {
        if !self.state.is_terminal() {
            warn!(
                received = self.point_count,
                "cast stream abandoned before end-of-stream"
            );
            self.state = SessionState::Failed;
            self.record_outcome("error");
        }
    }
}
