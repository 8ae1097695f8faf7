//! gRPC service implementation.

use std::sync::Arc;

use tonic::{Request, Response, Status, Streaming};
use tracing::{error, info};

use super::proto::telemetry_server::Telemetry;
use super::proto::{CastSummary, HealthRequest, HealthResponse, ParticleState};
use super::session::StreamSession;
use crate::store::{SessionRecord, SummaryStore};
use crate::{telemetry, version};

/// gRPC service that counts cast streams and hands summaries to a store.
#[derive(Clone)]
pub struct TelemetryService {
    store: Option<Arc<dyn SummaryStore>>,
}

impl std::fmt::Debug for TelemetryService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TelemetryService")
            .field("store", &self.store.is_some())
            .finish()
    }
}

impl TelemetryService {
    /// Create a service that persists every completed session to `store`.
    pub fn new(store: Arc<dyn SummaryStore>) -> Self {
        Self { store: Some(store) }
    }

    /// Create a service that only answers callers and persists nothing.
    pub fn without_store() -> Self {
        Self { store: None }
    }

    /// Persist a closed session. Failures are logged; the caller still gets
    /// its summary.
    async fn hand_off(&self, record: SessionRecord) {
        let Some(store) = &self.store else {
            return;
        };
        if let Err(e) = store.record(&record).await {
            metrics::counter!(telemetry::STORE_ERRORS_TOTAL).increment(1);
            error!(error = %e, num_states = record.num_states, "failed to persist cast summary");
        }
    }
}

#[tonic::async_trait]
impl Telemetry for TelemetryService {
    async fn cast_particle_state(
        &self,
        request: Request<Streaming<ParticleState>>,
    ) -> Result<Response<CastSummary>, Status> {
        let peer = request.remote_addr();
        let summary = StreamSession::new().run(request.into_inner()).await?;

        info!(
            peer = ?peer,
            num_states = summary.num_states,
            "cast complete"
        );
        self.hand_off(SessionRecord::now(peer, summary.num_states)).await;

        Ok(Response::new(summary))
    }

    async fn health(
        &self,
        _request: Request<HealthRequest>,
    ) -> Result<Response<HealthResponse>, Status> {
        Ok(Response::new(HealthResponse {
            healthy: true,
            version: version::version_string(),
            git_sha: version::git_sha().map(str::to_string),
        }))
    }
}
