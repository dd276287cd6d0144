use tracing::warn;

use crate::{dto::health::HealthResponse, state::SharedState};

/// Respond with a health payload, probing the snapshot store on the way.
pub async fn health_status(state: &SharedState) -> HealthResponse {
    match state.snapshot_store().health_check().await {
        Ok(()) => HealthResponse::ok(),
        Err(err) => {
            warn!(error = %err, "snapshot store health check failed");
            HealthResponse::degraded()
        }
    }
}
