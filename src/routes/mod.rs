use axum::Router;

use crate::state::SharedState;

/// Swagger UI route.
pub mod docs;
/// Health check route.
pub mod health;
/// WebSocket relay route.
pub mod relay;
/// Snapshot persistence routes.
pub mod snapshot;

/// Compose all route trees, wiring in shared state and documentation routes.
pub fn router(state: SharedState) -> Router<()> {
    let api_router = health::router()
        .merge(relay::router())
        .merge(snapshot::router());

    let docs_router = docs::router(state.clone());

    api_router.merge(docs_router).with_state(state)
}
