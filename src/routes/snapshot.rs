use axum::{Json, Router, extract::State, http::StatusCode, routing::get};

use crate::{dao::models::SnapshotEntity, error::AppError, state::SharedState};

#[utoipa::path(
    get,
    path = "/state",
    responses((status = 200, description = "Last persisted snapshot, or the empty default", body = SnapshotEntity))
)]
/// Return the last persisted snapshot, or the documented empty default.
pub async fn get_snapshot(
    State(state): State<SharedState>,
) -> Result<Json<SnapshotEntity>, AppError> {
    let snapshot = state.snapshot_store().load().await?;
    Ok(Json(snapshot))
}

#[utoipa::path(
    put,
    path = "/state",
    request_body = SnapshotEntity,
    responses((status = 204, description = "Snapshot replaced"))
)]
/// Replace the whole snapshot record. No partial updates.
pub async fn put_snapshot(
    State(state): State<SharedState>,
    Json(snapshot): Json<SnapshotEntity>,
) -> Result<StatusCode, AppError> {
    // The relay mirror is a late joiner like any other client: merge the
    // incoming document with the reconciliation rules before persisting it.
    state.hydrate_mirror(&snapshot).await;
    state.snapshot_store().save(snapshot).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    delete,
    path = "/state",
    responses((status = 204, description = "Snapshot reset to the empty default"))
)]
/// Reset the record to the empty default rather than deleting it.
pub async fn delete_snapshot(State(state): State<SharedState>) -> Result<StatusCode, AppError> {
    state.snapshot_store().clear().await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Configure the snapshot routes subtree.
pub fn router() -> Router<SharedState> {
    Router::<SharedState>::new().route(
        "/state",
        get(get_snapshot).put(put_snapshot).delete(delete_snapshot),
    )
}
