use utoipa::OpenApi;

#[derive(OpenApi)]
/// Aggregated OpenAPI specification for Trivia Board Back.
#[openapi(
    paths(
        crate::routes::health::healthcheck,
        crate::routes::relay::ws_handler,
        crate::routes::snapshot::get_snapshot,
        crate::routes::snapshot::put_snapshot,
        crate::routes::snapshot::delete_snapshot,
    ),
    components(
        schemas(
            crate::dto::health::HealthResponse,
            crate::dto::ws::ClientFrame,
            crate::dto::ws::ServerFrame,
            crate::dto::ws::TeamPayload,
            crate::dto::ws::BuzzPayload,
            crate::dto::ws::QuestionKey,
            crate::dto::ws::ScoreDeltaPayload,
            crate::dto::ws::ScoreSetPayload,
            crate::dto::ws::SpecialPayload,
            crate::dao::models::SnapshotEntity,
            crate::dao::models::TeamEntity,
        )
    ),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "relay", description = "WebSocket relay for game clients"),
        (name = "snapshot", description = "Recovery snapshot persistence"),
    )
)]
pub struct ApiDoc;
