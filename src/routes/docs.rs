use axum::Router;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::{services::documentation::ApiDoc, state::SharedState};

/// Serve the Swagger UI and the generated OpenAPI document.
pub fn router(state: SharedState) -> Router<SharedState> {
    let swagger = SwaggerUi::new("/docs").url("/api-doc/openapi.json", ApiDoc::openapi());
    Router::<SharedState>::from(swagger).with_state(state)
}
