/// OpenAPI documentation generation.
pub mod documentation;
/// Debounced snapshot persistence.
pub mod flush_service;
/// Health check service.
pub mod health_service;
/// WebSocket connection and frame routing.
pub mod relay_service;
