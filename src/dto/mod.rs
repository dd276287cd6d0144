/// Health check payloads.
pub mod health;
/// Wire frames exchanged over the relay WebSocket.
pub mod ws;
