/// Client-side session state and reconciliation rules.
pub mod session;
/// Reconnection supervisor keeping a session linked to the relay.
pub mod supervisor;

pub use self::session::ClientSession;
pub use self::supervisor::{Link, LinkError};
