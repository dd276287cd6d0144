use tokio::time::sleep;
use tracing::{debug, warn};

use crate::state::SharedState;

/// Debounced snapshot flusher.
///
/// Mirror mutations only flag a watch channel; this task wakes on the flag,
/// sleeps out the debounce window so a burst of rapid play coalesces into one
/// write, then persists the mirror. The store is therefore a recovery
/// snapshot that can trail the live stream by up to one window — the event
/// stream stays the source of truth while clients are connected.
pub async fn run(state: SharedState) {
    let debounce = state.config().flush_debounce();
    let mut dirty = state.dirty_watcher();

    loop {
        if dirty.changed().await.is_err() {
            break;
        }
        sleep(debounce).await;
        let version = *dirty.borrow_and_update();

        let snapshot = state.mirror_snapshot().await;
        match state.snapshot_store().save(snapshot).await {
            Ok(()) => debug!(version, "snapshot flushed"),
            Err(err) => {
                // Recoverable: the mirror keeps the state until the next
                // mutation triggers another attempt.
                warn!(version, error = %err, "snapshot flush failed; state remains in memory");
            }
        }
    }
}
