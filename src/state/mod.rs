/// Replicated game board state machine.
pub mod board;
/// Broadcast hub for relayed frames.
pub mod hub;

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::{RwLock, watch};
use uuid::Uuid;

use crate::{
    config::AppConfig,
    dao::{models::SnapshotEntity, snapshot_store::SnapshotStore},
    state::board::{Applied, BoardEvent, GameBoard},
};

pub use self::hub::{Envelope, RelayHub};

/// Shared handle to the application state.
pub type SharedState = Arc<AppState>;

/// Bookkeeping for one live WebSocket connection.
#[derive(Debug, Clone, Default)]
pub struct ConnectionEntry {
    /// Team the connection registered or rejoined as, once known.
    pub team_id: Option<String>,
}

/// Central application state: the relay hub, the connection registry, the
/// relay's own board mirror, and the snapshot store handle.
pub struct AppState {
    config: AppConfig,
    hub: RelayHub,
    connections: DashMap<Uuid, ConnectionEntry>,
    board: RwLock<GameBoard>,
    store: Arc<dyn SnapshotStore>,
    dirty: watch::Sender<u64>,
}

impl AppState {
    /// Construct the shared state wrapped in an [`Arc`] so it can be cloned cheaply.
    pub fn new(config: AppConfig, store: Arc<dyn SnapshotStore>) -> SharedState {
        let hub = RelayHub::new(config.hub_capacity());
        let (dirty_tx, _rx) = watch::channel(0);
        Arc::new(Self {
            config,
            hub,
            connections: DashMap::new(),
            board: RwLock::new(GameBoard::new()),
            store,
            dirty: dirty_tx,
        })
    }

    /// Immutable runtime configuration.
    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Broadcast hub used to fan frames out to socket tasks.
    pub fn hub(&self) -> &RelayHub {
        &self.hub
    }

    /// Registry of live connections keyed by their relay-assigned identity.
    pub fn connections(&self) -> &DashMap<Uuid, ConnectionEntry> {
        &self.connections
    }

    /// Handle to the snapshot store.
    pub fn snapshot_store(&self) -> Arc<dyn SnapshotStore> {
        self.store.clone()
    }

    /// Apply one event to the relay's board mirror, flagging the flusher when
    /// the mirror actually changed.
    pub async fn apply_to_mirror(&self, event: BoardEvent) -> Applied {
        let mut board = self.board.write().await;
        let applied = board.apply(event);
        if applied.changed() {
            let _ = self.dirty.send(board.version());
        }
        applied
    }

    /// Merge a snapshot into the mirror using the reconciliation rules.
    pub async fn hydrate_mirror(&self, snapshot: &SnapshotEntity) -> Applied {
        let mut board = self.board.write().await;
        let applied = board.hydrate(snapshot);
        if applied.changed() {
            let _ = self.dirty.send(board.version());
        }
        applied
    }

    /// Project the mirror into a persistable snapshot.
    pub async fn mirror_snapshot(&self) -> SnapshotEntity {
        let board = self.board.read().await;
        board.snapshot()
    }

    /// Subscribe to mirror mutations (carries the mirror version).
    pub fn dirty_watcher(&self) -> watch::Receiver<u64> {
        self.dirty.subscribe()
    }
}
