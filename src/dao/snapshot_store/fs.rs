use std::{io::ErrorKind, path::PathBuf};

use futures::future::BoxFuture;
use time::{OffsetDateTime, format_description::well_known::Rfc3339};
use tracing::warn;

use crate::dao::{
    models::SnapshotEntity,
    snapshot_store::SnapshotStore,
    storage::{StorageError, StorageResult},
};

/// Snapshot store backed by a single JSON file on local disk.
#[derive(Debug, Clone)]
pub struct FsSnapshotStore {
    path: PathBuf,
}

impl FsSnapshotStore {
    /// Create a store writing to `path`. Nothing is touched on disk until the
    /// first save.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    async fn read(&self) -> StorageResult<SnapshotEntity> {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(contents) => match serde_json::from_str(&contents) {
                Ok(snapshot) => Ok(snapshot),
                Err(err) => {
                    // A corrupt snapshot is a recoverable miss, not a fault.
                    warn!(
                        path = %self.path.display(),
                        error = %err,
                        "snapshot file is unreadable; falling back to defaults"
                    );
                    Ok(SnapshotEntity::default())
                }
            },
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(SnapshotEntity::default()),
            Err(err) => Err(StorageError::io(
                format!("reading {}", self.path.display()),
                err,
            )),
        }
    }

    async fn write(&self, mut snapshot: SnapshotEntity) -> StorageResult<()> {
        snapshot.updated_at = Some(timestamp());
        self.ensure_parent().await?;

        let payload = serde_json::to_string_pretty(&snapshot)?;
        tokio::fs::write(&self.path, payload)
            .await
            .map_err(|err| StorageError::io(format!("writing {}", self.path.display()), err))
    }

    async fn ensure_parent(&self) -> StorageResult<()> {
        let Some(parent) = self.path.parent() else {
            return Ok(());
        };
        if parent.as_os_str().is_empty() {
            return Ok(());
        }
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|err| StorageError::io(format!("creating {}", parent.display()), err))
    }
}

impl SnapshotStore for FsSnapshotStore {
    fn load(&self) -> BoxFuture<'static, StorageResult<SnapshotEntity>> {
        let store = self.clone();
        Box::pin(async move { store.read().await })
    }

    fn save(&self, snapshot: SnapshotEntity) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.write(snapshot).await })
    }

    fn clear(&self) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.write(SnapshotEntity::default()).await })
    }

    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.ensure_parent().await })
    }
}

/// RFC3339 stamp for the `updatedAt` field.
fn timestamp() -> String {
    OffsetDateTime::now_utc()
        .format(&Rfc3339)
        .unwrap_or_else(|_| "invalid-timestamp".into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dao::models::TeamEntity;
    use uuid::Uuid;

    fn scratch_store() -> FsSnapshotStore {
        let path = std::env::temp_dir()
            .join("trivia-board-back-tests")
            .join(format!("{}.json", Uuid::new_v4()));
        FsSnapshotStore::new(path)
    }

    #[tokio::test]
    async fn load_returns_default_when_file_missing() {
        let store = scratch_store();
        let snapshot = store.load().await.unwrap();
        assert_eq!(snapshot, SnapshotEntity::default());
        assert_eq!(snapshot.current_round, 1);
        assert!(snapshot.completed_questions.is_empty());
        assert!(snapshot.teams.is_empty());
    }

    #[tokio::test]
    async fn save_then_load_round_trips_and_stamps_time() {
        let store = scratch_store();
        let snapshot = SnapshotEntity {
            current_round: 3,
            completed_questions: vec!["cat1-q1".into(), "cat2-q4".into()],
            teams: vec![TeamEntity {
                id: "team-1".into(),
                name: "Alpha".into(),
                color: "#ff5500".into(),
                avatar: "fox".into(),
                score: 400,
                streak: 2,
            }],
            updated_at: None,
        };

        store.save(snapshot.clone()).await.unwrap();
        let loaded = store.load().await.unwrap();

        assert_eq!(loaded.current_round, 3);
        assert_eq!(loaded.completed_questions, snapshot.completed_questions);
        assert_eq!(loaded.teams, snapshot.teams);
        assert!(loaded.updated_at.is_some());

        let _ = tokio::fs::remove_file(store.path.clone()).await;
    }

    #[tokio::test]
    async fn clear_resets_to_default_without_deleting() {
        let store = scratch_store();
        store
            .save(SnapshotEntity {
                current_round: 2,
                completed_questions: vec!["cat1-q1".into()],
                ..SnapshotEntity::default()
            })
            .await
            .unwrap();

        store.clear().await.unwrap();

        assert!(tokio::fs::try_exists(&store.path).await.unwrap());
        let loaded = store.load().await.unwrap();
        assert_eq!(loaded.current_round, 1);
        assert!(loaded.completed_questions.is_empty());
        assert!(loaded.teams.is_empty());

        let _ = tokio::fs::remove_file(store.path.clone()).await;
    }

    #[tokio::test]
    async fn corrupt_file_falls_back_to_default() {
        let store = scratch_store();
        tokio::fs::create_dir_all(store.path.parent().unwrap())
            .await
            .unwrap();
        tokio::fs::write(&store.path, b"{ not json").await.unwrap();

        let loaded = store.load().await.unwrap();
        assert_eq!(loaded, SnapshotEntity::default());

        let _ = tokio::fs::remove_file(store.path.clone()).await;
    }
}
