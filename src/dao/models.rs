use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Durable projection of the game board persisted between sessions.
///
/// This is a recovery snapshot, not a live mirror: writers debounce, so the
/// record can trail the event stream by up to one flush interval. Field names
/// match the JSON document stored on disk and served over `/state`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct SnapshotEntity {
    /// Round that was active when the snapshot was taken.
    pub current_round: u32,
    /// Completion keys (`"categoryId-questionId"`) marked so far.
    pub completed_questions: Vec<String>,
    /// Roster at snapshot time, free of any connection identifiers.
    pub teams: Vec<TeamEntity>,
    /// RFC3339 timestamp stamped by the store on save.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
}

impl Default for SnapshotEntity {
    fn default() -> Self {
        Self {
            current_round: 1,
            completed_questions: Vec::new(),
            teams: Vec::new(),
            updated_at: None,
        }
    }
}

/// Persisted team record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TeamEntity {
    /// Client-generated unique identifier.
    pub id: String,
    /// Display name chosen by the team.
    pub name: String,
    /// Display color chosen at registration.
    #[serde(default)]
    pub color: String,
    /// Avatar reference chosen at registration.
    #[serde(default)]
    pub avatar: String,
    /// Score at snapshot time.
    #[serde(default)]
    pub score: i64,
    /// Consecutive correct answers at snapshot time.
    #[serde(default)]
    pub streak: u32,
}
