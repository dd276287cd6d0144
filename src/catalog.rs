//! Read-only question bank: rounds, categories, questions.
//!
//! The catalog is external data. The sync core only ever reads identifiers,
//! point values, the special tag, and resolved content blocks from it; it
//! performs no validation or versioning of the file.

use std::{
    env, fs,
    io::ErrorKind,
    path::{Path, PathBuf},
};

use serde::Deserialize;
use tracing::{info, warn};

use crate::dto::ws::ContentPayload;

/// Special subtype whose questions score double.
const SPECIAL_DOUBLE_POINT: &str = "doublePoint";

/// Default catalog location on disk.
const DEFAULT_CATALOG_PATH: &str = "data/questions.json";
/// Environment variable that overrides [`DEFAULT_CATALOG_PATH`].
const CATALOG_PATH_ENV: &str = "TRIVIA_BOARD_CATALOG_PATH";

/// Static catalog of every round playable in the game.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Catalog {
    /// Rounds in play order.
    pub rounds: Vec<Round>,
}

/// One round of the board: a set of categories.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Round {
    /// Number the host selects the round by.
    pub round_number: u32,
    /// Display name.
    #[serde(default)]
    pub name: String,
    /// Categories shown as board columns.
    #[serde(default)]
    pub categories: Vec<Category>,
}

/// A board column.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Category {
    /// Identifier referenced by completion keys.
    pub id: String,
    /// Display name.
    #[serde(default)]
    pub name: String,
    /// Questions from lowest to highest value.
    #[serde(default)]
    pub questions: Vec<Question>,
}

/// One playable question.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Question {
    /// Identifier referenced by completion keys.
    pub id: String,
    /// Base point value.
    #[serde(default)]
    pub points: i64,
    /// `regular` or `special`.
    #[serde(rename = "type", default = "regular_kind")]
    pub kind: String,
    /// Bonus variant for special questions (double points, duel, wager, ...).
    #[serde(default)]
    pub special_type: Option<String>,
    /// Variant-specific configuration, passed through opaquely.
    #[serde(default)]
    pub special_config: Option<serde_json::Value>,
    /// Question content block.
    #[serde(default)]
    pub question: ContentBlock,
    /// Answer content block.
    #[serde(default)]
    pub answer: ContentBlock,
}

/// Resolved content with a presentation type tag.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentBlock {
    /// Presentation type (text, image, audio, video).
    #[serde(rename = "type", default = "text_kind")]
    pub kind: String,
    /// Resolved text content.
    #[serde(default)]
    pub content: String,
    /// Media reference for non-text content.
    #[serde(default)]
    pub media_url: Option<String>,
}

impl Default for ContentBlock {
    fn default() -> Self {
        Self {
            kind: text_kind(),
            content: String::new(),
            media_url: None,
        }
    }
}

fn regular_kind() -> String {
    "regular".to_string()
}

fn text_kind() -> String {
    "text".to_string()
}

impl Catalog {
    /// Load the catalog from the default location, honoring the environment
    /// override.
    pub fn load_default() -> Self {
        let path = env::var(CATALOG_PATH_ENV)
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_CATALOG_PATH));
        Self::load(&path)
    }

    /// Load the catalog from disk, falling back to an empty catalog when the
    /// file is missing or unreadable.
    pub fn load(path: &Path) -> Self {
        match fs::read_to_string(path) {
            Ok(contents) => match serde_json::from_str::<Self>(&contents) {
                Ok(catalog) => {
                    info!(
                        path = %path.display(),
                        rounds = catalog.rounds.len(),
                        "loaded question catalog"
                    );
                    catalog
                }
                Err(err) => {
                    warn!(
                        path = %path.display(),
                        error = %err,
                        "failed to parse catalog; starting with an empty board"
                    );
                    Self::default()
                }
            },
            Err(err) if err.kind() == ErrorKind::NotFound => {
                info!(path = %path.display(), "no question catalog found");
                Self::default()
            }
            Err(err) => {
                warn!(
                    path = %path.display(),
                    error = %err,
                    "failed to read catalog; starting with an empty board"
                );
                Self::default()
            }
        }
    }

    /// Round by number.
    pub fn round(&self, number: u32) -> Option<&Round> {
        self.rounds.iter().find(|r| r.round_number == number)
    }

    /// Question within a round by category and question id.
    pub fn question(&self, round: u32, category_id: &str, question_id: &str) -> Option<&Question> {
        self.round(round)?
            .categories
            .iter()
            .find(|c| c.id == category_id)?
            .questions
            .iter()
            .find(|q| q.id == question_id)
    }
}

impl Question {
    /// Whether the question is a special (bonus) card.
    pub fn is_special(&self) -> bool {
        self.kind == "special"
    }

    /// Whether a correct answer scores double.
    pub fn is_double_points(&self) -> bool {
        self.is_special() && self.special_type.as_deref() == Some(SPECIAL_DOUBLE_POINT)
    }

    /// Points a correct answer is actually worth, special rules applied.
    pub fn scored_points(&self) -> i64 {
        if self.is_double_points() {
            self.points * 2
        } else {
            self.points
        }
    }
}

impl From<&ContentBlock> for ContentPayload {
    fn from(block: &ContentBlock) -> Self {
        Self {
            content: (!block.content.is_empty()).then(|| block.content.clone()),
            kind: Some(block.kind.clone()),
            media_url: block.media_url.clone(),
        }
    }
}
