use indexmap::{IndexMap, IndexSet};

use crate::{
    dao::models::{SnapshotEntity, TeamEntity},
    dto::ws::{ServerFrame, TeamPayload},
};

/// Marker used when a registration arrives without an avatar reference.
pub const DEFAULT_AVATAR: &str = "🎯";

/// A participating team as tracked by every mirror.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Team {
    /// Client-generated unique identifier.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Display color.
    pub color: String,
    /// Avatar reference.
    pub avatar: String,
    /// Current score.
    pub score: i64,
    /// Consecutive correct answers.
    pub streak: u32,
}

impl From<TeamPayload> for Team {
    fn from(payload: TeamPayload) -> Self {
        Self {
            id: payload.id,
            name: payload.name,
            color: payload.color,
            avatar: payload
                .avatar
                .unwrap_or_else(|| DEFAULT_AVATAR.to_string()),
            score: payload.score,
            streak: payload.streak,
        }
    }
}

impl From<Team> for TeamPayload {
    fn from(team: Team) -> Self {
        Self {
            id: team.id,
            name: team.name,
            color: team.color,
            avatar: Some(team.avatar),
            score: team.score,
            streak: team.streak,
            avatar_id: None,
        }
    }
}

impl From<&TeamEntity> for Team {
    fn from(entity: &TeamEntity) -> Self {
        Self {
            id: entity.id.clone(),
            name: entity.name.clone(),
            color: entity.color.clone(),
            avatar: entity.avatar.clone(),
            score: entity.score,
            streak: entity.streak,
        }
    }
}

impl From<&Team> for TeamEntity {
    fn from(team: &Team) -> Self {
        Self {
            id: team.id.clone(),
            name: team.name.clone(),
            color: team.color.clone(),
            avatar: team.avatar.clone(),
            score: team.score,
            streak: team.streak,
        }
    }
}

/// Whether a reducer changed the state, driving the version counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Applied {
    /// The event mutated the board.
    Changed,
    /// The event was a no-op (already applied, stale reference, held lock).
    Unchanged,
}

impl Applied {
    /// True when the event mutated the board.
    pub fn changed(self) -> bool {
        matches!(self, Applied::Changed)
    }
}

impl From<bool> for Applied {
    fn from(changed: bool) -> Self {
        if changed {
            Applied::Changed
        } else {
            Applied::Unchanged
        }
    }
}

/// Events the reducers understand.
///
/// Wire notifications map onto a subset of these (see
/// [`event_for_frame`]); the selection and streak variants only ever
/// originate locally on the host.
#[derive(Debug, Clone, PartialEq)]
pub enum BoardEvent {
    /// A team joined; idempotent, never overwrites an existing record.
    TeamRegistered {
        /// Full team record.
        team: Team,
    },
    /// A team was explicitly removed; the only way a team leaves the roster.
    TeamRemoved {
        /// Target team id.
        team_id: String,
    },
    /// A team claims the buzzer; first writer wins until a clear.
    BuzzerPressed {
        /// Claiming team id.
        team_id: String,
    },
    /// The buzzer lock is released.
    BuzzerCleared,
    /// The active round changed, abandoning the current board focus.
    RoundChanged {
        /// New round number.
        round: u32,
    },
    /// The host focused a question on the board (local-only).
    QuestionSelected {
        /// Category of the focused question.
        category_id: String,
        /// Focused question id.
        question_id: String,
        /// Staged question content for later reveal.
        question: Option<String>,
        /// Staged answer content for later reveal.
        answer: Option<String>,
    },
    /// The screen was cleared: focus, content, and reveal flags drop.
    SelectionCleared,
    /// Question content went up on the screen.
    QuestionRevealed {
        /// Resolved content delivered over the wire, when present.
        content: Option<String>,
    },
    /// Question content was hidden (content itself is kept staged).
    QuestionHidden,
    /// Answer content went up on the screen.
    AnswerRevealed {
        /// Resolved content delivered over the wire, when present.
        content: Option<String>,
    },
    /// Answer content was hidden.
    AnswerHidden,
    /// A score changed by a delta; receivers converge on `new_score` when set.
    ScoreUpdated {
        /// Team being scored.
        team_id: String,
        /// Points to add (may be negative).
        points: i64,
        /// Sender's resulting absolute score.
        new_score: Option<i64>,
    },
    /// A score was overwritten outright (explicit host editing).
    ScoreSet {
        /// Team being edited.
        team_id: String,
        /// New absolute score.
        score: i64,
    },
    /// A streak was set (local-only: streaks ride along with score events).
    StreakSet {
        /// Team whose streak changes.
        team_id: String,
        /// New streak value.
        streak: u32,
    },
    /// A question was marked resolved; idempotent.
    CompletionMarked {
        /// Category of the question.
        category_id: String,
        /// Question id.
        question_id: String,
    },
    /// A question was reopened; idempotent.
    CompletionUnmarked {
        /// Category of the question.
        category_id: String,
        /// Question id.
        question_id: String,
    },
    /// A special card's nature was unveiled; independent of completion.
    SpecialRevealed {
        /// Category of the card.
        category_id: String,
        /// Question behind the card.
        question_id: String,
    },
    /// A special card was covered back up.
    SpecialHidden {
        /// Category of the card.
        category_id: String,
        /// Question behind the card.
        question_id: String,
    },
    /// Everything returns to defaults.
    Reset,
}

/// Composite key marking a question inside the completion and special sets.
pub fn completion_key(category_id: &str, question_id: &str) -> String {
    format!("{category_id}-{question_id}")
}

/// Reducer event carried by a broadcast frame, if any.
///
/// Audio transport frames and disconnect notices carry no board state and map
/// to `None`; both buzzer release kinds collapse onto the same reducer.
pub fn event_for_frame(frame: &ServerFrame) -> Option<BoardEvent> {
    let event = match frame {
        ServerFrame::TeamRegistered(team) => BoardEvent::TeamRegistered {
            team: Team::from(team.clone()),
        },
        ServerFrame::TeamRemoved(target) => BoardEvent::TeamRemoved {
            team_id: target.team_id.clone(),
        },
        ServerFrame::BuzzerPressed(buzz) => BoardEvent::BuzzerPressed {
            team_id: buzz.team_id.clone(),
        },
        ServerFrame::BuzzerCleared | ServerFrame::BuzzerReset => BoardEvent::BuzzerCleared,
        ServerFrame::RoundChanged(payload) => BoardEvent::RoundChanged {
            round: payload.round,
        },
        ServerFrame::QuestionRevealed(content) => BoardEvent::QuestionRevealed {
            content: content.content.clone(),
        },
        ServerFrame::QuestionHidden => BoardEvent::QuestionHidden,
        ServerFrame::QuestionCleared => BoardEvent::SelectionCleared,
        ServerFrame::AnswerRevealed(content) => BoardEvent::AnswerRevealed {
            content: content.content.clone(),
        },
        ServerFrame::AnswerHidden => BoardEvent::AnswerHidden,
        ServerFrame::QuestionCompleted(key) => BoardEvent::CompletionMarked {
            category_id: key.category_id.clone(),
            question_id: key.question_id.clone(),
        },
        ServerFrame::QuestionUncompleted(key) => BoardEvent::CompletionUnmarked {
            category_id: key.category_id.clone(),
            question_id: key.question_id.clone(),
        },
        ServerFrame::ScoreUpdated(delta) => BoardEvent::ScoreUpdated {
            team_id: delta.team_id.clone(),
            points: delta.points,
            new_score: delta.new_score,
        },
        ServerFrame::ScoreSet(payload) => BoardEvent::ScoreSet {
            team_id: payload.team_id.clone(),
            score: payload.score,
        },
        ServerFrame::SpecialRevealed(card) => BoardEvent::SpecialRevealed {
            category_id: card.category_id.clone(),
            question_id: card.question_id.clone(),
        },
        ServerFrame::SpecialHidden(card) => BoardEvent::SpecialHidden {
            category_id: card.category_id.clone(),
            question_id: card.question_id.clone(),
        },
        ServerFrame::ResetAll => BoardEvent::Reset,
        ServerFrame::TeamDisconnected(_)
        | ServerFrame::AudioPlay
        | ServerFrame::AudioPause
        | ServerFrame::AudioSeek(_)
        | ServerFrame::Unknown => return None,
    };
    Some(event)
}

/// One logical game state, mirrored in every connected process.
///
/// Each mirror applies the identical reducers to the same event stream, so
/// mirrors converge without any cross-client coordination. The container is
/// constructor-injected — never a process-wide global — so isolated games can
/// coexist in one process (and in tests).
#[derive(Debug, Clone)]
pub struct GameBoard {
    current_round: u32,
    buzzer_locked: bool,
    buzzer_team: Option<String>,
    teams: IndexMap<String, Team>,
    selected_category: Option<String>,
    selected_question: Option<String>,
    completed_questions: IndexSet<String>,
    revealed_special_cards: IndexSet<String>,
    revealed_question: bool,
    revealed_answer: bool,
    current_question: Option<String>,
    current_answer: Option<String>,
    version: u64,
}

impl Default for GameBoard {
    fn default() -> Self {
        Self {
            current_round: 1,
            buzzer_locked: false,
            buzzer_team: None,
            teams: IndexMap::new(),
            selected_category: None,
            selected_question: None,
            completed_questions: IndexSet::new(),
            revealed_special_cards: IndexSet::new(),
            revealed_question: false,
            revealed_answer: false,
            current_question: None,
            current_answer: None,
            version: 0,
        }
    }
}

impl GameBoard {
    /// Create a board with all-empty defaults (round 1, nothing selected).
    pub fn new() -> Self {
        Self::default()
    }

    /// Active round number.
    pub fn current_round(&self) -> u32 {
        self.current_round
    }

    /// Whether a team currently holds the buzzer.
    pub fn buzzer_locked(&self) -> bool {
        self.buzzer_locked
    }

    /// Team holding the buzzer. Some iff [`Self::buzzer_locked`].
    pub fn buzzer_team(&self) -> Option<&str> {
        self.buzzer_team.as_deref()
    }

    /// Roster in join order.
    pub fn teams(&self) -> impl Iterator<Item = &Team> {
        self.teams.values()
    }

    /// Number of registered teams.
    pub fn team_count(&self) -> usize {
        self.teams.len()
    }

    /// Look up a team by id.
    pub fn team(&self, team_id: &str) -> Option<&Team> {
        self.teams.get(team_id)
    }

    /// The host's current board focus, when one is set.
    pub fn selection(&self) -> Option<(&str, &str)> {
        match (&self.selected_category, &self.selected_question) {
            (Some(category), Some(question)) => Some((category.as_str(), question.as_str())),
            _ => None,
        }
    }

    /// Completion keys marked so far, in marking order.
    pub fn completed_questions(&self) -> &IndexSet<String> {
        &self.completed_questions
    }

    /// Whether a question has been marked resolved.
    pub fn is_completed(&self, category_id: &str, question_id: &str) -> bool {
        self.completed_questions
            .contains(&completion_key(category_id, question_id))
    }

    /// Whether a special card's nature has been unveiled.
    pub fn is_special_revealed(&self, category_id: &str, question_id: &str) -> bool {
        self.revealed_special_cards
            .contains(&completion_key(category_id, question_id))
    }

    /// Whether the question is currently projected.
    pub fn revealed_question(&self) -> bool {
        self.revealed_question
    }

    /// Whether the answer is currently projected.
    pub fn revealed_answer(&self) -> bool {
        self.revealed_answer
    }

    /// Content staged or projected for the current question.
    pub fn current_question(&self) -> Option<&str> {
        self.current_question.as_deref()
    }

    /// Content staged or projected for the current answer.
    pub fn current_answer(&self) -> Option<&str> {
        self.current_answer.as_deref()
    }

    /// Monotonically increasing mutation counter.
    ///
    /// Presentation layers compare this against a remembered value to detect
    /// "something changed" without deep-diffing the mirror.
    pub fn version(&self) -> u64 {
        self.version
    }

    /// Apply one event through its reducer.
    ///
    /// Reducers are total: stale team or question references reduce to
    /// [`Applied::Unchanged`] instead of raising, since stale references are
    /// expected in a distributed stream, not exceptional.
    pub fn apply(&mut self, event: BoardEvent) -> Applied {
        let applied = match event {
            BoardEvent::TeamRegistered { team } => self.register_team(team),
            BoardEvent::TeamRemoved { team_id } => self.remove_team(&team_id),
            BoardEvent::BuzzerPressed { team_id } => self.press_buzzer(team_id),
            BoardEvent::BuzzerCleared => self.clear_buzzer(),
            BoardEvent::RoundChanged { round } => self.change_round(round),
            BoardEvent::QuestionSelected {
                category_id,
                question_id,
                question,
                answer,
            } => self.select_question(category_id, question_id, question, answer),
            BoardEvent::SelectionCleared => self.clear_selection(),
            BoardEvent::QuestionRevealed { content } => self.reveal_question(content),
            BoardEvent::QuestionHidden => self.hide_question(),
            BoardEvent::AnswerRevealed { content } => self.reveal_answer(content),
            BoardEvent::AnswerHidden => self.hide_answer(),
            BoardEvent::ScoreUpdated {
                team_id,
                points,
                new_score,
            } => self.update_score(&team_id, points, new_score),
            BoardEvent::ScoreSet { team_id, score } => self.set_score(&team_id, score),
            BoardEvent::StreakSet { team_id, streak } => self.set_streak(&team_id, streak),
            BoardEvent::CompletionMarked {
                category_id,
                question_id,
            } => Applied::from(
                self.completed_questions
                    .insert(completion_key(&category_id, &question_id)),
            ),
            BoardEvent::CompletionUnmarked {
                category_id,
                question_id,
            } => Applied::from(
                self.completed_questions
                    .shift_remove(&completion_key(&category_id, &question_id)),
            ),
            BoardEvent::SpecialRevealed {
                category_id,
                question_id,
            } => Applied::from(
                self.revealed_special_cards
                    .insert(completion_key(&category_id, &question_id)),
            ),
            BoardEvent::SpecialHidden {
                category_id,
                question_id,
            } => Applied::from(
                self.revealed_special_cards
                    .shift_remove(&completion_key(&category_id, &question_id)),
            ),
            BoardEvent::Reset => self.reset(),
        };

        if applied.changed() {
            self.version += 1;
        }
        applied
    }

    /// Merge a loaded snapshot into the mirror.
    ///
    /// Reconciliation rules: adopt the persisted round, union the completion
    /// keys, and add only teams whose id is not already present — a locally
    /// fresher record always wins. Buzzer state is never restored; a stale
    /// lock must not outlive the session that took it.
    pub fn hydrate(&mut self, snapshot: &SnapshotEntity) -> Applied {
        let mut changed = false;

        if self.current_round != snapshot.current_round {
            self.current_round = snapshot.current_round;
            changed = true;
        }
        for key in &snapshot.completed_questions {
            changed |= self.completed_questions.insert(key.clone());
        }
        for entity in &snapshot.teams {
            if !self.teams.contains_key(&entity.id) {
                self.teams.insert(entity.id.clone(), Team::from(entity));
                changed = true;
            }
        }

        if changed {
            self.version += 1;
        }
        Applied::from(changed)
    }

    /// Project the persistable portion of the board.
    pub fn snapshot(&self) -> SnapshotEntity {
        SnapshotEntity {
            current_round: self.current_round,
            completed_questions: self.completed_questions.iter().cloned().collect(),
            teams: self.teams.values().map(TeamEntity::from).collect(),
            updated_at: None,
        }
    }

    fn register_team(&mut self, team: Team) -> Applied {
        if self.teams.contains_key(&team.id) {
            return Applied::Unchanged;
        }
        self.teams.insert(team.id.clone(), team);
        Applied::Changed
    }

    fn remove_team(&mut self, team_id: &str) -> Applied {
        Applied::from(self.teams.shift_remove(team_id).is_some())
    }

    fn press_buzzer(&mut self, team_id: String) -> Applied {
        if self.buzzer_locked {
            return Applied::Unchanged;
        }
        self.buzzer_locked = true;
        self.buzzer_team = Some(team_id);
        Applied::Changed
    }

    fn clear_buzzer(&mut self) -> Applied {
        if !self.buzzer_locked && self.buzzer_team.is_none() {
            return Applied::Unchanged;
        }
        self.buzzer_locked = false;
        self.buzzer_team = None;
        Applied::Changed
    }

    fn change_round(&mut self, round: u32) -> Applied {
        let focus_active = self.selection().is_some()
            || self.current_question.is_some()
            || self.current_answer.is_some()
            || self.revealed_question
            || self.revealed_answer;
        if self.current_round == round && !focus_active {
            return Applied::Unchanged;
        }
        // Switching rounds abandons whatever was on the screen.
        self.current_round = round;
        self.drop_focus();
        Applied::Changed
    }

    fn select_question(
        &mut self,
        category_id: String,
        question_id: String,
        question: Option<String>,
        answer: Option<String>,
    ) -> Applied {
        let next_category = Some(category_id);
        let next_question = Some(question_id);
        if self.selected_category == next_category
            && self.selected_question == next_question
            && self.current_question == question
            && self.current_answer == answer
            && !self.revealed_question
            && !self.revealed_answer
        {
            return Applied::Unchanged;
        }
        self.selected_category = next_category;
        self.selected_question = next_question;
        self.current_question = question;
        self.current_answer = answer;
        self.revealed_question = false;
        self.revealed_answer = false;
        Applied::Changed
    }

    fn clear_selection(&mut self) -> Applied {
        let focus_active = self.selection().is_some()
            || self.current_question.is_some()
            || self.current_answer.is_some()
            || self.revealed_question
            || self.revealed_answer;
        if !focus_active {
            return Applied::Unchanged;
        }
        self.drop_focus();
        Applied::Changed
    }

    fn reveal_question(&mut self, content: Option<String>) -> Applied {
        let mut changed = !self.revealed_question;
        self.revealed_question = true;
        if let Some(content) = content
            && self.current_question.as_deref() != Some(content.as_str())
        {
            self.current_question = Some(content);
            changed = true;
        }
        Applied::from(changed)
    }

    fn hide_question(&mut self) -> Applied {
        let changed = self.revealed_question;
        self.revealed_question = false;
        Applied::from(changed)
    }

    fn reveal_answer(&mut self, content: Option<String>) -> Applied {
        let mut changed = !self.revealed_answer;
        self.revealed_answer = true;
        if let Some(content) = content
            && self.current_answer.as_deref() != Some(content.as_str())
        {
            self.current_answer = Some(content);
            changed = true;
        }
        Applied::from(changed)
    }

    fn hide_answer(&mut self) -> Applied {
        let changed = self.revealed_answer;
        self.revealed_answer = false;
        Applied::from(changed)
    }

    fn update_score(&mut self, team_id: &str, points: i64, new_score: Option<i64>) -> Applied {
        let Some(team) = self.teams.get_mut(team_id) else {
            return Applied::Unchanged;
        };
        let target = new_score.unwrap_or(team.score + points);
        if team.score == target {
            return Applied::Unchanged;
        }
        team.score = target;
        Applied::Changed
    }

    fn set_score(&mut self, team_id: &str, score: i64) -> Applied {
        let Some(team) = self.teams.get_mut(team_id) else {
            return Applied::Unchanged;
        };
        if team.score == score {
            return Applied::Unchanged;
        }
        team.score = score;
        Applied::Changed
    }

    fn set_streak(&mut self, team_id: &str, streak: u32) -> Applied {
        let Some(team) = self.teams.get_mut(team_id) else {
            return Applied::Unchanged;
        };
        if team.streak == streak {
            return Applied::Unchanged;
        }
        team.streak = streak;
        Applied::Changed
    }

    fn reset(&mut self) -> Applied {
        if self.is_pristine() {
            return Applied::Unchanged;
        }
        let version = self.version;
        *self = Self::default();
        self.version = version;
        Applied::Changed
    }

    fn drop_focus(&mut self) {
        self.selected_category = None;
        self.selected_question = None;
        self.current_question = None;
        self.current_answer = None;
        self.revealed_question = false;
        self.revealed_answer = false;
    }

    fn is_pristine(&self) -> bool {
        self.current_round == 1
            && !self.buzzer_locked
            && self.buzzer_team.is_none()
            && self.teams.is_empty()
            && self.selection().is_none()
            && self.completed_questions.is_empty()
            && self.revealed_special_cards.is_empty()
            && !self.revealed_question
            && !self.revealed_answer
            && self.current_question.is_none()
            && self.current_answer.is_none()
    }
}
