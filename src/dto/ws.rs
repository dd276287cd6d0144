use serde::{Deserialize, Serialize};
use serde_with::skip_serializing_none;
use utoipa::ToSchema;
use uuid::Uuid;

/// Delivery scope for a relayed frame.
///
/// `Others` excludes the sender, whose optimistic local update already
/// reflects the action. `All` echoes back to the sender as well, which is
/// required for event kinds where several surfaces must converge on identical
/// ordering; re-delivery to self relies on the receiving reducer being a
/// no-op when already applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FanOut {
    /// Every connection except the originating one.
    Others,
    /// Every connection, the originating one included.
    All,
}

/// Full team record carried by registration and rejoin frames.
#[skip_serializing_none]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TeamPayload {
    /// Client-generated unique identifier.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Display color.
    #[serde(default)]
    pub color: String,
    /// Avatar reference; absent registrations fall back to a default marker.
    pub avatar: Option<String>,
    /// Score carried along so late joiners rehydrate rosters in one frame.
    #[serde(default)]
    pub score: i64,
    /// Consecutive correct answers.
    #[serde(default)]
    pub streak: u32,
    /// Identifier of the avatar within the catalog, when the client knows it.
    pub avatar_id: Option<String>,
}

/// Reference to a team by id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TeamRef {
    /// Target team id.
    pub team_id: String,
}

/// Buzzer press notification.
#[skip_serializing_none]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BuzzPayload {
    /// Team claiming the buzzer.
    pub team_id: String,
    /// Display name, duplicated so receivers can render without a roster hit.
    pub team_name: Option<String>,
}

/// Round selector.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct RoundPayload {
    /// Round number to activate.
    pub round: u32,
}

/// Resolved content block projected to the shared screen.
#[skip_serializing_none]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ContentPayload {
    /// Resolved text content, when the block carries any.
    pub content: Option<String>,
    /// Content type tag (text, image, audio, video).
    #[serde(rename = "type")]
    pub kind: Option<String>,
    /// Media reference accompanying non-text content.
    pub media_url: Option<String>,
}

/// Composite question identifier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct QuestionKey {
    /// Category the question belongs to.
    pub category_id: String,
    /// Question within the category.
    pub question_id: String,
}

/// Relative score change.
#[skip_serializing_none]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ScoreDeltaPayload {
    /// Team being scored.
    pub team_id: String,
    /// Points to add (may be negative).
    pub points: i64,
    /// Sender's resulting absolute score; receivers converge on it when set.
    pub new_score: Option<i64>,
}

/// Absolute score overwrite, used only by explicit host editing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ScoreSetPayload {
    /// Team being edited.
    pub team_id: String,
    /// New absolute score.
    pub score: i64,
}

/// Special (bonus) card unveiling.
#[skip_serializing_none]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SpecialPayload {
    /// Category the card belongs to.
    pub category_id: String,
    /// Question behind the card.
    pub question_id: String,
    /// Bonus variant (double points, duel, wager, ...).
    pub special_type: Option<String>,
    /// Variant-specific configuration, passed through opaquely.
    #[schema(value_type = Object)]
    pub special_config: Option<serde_json::Value>,
}

/// Audio transport seek position.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct SeekPayload {
    /// Playback position in seconds.
    pub time: f64,
}

/// Informational notice that a team's connection dropped.
///
/// Receivers must never remove the team from the roster in response; only an
/// explicit removal frame deletes a team.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DisconnectPayload {
    /// Team the connection was registered to.
    pub team_id: String,
    /// Relay-assigned identity of the dropped connection.
    pub connection_id: Uuid,
}

/// Commands accepted from any connected client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(tag = "event", content = "data")]
pub enum ClientFrame {
    /// A brand-new team joins the game.
    #[serde(rename = "team:register")]
    TeamRegister(TeamPayload),
    /// A device with a remembered identity reconnects.
    #[serde(rename = "team:rejoin")]
    TeamRejoin(TeamPayload),
    /// Host kicks a team.
    #[serde(rename = "team:remove")]
    TeamRemove(TeamRef),
    /// A team slams the buzzer.
    #[serde(rename = "buzzer:press")]
    BuzzerPress(BuzzPayload),
    /// Host releases the buzzer lock for the current question.
    #[serde(rename = "buzzer:clear")]
    BuzzerClear,
    /// Host force-resets the buzzer on every device.
    #[serde(rename = "buzzer:reset")]
    BuzzerReset,
    /// Host switches the active round.
    #[serde(rename = "round:change")]
    RoundChange(RoundPayload),
    /// Host projects the question content to the screen.
    #[serde(rename = "question:reveal")]
    QuestionReveal(ContentPayload),
    /// Host takes the question back off the screen.
    #[serde(rename = "question:hide")]
    QuestionHide,
    /// Host clears the screen entirely (question, answer, focus).
    #[serde(rename = "question:clear")]
    QuestionClear,
    /// Host projects the answer content.
    #[serde(rename = "answer:reveal")]
    AnswerReveal(ContentPayload),
    /// Host hides the answer.
    #[serde(rename = "answer:hide")]
    AnswerHide,
    /// Host marks a question as resolved.
    #[serde(rename = "question:complete")]
    QuestionComplete(QuestionKey),
    /// Host reopens a previously completed question.
    #[serde(rename = "question:uncomplete")]
    QuestionUncomplete(QuestionKey),
    /// Host awards (or deducts) points.
    #[serde(rename = "score:update")]
    ScoreUpdate(ScoreDeltaPayload),
    /// Host overwrites a score outright.
    #[serde(rename = "score:set")]
    ScoreSet(ScoreSetPayload),
    /// Host unveils the nature of a special card.
    #[serde(rename = "special:reveal")]
    SpecialReveal(SpecialPayload),
    /// Host covers a special card back up.
    #[serde(rename = "special:hide")]
    SpecialHide(SpecialPayload),
    /// Audio transport: play.
    #[serde(rename = "audio:play")]
    AudioPlay,
    /// Audio transport: pause.
    #[serde(rename = "audio:pause")]
    AudioPause,
    /// Audio transport: seek.
    #[serde(rename = "audio:seek")]
    AudioSeek(SeekPayload),
    /// Host wipes the whole game, store included.
    #[serde(rename = "game:reset_all")]
    ResetAll,
    /// Anything this build does not understand; dropped at the parse boundary.
    #[serde(other)]
    Unknown,
}

/// Notifications rebroadcast to connected clients.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(tag = "event", content = "data")]
pub enum ServerFrame {
    /// A team joined (or rejoined) the game.
    #[serde(rename = "team:registered")]
    TeamRegistered(TeamPayload),
    /// A team was kicked.
    #[serde(rename = "team:removed")]
    TeamRemoved(TeamRef),
    /// A team's connection dropped; roster is unaffected.
    #[serde(rename = "team:disconnected")]
    TeamDisconnected(DisconnectPayload),
    /// A team won the buzzer race.
    #[serde(rename = "buzzer:pressed")]
    BuzzerPressed(BuzzPayload),
    /// The buzzer lock was released.
    #[serde(rename = "buzzer:cleared")]
    BuzzerCleared,
    /// The buzzer was force-reset everywhere.
    #[serde(rename = "buzzer:reset")]
    BuzzerReset,
    /// The active round changed.
    #[serde(rename = "round:changed")]
    RoundChanged(RoundPayload),
    /// Question content went up on the screen.
    #[serde(rename = "question:revealed")]
    QuestionRevealed(ContentPayload),
    /// Question content was hidden.
    #[serde(rename = "question:hidden")]
    QuestionHidden,
    /// The screen was cleared.
    #[serde(rename = "question:cleared")]
    QuestionCleared,
    /// Answer content went up on the screen.
    #[serde(rename = "answer:revealed")]
    AnswerRevealed(ContentPayload),
    /// Answer content was hidden.
    #[serde(rename = "answer:hidden")]
    AnswerHidden,
    /// A question was marked resolved.
    #[serde(rename = "question:completed")]
    QuestionCompleted(QuestionKey),
    /// A question was reopened.
    #[serde(rename = "question:uncompleted")]
    QuestionUncompleted(QuestionKey),
    /// A score changed by a delta.
    #[serde(rename = "score:updated")]
    ScoreUpdated(ScoreDeltaPayload),
    /// A score was overwritten.
    #[serde(rename = "score:set")]
    ScoreSet(ScoreSetPayload),
    /// A special card's nature was unveiled.
    #[serde(rename = "special:revealed")]
    SpecialRevealed(SpecialPayload),
    /// A special card was covered back up.
    #[serde(rename = "special:hide")]
    SpecialHidden(SpecialPayload),
    /// Audio transport: play.
    #[serde(rename = "audio:play")]
    AudioPlay,
    /// Audio transport: pause.
    #[serde(rename = "audio:pause")]
    AudioPause,
    /// Audio transport: seek.
    #[serde(rename = "audio:seek")]
    AudioSeek(SeekPayload),
    /// The whole game was wiped.
    #[serde(rename = "game:reset_all")]
    ResetAll,
    /// A broadcast kind this build does not understand; ignored.
    #[serde(other)]
    Unknown,
}

impl ClientFrame {
    /// Parse a frame from raw socket text.
    pub fn from_json_str(raw: &str) -> serde_json::Result<Self> {
        serde_json::from_str(raw)
    }

    /// Team identity carried by registration-class frames, used for
    /// connection bookkeeping.
    pub fn registered_team_id(&self) -> Option<&str> {
        match self {
            Self::TeamRegister(team) | Self::TeamRejoin(team) => Some(team.id.as_str()),
            _ => None,
        }
    }

    /// Translate an inbound command into the notification to rebroadcast and
    /// its delivery scope. `None` drops the frame.
    pub fn routed(self) -> Option<(ServerFrame, FanOut)> {
        let routed = match self {
            Self::TeamRegister(team) => (ServerFrame::TeamRegistered(team), FanOut::Others),
            // Rejoins echo back to the sender so its own roster converges with
            // the record everyone else just received.
            Self::TeamRejoin(team) => (ServerFrame::TeamRegistered(team), FanOut::All),
            Self::TeamRemove(target) => (ServerFrame::TeamRemoved(target), FanOut::All),
            Self::BuzzerPress(buzz) => (ServerFrame::BuzzerPressed(buzz), FanOut::Others),
            Self::BuzzerClear => (ServerFrame::BuzzerCleared, FanOut::Others),
            Self::BuzzerReset => (ServerFrame::BuzzerReset, FanOut::All),
            Self::RoundChange(round) => (ServerFrame::RoundChanged(round), FanOut::Others),
            Self::QuestionReveal(content) => {
                (ServerFrame::QuestionRevealed(content), FanOut::Others)
            }
            Self::QuestionHide => (ServerFrame::QuestionHidden, FanOut::Others),
            Self::QuestionClear => (ServerFrame::QuestionCleared, FanOut::Others),
            Self::AnswerReveal(content) => (ServerFrame::AnswerRevealed(content), FanOut::Others),
            Self::AnswerHide => (ServerFrame::AnswerHidden, FanOut::Others),
            Self::QuestionComplete(key) => (ServerFrame::QuestionCompleted(key), FanOut::All),
            Self::QuestionUncomplete(key) => (ServerFrame::QuestionUncompleted(key), FanOut::All),
            Self::ScoreUpdate(delta) => (ServerFrame::ScoreUpdated(delta), FanOut::Others),
            Self::ScoreSet(score) => (ServerFrame::ScoreSet(score), FanOut::Others),
            Self::SpecialReveal(card) => (ServerFrame::SpecialRevealed(card), FanOut::Others),
            Self::SpecialHide(card) => (ServerFrame::SpecialHidden(card), FanOut::Others),
            Self::AudioPlay => (ServerFrame::AudioPlay, FanOut::Others),
            Self::AudioPause => (ServerFrame::AudioPause, FanOut::Others),
            Self::AudioSeek(seek) => (ServerFrame::AudioSeek(seek), FanOut::Others),
            Self::ResetAll => (ServerFrame::ResetAll, FanOut::All),
            Self::Unknown => return None,
        };
        Some(routed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key() -> QuestionKey {
        QuestionKey {
            category_id: "cat1".into(),
            question_id: "q1".into(),
        }
    }

    #[test]
    fn completion_frames_echo_back_to_sender() {
        let (frame, scope) = ClientFrame::QuestionComplete(key()).routed().unwrap();
        assert_eq!(frame, ServerFrame::QuestionCompleted(key()));
        assert_eq!(scope, FanOut::All);

        let (frame, scope) = ClientFrame::QuestionUncomplete(key()).routed().unwrap();
        assert_eq!(frame, ServerFrame::QuestionUncompleted(key()));
        assert_eq!(scope, FanOut::All);
    }

    #[test]
    fn optimistic_kinds_skip_the_sender() {
        let press = ClientFrame::BuzzerPress(BuzzPayload {
            team_id: "team-1".into(),
            team_name: Some("Alpha".into()),
        });
        let (_, scope) = press.routed().unwrap();
        assert_eq!(scope, FanOut::Others);

        let (_, scope) = ClientFrame::BuzzerClear.routed().unwrap();
        assert_eq!(scope, FanOut::Others);

        let update = ClientFrame::ScoreUpdate(ScoreDeltaPayload {
            team_id: "team-1".into(),
            points: 100,
            new_score: Some(100),
        });
        let (_, scope) = update.routed().unwrap();
        assert_eq!(scope, FanOut::Others);
    }

    #[test]
    fn rejoin_rebroadcasts_as_registered_to_all() {
        let rejoin = ClientFrame::TeamRejoin(TeamPayload {
            id: "team-1".into(),
            name: "Alpha".into(),
            color: "#ff5500".into(),
            avatar: None,
            score: 300,
            streak: 1,
            avatar_id: None,
        });
        let (frame, scope) = rejoin.routed().unwrap();
        assert!(matches!(frame, ServerFrame::TeamRegistered(team) if team.id == "team-1"));
        assert_eq!(scope, FanOut::All);
    }

    #[test]
    fn frames_use_wire_event_names() {
        let raw = r#"{"event":"buzzer:press","data":{"teamId":"team-1","teamName":"Alpha"}}"#;
        let frame = ClientFrame::from_json_str(raw).unwrap();
        assert!(matches!(frame, ClientFrame::BuzzerPress(ref buzz) if buzz.team_id == "team-1"));

        let encoded = serde_json::to_string(&ServerFrame::QuestionCompleted(key())).unwrap();
        assert!(encoded.contains(r#""event":"question:completed""#));
        assert!(encoded.contains(r#""categoryId":"cat1""#));
    }

    #[test]
    fn unknown_events_parse_and_drop() {
        let frame = ClientFrame::from_json_str(r#"{"event":"video:rewind"}"#).unwrap();
        assert_eq!(frame, ClientFrame::Unknown);
        assert!(frame.routed().is_none());
    }

    #[test]
    fn optional_payload_fields_default() {
        let raw = r#"{"event":"team:register","data":{"id":"team-2","name":"Beta"}}"#;
        let frame = ClientFrame::from_json_str(raw).unwrap();
        let ClientFrame::TeamRegister(team) = frame else {
            panic!("expected registration");
        };
        assert_eq!(team.score, 0);
        assert_eq!(team.streak, 0);
        assert!(team.avatar.is_none());
    }
}
