use crate::{
    catalog::Question,
    dao::models::SnapshotEntity,
    dto::ws::{
        BuzzPayload, ClientFrame, ContentPayload, QuestionKey, RoundPayload, ScoreDeltaPayload,
        ScoreSetPayload, ServerFrame, SpecialPayload, TeamPayload, TeamRef,
    },
    state::board::{Applied, BoardEvent, GameBoard, Team, event_for_frame},
};

/// One client process's view of the game: a board mirror plus the locally
/// remembered team identity (buzzer devices persist theirs across reloads).
///
/// Every mutating action is two decoupled steps. The optimistic local reduce
/// happens inside the method; the returned frame(s) are what the caller
/// publishes to the bus, in order. Emitting is fire-and-forget — whether the
/// rebroadcast ever arrives anywhere does not change the local outcome — and
/// tests can exercise the whole session without a live transport.
#[derive(Debug, Default)]
pub struct ClientSession {
    board: GameBoard,
    identity: Option<Team>,
}

impl ClientSession {
    /// Fresh session with an empty mirror and no remembered identity.
    pub fn new() -> Self {
        Self::default()
    }

    /// Session resuming a remembered team identity (a buzzer device reload).
    pub fn with_identity(team: Team) -> Self {
        Self {
            board: GameBoard::new(),
            identity: Some(team),
        }
    }

    /// The local board mirror.
    pub fn board(&self) -> &GameBoard {
        &self.board
    }

    /// The locally remembered team, if this device has one.
    pub fn identity(&self) -> Option<&Team> {
        self.identity.as_ref()
    }

    /// Merge a loaded snapshot into the mirror before the live stream starts.
    pub fn hydrate(&mut self, snapshot: &SnapshotEntity) -> Applied {
        self.board.hydrate(snapshot)
    }

    /// Frame to publish on the initial connect and on every reconnect.
    ///
    /// Carries the full team record so every other roster reconverges on this
    /// team, and registers it locally first so our own mirror agrees with the
    /// echo the relay sends back.
    pub fn on_connected(&mut self) -> Option<ClientFrame> {
        let team = self.identity.clone()?;
        self.board.apply(BoardEvent::TeamRegistered { team: team.clone() });
        Some(ClientFrame::TeamRejoin(TeamPayload::from(team)))
    }

    /// Apply one inbound broadcast, exactly once.
    pub fn receive(&mut self, frame: &ServerFrame) -> Applied {
        // Kicks targeting us and global resets invalidate the remembered
        // identity; the device returns to the registration screen.
        match frame {
            ServerFrame::TeamRemoved(target) => {
                if self
                    .identity
                    .as_ref()
                    .is_some_and(|team| team.id == target.team_id)
                {
                    self.identity = None;
                }
            }
            ServerFrame::ResetAll => {
                self.identity = None;
            }
            _ => {}
        }

        let applied = match event_for_frame(frame) {
            Some(event) => self.board.apply(event),
            None => Applied::Unchanged,
        };

        // Keep the remembered identity in step with the roster (scores arrive
        // over the wire, and the device persists the record as-is).
        if let Some(identity) = self.identity.as_mut()
            && let Some(team) = self.board.team(&identity.id)
        {
            *identity = team.clone();
        }

        applied
    }

    /// Register a brand-new team and adopt it as this device's identity.
    pub fn register_team(&mut self, team: Team) -> ClientFrame {
        self.board.apply(BoardEvent::TeamRegistered { team: team.clone() });
        self.identity = Some(team.clone());
        ClientFrame::TeamRegister(TeamPayload::from(team))
    }

    /// Kick a team from the game.
    pub fn remove_team(&mut self, team_id: &str) -> ClientFrame {
        self.board.apply(BoardEvent::TeamRemoved {
            team_id: team_id.to_string(),
        });
        ClientFrame::TeamRemove(TeamRef {
            team_id: team_id.to_string(),
        })
    }

    /// Slam the buzzer.
    ///
    /// `None` when the device has no identity or the lock is already held —
    /// a press that loses the local race publishes nothing.
    pub fn press_buzzer(&mut self) -> Option<ClientFrame> {
        let team = self.identity.clone()?;
        let applied = self.board.apply(BoardEvent::BuzzerPressed {
            team_id: team.id.clone(),
        });
        if !applied.changed() {
            return None;
        }
        Some(ClientFrame::BuzzerPress(BuzzPayload {
            team_id: team.id,
            team_name: Some(team.name),
        }))
    }

    /// Release the buzzer for the current question.
    pub fn clear_buzzer(&mut self) -> ClientFrame {
        self.board.apply(BoardEvent::BuzzerCleared);
        ClientFrame::BuzzerClear
    }

    /// Force-reset the buzzer on every device.
    pub fn reset_buzzer(&mut self) -> ClientFrame {
        self.board.apply(BoardEvent::BuzzerCleared);
        ClientFrame::BuzzerReset
    }

    /// Switch the active round.
    pub fn change_round(&mut self, round: u32) -> ClientFrame {
        self.board.apply(BoardEvent::RoundChanged { round });
        ClientFrame::RoundChange(RoundPayload { round })
    }

    /// Focus a question on the board.
    ///
    /// Stages its content locally for later reveals and publishes a screen
    /// clear so stale content drops everywhere while the host lines up the
    /// reveal.
    pub fn select_question(&mut self, category_id: &str, question: &Question) -> ClientFrame {
        self.board.apply(BoardEvent::QuestionSelected {
            category_id: category_id.to_string(),
            question_id: question.id.clone(),
            question: non_empty(&question.question.content),
            answer: non_empty(&question.answer.content),
        });
        ClientFrame::QuestionClear
    }

    /// Project the question content to the shared screen.
    pub fn reveal_question(&mut self, question: &Question) -> ClientFrame {
        let payload = ContentPayload::from(&question.question);
        self.board.apply(BoardEvent::QuestionRevealed {
            content: payload.content.clone(),
        });
        ClientFrame::QuestionReveal(payload)
    }

    /// Take the question back off the screen.
    pub fn hide_question(&mut self) -> ClientFrame {
        self.board.apply(BoardEvent::QuestionHidden);
        ClientFrame::QuestionHide
    }

    /// Project the answer content to the shared screen.
    pub fn reveal_answer(&mut self, question: &Question) -> ClientFrame {
        let payload = ContentPayload::from(&question.answer);
        self.board.apply(BoardEvent::AnswerRevealed {
            content: payload.content.clone(),
        });
        ClientFrame::AnswerReveal(payload)
    }

    /// Hide the answer.
    pub fn hide_answer(&mut self) -> ClientFrame {
        self.board.apply(BoardEvent::AnswerHidden);
        ClientFrame::AnswerHide
    }

    /// Clear the shared screen entirely.
    pub fn clear_screen(&mut self) -> ClientFrame {
        self.board.apply(BoardEvent::SelectionCleared);
        ClientFrame::QuestionClear
    }

    /// The buzzing team answered correctly: score and streak first, then
    /// release the buzzer and mark the focused question complete.
    ///
    /// Frames come back in publish order — the score update strictly precedes
    /// the completion, so a client that drops the score event but receives the
    /// completion holds a consistent (if unscored) board.
    pub fn award_correct(&mut self, question: &Question) -> Vec<ClientFrame> {
        let Some(team_id) = self.board.buzzer_team().map(str::to_string) else {
            return Vec::new();
        };
        let mut frames = Vec::new();
        frames.extend(self.score_correct(&team_id, question));
        frames.push(self.clear_buzzer());
        frames.extend(self.complete_focused());
        frames
    }

    /// The buzzing team answered incorrectly: streak resets, buzzer reopens
    /// for everyone else, question stays in play.
    pub fn mark_incorrect(&mut self) -> Option<ClientFrame> {
        let team_id = self.board.buzzer_team().map(str::to_string)?;
        self.board
            .apply(BoardEvent::StreakSet { team_id, streak: 0 });
        Some(self.clear_buzzer())
    }

    /// Mark the focused question complete, optionally crediting `assign_to`.
    pub fn complete_question(
        &mut self,
        question: &Question,
        assign_to: Option<&str>,
    ) -> Vec<ClientFrame> {
        let mut frames = Vec::new();
        if let Some(team_id) = assign_to {
            frames.extend(self.score_correct(team_id, question));
        }
        frames.extend(self.complete_focused());
        frames
    }

    /// Reopen a completed question, handing it to `assign_to` when given.
    ///
    /// Unmark and re-mark are two independent mutations, not an atomic op: a
    /// client that observes only the unmark holds a valid-but-stale
    /// intermediate state, which this consistency model accepts.
    pub fn reassign_question(
        &mut self,
        category_id: &str,
        question: &Question,
        assign_to: Option<&str>,
    ) -> Vec<ClientFrame> {
        let key = QuestionKey {
            category_id: category_id.to_string(),
            question_id: question.id.clone(),
        };
        self.board.apply(BoardEvent::CompletionUnmarked {
            category_id: key.category_id.clone(),
            question_id: key.question_id.clone(),
        });
        let mut frames = vec![ClientFrame::QuestionUncomplete(key.clone())];

        if let Some(team_id) = assign_to {
            frames.extend(self.score_correct(team_id, question));
            self.board.apply(BoardEvent::CompletionMarked {
                category_id: key.category_id.clone(),
                question_id: key.question_id.clone(),
            });
            frames.push(ClientFrame::QuestionComplete(key));
        }
        frames
    }

    /// Overwrite a team's score outright (explicit host editing).
    pub fn set_score(&mut self, team_id: &str, score: i64) -> ClientFrame {
        self.board.apply(BoardEvent::ScoreSet {
            team_id: team_id.to_string(),
            score,
        });
        ClientFrame::ScoreSet(ScoreSetPayload {
            team_id: team_id.to_string(),
            score,
        })
    }

    /// Unveil the nature of a special card.
    pub fn reveal_special(&mut self, category_id: &str, question: &Question) -> ClientFrame {
        self.board.apply(BoardEvent::SpecialRevealed {
            category_id: category_id.to_string(),
            question_id: question.id.clone(),
        });
        ClientFrame::SpecialReveal(self.special_payload(category_id, question))
    }

    /// Cover a special card back up.
    pub fn hide_special(&mut self, category_id: &str, question: &Question) -> ClientFrame {
        self.board.apply(BoardEvent::SpecialHidden {
            category_id: category_id.to_string(),
            question_id: question.id.clone(),
        });
        ClientFrame::SpecialHide(self.special_payload(category_id, question))
    }

    /// Wipe the whole game: local mirror, remembered identity, and (via the
    /// relay) every other client plus the persisted snapshot.
    pub fn reset_all(&mut self) -> ClientFrame {
        self.board.apply(BoardEvent::Reset);
        self.identity = None;
        ClientFrame::ResetAll
    }

    /// Score a correct answer: delta plus streak bump, with the resulting
    /// absolute score carried for receiver convergence. Stale team = no frame.
    fn score_correct(&mut self, team_id: &str, question: &Question) -> Option<ClientFrame> {
        let team = self.board.team(team_id)?;
        let points = question.scored_points();
        let new_score = team.score + points;
        let streak = team.streak + 1;

        self.board.apply(BoardEvent::ScoreUpdated {
            team_id: team_id.to_string(),
            points,
            new_score: Some(new_score),
        });
        self.board.apply(BoardEvent::StreakSet {
            team_id: team_id.to_string(),
            streak,
        });

        Some(ClientFrame::ScoreUpdate(ScoreDeltaPayload {
            team_id: team_id.to_string(),
            points,
            new_score: Some(new_score),
        }))
    }

    /// Mark the focused question complete and clear the screen.
    fn complete_focused(&mut self) -> Vec<ClientFrame> {
        let Some((category_id, question_id)) = self
            .board
            .selection()
            .map(|(category, question)| (category.to_string(), question.to_string()))
        else {
            return Vec::new();
        };
        self.board.apply(BoardEvent::CompletionMarked {
            category_id: category_id.clone(),
            question_id: question_id.clone(),
        });
        let complete = ClientFrame::QuestionComplete(QuestionKey {
            category_id,
            question_id,
        });
        self.board.apply(BoardEvent::SelectionCleared);
        vec![complete, ClientFrame::QuestionClear]
    }

    fn special_payload(&self, category_id: &str, question: &Question) -> SpecialPayload {
        SpecialPayload {
            category_id: category_id.to_string(),
            question_id: question.id.clone(),
            special_type: question.special_type.clone(),
            special_config: question.special_config.clone(),
        }
    }
}

fn non_empty(content: &str) -> Option<String> {
    (!content.is_empty()).then(|| content.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dao::models::TeamEntity;

    fn team(id: &str, name: &str) -> Team {
        Team {
            id: id.into(),
            name: name.into(),
            color: "#a855f7".into(),
            avatar: "owl".into(),
            score: 0,
            streak: 0,
        }
    }

    fn question(id: &str, points: i64) -> Question {
        serde_json::from_value(serde_json::json!({
            "id": id,
            "points": points,
            "type": "regular",
            "question": {"type": "text", "content": "Q?"},
            "answer": {"type": "text", "content": "A."}
        }))
        .unwrap()
    }

    fn double_question(id: &str, points: i64) -> Question {
        serde_json::from_value(serde_json::json!({
            "id": id,
            "points": points,
            "type": "special",
            "specialType": "doublePoint",
            "question": {"type": "text", "content": "Q?"},
            "answer": {"type": "text", "content": "A."}
        }))
        .unwrap()
    }

    fn snapshot_with(teams: Vec<TeamEntity>, completed: Vec<&str>) -> SnapshotEntity {
        SnapshotEntity {
            current_round: 1,
            completed_questions: completed.into_iter().map(String::from).collect(),
            teams,
            updated_at: None,
        }
    }

    fn entity(id: &str, name: &str, score: i64) -> TeamEntity {
        TeamEntity {
            id: id.into(),
            name: name.into(),
            color: String::new(),
            avatar: String::new(),
            score,
            streak: 0,
        }
    }

    #[test]
    fn snapshot_then_registration_does_not_duplicate_teams() {
        let mut session = ClientSession::new();
        session.hydrate(&snapshot_with(vec![entity("team-x", "Xylo", 150)], vec![]));

        session.receive(&ServerFrame::TeamRegistered(TeamPayload::from(team(
            "team-x", "Xylo",
        ))));

        assert_eq!(session.board().team_count(), 1);
        // The snapshot record was there first and survives the live echo.
        assert_eq!(session.board().team("team-x").unwrap().score, 150);
    }

    #[test]
    fn rejoin_frame_carries_the_full_record_every_connect() {
        let mut session = ClientSession::with_identity(Team {
            score: 300,
            streak: 2,
            ..team("team-1", "Alpha")
        });

        for _ in 0..2 {
            let frame = session.on_connected().unwrap();
            let ClientFrame::TeamRejoin(payload) = frame else {
                panic!("expected rejoin");
            };
            assert_eq!(payload.id, "team-1");
            assert_eq!(payload.score, 300);
            assert_eq!(payload.streak, 2);
        }
        assert_eq!(session.board().team_count(), 1);
    }

    #[test]
    fn no_identity_means_no_rejoin() {
        let mut session = ClientSession::new();
        assert!(session.on_connected().is_none());
    }

    #[test]
    fn press_is_suppressed_while_locked() {
        let mut session = ClientSession::with_identity(team("team-2", "Beta"));
        session.on_connected();

        // Another team's press arrives first.
        session.receive(&ServerFrame::BuzzerPressed(BuzzPayload {
            team_id: "team-1".into(),
            team_name: None,
        }));

        assert!(session.press_buzzer().is_none());
        assert_eq!(session.board().buzzer_team(), Some("team-1"));

        session.receive(&ServerFrame::BuzzerCleared);
        let frame = session.press_buzzer().unwrap();
        assert!(matches!(
            frame,
            ClientFrame::BuzzerPress(ref buzz) if buzz.team_id == "team-2"
        ));
    }

    #[test]
    fn award_publishes_score_before_completion() {
        let mut session = ClientSession::new();
        session.receive(&ServerFrame::TeamRegistered(TeamPayload::from(team(
            "team-1", "Alpha",
        ))));
        let q = question("q1", 200);
        session.select_question("c1", &q);
        session.receive(&ServerFrame::BuzzerPressed(BuzzPayload {
            team_id: "team-1".into(),
            team_name: Some("Alpha".into()),
        }));

        let frames = session.award_correct(&q);

        let score_at = frames
            .iter()
            .position(|f| matches!(f, ClientFrame::ScoreUpdate(_)))
            .expect("score frame");
        let complete_at = frames
            .iter()
            .position(|f| matches!(f, ClientFrame::QuestionComplete(_)))
            .expect("completion frame");
        assert!(score_at < complete_at);

        let alpha = session.board().team("team-1").unwrap();
        assert_eq!(alpha.score, 200);
        assert_eq!(alpha.streak, 1);
        assert!(!session.board().buzzer_locked());
        assert!(session.board().is_completed("c1", "q1"));
        assert_eq!(session.board().selection(), None);
    }

    #[test]
    fn award_without_a_buzz_is_a_no_op() {
        let mut session = ClientSession::new();
        let q = question("q1", 100);
        session.select_question("c1", &q);
        assert!(session.award_correct(&q).is_empty());
    }

    #[test]
    fn incorrect_answer_resets_the_streak_and_reopens_the_buzzer() {
        let mut session = ClientSession::new();
        session.receive(&ServerFrame::TeamRegistered(TeamPayload::from(Team {
            streak: 3,
            ..team("team-1", "Alpha")
        })));
        session.receive(&ServerFrame::BuzzerPressed(BuzzPayload {
            team_id: "team-1".into(),
            team_name: None,
        }));

        let frame = session.mark_incorrect().unwrap();
        assert!(matches!(frame, ClientFrame::BuzzerClear));
        assert_eq!(session.board().team("team-1").unwrap().streak, 0);
        assert!(!session.board().buzzer_locked());
        // The question stays in play.
        assert!(!session.board().is_completed("c1", "q1"));
    }

    #[test]
    fn reassignment_moves_the_question_without_touching_the_old_owner() {
        let mut session = ClientSession::new();
        session.receive(&ServerFrame::TeamRegistered(TeamPayload::from(team(
            "team-a", "Alpha",
        ))));
        session.receive(&ServerFrame::TeamRegistered(TeamPayload::from(team(
            "team-b", "Beta",
        ))));

        // Team A originally won the question.
        let q = question("q1", 100);
        session.select_question("cat1", &q);
        session.complete_question(&q, Some("team-a"));
        let score_a = session.board().team("team-a").unwrap().score;
        assert_eq!(score_a, 100);

        let frames = session.reassign_question("cat1", &q, Some("team-b"));

        assert!(matches!(frames[0], ClientFrame::QuestionUncomplete(_)));
        assert!(matches!(frames[1], ClientFrame::ScoreUpdate(_)));
        assert!(matches!(frames[2], ClientFrame::QuestionComplete(_)));

        assert!(session.board().is_completed("cat1", "q1"));
        assert_eq!(session.board().team("team-b").unwrap().score, 100);
        assert_eq!(session.board().team("team-a").unwrap().score, score_a);
    }

    #[test]
    fn reassigning_a_double_point_special_doubles_the_award() {
        let mut session = ClientSession::new();
        session.receive(&ServerFrame::TeamRegistered(TeamPayload::from(team(
            "team-b", "Beta",
        ))));
        session.select_question("cat1", &double_question("q5", 300));
        session.complete_question(&double_question("q5", 300), None);

        session.reassign_question("cat1", &double_question("q5", 300), Some("team-b"));
        assert_eq!(session.board().team("team-b").unwrap().score, 600);
        assert!(session.board().is_completed("cat1", "q5"));
    }

    #[test]
    fn reassignment_without_a_team_just_reopens() {
        let mut session = ClientSession::new();
        let q = question("q1", 100);
        session.select_question("cat1", &q);
        session.complete_question(&q, None);
        assert!(session.board().is_completed("cat1", "q1"));

        let frames = session.reassign_question("cat1", &q, None);
        assert_eq!(frames.len(), 1);
        assert!(matches!(frames[0], ClientFrame::QuestionUncomplete(_)));
        assert!(!session.board().is_completed("cat1", "q1"));
    }

    #[test]
    fn redelivered_completion_echo_is_idempotent() {
        let mut session = ClientSession::new();
        let q = question("q1", 100);
        session.select_question("c1", &q);
        session.complete_question(&q, None);
        let version = session.board().version();

        // The relay echoes completions back to the sender.
        let echo = ServerFrame::QuestionCompleted(QuestionKey {
            category_id: "c1".into(),
            question_id: "q1".into(),
        });
        assert_eq!(session.receive(&echo), Applied::Unchanged);
        assert_eq!(session.board().version(), version);
        assert_eq!(session.board().completed_questions().len(), 1);
    }

    #[test]
    fn being_kicked_clears_the_remembered_identity() {
        let mut session = ClientSession::with_identity(team("team-1", "Alpha"));
        session.on_connected();

        // A kick for someone else changes nothing.
        session.receive(&ServerFrame::TeamRemoved(TeamRef {
            team_id: "team-9".into(),
        }));
        assert!(session.identity().is_some());

        session.receive(&ServerFrame::TeamRemoved(TeamRef {
            team_id: "team-1".into(),
        }));
        assert!(session.identity().is_none());
        assert!(session.board().team("team-1").is_none());
    }

    #[test]
    fn global_reset_clears_identity_and_board() {
        let mut session = ClientSession::with_identity(team("team-1", "Alpha"));
        session.on_connected();
        session.receive(&ServerFrame::QuestionCompleted(QuestionKey {
            category_id: "c1".into(),
            question_id: "q1".into(),
        }));

        session.receive(&ServerFrame::ResetAll);
        assert!(session.identity().is_none());
        assert_eq!(session.board().team_count(), 0);
        assert!(session.board().completed_questions().is_empty());
        assert!(!session.board().buzzer_locked());
    }

    #[test]
    fn identity_tracks_scores_arriving_over_the_wire() {
        let mut session = ClientSession::with_identity(team("team-1", "Alpha"));
        session.on_connected();

        session.receive(&ServerFrame::ScoreUpdated(ScoreDeltaPayload {
            team_id: "team-1".into(),
            points: 200,
            new_score: Some(200),
        }));

        assert_eq!(session.identity().unwrap().score, 200);
    }

    #[test]
    fn audio_frames_carry_no_state() {
        let mut session = ClientSession::new();
        let version = session.board().version();
        session.receive(&ServerFrame::AudioPlay);
        session.receive(&ServerFrame::AudioSeek(crate::dto::ws::SeekPayload {
            time: 12.5,
        }));
        assert_eq!(session.board().version(), version);
    }
}
