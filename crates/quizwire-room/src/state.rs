//! Room state: the data a room actor owns.
//!
//! The membership, round, and answer modules add behaviour to [`Room`]
//! through further `impl` blocks. Every mutating method returns an
//! [`Outbox`] of events for the actor to deliver; none of them do I/O.

use std::sync::Arc;
use std::time::Duration;

use quizwire_clock::RoundClock;
use quizwire_protocol::{
    ConnectionId, ControllerSummary, ParticipantResult, PlayerSummary,
    QuestionView, Recipient, Results, RoomCode, RoomSettings, RoomSnapshot,
    RoomStatus, ServerEvent,
};
use tokio::time::Instant;

use crate::QuestionProvider;

/// Events produced by one room operation, in delivery order.
pub type Outbox = Vec<(Recipient, ServerEvent)>;

/// Points awarded for a correct answer.
pub const POINTS_PER_CORRECT: u32 = 100;

// ---------------------------------------------------------------------------
// Participants
// ---------------------------------------------------------------------------

/// Scoring state shared by players and controllers.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Tally {
    pub score: u32,
    pub correct_count: u32,
    pub wrong_count: u32,
    pub answered_current_round: bool,
    /// Correctness of this round's answer, once given.
    pub last_correct: Option<bool>,
}

impl Tally {
    pub fn total_answered(&self) -> u32 {
        self.correct_count + self.wrong_count
    }

    fn reset_round(&mut self) {
        self.answered_current_round = false;
        self.last_correct = None;
    }
}

/// What the answer evaluator needs from anyone who can answer.
///
/// Players and controllers differ in role, not in how they are scored, so
/// scoring is written once against this trait.
pub trait Participant {
    fn connection_id(&self) -> &ConnectionId;
    fn nickname(&self) -> &str;
    fn tally(&self) -> &Tally;
    fn tally_mut(&mut self) -> &mut Tally;

    fn has_answered_current_round(&self) -> bool {
        self.tally().answered_current_round
    }

    /// Records this round's answer and returns the new score.
    fn apply_answer(&mut self, is_correct: bool) -> u32 {
        let tally = self.tally_mut();
        tally.answered_current_round = true;
        tally.last_correct = Some(is_correct);
        if is_correct {
            tally.score += POINTS_PER_CORRECT;
            tally.correct_count += 1;
        } else {
            tally.wrong_count += 1;
        }
        tally.score
    }

    fn result(&self) -> ParticipantResult {
        let tally = self.tally();
        ParticipantResult {
            nickname: self.nickname().to_owned(),
            score: tally.score,
            correct_count: tally.correct_count,
            total_answered: tally.total_answered(),
        }
    }
}

/// A display/web participant. One player per room is the host.
#[derive(Debug, Clone)]
pub struct Player {
    pub connection_id: ConnectionId,
    pub nickname: String,
    pub is_host: bool,
    pub tally: Tally,
}

impl Player {
    pub fn new(connection_id: ConnectionId, nickname: String, is_host: bool) -> Self {
        Self {
            connection_id,
            nickname,
            is_host,
            tally: Tally::default(),
        }
    }

    pub fn summary(&self) -> PlayerSummary {
        PlayerSummary {
            connection_id: self.connection_id.clone(),
            nickname: self.nickname.clone(),
            is_host: self.is_host,
            score: self.tally.score,
        }
    }
}

impl Participant for Player {
    fn connection_id(&self) -> &ConnectionId {
        &self.connection_id
    }
    fn nickname(&self) -> &str {
        &self.nickname
    }
    fn tally(&self) -> &Tally {
        &self.tally
    }
    fn tally_mut(&mut self) -> &mut Tally {
        &mut self.tally
    }
}

/// A mobile participant: answers and readies up, never hosts.
#[derive(Debug, Clone)]
pub struct Controller {
    pub connection_id: ConnectionId,
    pub nickname: String,
    pub is_ready: bool,
    pub tally: Tally,
}

impl Controller {
    pub fn new(connection_id: ConnectionId, nickname: String) -> Self {
        Self {
            connection_id,
            nickname,
            is_ready: false,
            tally: Tally::default(),
        }
    }

    pub fn summary(&self) -> ControllerSummary {
        ControllerSummary {
            connection_id: self.connection_id.clone(),
            nickname: self.nickname.clone(),
            is_ready: self.is_ready,
            score: self.tally.score,
        }
    }
}

impl Participant for Controller {
    fn connection_id(&self) -> &ConnectionId {
        &self.connection_id
    }
    fn nickname(&self) -> &str {
        &self.nickname
    }
    fn tally(&self) -> &Tally {
        &self.tally
    }
    fn tally_mut(&mut self) -> &mut Tally {
        &mut self.tally
    }
}

// ---------------------------------------------------------------------------
// QuestionRound
// ---------------------------------------------------------------------------

/// The question in flight. Replaced, never edited, each round.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuestionRound {
    pub id: String,
    pub prompt: String,
    pub options_by_label: std::collections::BTreeMap<String, String>,
    pub correct_label: String,
    pub round_index: u32,
    pub total_rounds: u32,
    pub time_limit_seconds: u32,
}

impl QuestionRound {
    /// The public view: everything except the correct label.
    pub fn view(&self) -> QuestionView {
        QuestionView {
            id: self.id.clone(),
            prompt: self.prompt.clone(),
            options: self.options_by_label.clone(),
            round_index: self.round_index,
            total_rounds: self.total_rounds,
            time_limit_seconds: self.time_limit_seconds,
        }
    }
}

// ---------------------------------------------------------------------------
// Room
// ---------------------------------------------------------------------------

/// One game session.
pub struct Room {
    pub(crate) code: RoomCode,
    pub(crate) host_connection_id: ConnectionId,
    pub(crate) status: RoomStatus,
    pub(crate) players: Vec<Player>,
    pub(crate) controllers: Vec<Controller>,
    pub(crate) settings: RoomSettings,
    pub(crate) current_round: u32,
    pub(crate) category: Option<String>,
    pub(crate) category_kind: Option<String>,
    pub(crate) current_question: Option<QuestionRound>,
    pub(crate) round_deadline: Option<Instant>,
    /// Bumped every time a round begins. Clock events and round-end
    /// requests carrying an older value are ignored.
    pub(crate) round_generation: u64,
    pub(crate) clock: RoundClock,
    pub(crate) questions: Arc<dyn QuestionProvider>,
    pub(crate) inter_round_pause: Duration,
}

impl Room {
    /// Creates a waiting room with `host` as its only player.
    pub fn new(
        code: RoomCode,
        host: ConnectionId,
        nickname: String,
        settings: RoomSettings,
        category: Option<String>,
        questions: Arc<dyn QuestionProvider>,
    ) -> Self {
        Self {
            code,
            host_connection_id: host.clone(),
            status: RoomStatus::Waiting,
            players: vec![Player::new(host, nickname, true)],
            controllers: Vec::new(),
            settings,
            current_round: 0,
            category,
            category_kind: None,
            current_question: None,
            round_deadline: None,
            round_generation: 0,
            clock: RoundClock::default(),
            questions,
            inter_round_pause: Duration::from_secs(5),
        }
    }

    /// Overrides the pause between automatically advanced rounds.
    pub fn with_inter_round_pause(mut self, pause: Duration) -> Self {
        self.inter_round_pause = pause;
        self
    }

    /// Replaces the round clock, e.g. to change its tick period.
    pub fn with_clock(mut self, clock: RoundClock) -> Self {
        self.clock = clock;
        self
    }

    pub fn code(&self) -> &RoomCode {
        &self.code
    }

    pub fn host_connection_id(&self) -> &ConnectionId {
        &self.host_connection_id
    }

    pub fn status(&self) -> RoomStatus {
        self.status
    }

    pub fn current_round(&self) -> u32 {
        self.current_round
    }

    pub fn round_generation(&self) -> u64 {
        self.round_generation
    }

    pub fn current_question(&self) -> Option<&QuestionRound> {
        self.current_question.as_ref()
    }

    pub fn round_deadline(&self) -> Option<Instant> {
        self.round_deadline
    }

    pub fn players(&self) -> &[Player] {
        &self.players
    }

    pub fn controllers(&self) -> &[Controller] {
        &self.controllers
    }

    pub fn member_count(&self) -> usize {
        self.players.len() + self.controllers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.players.is_empty() && self.controllers.is_empty()
    }

    pub fn is_member(&self, connection_id: &ConnectionId) -> bool {
        self.players.iter().any(|p| &p.connection_id == connection_id)
            || self.controllers.iter().any(|c| &c.connection_id == connection_id)
    }

    pub fn is_host(&self, connection_id: &ConnectionId) -> bool {
        &self.host_connection_id == connection_id
    }

    /// Every member's connection id, players first.
    pub fn member_ids(&self) -> impl Iterator<Item = &ConnectionId> {
        self.players
            .iter()
            .map(|p| &p.connection_id)
            .chain(self.controllers.iter().map(|c| &c.connection_id))
    }

    pub(crate) fn participant_mut(
        &mut self,
        connection_id: &ConnectionId,
    ) -> Option<&mut dyn Participant> {
        if let Some(player) = self
            .players
            .iter_mut()
            .find(|p| &p.connection_id == connection_id)
        {
            return Some(player as &mut dyn Participant);
        }
        self.controllers
            .iter_mut()
            .find(|c| &c.connection_id == connection_id)
            .map(|c| c as &mut dyn Participant)
    }

    /// Everything a client needs to render the room.
    pub fn snapshot(&self) -> RoomSnapshot {
        RoomSnapshot {
            code: self.code.clone(),
            host_connection_id: self.host_connection_id.clone(),
            status: self.status,
            players: self.players.iter().map(Player::summary).collect(),
            controllers: self.controllers.iter().map(Controller::summary).collect(),
            settings: self.settings,
            current_round: self.current_round,
            category: self.category.clone(),
            category_kind: self.category_kind.clone(),
        }
    }

    /// Final standings for every current participant.
    pub fn results(&self) -> Results {
        let players = self.players.iter().map(|p| (p.connection_id.clone(), p.result()));
        let controllers = self
            .controllers
            .iter()
            .map(|c| (c.connection_id.clone(), c.result()));
        players.chain(controllers).collect()
    }

    pub(crate) fn reset_round_flags(&mut self) {
        for player in &mut self.players {
            player.tally.reset_round();
        }
        for controller in &mut self.controllers {
            controller.tally.reset_round();
        }
    }
}

impl std::fmt::Debug for Room {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Room")
            .field("code", &self.code)
            .field("status", &self.status)
            .field("players", &self.players.len())
            .field("controllers", &self.controllers.len())
            .field("current_round", &self.current_round)
            .field("round_generation", &self.round_generation)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::StaticQuestionBank;

    fn room() -> Room {
        Room::new(
            RoomCode::normalize("ABC123"),
            ConnectionId::new("host"),
            "Host".into(),
            RoomSettings::default(),
            None,
            Arc::new(StaticQuestionBank::builtin()),
        )
    }

    #[test]
    fn test_new_room_has_host_player() {
        let room = room();
        assert_eq!(room.status(), RoomStatus::Waiting);
        assert_eq!(room.current_round(), 0);
        assert_eq!(room.players().len(), 1);
        assert!(room.players()[0].is_host);
        assert!(room.is_host(&ConnectionId::new("host")));
    }

    #[test]
    fn test_apply_answer_scores_once_per_call() {
        let mut controller = Controller::new(ConnectionId::new("c1"), "Ann".into());
        assert_eq!(controller.apply_answer(true), POINTS_PER_CORRECT);
        assert!(controller.has_answered_current_round());
        assert_eq!(controller.apply_answer(false), POINTS_PER_CORRECT);

        let result = controller.result();
        assert_eq!(result.correct_count, 1);
        assert_eq!(result.total_answered, 2);
    }

    #[test]
    fn test_snapshot_lists_members() {
        let mut room = room();
        room.controllers
            .push(Controller::new(ConnectionId::new("c1"), "Ann".into()));

        let snapshot = room.snapshot();
        assert_eq!(snapshot.players.len(), 1);
        assert_eq!(snapshot.controllers[0].nickname, "Ann");
        assert_eq!(snapshot.host_connection_id.as_str(), "host");
        assert_eq!(room.member_count(), 2);
    }

    #[test]
    fn test_results_cover_players_and_controllers() {
        let mut room = room();
        room.controllers
            .push(Controller::new(ConnectionId::new("c1"), "Ann".into()));
        room.controllers[0].apply_answer(true);

        let results = room.results();
        assert_eq!(results.len(), 2);
        assert_eq!(results[&ConnectionId::new("c1")].score, 100);
        assert_eq!(results[&ConnectionId::new("host")].score, 0);
    }
}
