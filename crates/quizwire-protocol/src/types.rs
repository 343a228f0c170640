//! Core protocol types for Quizwire's wire format.
//!
//! Every type here is serialized to JSON and read by browser or mobile
//! clients, so field names follow the clients' camelCase convention and
//! events are adjacently tagged:
//!
//! ```text
//! { "event": "submit_answer", "data": { "roomCode": "AB12CD", "answer": "B" } }
//! ```

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Identity types
// ---------------------------------------------------------------------------

/// Opaque identifier of one client connection.
///
/// Assigned by the transport. It is the only identity the session core
/// knows: a client that reconnects on a new connection is a new participant.
#[derive(
    Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct ConnectionId(String);

impl ConnectionId {
    /// Wraps a transport-assigned identifier.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ConnectionId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

/// Short, human-typed identifier of a room.
///
/// Codes are six characters over `[A-Z0-9]`. Anything a client sends is
/// normalized on the way in (trimmed and uppercased), which is why
/// deserialization goes through `From<String>`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct RoomCode(String);

impl RoomCode {
    /// Length of every generated code.
    pub const LEN: usize = 6;

    /// Builds a code from client input: surrounding whitespace is dropped
    /// and letters are uppercased.
    pub fn normalize(input: &str) -> Self {
        Self(input.trim().to_ascii_uppercase())
    }

    /// Returns `true` if the code has the shape the generator produces.
    pub fn is_well_formed(&self) -> bool {
        self.0.len() == Self::LEN
            && self
                .0
                .bytes()
                .all(|b| b.is_ascii_uppercase() || b.is_ascii_digit())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RoomCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for RoomCode {
    fn from(input: String) -> Self {
        Self::normalize(&input)
    }
}

impl From<RoomCode> for String {
    fn from(code: RoomCode) -> Self {
        code.0
    }
}

// ---------------------------------------------------------------------------
// Recipient: who should receive an outbound event?
// ---------------------------------------------------------------------------

/// The audience of an outbound [`ServerEvent`].
///
/// Room logic returns `(Recipient, ServerEvent)` pairs and the room actor
/// fans them out to the matching connections.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Recipient {
    /// One connection only (errors, answer results, snapshots).
    Connection(ConnectionId),

    /// Every player and controller in the room.
    Room,

    /// Everyone in the room except the given connection.
    AllExcept(ConnectionId),
}

// ---------------------------------------------------------------------------
// Room-level wire types
// ---------------------------------------------------------------------------

/// Lifecycle status of a room.
///
/// ```text
/// Waiting ──(start_game | all controllers ready)──→ Playing ──(last round ends)──→ Finished
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RoomStatus {
    Waiting,
    Playing,
    Finished,
}

impl RoomStatus {
    /// Returns `true` if display players may still join.
    pub fn is_joinable(&self) -> bool {
        matches!(self, Self::Waiting)
    }
}

impl fmt::Display for RoomStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Waiting => write!(f, "waiting"),
            Self::Playing => write!(f, "playing"),
            Self::Finished => write!(f, "finished"),
        }
    }
}

/// Per-room game settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomSettings {
    /// Maximum participants (players + controllers).
    pub max_players: usize,
    /// Length of each round's countdown.
    pub round_seconds: u32,
    /// Rounds in a game.
    pub total_rounds: u32,
}

impl Default for RoomSettings {
    fn default() -> Self {
        Self {
            max_players: 8,
            round_seconds: 30,
            total_rounds: 10,
        }
    }
}

/// A caller-supplied subset of [`RoomSettings`]. Unset fields keep the
/// defaults.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SettingsOverride {
    pub max_players: Option<usize>,
    pub round_seconds: Option<u32>,
    pub total_rounds: Option<u32>,
}

impl SettingsOverride {
    /// Overlays the set fields onto `base`.
    pub fn apply(&self, base: RoomSettings) -> RoomSettings {
        RoomSettings {
            max_players: self.max_players.unwrap_or(base.max_players),
            round_seconds: self.round_seconds.unwrap_or(base.round_seconds),
            total_rounds: self.total_rounds.unwrap_or(base.total_rounds),
        }
    }
}

/// Public view of a display player.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerSummary {
    pub connection_id: ConnectionId,
    pub nickname: String,
    pub is_host: bool,
    pub score: u32,
}

/// Public view of a mobile controller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ControllerSummary {
    pub connection_id: ConnectionId,
    pub nickname: String,
    pub is_ready: bool,
    pub score: u32,
}

/// Everything a client needs to render a room it just entered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomSnapshot {
    pub code: RoomCode,
    pub host_connection_id: ConnectionId,
    pub status: RoomStatus,
    pub players: Vec<PlayerSummary>,
    pub controllers: Vec<ControllerSummary>,
    pub settings: RoomSettings,
    pub current_round: u32,
    pub category: Option<String>,
    pub category_kind: Option<String>,
}

/// A question as shown to participants while its round is open.
///
/// Carries no correct label. The label only leaves the server in
/// `question_ended` and `answer_result`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionView {
    pub id: String,
    pub prompt: String,
    /// Option text keyed by label (`"A"`, `"B"`, ...).
    pub options: BTreeMap<String, String>,
    pub round_index: u32,
    pub total_rounds: u32,
    pub time_limit_seconds: u32,
}

/// One participant's line in the final results.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParticipantResult {
    pub nickname: String,
    pub score: u32,
    pub correct_count: u32,
    pub total_answered: u32,
}

/// Final results keyed by connection.
pub type Results = BTreeMap<ConnectionId, ParticipantResult>;

/// Machine-readable error kinds sent with `error` events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    RoomNotFound,
    GameAlreadyStarted,
    Unauthorized,
    MissingSelection,
    NotPlaying,
    NoActiveQuestion,
    RoomCreationFailed,
    RoomFull,
    NotInRoom,
    NotController,
    RoundInProgress,
    InvalidEvent,
    Unavailable,
}

// ---------------------------------------------------------------------------
// ClientEvent: inbound
// ---------------------------------------------------------------------------

/// Events a client sends to the server.
///
/// `disconnect` is normally synthesized by the transport when the socket
/// closes, but a client may also send it explicitly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(
    tag = "event",
    content = "data",
    rename_all = "snake_case",
    rename_all_fields = "camelCase"
)]
pub enum ClientEvent {
    /// Open a new room with the sender as host player.
    CreateRoom {
        nickname: Option<String>,
        category: Option<String>,
        settings: Option<SettingsOverride>,
    },

    /// Join as a display player (only while the room is waiting).
    JoinRoom { room_code: RoomCode, nickname: String },

    /// Join as a mobile controller (allowed mid-game).
    JoinController { room_code: RoomCode, nickname: String },

    LeaveRoom { room_code: RoomCode },

    /// Host-only. Category fields fall back to what the room already has.
    StartGame {
        room_code: RoomCode,
        category: Option<String>,
        category_kind: Option<String>,
    },

    ToggleReady { room_code: RoomCode, is_ready: bool },

    SubmitAnswer { room_code: RoomCode, answer: String },

    RequestCurrentQuestion { room_code: RoomCode },

    RequestNextQuestion { room_code: RoomCode },

    /// Host-only, before the game starts.
    UpdateRoomCategory {
        room_code: RoomCode,
        category: String,
        category_kind: String,
    },

    /// Replays the room snapshot to a connection that is still a member.
    ReconnectToRoom { room_code: RoomCode },

    RequestGameResults { room_code: RoomCode },

    Disconnect,
}

impl ClientEvent {
    /// The wire name of this event, for logging.
    pub fn name(&self) -> &'static str {
        match self {
            Self::CreateRoom { .. } => "create_room",
            Self::JoinRoom { .. } => "join_room",
            Self::JoinController { .. } => "join_controller",
            Self::LeaveRoom { .. } => "leave_room",
            Self::StartGame { .. } => "start_game",
            Self::ToggleReady { .. } => "toggle_ready",
            Self::SubmitAnswer { .. } => "submit_answer",
            Self::RequestCurrentQuestion { .. } => "request_current_question",
            Self::RequestNextQuestion { .. } => "request_next_question",
            Self::UpdateRoomCategory { .. } => "update_room_category",
            Self::ReconnectToRoom { .. } => "reconnect_to_room",
            Self::RequestGameResults { .. } => "request_game_results",
            Self::Disconnect => "disconnect",
        }
    }
}

// ---------------------------------------------------------------------------
// ServerEvent: outbound
// ---------------------------------------------------------------------------

/// Events the server pushes to clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(
    tag = "event",
    content = "data",
    rename_all = "snake_case",
    rename_all_fields = "camelCase"
)]
pub enum ServerEvent {
    /// Unicast to the creator.
    RoomCreated { room: RoomSnapshot },

    /// Unicast to a player or controller that just joined.
    RoomJoined { room: RoomSnapshot },

    /// Unicast answer to `reconnect_to_room`.
    RoomRejoined { room: RoomSnapshot, is_host: bool },

    PlayerJoined { player: PlayerSummary },

    ControllerJoined { controller: ControllerSummary },

    PlayerLeft { connection_id: ConnectionId, nickname: String },

    ControllerLeft { connection_id: ConnectionId, nickname: String },

    /// Host authority moved to another player.
    NewHost { connection_id: ConnectionId, nickname: String },

    PlayerReady {
        connection_id: ConnectionId,
        nickname: String,
        is_ready: bool,
    },

    /// Every controller flagged ready; the game is about to start.
    AllReady,

    CategoryUpdated { category: String, category_kind: String },

    GameStarted {
        current_round: u32,
        total_rounds: u32,
        category: Option<String>,
        category_kind: Option<String>,
    },

    /// Options and metadata only, never the correct label.
    NewQuestion { question: QuestionView },

    TimerUpdate { seconds_remaining: u64 },

    /// Round closed: reveals the correct label to everyone.
    QuestionEnded { round: u32, correct_label: String },

    /// Someone answered. Carries no label and no correctness.
    PlayerAnswered { connection_id: ConnectionId, nickname: String },

    /// Unicast to the submitter.
    AnswerResult {
        is_correct: bool,
        correct_label: String,
        score: u32,
        duplicate: bool,
    },

    GameEnded { results: Results },

    /// Unicast answer to `request_game_results`.
    GameResults { results: Results },

    Error { code: ErrorCode, message: String },
}

impl ServerEvent {
    /// The wire name of this event, for logging.
    pub fn name(&self) -> &'static str {
        match self {
            Self::RoomCreated { .. } => "room_created",
            Self::RoomJoined { .. } => "room_joined",
            Self::RoomRejoined { .. } => "room_rejoined",
            Self::PlayerJoined { .. } => "player_joined",
            Self::ControllerJoined { .. } => "controller_joined",
            Self::PlayerLeft { .. } => "player_left",
            Self::ControllerLeft { .. } => "controller_left",
            Self::NewHost { .. } => "new_host",
            Self::PlayerReady { .. } => "player_ready",
            Self::AllReady => "all_ready",
            Self::CategoryUpdated { .. } => "category_updated",
            Self::GameStarted { .. } => "game_started",
            Self::NewQuestion { .. } => "new_question",
            Self::TimerUpdate { .. } => "timer_update",
            Self::QuestionEnded { .. } => "question_ended",
            Self::PlayerAnswered { .. } => "player_answered",
            Self::AnswerResult { .. } => "answer_result",
            Self::GameEnded { .. } => "game_ended",
            Self::GameResults { .. } => "game_results",
            Self::Error { .. } => "error",
        }
    }
}

// =========================================================================
// Tests
// =========================================================================

#[cfg(test)]
mod tests {
    //! The JSON shapes here are what the web and mobile clients parse, so
    //! a serde attribute change that alters them is a breaking change.

    use super::*;

    fn code(s: &str) -> RoomCode {
        RoomCode::normalize(s)
    }

    #[test]
    fn test_room_code_normalizes_input() {
        assert_eq!(code("  ab12cd\n").as_str(), "AB12CD");
    }

    #[test]
    fn test_room_code_deserialization_normalizes() {
        let parsed: RoomCode = serde_json::from_str("\" xy9zq1 \"").unwrap();
        assert_eq!(parsed.as_str(), "XY9ZQ1");
        assert_eq!(serde_json::to_string(&parsed).unwrap(), "\"XY9ZQ1\"");
    }

    #[test]
    fn test_room_code_well_formed() {
        assert!(code("AB12CD").is_well_formed());
        assert!(!code("AB12C").is_well_formed());
        assert!(!code("AB-2CD").is_well_formed());
    }

    #[test]
    fn test_connection_id_serializes_as_plain_string() {
        let json = serde_json::to_string(&ConnectionId::new("conn-7")).unwrap();
        assert_eq!(json, "\"conn-7\"");
    }

    #[test]
    fn test_room_status_lowercase() {
        let json = serde_json::to_string(&RoomStatus::Playing).unwrap();
        assert_eq!(json, "\"playing\"");
        assert!(RoomStatus::Waiting.is_joinable());
        assert!(!RoomStatus::Playing.is_joinable());
    }

    #[test]
    fn test_settings_override_applies_only_set_fields() {
        let merged = SettingsOverride {
            total_rounds: Some(3),
            ..SettingsOverride::default()
        }
        .apply(RoomSettings::default());

        assert_eq!(merged.total_rounds, 3);
        assert_eq!(merged.round_seconds, 30);
        assert_eq!(merged.max_players, 8);
    }

    #[test]
    fn test_create_room_fields_are_optional() {
        let event: ClientEvent =
            serde_json::from_str(r#"{"event":"create_room","data":{}}"#).unwrap();
        assert_eq!(
            event,
            ClientEvent::CreateRoom {
                nickname: None,
                category: None,
                settings: None,
            }
        );
    }

    #[test]
    fn test_start_game_uses_camel_case_fields() {
        let event: ClientEvent = serde_json::from_str(
            r#"{"event":"start_game","data":{"roomCode":"ab12cd","category":"funk","categoryKind":"music"}}"#,
        )
        .unwrap();
        assert_eq!(
            event,
            ClientEvent::StartGame {
                room_code: code("AB12CD"),
                category: Some("funk".into()),
                category_kind: Some("music".into()),
            }
        );
        assert_eq!(event.name(), "start_game");
    }

    #[test]
    fn test_disconnect_has_no_data() {
        let event: ClientEvent =
            serde_json::from_str(r#"{"event":"disconnect"}"#).unwrap();
        assert_eq!(event, ClientEvent::Disconnect);
    }

    #[test]
    fn test_unknown_event_is_rejected() {
        let result: Result<ClientEvent, _> =
            serde_json::from_str(r#"{"event":"fly_to_moon","data":{}}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_new_question_json_has_no_correct_label() {
        let event = ServerEvent::NewQuestion {
            question: QuestionView {
                id: "q1".into(),
                prompt: "Who?".into(),
                options: BTreeMap::from([
                    ("A".to_string(), "Pink Floyd".to_string()),
                    ("B".to_string(), "Queen".to_string()),
                ]),
                round_index: 1,
                total_rounds: 10,
                time_limit_seconds: 30,
            },
        };
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("\"event\":\"new_question\""));
        assert!(json.contains("\"timeLimitSeconds\":30"));
        assert!(!json.to_lowercase().contains("correct"));
    }

    #[test]
    fn test_error_code_screaming_snake_case() {
        let event = ServerEvent::Error {
            code: ErrorCode::RoomNotFound,
            message: "room AB12CD not found".into(),
        };
        let json: serde_json::Value = serde_json::to_value(&event).unwrap();
        assert_eq!(json["event"], "error");
        assert_eq!(json["data"]["code"], "ROOM_NOT_FOUND");
    }

    #[test]
    fn test_all_ready_is_unit_event() {
        let json: serde_json::Value =
            serde_json::to_value(&ServerEvent::AllReady).unwrap();
        assert_eq!(json["event"], "all_ready");
        assert_eq!(ServerEvent::AllReady.name(), "all_ready");
    }

    #[test]
    fn test_results_keyed_by_connection_id() {
        let mut results = Results::new();
        results.insert(
            ConnectionId::new("c1"),
            ParticipantResult {
                nickname: "Ann".into(),
                score: 200,
                correct_count: 2,
                total_answered: 3,
            },
        );
        let json: serde_json::Value =
            serde_json::to_value(&ServerEvent::GameEnded { results }).unwrap();
        assert_eq!(json["data"]["results"]["c1"]["totalAnswered"], 3);
    }
}
