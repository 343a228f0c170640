//! Error types for the room layer.

use quizwire_protocol::{ConnectionId, ErrorCode, RoomCode};

/// Errors that can occur during room operations.
///
/// Every variant is recoverable: the coordinator reports it to the
/// offending connection and leaves the room untouched.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RoomError {
    /// No room is registered under this code.
    #[error("room {0} not found")]
    NotFound(RoomCode),

    /// Display players can only join a room that is still waiting.
    #[error("game in room {0} has already started")]
    GameAlreadyStarted(RoomCode),

    /// A non-host connection attempted a host-only action.
    #[error("connection {0} is not the host")]
    Unauthorized(ConnectionId),

    /// The game cannot start without a category and a category kind.
    #[error("a category and category kind must be selected before starting")]
    MissingSelection,

    #[error("room {0} is not playing")]
    NotPlaying(RoomCode),

    /// No round is open right now (between rounds or before the game).
    #[error("room {0} has no active question")]
    NoActiveQuestion(RoomCode),

    /// Code generation kept colliding with live rooms.
    #[error("could not allocate a room code after {0} attempts")]
    CreationFailed(usize),

    /// Players plus controllers already reach `max_players`.
    #[error("room {0} is full")]
    RoomFull(RoomCode),

    #[error("connection {0} is not in room {1}")]
    NotInRoom(ConnectionId, RoomCode),

    /// Only mobile controllers have a ready flag.
    #[error("connection {0} is not a controller")]
    NotController(ConnectionId),

    /// The registry already holds a room under this code.
    #[error("room code {0} is already in use")]
    DuplicateCode(RoomCode),

    /// The current round must end before the next one can begin.
    #[error("a round is still in progress in room {0}")]
    RoundInProgress(RoomCode),

    /// The room's command channel is full or closed.
    #[error("room {0} is unavailable")]
    Unavailable(RoomCode),
}

impl RoomError {
    /// The wire error code reported to clients.
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::NotFound(_) => ErrorCode::RoomNotFound,
            Self::GameAlreadyStarted(_) => ErrorCode::GameAlreadyStarted,
            Self::Unauthorized(_) => ErrorCode::Unauthorized,
            Self::MissingSelection => ErrorCode::MissingSelection,
            Self::NotPlaying(_) => ErrorCode::NotPlaying,
            Self::NoActiveQuestion(_) => ErrorCode::NoActiveQuestion,
            Self::CreationFailed(_) | Self::DuplicateCode(_) => {
                ErrorCode::RoomCreationFailed
            }
            Self::RoomFull(_) => ErrorCode::RoomFull,
            Self::NotInRoom(..) => ErrorCode::NotInRoom,
            Self::NotController(_) => ErrorCode::NotController,
            Self::RoundInProgress(_) => ErrorCode::RoundInProgress,
            Self::Unavailable(_) => ErrorCode::Unavailable,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_duplicate_code_reports_creation_failure() {
        let err = RoomError::DuplicateCode(RoomCode::normalize("AB12CD"));
        assert_eq!(err.code(), ErrorCode::RoomCreationFailed);
    }

    #[test]
    fn test_error_messages_name_the_room() {
        let err = RoomError::NotFound(RoomCode::normalize("zz99aa"));
        assert_eq!(err.to_string(), "room ZZ99AA not found");
    }
}
