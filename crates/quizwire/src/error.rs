//! Unified error type for the Quizwire server.

use quizwire_protocol::ProtocolError;
use quizwire_room::RoomError;
use quizwire_transport::TransportError;

/// Top-level error wrapping the errors of each layer.
///
/// `#[from]` on each variant lets `?` convert layer errors directly.
#[derive(Debug, thiserror::Error)]
pub enum QuizwireError {
    /// Binding, accepting, or talking to a socket failed.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// A frame could not be encoded or decoded.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// A room operation was rejected.
    #[error(transparent)]
    Room(#[from] RoomError),
}

#[cfg(test)]
mod tests {
    use super::*;
    use quizwire_protocol::RoomCode;

    #[test]
    fn test_from_transport_error() {
        let err = TransportError::AcceptFailed(std::io::Error::other("gone"));
        let err: QuizwireError = err.into();
        assert!(matches!(err, QuizwireError::Transport(_)));
        assert!(err.to_string().contains("gone"));
    }

    #[test]
    fn test_from_protocol_error() {
        let err: QuizwireError = ProtocolError::InvalidEvent("bad".into()).into();
        assert!(matches!(err, QuizwireError::Protocol(_)));
    }

    #[test]
    fn test_from_room_error_keeps_message() {
        let room_err = RoomError::NotFound(RoomCode::normalize("zz9zz9"));
        let expected = room_err.to_string();
        let err: QuizwireError = room_err.into();
        assert!(matches!(err, QuizwireError::Room(_)));
        assert_eq!(err.to_string(), expected);
    }
}
