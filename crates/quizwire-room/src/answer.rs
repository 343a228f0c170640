//! Answer evaluation and round-completion detection.

use quizwire_protocol::{ConnectionId, Recipient, RoomStatus, ServerEvent};
use tracing::debug;

use crate::state::{Outbox, Participant};
use crate::{Room, RoomError};

/// Result of evaluating one submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnswerOutcome {
    pub is_correct: bool,
    pub correct_label: String,
    pub score: u32,
    /// The participant had already answered this round; nothing changed.
    pub duplicate: bool,
    /// This submission completed the answering set.
    pub completes_round: bool,
    /// Generation of the round the answer was scored against.
    pub generation: u64,
}

impl Room {
    /// Scores `label` against the open question.
    ///
    /// A second submission in the same round is accepted but returns the
    /// first outcome unchanged.
    ///
    /// # Errors
    /// [`RoomError::NotPlaying`], [`RoomError::NoActiveQuestion`], or
    /// [`RoomError::NotInRoom`] for non-members.
    pub fn submit(
        &mut self,
        connection_id: &ConnectionId,
        label: &str,
    ) -> Result<AnswerOutcome, RoomError> {
        if self.status != RoomStatus::Playing {
            return Err(RoomError::NotPlaying(self.code.clone()));
        }
        let Some(question) = &self.current_question else {
            return Err(RoomError::NoActiveQuestion(self.code.clone()));
        };
        let correct_label = question.correct_label.clone();
        let generation = self.round_generation;
        let code = self.code.clone();

        let participant = self
            .participant_mut(connection_id)
            .ok_or_else(|| RoomError::NotInRoom(connection_id.clone(), code))?;

        if participant.has_answered_current_round() {
            let tally = participant.tally();
            return Ok(AnswerOutcome {
                is_correct: tally.last_correct.unwrap_or(false),
                correct_label,
                score: tally.score,
                duplicate: true,
                completes_round: false,
                generation,
            });
        }

        let is_correct = label == correct_label;
        let score = participant.apply_answer(is_correct);

        Ok(AnswerOutcome {
            is_correct,
            correct_label,
            score,
            duplicate: false,
            completes_round: self.everyone_answered(),
            generation,
        })
    }

    /// Evaluates a submission and produces its events: the unicast result,
    /// the `player_answered` broadcast, and the round end if this answer
    /// completed it.
    pub fn answer(&mut self, connection_id: &ConnectionId, label: &str) -> Result<Outbox, RoomError> {
        let outcome = self.submit(connection_id, label)?;
        debug!(
            room_code = %self.code,
            %connection_id,
            correct = outcome.is_correct,
            duplicate = outcome.duplicate,
            "answer evaluated"
        );

        let mut outbox = vec![(
            Recipient::Connection(connection_id.clone()),
            ServerEvent::AnswerResult {
                is_correct: outcome.is_correct,
                correct_label: outcome.correct_label,
                score: outcome.score,
                duplicate: outcome.duplicate,
            },
        )];
        if outcome.duplicate {
            return Ok(outbox);
        }

        let nickname = self
            .participant_mut(connection_id)
            .map(|p| p.nickname().to_owned())
            .unwrap_or_default();
        outbox.push((
            Recipient::Room,
            ServerEvent::PlayerAnswered {
                connection_id: connection_id.clone(),
                nickname,
            },
        ));

        if outcome.completes_round {
            outbox.extend(self.finish_round(outcome.generation));
        }
        Ok(outbox)
    }

    /// Whether everyone who is expected to answer has answered.
    ///
    /// Controllers drive play when present, so they form the answering
    /// set; otherwise the players do. An empty set never completes.
    pub fn everyone_answered(&self) -> bool {
        if self.controllers.is_empty() {
            all_answered(&self.players)
        } else {
            all_answered(&self.controllers)
        }
    }
}

fn all_answered<P: Participant>(set: &[P]) -> bool {
    !set.is_empty() && set.iter().all(|p| p.has_answered_current_round())
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use quizwire_protocol::{RoomCode, RoomSettings};

    use super::*;
    use crate::{QuizQuestion, StaticQuestionBank};

    fn id(s: &str) -> ConnectionId {
        ConnectionId::new(s)
    }

    /// A room with two controllers and round 1 open. The answer is "B".
    fn playing_room() -> Room {
        let bank = StaticQuestionBank::new(vec![QuizQuestion::lettered(
            "pick b",
            ["a", "b", "c", "d"],
            "B",
        )]);
        let mut room = Room::new(
            RoomCode::normalize("ANSWER"),
            id("host"),
            "Host".into(),
            RoomSettings::default(),
            None,
            Arc::new(bank),
        );
        room.join_controller(id("c1"), "Ann".into()).unwrap();
        room.join_controller(id("c2"), "Bo".into()).unwrap();
        room.start_game(&id("host"), Some("any".into()), Some("any".into()))
            .unwrap();
        room
    }

    #[tokio::test]
    async fn test_correct_answer_scores() {
        let mut room = playing_room();
        let outcome = room.submit(&id("c1"), "B").unwrap();

        assert!(outcome.is_correct);
        assert_eq!(outcome.score, 100);
        assert_eq!(outcome.correct_label, "B");
        assert!(!outcome.completes_round);
    }

    #[tokio::test]
    async fn test_wrong_answer_counts_wrong() {
        let mut room = playing_room();
        let outcome = room.submit(&id("c1"), "A").unwrap();

        assert!(!outcome.is_correct);
        assert_eq!(outcome.score, 0);
        assert_eq!(room.controllers()[0].tally.wrong_count, 1);
    }

    #[tokio::test]
    async fn test_label_must_match_exactly() {
        let mut room = playing_room();
        assert!(!room.submit(&id("c1"), "b").unwrap().is_correct);
        assert!(!room.submit(&id("c2"), " B ").unwrap().is_correct);
        assert_eq!(room.controllers()[1].tally.score, 0);
    }

    #[tokio::test]
    async fn test_duplicate_submission_changes_nothing() {
        let mut room = playing_room();
        room.submit(&id("c1"), "B").unwrap();
        let again = room.submit(&id("c1"), "A").unwrap();

        assert!(again.duplicate);
        assert!(again.is_correct);
        assert_eq!(again.score, 100);
        assert_eq!(room.controllers()[0].tally.correct_count, 1);
        assert_eq!(room.controllers()[0].tally.wrong_count, 0);
    }

    #[tokio::test]
    async fn test_last_controller_completes_round() {
        let mut room = playing_room();
        let first = room.answer(&id("c1"), "B").unwrap();
        assert!(first.iter().all(|(_, e)| e.name() != "question_ended"));

        let second = room.answer(&id("c2"), "C").unwrap();
        let names: Vec<_> = second.iter().map(|(_, e)| e.name()).collect();
        assert_eq!(names, vec!["answer_result", "player_answered", "question_ended"]);
        assert!(room.current_question().is_none());
    }

    #[tokio::test]
    async fn test_host_player_not_in_answering_set_with_controllers() {
        let mut room = playing_room();
        let outcome = room.submit(&id("host"), "B").unwrap();
        assert!(outcome.is_correct);
        assert!(!outcome.completes_round);
    }

    #[tokio::test]
    async fn test_player_answered_hides_correctness() {
        let mut room = playing_room();
        let outbox = room.answer(&id("c1"), "B").unwrap();

        let (recipient, event) = &outbox[1];
        assert_eq!(recipient, &Recipient::Room);
        assert_eq!(
            event,
            &ServerEvent::PlayerAnswered {
                connection_id: id("c1"),
                nickname: "Ann".into(),
            }
        );
        assert_eq!(outbox[0].0, Recipient::Connection(id("c1")));
    }

    #[tokio::test]
    async fn test_leaving_last_unanswered_controller_ends_round() {
        let mut room = playing_room();
        room.answer(&id("c1"), "B").unwrap();
        let outbox = room.leave(&id("c2")).unwrap();

        let names: Vec<_> = outbox.iter().map(|(_, e)| e.name()).collect();
        assert_eq!(names, vec!["controller_left", "question_ended"]);
    }

    #[tokio::test]
    async fn test_submit_between_rounds() {
        let mut room = playing_room();
        room.finish_round(room.round_generation());
        assert!(matches!(
            room.submit(&id("c1"), "B"),
            Err(RoomError::NoActiveQuestion(_))
        ));
    }

    #[tokio::test]
    async fn test_non_member_cannot_answer() {
        let mut room = playing_room();
        assert!(matches!(
            room.submit(&id("stranger"), "B"),
            Err(RoomError::NotInRoom(..))
        ));
    }
}
