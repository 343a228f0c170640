//! Round engine: starting the game, running rounds, and ending it.
//!
//! ```text
//! Waiting ──(start_game | ready-check)──→ Playing ──┐
//!                                          ↑        │ timeout | all answered
//!                                          └────────┤ (round < total)
//!                                                   ↓ (round == total)
//!                                                Finished
//! ```
//!
//! Round end is reachable from two racing triggers, the clock and the
//! answer evaluator. Both name the round generation they belong to and
//! [`Room::finish_round`] acts only on a live round of the current
//! generation, so a round ends at most once.

use std::time::Duration;

use quizwire_clock::ClockEvent;
use quizwire_protocol::{ConnectionId, Recipient, RoomStatus, ServerEvent};
use tokio::time::Instant;
use tracing::{debug, info, trace, warn};

use crate::code::generate_question_id;
use crate::state::{Outbox, QuestionRound};
use crate::{Room, RoomError};

impl Room {
    /// Host-only explicit start.
    ///
    /// Category and category kind come from the request or, failing that,
    /// from what the room already has. Both must resolve.
    ///
    /// # Errors
    /// [`RoomError::Unauthorized`], [`RoomError::GameAlreadyStarted`],
    /// [`RoomError::MissingSelection`]. Nothing changes on error.
    pub fn start_game(
        &mut self,
        requester: &ConnectionId,
        category: Option<String>,
        category_kind: Option<String>,
    ) -> Result<Outbox, RoomError> {
        if !self.is_host(requester) {
            return Err(RoomError::Unauthorized(requester.clone()));
        }
        if self.status != RoomStatus::Waiting {
            return Err(RoomError::GameAlreadyStarted(self.code.clone()));
        }

        let category = non_empty(category).or_else(|| non_empty(self.category.clone()));
        let category_kind =
            non_empty(category_kind).or_else(|| non_empty(self.category_kind.clone()));
        let (Some(category), Some(category_kind)) = (category, category_kind) else {
            return Err(RoomError::MissingSelection);
        };

        self.category = Some(category);
        self.category_kind = Some(category_kind);
        Ok(self.start_playing())
    }

    /// Moves a waiting room into play and opens round 1.
    pub(crate) fn start_playing(&mut self) -> Outbox {
        self.status = RoomStatus::Playing;
        self.current_round = 1;
        info!(
            room_code = %self.code,
            category = ?self.category,
            total_rounds = self.settings.total_rounds,
            "game started"
        );

        let mut outbox = vec![(Recipient::Room, self.game_started())];
        outbox.extend(self.begin_round());
        outbox
    }

    /// Opens the round numbered `current_round`.
    ///
    /// Questions are picked round-robin from the category pool, so the
    /// round number alone identifies the question.
    pub fn begin_round(&mut self) -> Outbox {
        self.clock.cancel();

        let pool = self.question_pool();
        if pool.is_empty() {
            warn!(room_code = %self.code, "no questions available, ending game");
            return self.end_game();
        }
        let index = (self.current_round.saturating_sub(1) as usize) % pool.len();
        let Some(question) = pool.into_iter().nth(index) else {
            return self.end_game();
        };

        self.round_generation += 1;
        let time_limit = self.settings.round_seconds;
        let round = QuestionRound {
            id: generate_question_id(),
            prompt: question.prompt,
            options_by_label: question.options,
            correct_label: question.correct_label,
            round_index: self.current_round,
            total_rounds: self.settings.total_rounds,
            time_limit_seconds: time_limit,
        };
        let view = round.view();
        self.current_question = Some(round);
        self.reset_round_flags();

        let duration = Duration::from_secs(u64::from(time_limit));
        self.round_deadline = Some(Instant::now() + duration);
        let seconds = self.clock.start_countdown(self.round_generation, duration);

        info!(
            room_code = %self.code,
            round = self.current_round,
            generation = self.round_generation,
            pool_index = index,
            "round started"
        );

        vec![
            (Recipient::Room, ServerEvent::NewQuestion { question: view }),
            (
                Recipient::Room,
                ServerEvent::TimerUpdate {
                    seconds_remaining: seconds,
                },
            ),
        ]
    }

    fn question_pool(&self) -> Vec<crate::QuizQuestion> {
        if let Some(category) = self.category.as_deref() {
            match self.questions.questions_for_category(category) {
                Some(pool) if !pool.is_empty() => return pool,
                _ => warn!(
                    room_code = %self.code,
                    %category,
                    "category has no questions, using default pool"
                ),
            }
        } else {
            warn!(room_code = %self.code, "no category selected, using default pool");
        }
        self.questions.default_questions()
    }

    /// Reacts to the room's clock.
    pub fn on_clock(&mut self, event: ClockEvent) -> Outbox {
        match event {
            ClockEvent::Remaining {
                generation,
                seconds,
            } => {
                if generation != self.round_generation || self.current_question.is_none() {
                    return Outbox::new();
                }
                trace!(room_code = %self.code, generation, seconds, "timer update");
                vec![(
                    Recipient::Room,
                    ServerEvent::TimerUpdate {
                        seconds_remaining: seconds,
                    },
                )]
            }
            ClockEvent::Expired { generation } => {
                debug!(room_code = %self.code, generation, "round timed out");
                self.finish_round(generation)
            }
            ClockEvent::IntermissionOver { generation } => {
                if generation != self.round_generation
                    || self.status != RoomStatus::Playing
                    || self.current_question.is_some()
                {
                    return Outbox::new();
                }
                self.begin_round()
            }
        }
    }

    /// Closes the round of `generation`: reveals the answer and either
    /// schedules the next round, ends the game, or (with controllers
    /// present) waits for a `request_next_question`.
    ///
    /// A stale generation or an already-closed round is a no-op.
    pub fn finish_round(&mut self, generation: u64) -> Outbox {
        if generation != self.round_generation {
            trace!(
                room_code = %self.code,
                generation,
                current = self.round_generation,
                "stale round end ignored"
            );
            return Outbox::new();
        }
        let Some(question) = self.current_question.take() else {
            trace!(room_code = %self.code, generation, "round already closed");
            return Outbox::new();
        };
        self.clock.cancel();
        self.round_deadline = None;

        info!(
            room_code = %self.code,
            round = self.current_round,
            generation,
            "round ended"
        );
        let mut outbox = vec![(
            Recipient::Room,
            ServerEvent::QuestionEnded {
                round: self.current_round,
                correct_label: question.correct_label,
            },
        )];

        if !self.controllers.is_empty() {
            debug!(room_code = %self.code, "waiting for next-question request");
            return outbox;
        }

        self.current_round += 1;
        if self.current_round <= self.settings.total_rounds {
            self.clock
                .start_intermission(self.round_generation, self.inter_round_pause);
        } else {
            outbox.extend(self.end_game());
        }
        outbox
    }

    /// Advances to the next round on request.
    ///
    /// If an automatic pause is already running, the round it would have
    /// opened starts now instead.
    ///
    /// # Errors
    /// [`RoomError::NotPlaying`], or [`RoomError::RoundInProgress`] while
    /// a question is still open.
    pub fn next_question(&mut self) -> Result<Outbox, RoomError> {
        if self.status != RoomStatus::Playing {
            return Err(RoomError::NotPlaying(self.code.clone()));
        }
        if self.current_question.is_some() {
            return Err(RoomError::RoundInProgress(self.code.clone()));
        }
        if self.clock.in_intermission() {
            return Ok(self.begin_round());
        }

        self.current_round += 1;
        if self.current_round <= self.settings.total_rounds {
            Ok(self.begin_round())
        } else {
            Ok(self.end_game())
        }
    }

    /// Finishes the game and announces the results.
    pub fn end_game(&mut self) -> Outbox {
        self.status = RoomStatus::Finished;
        self.clock.cancel();
        self.current_question = None;
        self.round_deadline = None;
        info!(
            room_code = %self.code,
            rounds = self.current_round.min(self.settings.total_rounds),
            "game ended"
        );
        vec![(
            Recipient::Room,
            ServerEvent::GameEnded {
                results: self.results(),
            },
        )]
    }

    /// Unicasts the open question and its remaining time.
    ///
    /// # Errors
    /// [`RoomError::NotPlaying`] or [`RoomError::NoActiveQuestion`].
    pub fn current_question_for(&self, connection_id: &ConnectionId) -> Result<Outbox, RoomError> {
        if self.status != RoomStatus::Playing {
            return Err(RoomError::NotPlaying(self.code.clone()));
        }
        if self.current_question.is_none() {
            return Err(RoomError::NoActiveQuestion(self.code.clone()));
        }
        Ok(self.question_replay(connection_id))
    }

    /// Unicasts the results so far. Allowed in any status.
    pub fn results_for(&self, connection_id: &ConnectionId) -> Outbox {
        vec![(
            Recipient::Connection(connection_id.clone()),
            ServerEvent::GameResults {
                results: self.results(),
            },
        )]
    }

    /// Brings a late or returning member up to date with a running game.
    pub(crate) fn catch_up(&self, connection_id: &ConnectionId) -> Outbox {
        if self.status != RoomStatus::Playing {
            return Outbox::new();
        }
        let mut outbox = vec![(
            Recipient::Connection(connection_id.clone()),
            self.game_started(),
        )];
        outbox.extend(self.question_replay(connection_id));
        outbox
    }

    fn question_replay(&self, connection_id: &ConnectionId) -> Outbox {
        let Some(question) = &self.current_question else {
            return Outbox::new();
        };
        let to = Recipient::Connection(connection_id.clone());
        vec![
            (
                to.clone(),
                ServerEvent::NewQuestion {
                    question: question.view(),
                },
            ),
            (
                to,
                ServerEvent::TimerUpdate {
                    seconds_remaining: self.clock.remaining_secs().unwrap_or(0),
                },
            ),
        ]
    }

    fn game_started(&self) -> ServerEvent {
        ServerEvent::GameStarted {
            current_round: self.current_round,
            total_rounds: self.settings.total_rounds,
            category: self.category.clone(),
            category_kind: self.category_kind.clone(),
        }
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}
