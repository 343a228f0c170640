//! Room lifecycle for Quizwire.
//!
//! Each room runs as an isolated Tokio task (actor model) that owns the
//! room's members, its round clock, and the question in flight.
//!
//! # Key types
//!
//! - [`SessionCoordinator`]: entry point for every inbound client event
//! - [`RoomRegistry`] / [`InMemoryRoomRegistry`]: live rooms by code
//! - [`RoomHandle`]: send commands to a running room actor
//! - [`Room`]: the room state, with membership, round, and answer logic
//! - [`QuestionProvider`] / [`StaticQuestionBank`]: where questions come from
//! - [`CoordinatorConfig`]: defaults for new rooms
//!
//! # Flow
//!
//! ```text
//! ClientEvent → SessionCoordinator → RoomRegistry::get → RoomHandle
//!            → RoomActor (Room logic → Outbox) → per-connection senders
//! ```

mod actor;
mod answer;
mod code;
mod config;
mod coordinator;
mod error;
mod membership;
mod questions;
mod registry;
mod round;
mod state;

pub use actor::{EventSender, Role, RoomHandle, RoomRequest};
pub use answer::AnswerOutcome;
pub use code::generate_code;
pub use config::CoordinatorConfig;
pub use coordinator::SessionCoordinator;
pub use error::RoomError;
pub use questions::{QuestionProvider, QuizQuestion, StaticQuestionBank};
pub use registry::{InMemoryRoomRegistry, RoomRegistry};
pub use state::{
    Controller, Outbox, POINTS_PER_CORRECT, Participant, Player, QuestionRound, Room, Tally,
};
