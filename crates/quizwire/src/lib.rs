//! # Quizwire
//!
//! Real-time session server for party trivia: one display host, any number
//! of phones acting as controllers, short lettered questions on a countdown.
//!
//! Quizwire wires three layers together: a WebSocket transport, the JSON
//! event protocol, and the room system where every room runs as its own
//! task. Embedders usually only need the builder and a question bank.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use quizwire::prelude::*;
//!
//! # async fn run() -> Result<(), QuizwireError> {
//! let server = QuizServer::builder()
//!     .bind("0.0.0.0:8080")
//!     .questions(Arc::new(StaticQuestionBank::builtin()))
//!     .build()
//!     .await?;
//! server.run().await
//! # }
//! ```

mod error;
mod handler;
mod server;
pub mod telemetry;

pub use error::QuizwireError;
pub use server::{QuizServer, QuizServerBuilder};

/// Commonly used types, importable in one line.
pub mod prelude {
    pub use crate::{QuizServer, QuizServerBuilder, QuizwireError};
    pub use quizwire_protocol::{
        ClientEvent, ConnectionId, RoomCode, RoomSettings, ServerEvent,
    };
    pub use quizwire_room::{
        CoordinatorConfig, QuestionProvider, QuizQuestion, SessionCoordinator,
        StaticQuestionBank,
    };
}
