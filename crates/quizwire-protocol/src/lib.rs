//! Wire protocol for Quizwire.
//!
//! This crate defines the "language" spoken between the session core and
//! the real-time clients (display hosts and mobile controllers):
//!
//! - **Identifiers** ([`ConnectionId`], [`RoomCode`]): who and where.
//! - **Events** ([`ClientEvent`], [`ServerEvent`]): the named events that
//!   travel on the wire, in both directions.
//! - **Routing** ([`Recipient`]): which audience an outbound event targets.
//! - **Codec** ([`Codec`] trait, [`JsonCodec`]): how events are converted
//!   to/from bytes.
//!
//! # Architecture
//!
//! ```text
//! Transport (bytes) → Protocol (ClientEvent) → Room actor → ServerEvent → Transport
//! ```
//!
//! Nothing in here knows about sockets or rooms-as-tasks; it only describes
//! data.

mod codec;
mod error;
mod types;

pub use codec::Codec;
#[cfg(feature = "json")]
pub use codec::JsonCodec;
pub use error::ProtocolError;
pub use types::{
    ClientEvent, ConnectionId, ControllerSummary, ErrorCode,
    ParticipantResult, PlayerSummary, QuestionView, Recipient, Results,
    RoomCode, RoomSettings, RoomSnapshot, RoomStatus, ServerEvent,
    SettingsOverride,
};
