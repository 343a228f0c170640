//! Room actor: an isolated Tokio task that owns one [`Room`].
//!
//! Each room runs in its own task and talks to the outside world through
//! an mpsc channel, so all mutations of one room are serialized without a
//! lock and rooms never contend with each other. The task also polls the
//! room's round clock, which makes timer expiry just another event in the
//! same queue as client commands.

use std::collections::HashMap;
use std::ops::ControlFlow;
use std::sync::Arc;

use quizwire_protocol::{ConnectionId, Recipient, RoomCode, RoomSnapshot, ServerEvent};
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, trace};

use crate::state::Outbox;
use crate::{Room, RoomError, RoomRegistry};

/// Channel sender for delivering outbound events to one connection.
pub type EventSender = mpsc::UnboundedSender<ServerEvent>;

/// The part a connection plays in a room.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Player,
    Controller,
}

/// Member operations routed to a room.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoomRequest {
    StartGame {
        category: Option<String>,
        category_kind: Option<String>,
    },
    SetReady(bool),
    SubmitAnswer(String),
    CurrentQuestion,
    NextQuestion,
    UpdateCategory {
        category: String,
        category_kind: String,
    },
    Results,
}

type Reply<T> = oneshot::Sender<Result<T, RoomError>>;

/// Commands sent to a room actor through its channel.
pub(crate) enum RoomCommand {
    Join {
        connection_id: ConnectionId,
        nickname: String,
        role: Role,
        sender: EventSender,
        reply: Reply<()>,
    },
    Rejoin {
        connection_id: ConnectionId,
        sender: EventSender,
        reply: Reply<()>,
    },
    Leave {
        connection_id: ConnectionId,
        reply: Reply<()>,
    },
    Request {
        connection_id: ConnectionId,
        request: RoomRequest,
        reply: Reply<()>,
    },
    Snapshot {
        reply: oneshot::Sender<RoomSnapshot>,
    },
}

/// Handle to a running room actor.
///
/// Cheap to clone: it is an `mpsc::Sender` plus the room code. The
/// registry holds one per room.
#[derive(Clone)]
pub struct RoomHandle {
    code: RoomCode,
    sender: mpsc::Sender<RoomCommand>,
}

impl std::fmt::Debug for RoomHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RoomHandle").field("code", &self.code).finish()
    }
}

impl RoomHandle {
    pub fn code(&self) -> &RoomCode {
        &self.code
    }

    /// Returns `true` once the actor has stopped.
    pub fn is_closed(&self) -> bool {
        self.sender.is_closed()
    }

    /// Adds a player or controller. Events for the connection go to
    /// `sender` from now on.
    pub async fn join(
        &self,
        connection_id: ConnectionId,
        nickname: String,
        role: Role,
        sender: EventSender,
    ) -> Result<(), RoomError> {
        self.call(|reply| RoomCommand::Join {
            connection_id,
            nickname,
            role,
            sender,
            reply,
        })
        .await?
    }

    /// Replays the room to an existing member and re-registers its sender.
    pub async fn rejoin(
        &self,
        connection_id: ConnectionId,
        sender: EventSender,
    ) -> Result<(), RoomError> {
        self.call(|reply| RoomCommand::Rejoin {
            connection_id,
            sender,
            reply,
        })
        .await?
    }

    /// Removes a member. If it was the last one the room unregisters
    /// itself before this returns.
    pub async fn leave(&self, connection_id: ConnectionId) -> Result<(), RoomError> {
        self.call(|reply| RoomCommand::Leave {
            connection_id,
            reply,
        })
        .await?
    }

    /// Runs a member operation.
    pub async fn request(
        &self,
        connection_id: ConnectionId,
        request: RoomRequest,
    ) -> Result<(), RoomError> {
        self.call(|reply| RoomCommand::Request {
            connection_id,
            request,
            reply,
        })
        .await?
    }

    /// The room as it is right now.
    pub async fn snapshot(&self) -> Result<RoomSnapshot, RoomError> {
        self.call(|reply| RoomCommand::Snapshot { reply }).await
    }

    async fn call<T>(
        &self,
        command: impl FnOnce(oneshot::Sender<T>) -> RoomCommand,
    ) -> Result<T, RoomError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.sender
            .send(command(reply_tx))
            .await
            .map_err(|_| RoomError::Unavailable(self.code.clone()))?;
        reply_rx
            .await
            .map_err(|_| RoomError::Unavailable(self.code.clone()))
    }

    /// A handle with no actor behind it.
    #[cfg(test)]
    pub(crate) fn detached(code: RoomCode) -> Self {
        let (sender, _) = mpsc::channel(1);
        Self { code, sender }
    }

    /// A handle whose actor accepts commands but stops before replying.
    #[cfg(test)]
    pub(crate) fn vanishing(code: RoomCode) -> Self {
        let (sender, mut receiver) = mpsc::channel::<RoomCommand>(1);
        tokio::spawn(async move {
            while let Some(command) = receiver.recv().await {
                drop(command);
            }
        });
        Self { code, sender }
    }
}

/// The internal room actor state. Runs inside a Tokio task.
struct RoomActor {
    room: Room,
    /// Per-connection outbound channels.
    senders: HashMap<ConnectionId, EventSender>,
    registry: Arc<dyn RoomRegistry>,
    receiver: mpsc::Receiver<RoomCommand>,
}

impl RoomActor {
    /// Processes commands and clock events until the room empties or
    /// every handle is dropped.
    async fn run(mut self) {
        info!(room_code = %self.room.code, "room actor started");

        loop {
            tokio::select! {
                command = self.receiver.recv() => {
                    let Some(command) = command else { break };
                    if self.handle(command).is_break() {
                        break;
                    }
                }
                event = self.room.clock.next_event() => {
                    let outbox = self.room.on_clock(event);
                    self.dispatch(outbox);
                }
            }
        }

        info!(room_code = %self.room.code, "room actor stopped");
    }

    fn handle(&mut self, command: RoomCommand) -> ControlFlow<()> {
        match command {
            RoomCommand::Join {
                connection_id,
                nickname,
                role,
                sender,
                reply,
            } => {
                let result = match role {
                    Role::Player => self.room.join_player(connection_id.clone(), nickname),
                    Role::Controller => {
                        self.room.join_controller(connection_id.clone(), nickname)
                    }
                };
                let _ = reply.send(self.admit(connection_id, sender, result));
            }
            RoomCommand::Rejoin {
                connection_id,
                sender,
                reply,
            } => {
                let result = self.room.rejoin(&connection_id);
                let _ = reply.send(self.admit(connection_id, sender, result));
            }
            RoomCommand::Leave {
                connection_id,
                reply,
            } => {
                let result = match self.room.leave(&connection_id) {
                    Ok(outbox) => {
                        self.senders.remove(&connection_id);
                        self.dispatch(outbox);
                        Ok(())
                    }
                    Err(err) => Err(err),
                };
                if result.is_ok() && self.room.is_empty() {
                    self.registry.remove(&self.room.code);
                    info!(room_code = %self.room.code, "room empty, removed");
                    let _ = reply.send(result);
                    return ControlFlow::Break(());
                }
                let _ = reply.send(result);
            }
            RoomCommand::Request {
                connection_id,
                request,
                reply,
            } => {
                let result = self
                    .handle_request(&connection_id, request)
                    .map(|outbox| self.dispatch(outbox));
                if let Err(err) = &result {
                    debug!(
                        room_code = %self.room.code,
                        %connection_id,
                        error = %err,
                        "request rejected"
                    );
                }
                let _ = reply.send(result);
            }
            RoomCommand::Snapshot { reply } => {
                let _ = reply.send(self.room.snapshot());
            }
        }
        ControlFlow::Continue(())
    }

    /// Registers the connection's sender if the membership change
    /// succeeded, then delivers its events.
    fn admit(
        &mut self,
        connection_id: ConnectionId,
        sender: EventSender,
        result: Result<Outbox, RoomError>,
    ) -> Result<(), RoomError> {
        let outbox = result?;
        self.senders.insert(connection_id, sender);
        self.dispatch(outbox);
        Ok(())
    }

    fn handle_request(
        &mut self,
        connection_id: &ConnectionId,
        request: RoomRequest,
    ) -> Result<Outbox, RoomError> {
        if !self.room.is_member(connection_id) {
            return Err(RoomError::NotInRoom(
                connection_id.clone(),
                self.room.code.clone(),
            ));
        }
        match request {
            RoomRequest::StartGame {
                category,
                category_kind,
            } => self.room.start_game(connection_id, category, category_kind),
            RoomRequest::SetReady(is_ready) => self.room.set_ready(connection_id, is_ready),
            RoomRequest::SubmitAnswer(label) => self.room.answer(connection_id, &label),
            RoomRequest::CurrentQuestion => self.room.current_question_for(connection_id),
            RoomRequest::NextQuestion => self.room.next_question(),
            RoomRequest::UpdateCategory {
                category,
                category_kind,
            } => self
                .room
                .update_category(connection_id, category, category_kind),
            RoomRequest::Results => Ok(self.room.results_for(connection_id)),
        }
    }

    /// Delivers outbound events to the matching connections.
    fn dispatch(&self, outbox: Outbox) {
        for (recipient, event) in outbox {
            trace!(room_code = %self.room.code, event = event.name(), ?recipient, "dispatch");
            match recipient {
                Recipient::Connection(id) => self.send_to(&id, event),
                Recipient::Room => {
                    for id in self.room.member_ids() {
                        self.send_to(id, event.clone());
                    }
                }
                Recipient::AllExcept(excluded) => {
                    for id in self.room.member_ids().filter(|id| **id != excluded) {
                        self.send_to(id, event.clone());
                    }
                }
            }
        }
    }

    /// Silently drops the event if the connection is gone.
    fn send_to(&self, connection_id: &ConnectionId, event: ServerEvent) {
        if let Some(sender) = self.senders.get(connection_id) {
            let _ = sender.send(event);
        }
    }
}

/// Registers `room` and spawns its actor.
///
/// The room is registered before the task starts, so a code collision
/// leaves nothing running.
///
/// # Errors
/// [`RoomError::DuplicateCode`] if the registry already has this code.
pub(crate) fn spawn_room(
    room: Room,
    members: HashMap<ConnectionId, EventSender>,
    registry: Arc<dyn RoomRegistry>,
    channel_size: usize,
) -> Result<RoomHandle, RoomError> {
    let (sender, receiver) = mpsc::channel(channel_size.max(1));
    let handle = RoomHandle {
        code: room.code.clone(),
        sender,
    };
    registry.add(handle.clone())?;

    let actor = RoomActor {
        room,
        senders: members,
        registry,
        receiver,
    };
    tokio::spawn(actor.run());
    Ok(handle)
}
