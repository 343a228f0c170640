//! Session coordinator: the entry point for every inbound client event.
//!
//! The coordinator resolves room codes through the registry, tracks which
//! room each connection belongs to, and forwards work to the room actors.
//! Rejected events become a unicast `error` to the sender; the room is
//! left as it was.

use std::collections::HashMap;
use std::sync::Arc;

use dashmap::DashMap;
use quizwire_clock::RoundClock;
use quizwire_protocol::{
    ClientEvent, ConnectionId, RoomCode, RoomSnapshot, ServerEvent, SettingsOverride,
};
use tracing::{debug, info, warn};

use crate::actor::spawn_room;
use crate::code::generate_code;
use crate::{
    CoordinatorConfig, EventSender, InMemoryRoomRegistry, QuestionProvider, Role, Room,
    RoomError, RoomHandle, RoomRegistry, RoomRequest,
};

/// Routes client events to rooms.
///
/// A connection is a member of at most one room: creating or joining a
/// room leaves the previous one.
pub struct SessionCoordinator {
    config: CoordinatorConfig,
    registry: Arc<dyn RoomRegistry>,
    questions: Arc<dyn QuestionProvider>,
    /// Which room each connection is currently in.
    memberships: DashMap<ConnectionId, RoomCode>,
}

impl SessionCoordinator {
    pub fn new(
        config: CoordinatorConfig,
        registry: Arc<dyn RoomRegistry>,
        questions: Arc<dyn QuestionProvider>,
    ) -> Self {
        Self {
            config,
            registry,
            questions,
            memberships: DashMap::new(),
        }
    }

    /// A coordinator with its own [`InMemoryRoomRegistry`].
    pub fn in_memory(config: CoordinatorConfig, questions: Arc<dyn QuestionProvider>) -> Self {
        Self::new(config, Arc::new(InMemoryRoomRegistry::new()), questions)
    }

    pub fn config(&self) -> &CoordinatorConfig {
        &self.config
    }

    pub fn registry(&self) -> &Arc<dyn RoomRegistry> {
        &self.registry
    }

    /// The room `connection_id` is currently in, if any.
    pub fn room_of(&self, connection_id: &ConnectionId) -> Option<RoomCode> {
        self.memberships.get(connection_id).map(|entry| entry.value().clone())
    }

    /// Handles one inbound event. Failures are reported to `sender` as an
    /// `error` event.
    pub async fn handle(
        &self,
        connection_id: &ConnectionId,
        sender: &EventSender,
        event: ClientEvent,
    ) {
        let name = event.name();
        debug!(%connection_id, event = name, "client event");

        if let Err(err) = self.route(connection_id, sender, event).await {
            debug!(%connection_id, event = name, error = %err, "client event rejected");
            let _ = sender.send(ServerEvent::Error {
                code: err.code(),
                message: err.to_string(),
            });
        }
    }

    async fn route(
        &self,
        connection_id: &ConnectionId,
        sender: &EventSender,
        event: ClientEvent,
    ) -> Result<(), RoomError> {
        match event {
            ClientEvent::CreateRoom {
                nickname,
                category,
                settings,
            } => self
                .create_room(connection_id, sender.clone(), nickname, category, settings)
                .await
                .map(|_| ()),
            ClientEvent::JoinRoom {
                room_code,
                nickname,
            } => {
                self.join_player(&room_code, connection_id, nickname, sender.clone())
                    .await
            }
            ClientEvent::JoinController {
                room_code,
                nickname,
            } => {
                self.join_controller(&room_code, connection_id, nickname, sender.clone())
                    .await
            }
            ClientEvent::LeaveRoom { room_code } => self.leave(&room_code, connection_id).await,
            ClientEvent::StartGame {
                room_code,
                category,
                category_kind,
            } => {
                self.start_game(&room_code, connection_id, category, category_kind)
                    .await
            }
            ClientEvent::ToggleReady {
                room_code,
                is_ready,
            } => self.set_ready(&room_code, connection_id, is_ready).await,
            ClientEvent::SubmitAnswer { room_code, answer } => {
                self.submit_answer(&room_code, connection_id, answer).await
            }
            ClientEvent::RequestCurrentQuestion { room_code } => {
                self.request_current_question(&room_code, connection_id)
                    .await
            }
            ClientEvent::RequestNextQuestion { room_code } => {
                self.request_next_question(&room_code, connection_id).await
            }
            ClientEvent::UpdateRoomCategory {
                room_code,
                category,
                category_kind,
            } => {
                self.update_category(&room_code, connection_id, category, category_kind)
                    .await
            }
            ClientEvent::ReconnectToRoom { room_code } => {
                self.reconnect(&room_code, connection_id, sender.clone())
                    .await
            }
            ClientEvent::RequestGameResults { room_code } => {
                self.request_results(&room_code, connection_id).await
            }
            ClientEvent::Disconnect => {
                self.disconnect(connection_id).await;
                Ok(())
            }
        }
    }

    /// Opens a room with `host` as its host player and sends it
    /// `room_created`.
    ///
    /// # Errors
    /// [`RoomError::CreationFailed`] if no free code turned up within
    /// `max_code_attempts` tries.
    pub async fn create_room(
        &self,
        host: &ConnectionId,
        sender: EventSender,
        nickname: Option<String>,
        category: Option<String>,
        settings: Option<SettingsOverride>,
    ) -> Result<RoomSnapshot, RoomError> {
        let settings = settings
            .unwrap_or_default()
            .apply(self.config.default_settings);
        let nickname = nickname
            .filter(|n| !n.trim().is_empty())
            .unwrap_or_else(|| self.config.default_host_nickname.clone());
        let category = category.filter(|c| !c.trim().is_empty());

        for attempt in 1..=self.config.max_code_attempts {
            let code = generate_code();
            let room = Room::new(
                code.clone(),
                host.clone(),
                nickname.clone(),
                settings,
                category.clone(),
                Arc::clone(&self.questions),
            )
            .with_inter_round_pause(self.config.inter_round_pause)
            .with_clock(RoundClock::new(self.config.clock_tick));
            let snapshot = room.snapshot();
            let members = HashMap::from([(host.clone(), sender.clone())]);

            match spawn_room(
                room,
                members,
                Arc::clone(&self.registry),
                self.config.channel_size,
            ) {
                Ok(_) => {
                    info!(room_code = %code, connection_id = %host, attempt, "room created");
                    let _ = sender.send(ServerEvent::RoomCreated {
                        room: snapshot.clone(),
                    });
                    self.enter(host, &code).await;
                    return Ok(snapshot);
                }
                Err(RoomError::DuplicateCode(taken)) => {
                    debug!(room_code = %taken, attempt, "room code taken, retrying");
                }
                Err(err) => return Err(err),
            }
        }

        warn!(
            connection_id = %host,
            attempts = self.config.max_code_attempts,
            "could not allocate a room code"
        );
        Err(RoomError::CreationFailed(self.config.max_code_attempts))
    }

    /// Joins `code` as a display player.
    pub async fn join_player(
        &self,
        code: &RoomCode,
        connection_id: &ConnectionId,
        nickname: String,
        sender: EventSender,
    ) -> Result<(), RoomError> {
        self.join(code, connection_id, nickname, Role::Player, sender)
            .await
    }

    /// Joins `code` as a mobile controller.
    pub async fn join_controller(
        &self,
        code: &RoomCode,
        connection_id: &ConnectionId,
        nickname: String,
        sender: EventSender,
    ) -> Result<(), RoomError> {
        self.join(code, connection_id, nickname, Role::Controller, sender)
            .await
    }

    async fn join(
        &self,
        code: &RoomCode,
        connection_id: &ConnectionId,
        nickname: String,
        role: Role,
        sender: EventSender,
    ) -> Result<(), RoomError> {
        let handle = self.room(code)?;
        handle
            .join(connection_id.clone(), nickname, role, sender)
            .await
            .map_err(closed_as_not_found)?;
        self.enter(connection_id, code).await;
        Ok(())
    }

    /// Leaves `code`. The room disappears if this was its last member.
    pub async fn leave(
        &self,
        code: &RoomCode,
        connection_id: &ConnectionId,
    ) -> Result<(), RoomError> {
        let handle = self.room(code)?;
        handle.leave(connection_id.clone()).await?;
        self.memberships
            .remove_if(connection_id, |_, current| current == code);
        Ok(())
    }

    /// Drops the connection from whatever room it is in. Never fails.
    pub async fn disconnect(&self, connection_id: &ConnectionId) {
        let Some((_, code)) = self.memberships.remove(connection_id) else {
            debug!(%connection_id, "disconnect without room");
            return;
        };
        info!(room_code = %code, %connection_id, "connection dropped");
        if let Some(handle) = self.registry.get(&code) {
            if let Err(err) = handle.leave(connection_id.clone()).await {
                debug!(room_code = %code, %connection_id, error = %err, "leave on disconnect failed");
            }
        }
    }

    pub async fn start_game(
        &self,
        code: &RoomCode,
        connection_id: &ConnectionId,
        category: Option<String>,
        category_kind: Option<String>,
    ) -> Result<(), RoomError> {
        self.request(
            code,
            connection_id,
            RoomRequest::StartGame {
                category,
                category_kind,
            },
        )
        .await
    }

    pub async fn set_ready(
        &self,
        code: &RoomCode,
        connection_id: &ConnectionId,
        is_ready: bool,
    ) -> Result<(), RoomError> {
        self.request(code, connection_id, RoomRequest::SetReady(is_ready))
            .await
    }

    pub async fn submit_answer(
        &self,
        code: &RoomCode,
        connection_id: &ConnectionId,
        answer: String,
    ) -> Result<(), RoomError> {
        self.request(code, connection_id, RoomRequest::SubmitAnswer(answer))
            .await
    }

    pub async fn request_current_question(
        &self,
        code: &RoomCode,
        connection_id: &ConnectionId,
    ) -> Result<(), RoomError> {
        self.request(code, connection_id, RoomRequest::CurrentQuestion)
            .await
    }

    pub async fn request_next_question(
        &self,
        code: &RoomCode,
        connection_id: &ConnectionId,
    ) -> Result<(), RoomError> {
        self.request(code, connection_id, RoomRequest::NextQuestion)
            .await
    }

    pub async fn update_category(
        &self,
        code: &RoomCode,
        connection_id: &ConnectionId,
        category: String,
        category_kind: String,
    ) -> Result<(), RoomError> {
        self.request(
            code,
            connection_id,
            RoomRequest::UpdateCategory {
                category,
                category_kind,
            },
        )
        .await
    }

    pub async fn request_results(
        &self,
        code: &RoomCode,
        connection_id: &ConnectionId,
    ) -> Result<(), RoomError> {
        self.request(code, connection_id, RoomRequest::Results)
            .await
    }

    /// Replays the room to a connection that is still a member and routes
    /// its events to `sender` from now on.
    pub async fn reconnect(
        &self,
        code: &RoomCode,
        connection_id: &ConnectionId,
        sender: EventSender,
    ) -> Result<(), RoomError> {
        let handle = self.room(code)?;
        handle
            .rejoin(connection_id.clone(), sender)
            .await
            .map_err(closed_as_not_found)?;
        self.enter(connection_id, code).await;
        Ok(())
    }

    /// The current snapshot of `code`.
    pub async fn snapshot(&self, code: &RoomCode) -> Result<RoomSnapshot, RoomError> {
        self.room(code)?.snapshot().await
    }

    async fn request(
        &self,
        code: &RoomCode,
        connection_id: &ConnectionId,
        request: RoomRequest,
    ) -> Result<(), RoomError> {
        self.room(code)?
            .request(connection_id.clone(), request)
            .await
    }

    fn room(&self, code: &RoomCode) -> Result<RoomHandle, RoomError> {
        self.registry
            .get(code)
            .filter(|handle| !handle.is_closed())
            .ok_or_else(|| RoomError::NotFound(code.clone()))
    }

    /// Records `code` as the connection's room and leaves the one it was
    /// in before, if different.
    async fn enter(&self, connection_id: &ConnectionId, code: &RoomCode) {
        let previous = self
            .memberships
            .insert(connection_id.clone(), code.clone());
        let Some(previous) = previous.filter(|p| p != code) else {
            return;
        };
        debug!(
            %connection_id,
            from = %previous,
            to = %code,
            "switching rooms"
        );
        if let Some(handle) = self.registry.get(&previous) {
            if let Err(err) = handle.leave(connection_id.clone()).await {
                debug!(room_code = %previous, %connection_id, error = %err, "leaving previous room failed");
            }
        }
    }
}

/// A room that shut down between lookup and delivery reads as gone.
fn closed_as_not_found(err: RoomError) -> RoomError {
    match err {
        RoomError::Unavailable(code) => RoomError::NotFound(code),
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use tokio::sync::mpsc;

    use super::*;
    use crate::StaticQuestionBank;

    #[tokio::test]
    async fn test_join_racing_room_shutdown_reports_not_found() {
        let registry = Arc::new(InMemoryRoomRegistry::new());
        let code = RoomCode::normalize("GONE01");
        registry.add(RoomHandle::vanishing(code.clone())).unwrap();
        let coordinator = SessionCoordinator::new(
            CoordinatorConfig::default(),
            registry,
            Arc::new(StaticQuestionBank::new(Vec::new())),
        );
        let ann = ConnectionId::new("ann");
        let (tx, _rx) = mpsc::unbounded_channel();

        let err = coordinator
            .join_controller(&code, &ann, "Ann".into(), tx.clone())
            .await
            .unwrap_err();
        assert_eq!(err, RoomError::NotFound(code.clone()));
        assert_eq!(coordinator.room_of(&ann), None);

        let err = coordinator.reconnect(&code, &ann, tx).await.unwrap_err();
        assert_eq!(err.code(), quizwire_protocol::ErrorCode::RoomNotFound);
    }

    #[test]
    fn test_other_errors_pass_through() {
        let code = RoomCode::normalize("ROOM01");
        assert_eq!(
            closed_as_not_found(RoomError::RoomFull(code.clone())),
            RoomError::RoomFull(code)
        );
    }
}
