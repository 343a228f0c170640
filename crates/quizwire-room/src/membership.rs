//! Membership: joining, leaving, host transfer, and the ready-check.

use quizwire_protocol::{ConnectionId, Recipient, RoomStatus, ServerEvent};
use tracing::{debug, info};

use crate::state::{Controller, Outbox, Player};
use crate::{Room, RoomError};

impl Room {
    /// Admits a display player.
    ///
    /// Re-joining with a connection that is already a member only replays
    /// the snapshot to it. The first player into a room with no players
    /// becomes its host.
    ///
    /// # Errors
    /// [`RoomError::GameAlreadyStarted`] unless the room is waiting,
    /// [`RoomError::RoomFull`] if `max_players` is reached.
    pub fn join_player(
        &mut self,
        connection_id: ConnectionId,
        nickname: String,
    ) -> Result<Outbox, RoomError> {
        if self.is_member(&connection_id) {
            debug!(room_code = %self.code, %connection_id, "repeat join, replaying snapshot");
            return Ok(vec![(
                Recipient::Connection(connection_id),
                ServerEvent::RoomJoined { room: self.snapshot() },
            )]);
        }
        if !self.status.is_joinable() {
            return Err(RoomError::GameAlreadyStarted(self.code.clone()));
        }
        self.ensure_capacity()?;

        // The first player of a room without players takes the host seat.
        let becomes_host = self.players.is_empty();
        let player = Player::new(connection_id.clone(), nickname, becomes_host);
        let summary = player.summary();
        let nickname = player.nickname.clone();
        self.players.push(player);
        if becomes_host {
            self.host_connection_id = connection_id.clone();
        }
        info!(
            room_code = %self.code,
            %connection_id,
            members = self.member_count(),
            is_host = becomes_host,
            "player joined"
        );

        let mut outbox = vec![
            (
                Recipient::Connection(connection_id.clone()),
                ServerEvent::RoomJoined { room: self.snapshot() },
            ),
            (
                Recipient::AllExcept(connection_id.clone()),
                ServerEvent::PlayerJoined { player: summary },
            ),
        ];
        if becomes_host {
            outbox.push((
                Recipient::Room,
                ServerEvent::NewHost {
                    connection_id,
                    nickname,
                },
            ));
        }
        Ok(outbox)
    }

    /// Admits a mobile controller. Unlike players, controllers may join a
    /// game in progress; they are then caught up on the live round.
    ///
    /// # Errors
    /// [`RoomError::GameAlreadyStarted`] once the game has finished,
    /// [`RoomError::RoomFull`] if `max_players` is reached.
    pub fn join_controller(
        &mut self,
        connection_id: ConnectionId,
        nickname: String,
    ) -> Result<Outbox, RoomError> {
        if self.is_member(&connection_id) {
            debug!(room_code = %self.code, %connection_id, "repeat join, replaying snapshot");
            let mut outbox = vec![(
                Recipient::Connection(connection_id.clone()),
                ServerEvent::RoomJoined { room: self.snapshot() },
            )];
            outbox.extend(self.catch_up(&connection_id));
            return Ok(outbox);
        }
        if self.status == RoomStatus::Finished {
            return Err(RoomError::GameAlreadyStarted(self.code.clone()));
        }
        self.ensure_capacity()?;

        let controller = Controller::new(connection_id.clone(), nickname);
        let summary = controller.summary();
        self.controllers.push(controller);
        info!(
            room_code = %self.code,
            %connection_id,
            members = self.member_count(),
            status = %self.status,
            "controller joined"
        );

        let mut outbox = vec![
            (
                Recipient::Connection(connection_id.clone()),
                ServerEvent::RoomJoined { room: self.snapshot() },
            ),
            (
                Recipient::AllExcept(connection_id.clone()),
                ServerEvent::ControllerJoined { controller: summary },
            ),
        ];
        outbox.extend(self.catch_up(&connection_id));
        Ok(outbox)
    }

    /// Removes a player or controller.
    ///
    /// A departing host hands authority to the earliest-joined remaining
    /// player. Leaving during an open round does not end it, but the
    /// remaining members may now all have answered.
    ///
    /// # Errors
    /// [`RoomError::NotInRoom`] if the connection is not a member.
    pub fn leave(&mut self, connection_id: &ConnectionId) -> Result<Outbox, RoomError> {
        let mut outbox = Outbox::new();

        if let Some(index) = self
            .players
            .iter()
            .position(|p| &p.connection_id == connection_id)
        {
            let player = self.players.remove(index);
            info!(room_code = %self.code, %connection_id, "player left");
            outbox.push((
                Recipient::Room,
                ServerEvent::PlayerLeft {
                    connection_id: player.connection_id,
                    nickname: player.nickname,
                },
            ));

            if player.is_host {
                outbox.extend(self.transfer_host());
            }
        } else if let Some(index) = self
            .controllers
            .iter()
            .position(|c| &c.connection_id == connection_id)
        {
            let controller = self.controllers.remove(index);
            info!(room_code = %self.code, %connection_id, "controller left");
            outbox.push((
                Recipient::Room,
                ServerEvent::ControllerLeft {
                    connection_id: controller.connection_id,
                    nickname: controller.nickname,
                },
            ));
        } else {
            return Err(RoomError::NotInRoom(
                connection_id.clone(),
                self.code.clone(),
            ));
        }

        if self.is_empty() {
            self.clock.cancel();
            self.current_question = None;
            self.round_deadline = None;
            return Ok(outbox);
        }

        if self.current_question.is_some() && self.everyone_answered() {
            debug!(room_code = %self.code, "remaining members have all answered");
            outbox.extend(self.finish_round(self.round_generation));
        }

        Ok(outbox)
    }

    fn transfer_host(&mut self) -> Outbox {
        let Some(next) = self.players.first_mut() else {
            debug!(room_code = %self.code, "host left with no players remaining, seat open");
            return Outbox::new();
        };
        next.is_host = true;
        self.host_connection_id = next.connection_id.clone();
        info!(
            room_code = %self.code,
            new_host = %next.connection_id,
            "host transferred"
        );
        vec![(
            Recipient::Room,
            ServerEvent::NewHost {
                connection_id: next.connection_id.clone(),
                nickname: next.nickname.clone(),
            },
        )]
    }

    /// Updates a controller's ready flag and runs the ready-check: once
    /// every controller of a waiting room is ready, the game starts.
    ///
    /// # Errors
    /// [`RoomError::NotController`] for display players,
    /// [`RoomError::NotInRoom`] for non-members.
    pub fn set_ready(
        &mut self,
        connection_id: &ConnectionId,
        is_ready: bool,
    ) -> Result<Outbox, RoomError> {
        if self.players.iter().any(|p| &p.connection_id == connection_id) {
            return Err(RoomError::NotController(connection_id.clone()));
        }
        let controller = self
            .controllers
            .iter_mut()
            .find(|c| &c.connection_id == connection_id)
            .ok_or_else(|| RoomError::NotInRoom(connection_id.clone(), self.code.clone()))?;
        controller.is_ready = is_ready;

        let mut outbox = vec![(
            Recipient::Room,
            ServerEvent::PlayerReady {
                connection_id: controller.connection_id.clone(),
                nickname: controller.nickname.clone(),
                is_ready,
            },
        )];
        debug!(room_code = %self.code, %connection_id, is_ready, "ready flag updated");

        if self.status == RoomStatus::Waiting && self.all_controllers_ready() {
            info!(room_code = %self.code, "all controllers ready");
            outbox.push((Recipient::Room, ServerEvent::AllReady));
            outbox.extend(self.start_playing());
        }
        Ok(outbox)
    }

    fn all_controllers_ready(&self) -> bool {
        !self.controllers.is_empty() && self.controllers.iter().all(|c| c.is_ready)
    }

    /// Host-only: picks the category before the game starts.
    ///
    /// # Errors
    /// [`RoomError::Unauthorized`] for non-hosts,
    /// [`RoomError::GameAlreadyStarted`] once play has begun.
    pub fn update_category(
        &mut self,
        requester: &ConnectionId,
        category: String,
        category_kind: String,
    ) -> Result<Outbox, RoomError> {
        if !self.is_host(requester) {
            return Err(RoomError::Unauthorized(requester.clone()));
        }
        if self.status != RoomStatus::Waiting {
            return Err(RoomError::GameAlreadyStarted(self.code.clone()));
        }
        self.category = Some(category.clone());
        self.category_kind = Some(category_kind.clone());
        debug!(room_code = %self.code, %category, %category_kind, "category updated");

        Ok(vec![(
            Recipient::Room,
            ServerEvent::CategoryUpdated {
                category,
                category_kind,
            },
        )])
    }

    /// Replays the room to a member that lost its view of it.
    ///
    /// Matching is by connection id only: a client on a new connection is
    /// not recognised.
    ///
    /// # Errors
    /// [`RoomError::NotInRoom`] for non-members.
    pub fn rejoin(&self, connection_id: &ConnectionId) -> Result<Outbox, RoomError> {
        if !self.is_member(connection_id) {
            return Err(RoomError::NotInRoom(
                connection_id.clone(),
                self.code.clone(),
            ));
        }
        let mut outbox = vec![(
            Recipient::Connection(connection_id.clone()),
            ServerEvent::RoomRejoined {
                room: self.snapshot(),
                is_host: self.is_host(connection_id),
            },
        )];
        outbox.extend(self.catch_up(connection_id));
        Ok(outbox)
    }

    fn ensure_capacity(&self) -> Result<(), RoomError> {
        if self.member_count() >= self.settings.max_players {
            return Err(RoomError::RoomFull(self.code.clone()));
        }
        Ok(())
    }
}
