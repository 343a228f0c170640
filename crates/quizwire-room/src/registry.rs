//! The room registry: every live room, keyed by code.
//!
//! The registry stores [`RoomHandle`]s, not rooms. A room's state is owned
//! by its actor task, so looking a room up never locks the room itself and
//! traffic on different rooms never contends.

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use quizwire_protocol::RoomCode;

use crate::{RoomError, RoomHandle};

/// Storage for live rooms.
///
/// Injected into the coordinator and into every room actor so tests can
/// build isolated instances.
pub trait RoomRegistry: Send + Sync + 'static {
    /// Registers a room.
    ///
    /// # Errors
    /// Returns [`RoomError::DuplicateCode`] if the code is already taken.
    /// The check and the insert are one atomic step.
    fn add(&self, handle: RoomHandle) -> Result<(), RoomError>;

    fn get(&self, code: &RoomCode) -> Option<RoomHandle>;

    /// Removes a room. Returns the handle if it was present.
    fn remove(&self, code: &RoomCode) -> Option<RoomHandle>;

    /// A point-in-time copy of every registered room.
    fn all(&self) -> Vec<RoomHandle>;

    fn len(&self) -> usize {
        self.all().len()
    }

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A [`RoomRegistry`] backed by a sharded concurrent map.
#[derive(Default)]
pub struct InMemoryRoomRegistry {
    rooms: DashMap<RoomCode, RoomHandle>,
}

impl InMemoryRoomRegistry {
    pub fn new() -> Self {
        Self::default()
    }
}

impl RoomRegistry for InMemoryRoomRegistry {
    fn add(&self, handle: RoomHandle) -> Result<(), RoomError> {
        match self.rooms.entry(handle.code().clone()) {
            Entry::Occupied(entry) => Err(RoomError::DuplicateCode(entry.key().clone())),
            Entry::Vacant(entry) => {
                entry.insert(handle);
                Ok(())
            }
        }
    }

    fn get(&self, code: &RoomCode) -> Option<RoomHandle> {
        self.rooms.get(code).map(|entry| entry.value().clone())
    }

    fn remove(&self, code: &RoomCode) -> Option<RoomHandle> {
        self.rooms.remove(code).map(|(_, handle)| handle)
    }

    fn all(&self) -> Vec<RoomHandle> {
        self.rooms.iter().map(|entry| entry.value().clone()).collect()
    }

    fn len(&self) -> usize {
        self.rooms.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn handle(code: &str) -> RoomHandle {
        RoomHandle::detached(RoomCode::normalize(code))
    }

    #[test]
    fn test_add_then_get() {
        let registry = InMemoryRoomRegistry::new();
        registry.add(handle("AAAAAA")).unwrap();

        let found = registry.get(&RoomCode::normalize("aaaaaa")).unwrap();
        assert_eq!(found.code().as_str(), "AAAAAA");
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_add_rejects_duplicate_code() {
        let registry = InMemoryRoomRegistry::new();
        registry.add(handle("AAAAAA")).unwrap();

        let err = registry.add(handle("AAAAAA")).unwrap_err();
        assert!(matches!(err, RoomError::DuplicateCode(_)));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_remove_and_all() {
        let registry = InMemoryRoomRegistry::new();
        registry.add(handle("AAAAAA")).unwrap();
        registry.add(handle("BBBBBB")).unwrap();

        assert!(registry.remove(&RoomCode::normalize("AAAAAA")).is_some());
        assert!(registry.remove(&RoomCode::normalize("AAAAAA")).is_none());

        let codes: Vec<_> = registry.all().into_iter().map(|h| h.code().clone()).collect();
        assert_eq!(codes, vec![RoomCode::normalize("BBBBBB")]);
        assert!(!registry.is_empty());
    }
}
