use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::Mutex;

use crate::room::Room;

/// Maps room codes to live rooms. Creation is atomic with respect to joins;
/// destruction happens eagerly, driven by a coordinator that just emptied
/// its room inside the room's own critical section.
///
/// A caller can capture a room's `Arc` just before the coordinator reaps
/// it. The room's `defunct` flag closes that race: whoever locks a defunct
/// room retries `join_or_create` and gets a fresh one.
pub struct RoomRegistry {
    rooms: DashMap<String, Arc<Mutex<Room>>>,
    chat_cap: usize,
    chat_join_slice: usize,
}

impl RoomRegistry {
    pub fn new(chat_cap: usize, chat_join_slice: usize) -> Self {
        Self {
            rooms: DashMap::new(),
            chat_cap,
            chat_join_slice,
        }
    }

    /// Case-fold and validate a client-supplied room code: exactly six
    /// ASCII alphanumerics.
    pub fn normalize_code(code: &str) -> Option<String> {
        let code = code.trim().to_ascii_uppercase();
        if code.len() == 6 && code.bytes().all(|b| b.is_ascii_alphanumeric()) {
            Some(code)
        } else {
            None
        }
    }

    /// Fetch the room for `code`, creating it if absent. `code` must
    /// already be normalized.
    pub fn join_or_create(&self, code: &str) -> Arc<Mutex<Room>> {
        self.rooms
            .entry(code.to_string())
            .or_insert_with(|| {
                tracing::info!(room = %code, "Room created");
                Arc::new(Mutex::new(Room::new(
                    code.to_string(),
                    self.chat_cap,
                    self.chat_join_slice,
                )))
            })
            .value()
            .clone()
    }

    pub fn get(&self, code: &str) -> Option<Arc<Mutex<Room>>> {
        self.rooms.get(code).map(|entry| entry.value().clone())
    }

    /// Drop the mapping for a reaped room. Guarded by pointer identity so a
    /// stale destroy cannot remove a newer room that reused the code.
    pub fn destroy(&self, code: &str, room: &Arc<Mutex<Room>>) {
        let removed = self
            .rooms
            .remove_if(code, |_, current| Arc::ptr_eq(current, room))
            .is_some();
        if removed {
            tracing::info!(room = %code, "Room destroyed (empty)");
        }
    }

    pub fn room_count(&self) -> usize {
        self.rooms.len()
    }
}
