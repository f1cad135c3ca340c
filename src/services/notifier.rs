use dashmap::DashMap;
use serde::Serialize;
use serde_json::{Value, json};
use thiserror::Error;
use tokio::sync::broadcast;

/// Event published while a file is being written.
pub const ON_UPLOAD_EVENT: &str = "file-uploaded";

/// Event sent to a client right after it joins its room.
pub const ON_CONNECTED_EVENT: &str = "connected";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Notification {
    pub event: String,
    pub payload: Value,
}

#[derive(Error, Debug)]
pub enum NotifyError {
    #[error("no listeners in room '{0}'")]
    NoListeners(String),

    #[error("failed to encode payload: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Room addressed publish side of the notification transport.
pub trait NotificationChannel: Send + Sync {
    fn publish(&self, room: &str, event: &str, payload: Value) -> Result<(), NotifyError>;
}

/// In-process pub/sub keyed by room (session id).
pub struct RoomHub {
    rooms: DashMap<String, broadcast::Sender<Notification>>,
    capacity: usize,
}

impl RoomHub {
    pub fn new(capacity: usize) -> Self {
        Self {
            rooms: DashMap::new(),
            capacity: capacity.max(1),
        }
    }

    /// Subscribes to a room, creating it on first use, and greets the new member.
    ///
    /// Rooms whose members have all left are dropped here as well as on a failed publish.
    pub fn join(&self, room: &str) -> broadcast::Receiver<Notification> {
        self.prune_empty_rooms();

        let sender = self
            .rooms
            .entry(room.to_string())
            .or_insert_with(|| broadcast::channel(self.capacity).0)
            .clone();
        let receiver = sender.subscribe();

        tracing::info!("someone connected: {}", room);
        let _ = sender.send(Notification {
            event: ON_CONNECTED_EVENT.to_string(),
            payload: json!({ "room": room }),
        });

        receiver
    }

    pub fn listener_count(&self, room: &str) -> usize {
        self.rooms
            .get(room)
            .map(|sender| sender.receiver_count())
            .unwrap_or(0)
    }

    pub fn room_count(&self) -> usize {
        self.rooms.len()
    }

    /// Forgets every room that has no receivers left.
    pub fn prune_empty_rooms(&self) {
        self.rooms.retain(|_, sender| sender.receiver_count() > 0);
    }
}

impl NotificationChannel for RoomHub {
    fn publish(&self, room: &str, event: &str, payload: Value) -> Result<(), NotifyError> {
        let delivered = match self.rooms.get(room) {
            Some(sender) => sender
                .send(Notification {
                    event: event.to_string(),
                    payload,
                })
                .is_ok(),
            None => return Err(NotifyError::NoListeners(room.to_string())),
        };

        if !delivered {
            // every receiver is gone; forget the room
            self.rooms
                .remove_if(room, |_, sender| sender.receiver_count() == 0);
            return Err(NotifyError::NoListeners(room.to_string()));
        }

        Ok(())
    }
}
