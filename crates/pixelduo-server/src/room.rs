//! Room registry: the authoritative grid of every room and its members.

use std::sync::Arc;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use pixelduo_core::{Color, Grid, GridError, ServerMessage, ROOM_CAPACITY};
use thiserror::Error;
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::sync::Notify;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Messages a connection may fall behind before it is dropped.
pub const OUTBOX_CAPACITY: usize = 256;

/// Server-assigned connection identifier.
pub type MemberId = Uuid;

/// Bounded queue of outbound messages for one connection.
///
/// Sends never wait. When the queue is full the message is discarded and
/// the overflow signal fires; the connection task then closes the socket,
/// and the view resyncs from `init` on reconnect.
#[derive(Debug, Clone)]
pub struct Outbox {
    owner: MemberId,
    tx: mpsc::Sender<ServerMessage>,
    overflow: Arc<Notify>,
}

impl Outbox {
    pub fn channel(owner: MemberId, capacity: usize) -> (Self, mpsc::Receiver<ServerMessage>) {
        let (tx, rx) = mpsc::channel(capacity);
        let outbox = Self {
            owner,
            tx,
            overflow: Arc::new(Notify::new()),
        };
        (outbox, rx)
    }

    /// Queue a message. Returns false if it was not queued.
    pub fn send(&self, msg: ServerMessage) -> bool {
        match self.tx.try_send(msg) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) => {
                warn!("Outbox for {} is full, dropping connection", self.owner);
                self.overflow.notify_one();
                false
            }
            Err(TrySendError::Closed(_)) => {
                debug!("Outbox for {} is closed", self.owner);
                false
            }
        }
    }

    /// Resolves once a send has been refused because the queue was full.
    pub async fn overflowed(&self) {
        self.overflow.notified().await;
    }
}

/// A connection attached to a room.
#[derive(Debug, Clone)]
pub struct Member {
    pub id: MemberId,
    pub user_id: String,
    outbox: Outbox,
}

impl Member {
    pub fn new(id: MemberId, user_id: impl Into<String>, outbox: Outbox) -> Self {
        Self {
            id,
            user_id: user_id.into(),
            outbox,
        }
    }

    fn send(&self, msg: ServerMessage) {
        self.outbox.send(msg);
    }
}

/// Registry errors.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RoomError {
    #[error("Room is full")]
    RoomFull,
    #[error("Room not found: {0}")]
    UnknownRoom(String),
    #[error(transparent)]
    Grid(#[from] GridError),
}

/// Result of a successful join.
#[derive(Debug, Clone)]
pub struct Joined {
    pub grid: Grid,
    pub user_count: usize,
    /// Members told about the new arrival.
    pub notified: Vec<MemberId>,
}

/// Room state
struct Room {
    grid: Grid,
    members: Vec<Member>,
}

impl Room {
    fn new() -> Self {
        Self {
            grid: Grid::default(),
            members: Vec::with_capacity(ROOM_CAPACITY),
        }
    }

    /// Send `msg` to every member except `exclude`; returns who got it.
    fn fan_out(&self, msg: &ServerMessage, exclude: Option<MemberId>) -> Vec<MemberId> {
        self.members
            .iter()
            .filter(|m| Some(m.id) != exclude)
            .map(|m| {
                m.send(msg.clone());
                m.id
            })
            .collect()
    }
}

/// All active rooms.
///
/// Each room sits behind its own map entry lock. Every operation applies its
/// grid mutation and queues its notifications while holding that lock, so
/// the members of a room observe mutations in exactly the order they were
/// applied to the authoritative grid.
pub struct RoomRegistry {
    rooms: DashMap<String, Room>,
    capacity: usize,
}

impl Default for RoomRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl RoomRegistry {
    pub fn new() -> Self {
        Self::with_capacity(ROOM_CAPACITY)
    }

    /// Registry whose rooms hold at most `capacity` members.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            rooms: DashMap::new(),
            capacity,
        }
    }

    /// Attach `member` to a room, creating it if needed.
    ///
    /// On success the member is sent `init` and the others `userJoined`.
    pub fn join(&self, room_id: &str, member: Member) -> Result<Joined, RoomError> {
        let mut room = self.rooms.entry(room_id.to_string()).or_insert_with(|| {
            info!("Room {} created", room_id);
            Room::new()
        });
        if room.members.len() >= self.capacity {
            return Err(RoomError::RoomFull);
        }

        let member_id = member.id;
        let user_id = member.user_id.clone();
        room.members.push(member);
        let user_count = room.members.len();

        if let Some(joined) = room.members.last() {
            joined.send(ServerMessage::Init {
                canvas: room.grid.clone(),
                user_count,
            });
        }
        let notified = room.fan_out(
            &ServerMessage::UserJoined { user_id, user_count },
            Some(member_id),
        );

        Ok(Joined {
            grid: room.grid.clone(),
            user_count,
            notified,
        })
    }

    /// Re-send `init` to a connection that is already a member of the room.
    ///
    /// The membership and the authoritative grid are kept as they are.
    /// Returns the member count, or `None` if the member is not in the room.
    pub fn resync(&self, room_id: &str, member_id: MemberId, user_id: &str) -> Option<usize> {
        let mut room = self.rooms.get_mut(room_id)?;
        let user_count = room.members.len();
        let canvas = room.grid.clone();
        let member = room.members.iter_mut().find(|m| m.id == member_id)?;
        member.user_id = user_id.to_string();
        member.send(ServerMessage::Init { canvas, user_count });
        Some(user_count)
    }

    /// Detach a member. The room is destroyed when it becomes empty;
    /// otherwise the remaining members are sent `userLeft`.
    ///
    /// Returns the remaining member count, or `None` if the member was not
    /// in the room.
    pub fn leave(&self, room_id: &str, member_id: MemberId) -> Option<usize> {
        let Entry::Occupied(mut entry) = self.rooms.entry(room_id.to_string()) else {
            return None;
        };

        let room = entry.get_mut();
        let pos = room.members.iter().position(|m| m.id == member_id)?;
        let member = room.members.remove(pos);
        let user_count = room.members.len();

        if user_count == 0 {
            entry.remove();
            info!("Room {} deleted", room_id);
        } else {
            room.fan_out(
                &ServerMessage::UserLeft {
                    user_id: member.user_id,
                    user_count,
                },
                None,
            );
        }
        Some(user_count)
    }

    /// Set one cell and relay it to the other members.
    pub fn apply_draw(
        &self,
        room_id: &str,
        from: MemberId,
        row: usize,
        col: usize,
        color: Option<Color>,
    ) -> Result<Vec<MemberId>, RoomError> {
        let mut room = self.room_mut(room_id)?;
        room.grid.set_cell(row, col, color.clone())?;
        let user_id = room
            .members
            .iter()
            .find(|m| m.id == from)
            .map(|m| m.user_id.clone());
        Ok(room.fan_out(&ServerMessage::Draw { row, col, color, user_id }, Some(from)))
    }

    /// Replace the grid and relay it to the other members.
    pub fn apply_fill(&self, room_id: &str, from: MemberId, data: Grid) -> Result<Vec<MemberId>, RoomError> {
        let mut room = self.room_mut(room_id)?;
        room.grid.replace(data.clone())?;
        Ok(room.fan_out(&ServerMessage::Fill { data }, Some(from)))
    }

    /// Clear the grid and tell every member, the originator included.
    pub fn apply_clear(&self, room_id: &str) -> Result<Vec<MemberId>, RoomError> {
        let mut room = self.room_mut(room_id)?;
        room.grid.clear();
        Ok(room.fan_out(&ServerMessage::Clear, None))
    }

    /// Copy of a room's authoritative grid.
    pub fn snapshot(&self, room_id: &str) -> Option<Grid> {
        self.rooms.get(room_id).map(|room| room.grid.clone())
    }

    /// Number of members in a room (0 if it does not exist).
    pub fn member_count(&self, room_id: &str) -> usize {
        self.rooms.get(room_id).map_or(0, |room| room.members.len())
    }

    pub fn room_count(&self) -> usize {
        self.rooms.len()
    }

    fn room_mut(&self, room_id: &str) -> Result<dashmap::mapref::one::RefMut<'_, String, Room>, RoomError> {
        self.rooms
            .get_mut(room_id)
            .ok_or_else(|| RoomError::UnknownRoom(room_id.to_string()))
    }
}
