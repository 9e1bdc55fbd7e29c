//! Wire protocol shared by the relay server and the views.
//!
//! Messages are JSON objects tagged by `type`, with camelCase fields:
//! ```json
//! { "type": "join", "roomId": "R1", "userId": "alice" }
//! { "type": "draw", "row": 0, "col": 0, "color": "#FF0000" }
//! { "type": "fill", "data": [[null, "#FF0000"], ...] }
//! { "type": "clear" }
//! ```

use serde::{Deserialize, Serialize};

use crate::error::SyncResult;
use crate::grid::{Color, Grid};

/// Maximum number of members in a room.
pub const ROOM_CAPACITY: usize = 2;

/// Messages sent by a view to the server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum ClientMessage {
    /// Attach to a room
    Join { room_id: String, user_id: String },
    /// Single-cell update; `None` erases the cell
    Draw { row: usize, col: usize, color: Option<Color> },
    /// Whole-grid replacement (flood fill, undo, redo)
    Fill { data: Grid },
    /// Reset the grid
    Clear,
    /// Request the authoritative grid for export
    Export,
}

/// Messages sent by the server to a view.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum ServerMessage {
    /// Join accepted with the authoritative grid
    Init { canvas: Grid, user_count: usize },
    /// Single-cell update from the other member
    Draw {
        row: usize,
        col: usize,
        color: Option<Color>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        user_id: Option<String>,
    },
    /// Whole-grid replacement from the other member
    Fill { data: Grid },
    /// Grid reset, delivered to every member
    Clear,
    /// Another member joined
    UserJoined { user_id: String, user_count: usize },
    /// Another member left
    UserLeft { user_id: String, user_count: usize },
    /// Join rejected
    Error { message: String },
    /// Authoritative grid in reply to `export`
    ExportData { canvas: Grid },
}

impl ClientMessage {
    pub fn to_json(&self) -> SyncResult<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn from_json(json: &str) -> SyncResult<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

impl ServerMessage {
    pub fn to_json(&self) -> SyncResult<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn from_json(json: &str) -> SyncResult<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

/// What an inbound server message did to a view.
#[derive(Debug, Clone, PartialEq)]
pub enum SyncEvent {
    /// Joined the room; the mirror now holds the authoritative grid
    Joined { user_count: usize },
    /// A remote cell update was applied
    RemoteDraw { row: usize, col: usize },
    /// A remote whole-grid replacement was applied
    RemoteFill,
    /// The grid was cleared
    Cleared,
    /// The other member joined
    PeerJoined { user_id: String, user_count: usize },
    /// The other member left
    PeerLeft { user_id: String, user_count: usize },
    /// The server rejected the join
    Rejected { message: String },
    /// The authoritative grid arrived for export
    ExportReady { canvas: Grid },
}
