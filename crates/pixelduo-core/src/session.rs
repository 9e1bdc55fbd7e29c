//! Per-view editing session.
//!
//! A `ViewSession` owns the local mirror grid, its undo history, the current
//! tool and color, and a queue of outgoing protocol messages. Local edits go
//! through the session so that every mutation is recorded in history and
//! announced to the server. Inbound server messages are applied to the mirror
//! without touching history.

use std::collections::VecDeque;

use crate::error::{GridError, SyncResult};
use crate::fill::{flood_fill, FillOutcome};
use crate::grid::{Color, Grid};
use crate::history::HistoryStack;
use crate::sync::{ClientMessage, ServerMessage, SyncEvent};

/// Number of activity entries kept for display.
pub const MAX_ACTIVITY: usize = 10;

/// Editing tools.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Tool {
    #[default]
    Draw,
    Erase,
    Fill,
}

/// Local state of one connected view.
pub struct ViewSession {
    room_id: String,
    user_id: String,
    grid: Grid,
    history: HistoryStack,
    tool: Tool,
    color: Color,
    user_count: usize,
    /// Pending outgoing messages.
    outgoing: Vec<ClientMessage>,
    /// Most recent activity first.
    activity: VecDeque<String>,
}

impl ViewSession {
    /// Create a session for `user_id` in `room_id` with an empty grid.
    pub fn new(room_id: impl Into<String>, user_id: impl Into<String>) -> Self {
        Self {
            room_id: room_id.into(),
            user_id: user_id.into(),
            grid: Grid::default(),
            history: HistoryStack::new(),
            tool: Tool::default(),
            color: Color::new("#000000"),
            user_count: 0,
            outgoing: Vec::new(),
            activity: VecDeque::with_capacity(MAX_ACTIVITY),
        }
    }

    pub fn room_id(&self) -> &str {
        &self.room_id
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    /// The local mirror grid.
    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    pub fn history(&self) -> &HistoryStack {
        &self.history
    }

    /// Members in the room as last reported by the server.
    pub fn user_count(&self) -> usize {
        self.user_count
    }

    pub fn tool(&self) -> Tool {
        self.tool
    }

    pub fn set_tool(&mut self, tool: Tool) {
        self.tool = tool;
    }

    pub fn color(&self) -> &Color {
        &self.color
    }

    pub fn set_color(&mut self, color: Color) {
        self.color = color;
    }

    /// The message that attaches this view to its room.
    pub fn join_message(&self) -> ClientMessage {
        ClientMessage::Join {
            room_id: self.room_id.clone(),
            user_id: self.user_id.clone(),
        }
    }

    // --- Local edits ---

    /// Apply the current tool at a cell.
    pub fn apply_tool(&mut self, row: usize, col: usize) -> Result<bool, GridError> {
        match self.tool {
            Tool::Draw => {
                let color = self.color.clone();
                self.draw(row, col, Some(color)).map(|_| true)
            }
            Tool::Erase => self.draw(row, col, None).map(|_| true),
            Tool::Fill => {
                let color = self.color.clone();
                self.fill(row, col, Some(color)).map(FillOutcome::changed)
            }
        }
    }

    /// Set one cell and announce it.
    pub fn draw(&mut self, row: usize, col: usize, color: Option<Color>) -> Result<(), GridError> {
        self.grid.set_cell(row, col, color.clone())?;
        self.history.push(&self.grid);
        self.outgoing.push(ClientMessage::Draw { row, col, color });
        Ok(())
    }

    /// Flood fill from a cell and announce the resulting grid.
    ///
    /// A fill that would not change anything records no history and sends
    /// nothing.
    pub fn fill(&mut self, row: usize, col: usize, color: Option<Color>) -> Result<FillOutcome, GridError> {
        let outcome = flood_fill(&mut self.grid, row, col, color)?;
        if outcome.changed() {
            self.history.push(&self.grid);
            self.outgoing.push(ClientMessage::Fill {
                data: self.grid.clone(),
            });
            self.record("Filled area");
        }
        Ok(outcome)
    }

    /// Clear the grid and announce it.
    pub fn clear(&mut self) {
        self.grid.clear();
        self.history.push(&self.grid);
        self.outgoing.push(ClientMessage::Clear);
        self.record("Canvas cleared");
    }

    /// Step back in history. Returns false if there was nothing to undo.
    pub fn undo(&mut self) -> bool {
        match self.history.undo() {
            Some(snapshot) => {
                self.restore(snapshot);
                self.record("Undo");
                true
            }
            None => {
                self.record("Nothing to undo");
                false
            }
        }
    }

    /// Step forward in history. Returns false if there was nothing to redo.
    pub fn redo(&mut self) -> bool {
        match self.history.redo() {
            Some(snapshot) => {
                self.restore(snapshot);
                self.record("Redo");
                true
            }
            None => {
                self.record("Nothing to redo");
                false
            }
        }
    }

    /// Ask the server for the authoritative grid.
    pub fn request_export(&mut self) {
        self.outgoing.push(ClientMessage::Export);
    }

    fn restore(&mut self, snapshot: Grid) {
        // History snapshots always share the mirror's size.
        self.grid = snapshot;
        self.outgoing.push(ClientMessage::Fill {
            data: self.grid.clone(),
        });
    }

    // --- Outgoing ---

    /// Take pending outgoing messages (drains the queue).
    pub fn take_outgoing(&mut self) -> Vec<ClientMessage> {
        std::mem::take(&mut self.outgoing)
    }

    pub fn has_outgoing(&self) -> bool {
        !self.outgoing.is_empty()
    }

    // --- Incoming ---

    /// Decode and apply a raw server message.
    pub fn handle_text(&mut self, json: &str) -> SyncResult<SyncEvent> {
        let msg = ServerMessage::from_json(json)?;
        Ok(self.handle_message(msg)?)
    }

    /// Apply a server message to the mirror.
    pub fn handle_message(&mut self, msg: ServerMessage) -> Result<SyncEvent, GridError> {
        match msg {
            ServerMessage::Init { canvas, user_count } => {
                self.grid.replace(canvas)?;
                self.history.reset(&self.grid);
                // Edits queued against the old mirror are not in the snapshot.
                let dropped = std::mem::take(&mut self.outgoing);
                if !dropped.is_empty() {
                    log::debug!("Discarding {} edit(s) made before sync", dropped.len());
                }
                self.user_count = user_count;
                self.record("Canvas loaded");
                Ok(SyncEvent::Joined { user_count })
            }
            ServerMessage::Draw { row, col, color, .. } => {
                self.grid.set_cell(row, col, color)?;
                Ok(SyncEvent::RemoteDraw { row, col })
            }
            ServerMessage::Fill { data } => {
                self.grid.replace(data)?;
                Ok(SyncEvent::RemoteFill)
            }
            ServerMessage::Clear => {
                self.grid.clear();
                Ok(SyncEvent::Cleared)
            }
            ServerMessage::UserJoined { user_id, user_count } => {
                self.user_count = user_count;
                self.record(format!("{} joined", user_id));
                Ok(SyncEvent::PeerJoined { user_id, user_count })
            }
            ServerMessage::UserLeft { user_id, user_count } => {
                self.user_count = user_count;
                self.record(format!("{} left", user_id));
                Ok(SyncEvent::PeerLeft { user_id, user_count })
            }
            ServerMessage::Error { message } => {
                self.record(message.clone());
                Ok(SyncEvent::Rejected { message })
            }
            ServerMessage::ExportData { canvas } => Ok(SyncEvent::ExportReady { canvas }),
        }
    }

    // --- Activity ---

    /// Add an entry to the activity log.
    pub fn record(&mut self, entry: impl Into<String>) {
        self.activity.push_front(entry.into());
        self.activity.truncate(MAX_ACTIVITY);
    }

    /// Activity entries, most recent first.
    pub fn activity(&self) -> impl Iterator<Item = &str> {
        self.activity.iter().map(String::as_str)
    }
}
