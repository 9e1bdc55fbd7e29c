//! PixelDuo Core Library
//!
//! Grid state, flood fill, undo history and the synchronization protocol
//! shared by the relay server and the views.

pub mod error;
pub mod export;
pub mod fill;
pub mod grid;
pub mod history;
pub mod session;
pub mod supervisor;
pub mod sync;
pub mod transport;

pub use error::{GridError, SyncError, SyncResult};
pub use export::encode_png;
pub use fill::{FillOutcome, flood_fill};
pub use grid::{Color, Grid, GRID_SIZE};
pub use history::{HistoryStack, MAX_HISTORY};
pub use session::{Tool, ViewSession, MAX_ACTIVITY};
pub use supervisor::{ConnectionSupervisor, SupervisorState, RECONNECT_DELAY};
pub use sync::{ClientMessage, ServerMessage, SyncEvent, ROOM_CAPACITY};
pub use transport::{NativeWebSocket, Transport, TransportEvent};
