//! PixelDuo WebSocket Relay Server
//!
//! Holds the authoritative grid of every room and relays edits between the
//! two members of a room.
//!
//! ## Protocol
//!
//! JSON text frames tagged by `type`; see [`pixelduo_core::sync`]:
//! ```json
//! { "type": "join", "roomId": "R1", "userId": "alice" }
//! { "type": "draw", "row": 0, "col": 0, "color": "#FF0000" }
//! { "type": "fill", "data": [[...], ...] }
//! { "type": "clear" }
//! ```

pub mod config;
pub mod room;

use std::sync::Arc;

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::IntoResponse,
    routing::get,
    Router,
};
use futures_util::{SinkExt, StreamExt};
use pixelduo_core::{ClientMessage, ServerMessage};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{debug, info, warn};
use uuid::Uuid;

pub use config::ServerConfig;
pub use room::{Member, MemberId, Outbox, RoomError, RoomRegistry, OUTBOX_CAPACITY};

/// Build the HTTP router around a registry.
pub fn router(registry: Arc<RoomRegistry>) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/ws", get(ws_handler))
        .route("/health", get(health))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(registry)
}

/// Index page
async fn index() -> &'static str {
    "PixelDuo Relay Server - Connect via WebSocket at /ws"
}

/// Health check
async fn health() -> &'static str {
    "ok"
}

/// WebSocket upgrade handler
async fn ws_handler(ws: WebSocketUpgrade, State(registry): State<Arc<RoomRegistry>>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, registry))
}

/// Room membership of a connection.
struct Attachment {
    room: String,
    user_id: String,
}

/// What the connection loop should do after a client message.
enum Flow {
    Continue,
    Close,
}

/// Handle a WebSocket connection
async fn handle_socket(socket: WebSocket, registry: Arc<RoomRegistry>) {
    let member_id = Uuid::new_v4();
    info!("New connection: {}", member_id);

    let (mut sender, mut receiver) = socket.split();
    let (outbox, mut outbox_rx) = Outbox::channel(member_id, OUTBOX_CAPACITY);
    let mut attachment: Option<Attachment> = None;

    loop {
        tokio::select! {
            msg = receiver.next() => {
                match msg {
                    Some(Ok(Message::Text(text))) => {
                        let flow = match serde_json::from_str::<ClientMessage>(&text) {
                            Ok(client_msg) => {
                                handle_client_message(&registry, member_id, &outbox, &mut attachment, client_msg)
                            }
                            Err(e) => {
                                warn!("Invalid message from {}: {}", member_id, e);
                                Flow::Continue
                            }
                        };
                        if let Flow::Close = flow {
                            break;
                        }
                    }
                    Some(Ok(Message::Binary(_))) => {
                        warn!("Ignoring binary frame from {}", member_id);
                    }
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Ok(_)) => {} // Ignore ping/pong
                    Some(Err(e)) => {
                        warn!("WebSocket error for {}: {}", member_id, e);
                        break;
                    }
                }
            }

            Some(server_msg) = outbox_rx.recv() => {
                let json = match server_msg.to_json() {
                    Ok(json) => json,
                    Err(e) => {
                        warn!("Failed to encode message for {}: {}", member_id, e);
                        continue;
                    }
                };
                if sender.send(Message::Text(json.into())).await.is_err() {
                    break;
                }
            }

            _ = outbox.overflowed() => {
                warn!("Connection {} fell behind, closing", member_id);
                break;
            }
        }
    }

    // Deliver anything queued before the loop ended (e.g. a join rejection).
    while let Ok(server_msg) = outbox_rx.try_recv() {
        if let Ok(json) = server_msg.to_json() {
            if sender.send(Message::Text(json.into())).await.is_err() {
                break;
            }
        }
    }
    let _ = sender.send(Message::Close(None)).await;

    if let Some(attached) = attachment.take() {
        registry.leave(&attached.room, member_id);
        info!("User {} left room {}", attached.user_id, attached.room);
    }
    info!("Connection closed: {}", member_id);
}

/// Apply one decoded client message.
///
/// Failures are logged and confined to the message; only a rejected join
/// ends the connection.
fn handle_client_message(
    registry: &RoomRegistry,
    member_id: MemberId,
    outbox: &Outbox,
    attachment: &mut Option<Attachment>,
    msg: ClientMessage,
) -> Flow {
    if let ClientMessage::Join { room_id, user_id } = msg {
        // Same room again: resend the grid, keep the membership.
        if let Some(current) = attachment.as_mut().filter(|a| a.room == room_id) {
            match registry.resync(&room_id, member_id, &user_id) {
                Some(count) => info!("User {} resynced in room {} ({}/2)", user_id, room_id, count),
                None => warn!("Connection {} not found in room {}", member_id, room_id),
            }
            current.user_id = user_id;
            return Flow::Continue;
        }

        let member = Member::new(member_id, user_id.clone(), outbox.clone());
        return match registry.join(&room_id, member) {
            Ok(joined) => {
                info!("User {} joined room {} ({}/2)", user_id, room_id, joined.user_count);
                // Attached to the new room; now leave the previous one if any.
                if let Some(old) = attachment.replace(Attachment { room: room_id, user_id }) {
                    registry.leave(&old.room, member_id);
                    info!("User {} left room {}", old.user_id, old.room);
                }
                Flow::Continue
            }
            Err(e) => {
                warn!("User {} rejected from room {}: {}", user_id, room_id, e);
                outbox.send(ServerMessage::Error { message: e.to_string() });
                Flow::Close
            }
        };
    }

    let Some(attached) = attachment.as_ref() else {
        debug!("Ignoring message from {} before join", member_id);
        return Flow::Continue;
    };
    let room = attached.room.as_str();

    let result = match msg {
        ClientMessage::Draw { row, col, color } => registry.apply_draw(room, member_id, row, col, color).map(drop),
        ClientMessage::Fill { data } => registry.apply_fill(room, member_id, data).map(drop),
        ClientMessage::Clear => registry.apply_clear(room).map(drop),
        ClientMessage::Export => match registry.snapshot(room) {
            Some(canvas) => {
                outbox.send(ServerMessage::ExportData { canvas });
                Ok(())
            }
            None => Err(RoomError::UnknownRoom(room.to_string())),
        },
        ClientMessage::Join { .. } => Ok(()),
    };

    if let Err(e) = result {
        warn!("Dropping message from {} in room {}: {}", member_id, room, e);
    }
    Flow::Continue
}
