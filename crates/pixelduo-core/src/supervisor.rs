//! Connection lifecycle for a view.
//!
//! ```text
//! Connecting -> Joining -> Synced -> Disconnected -> (3 s) -> Connecting
//!                  \-> Rejected (join refused, terminal)
//! ```
//!
//! The supervisor is driven by `tick`, which drains transport events, applies
//! them to the session, fires the reconnect timer and flushes outgoing
//! messages. Time is passed in so the schedule can be tested without
//! sleeping.

use std::time::{Duration, Instant};

use crate::session::ViewSession;
use crate::sync::SyncEvent;
use crate::transport::{Transport, TransportEvent};

/// Fixed delay before reconnecting after a lost connection.
pub const RECONNECT_DELAY: Duration = Duration::from_millis(3000);

/// Connection state of a view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SupervisorState {
    /// Not started yet
    Idle,
    /// Opening the transport
    Connecting,
    /// Transport open, waiting for `init`
    Joining,
    /// Joined and mirroring the room
    Synced,
    /// Connection lost; reconnect scheduled at `retry_at`
    Disconnected { retry_at: Instant },
    /// The server refused the join
    Rejected,
}

/// Drives a transport on behalf of a [`ViewSession`].
pub struct ConnectionSupervisor<T: Transport> {
    url: String,
    transport: T,
    state: SupervisorState,
    reconnect_delay: Duration,
    attempts: u64,
}

impl<T: Transport> ConnectionSupervisor<T> {
    pub fn new(url: impl Into<String>, transport: T) -> Self {
        Self {
            url: url.into(),
            transport,
            state: SupervisorState::Idle,
            reconnect_delay: RECONNECT_DELAY,
            attempts: 0,
        }
    }

    pub fn state(&self) -> SupervisorState {
        self.state
    }

    pub fn is_synced(&self) -> bool {
        self.state == SupervisorState::Synced
    }

    /// Number of connection attempts made so far.
    pub fn attempts(&self) -> u64 {
        self.attempts
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    /// Start the first connection attempt.
    pub fn start(&mut self, session: &mut ViewSession, now: Instant) {
        if self.state == SupervisorState::Idle {
            self.begin_connect(session, now);
        }
    }

    /// Process pending transport events and timers.
    ///
    /// Returns the protocol events applied to the session, in order.
    pub fn tick(&mut self, session: &mut ViewSession, now: Instant) -> Vec<SyncEvent> {
        let mut applied = Vec::new();

        for event in self.transport.poll_events() {
            if self.state == SupervisorState::Rejected {
                break;
            }
            match event {
                TransportEvent::Opened => self.on_open(session, now),
                TransportEvent::Text(text) => {
                    if let Some(event) = self.on_text(session, &text) {
                        applied.push(event);
                    }
                }
                TransportEvent::Closed => self.on_lost(session, now, "closed"),
                TransportEvent::Failed(reason) => self.on_lost(session, now, &reason),
            }
        }

        if let SupervisorState::Disconnected { retry_at } = self.state {
            if now >= retry_at {
                session.record("Reconnecting...");
                self.begin_connect(session, now);
            }
        }

        self.flush(session, now);
        applied
    }

    /// Close the connection for good.
    pub fn shutdown(&mut self) {
        self.transport.disconnect();
        self.state = SupervisorState::Idle;
    }

    fn begin_connect(&mut self, session: &mut ViewSession, now: Instant) {
        self.attempts += 1;
        self.state = SupervisorState::Connecting;
        if let Err(e) = self.transport.connect(&self.url) {
            log::error!("Failed to open transport: {}", e);
            self.on_lost(session, now, &e.to_string());
        }
    }

    fn on_open(&mut self, session: &mut ViewSession, now: Instant) {
        if self.state != SupervisorState::Connecting {
            return;
        }
        log::info!("Connected, joining room {}", session.room_id());
        self.state = SupervisorState::Joining;
        match session.join_message().to_json() {
            Ok(json) => {
                if let Err(e) = self.transport.send(&json) {
                    self.on_lost(session, now, &e.to_string());
                }
            }
            Err(e) => log::error!("Failed to encode join: {}", e),
        }
    }

    fn on_text(&mut self, session: &mut ViewSession, text: &str) -> Option<SyncEvent> {
        let event = match session.handle_text(text) {
            Ok(event) => event,
            Err(e) => {
                log::warn!("Dropping inbound message: {}", e);
                return None;
            }
        };

        match &event {
            SyncEvent::Joined { user_count } => {
                log::info!("Joined room {} ({}/2)", session.room_id(), user_count);
                self.state = SupervisorState::Synced;
            }
            SyncEvent::Rejected { message } => {
                log::warn!("Join rejected: {}", message);
                self.transport.disconnect();
                self.state = SupervisorState::Rejected;
            }
            _ => {}
        }
        Some(event)
    }

    fn on_lost(&mut self, session: &mut ViewSession, now: Instant, reason: &str) {
        if matches!(
            self.state,
            SupervisorState::Disconnected { .. } | SupervisorState::Rejected | SupervisorState::Idle
        ) {
            return;
        }
        log::warn!("Connection lost ({}), retrying in {:?}", reason, self.reconnect_delay);
        self.transport.disconnect();
        session.record("Disconnected");
        self.state = SupervisorState::Disconnected {
            retry_at: now + self.reconnect_delay,
        };
    }

    /// Send queued edits if synced; otherwise drop them.
    fn flush(&mut self, session: &mut ViewSession, now: Instant) {
        if !session.has_outgoing() {
            return;
        }
        let outgoing = session.take_outgoing();
        if !self.is_synced() {
            log::debug!("Not synced, dropping {} outgoing message(s)", outgoing.len());
            return;
        }
        for msg in outgoing {
            let json = match msg.to_json() {
                Ok(json) => json,
                Err(e) => {
                    log::error!("Failed to encode message: {}", e);
                    continue;
                }
            };
            if let Err(e) = self.transport.send(&json) {
                self.on_lost(session, now, &e.to_string());
                break;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{SyncError, SyncResult};
    use crate::grid::{Color, Grid};
    use crate::sync::{ClientMessage, ServerMessage};

    /// Transport that records what was sent and replays scripted events.
    #[derive(Default)]
    struct ScriptedTransport {
        connects: usize,
        sent: Vec<String>,
        pending: Vec<TransportEvent>,
        refuse_connect: bool,
        open: bool,
    }

    impl ScriptedTransport {
        fn push(&mut self, event: TransportEvent) {
            self.pending.push(event);
        }

        fn push_server(&mut self, msg: ServerMessage) {
            self.pending.push(TransportEvent::Text(msg.to_json().unwrap()));
        }

        fn sent_messages(&self) -> Vec<ClientMessage> {
            self.sent.iter().map(|s| ClientMessage::from_json(s).unwrap()).collect()
        }
    }

    impl Transport for ScriptedTransport {
        fn connect(&mut self, _url: &str) -> SyncResult<()> {
            self.connects += 1;
            if self.refuse_connect {
                return Err(SyncError::TransportLost("refused".to_string()));
            }
            self.open = true;
            Ok(())
        }

        fn send(&mut self, msg: &str) -> SyncResult<()> {
            if !self.open {
                return Err(SyncError::TransportLost("Not connected".to_string()));
            }
            self.sent.push(msg.to_string());
            Ok(())
        }

        fn poll_events(&mut self) -> Vec<TransportEvent> {
            std::mem::take(&mut self.pending)
        }

        fn disconnect(&mut self) {
            self.open = false;
        }
    }

    fn synced() -> (ConnectionSupervisor<ScriptedTransport>, ViewSession, Instant) {
        let now = Instant::now();
        let mut session = ViewSession::new("R1", "alice");
        let mut supervisor = ConnectionSupervisor::new("ws://test/ws", ScriptedTransport::default());
        supervisor.start(&mut session, now);
        supervisor.transport_mut().push(TransportEvent::Opened);
        supervisor.transport_mut().push_server(ServerMessage::Init {
            canvas: Grid::default(),
            user_count: 1,
        });
        supervisor.tick(&mut session, now);
        (supervisor, session, now)
    }

    #[test]
    fn test_connect_join_sync() {
        let (supervisor, session, _) = synced();
        assert_eq!(supervisor.state(), SupervisorState::Synced);
        assert_eq!(
            supervisor.transport().sent_messages(),
            vec![ClientMessage::Join { room_id: "R1".to_string(), user_id: "alice".to_string() }]
        );
        assert_eq!(session.user_count(), 1);
    }

    #[test]
    fn test_joining_until_init() {
        let now = Instant::now();
        let mut session = ViewSession::new("R1", "alice");
        let mut supervisor = ConnectionSupervisor::new("ws://test/ws", ScriptedTransport::default());
        supervisor.start(&mut session, now);
        assert_eq!(supervisor.state(), SupervisorState::Connecting);

        supervisor.transport_mut().push(TransportEvent::Opened);
        supervisor.tick(&mut session, now);
        assert_eq!(supervisor.state(), SupervisorState::Joining);
    }

    #[test]
    fn test_edits_flushed_when_synced() {
        let (mut supervisor, mut session, now) = synced();
        session.draw(0, 0, Some(Color::new("#FF0000"))).unwrap();
        supervisor.tick(&mut session, now);

        let sent = supervisor.transport().sent_messages();
        assert_eq!(
            sent.last(),
            Some(&ClientMessage::Draw { row: 0, col: 0, color: Some(Color::new("#FF0000")) })
        );
    }

    #[test]
    fn test_reconnect_after_fixed_delay() {
        let (mut supervisor, mut session, now) = synced();
        supervisor.transport_mut().push(TransportEvent::Closed);
        supervisor.tick(&mut session, now);
        assert_eq!(
            supervisor.state(),
            SupervisorState::Disconnected { retry_at: now + RECONNECT_DELAY }
        );

        supervisor.tick(&mut session, now + Duration::from_millis(2999));
        assert_eq!(supervisor.transport().connects, 1);

        supervisor.tick(&mut session, now + RECONNECT_DELAY);
        assert_eq!(supervisor.state(), SupervisorState::Connecting);
        assert_eq!(supervisor.transport().connects, 2);
        assert_eq!(supervisor.attempts(), 2);
    }

    #[test]
    fn test_retries_unbounded() {
        let now = Instant::now();
        let mut session = ViewSession::new("R1", "alice");
        let transport = ScriptedTransport {
            refuse_connect: true,
            ..Default::default()
        };
        let mut supervisor = ConnectionSupervisor::new("ws://test/ws", transport);
        supervisor.start(&mut session, now);

        for i in 1..=20u32 {
            supervisor.tick(&mut session, now + RECONNECT_DELAY * i);
        }
        assert_eq!(supervisor.transport().connects, 21);
        assert!(matches!(supervisor.state(), SupervisorState::Disconnected { .. }));
    }

    #[test]
    fn test_rejected_is_terminal() {
        let now = Instant::now();
        let mut session = ViewSession::new("R1", "carol");
        let mut supervisor = ConnectionSupervisor::new("ws://test/ws", ScriptedTransport::default());
        supervisor.start(&mut session, now);
        supervisor.transport_mut().push(TransportEvent::Opened);
        supervisor.transport_mut().push_server(ServerMessage::Error {
            message: "Room is full".to_string(),
        });
        supervisor.transport_mut().push(TransportEvent::Closed);

        let events = supervisor.tick(&mut session, now);
        assert_eq!(events, vec![SyncEvent::Rejected { message: "Room is full".to_string() }]);
        assert_eq!(supervisor.state(), SupervisorState::Rejected);

        supervisor.tick(&mut session, now + RECONNECT_DELAY * 2);
        assert_eq!(supervisor.transport().connects, 1);
        assert_eq!(supervisor.state(), SupervisorState::Rejected);
    }

    #[test]
    fn test_edits_dropped_while_disconnected() {
        let (mut supervisor, mut session, now) = synced();
        supervisor.transport_mut().push(TransportEvent::Closed);
        supervisor.tick(&mut session, now);
        let sent_before = supervisor.transport().sent.len();

        session.draw(1, 1, Some(Color::new("#00FF00"))).unwrap();
        supervisor.tick(&mut session, now);
        assert_eq!(supervisor.transport().sent.len(), sent_before);
        assert!(!session.has_outgoing());
    }

    #[test]
    fn test_edits_before_init_not_sent() {
        let now = Instant::now();
        let mut session = ViewSession::new("R1", "alice");
        let mut supervisor = ConnectionSupervisor::new("ws://test/ws", ScriptedTransport::default());
        supervisor.start(&mut session, now);
        supervisor.transport_mut().push(TransportEvent::Opened);
        supervisor.tick(&mut session, now);
        assert_eq!(supervisor.state(), SupervisorState::Joining);

        session.draw(0, 0, Some(Color::new("#FF0000"))).unwrap();
        supervisor.transport_mut().push_server(ServerMessage::Init {
            canvas: Grid::default(),
            user_count: 1,
        });
        supervisor.tick(&mut session, now);

        assert!(supervisor.is_synced());
        assert_eq!(session.grid().get(0, 0).unwrap(), None);
        assert_eq!(
            supervisor.transport().sent_messages(),
            vec![ClientMessage::Join { room_id: "R1".to_string(), user_id: "alice".to_string() }]
        );
    }

    #[test]
    fn test_malformed_message_dropped() {
        let (mut supervisor, mut session, now) = synced();
        supervisor.transport_mut().push(TransportEvent::Text("{garbage".to_string()));
        supervisor.transport_mut().push_server(ServerMessage::Clear);

        let events = supervisor.tick(&mut session, now);
        assert_eq!(events, vec![SyncEvent::Cleared]);
        assert_eq!(supervisor.state(), SupervisorState::Synced);
    }

    #[test]
    fn test_resync_on_reconnect() {
        let (mut supervisor, mut session, now) = synced();
        session.draw(0, 0, Some(Color::new("#FF0000"))).unwrap();
        supervisor.tick(&mut session, now);
        supervisor.transport_mut().push(TransportEvent::Closed);
        supervisor.tick(&mut session, now);

        let later = now + RECONNECT_DELAY;
        supervisor.tick(&mut session, later);
        let mut canvas = Grid::default();
        canvas.set_cell(7, 7, Some(Color::new("#0000FF"))).unwrap();
        supervisor.transport_mut().push(TransportEvent::Opened);
        supervisor.transport_mut().push_server(ServerMessage::Init { canvas: canvas.clone(), user_count: 2 });
        supervisor.tick(&mut session, later);

        assert!(supervisor.is_synced());
        assert_eq!(session.grid(), &canvas);
        assert_eq!(session.history().len(), 1);
    }
}
