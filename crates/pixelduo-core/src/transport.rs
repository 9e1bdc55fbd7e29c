//! WebSocket transport for views.
//!
//! The supervisor talks to the network through the [`Transport`] trait so it
//! can be driven by a scripted transport in tests. [`NativeWebSocket`] runs a
//! blocking tungstenite socket on a background thread and hands events back
//! through a channel, so polling it never blocks the view loop.

use std::io::ErrorKind;
use std::net::TcpStream;
use std::sync::mpsc::{channel, Receiver, Sender, TryRecvError};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use tungstenite::stream::MaybeTlsStream;
use tungstenite::{connect, Message};
use url::Url;

use crate::error::{SyncError, SyncResult};

/// Low-level events produced by a transport.
#[derive(Debug, Clone, PartialEq)]
pub enum TransportEvent {
    /// The connection is open
    Opened,
    /// A text frame arrived
    Text(String),
    /// The connection closed
    Closed,
    /// The connection could not be opened or broke
    Failed(String),
}

/// A bidirectional text transport.
pub trait Transport {
    /// Start opening a connection. Completion is reported as an event.
    fn connect(&mut self, url: &str) -> SyncResult<()>;

    /// Queue a text frame.
    fn send(&mut self, msg: &str) -> SyncResult<()>;

    /// Drain pending events without blocking.
    fn poll_events(&mut self) -> Vec<TransportEvent>;

    /// Close the connection, if any.
    fn disconnect(&mut self);
}

/// Commands sent to the WebSocket thread.
enum WsCommand {
    Send(String),
    Close,
}

/// WebSocket client for native platforms.
#[derive(Default)]
pub struct NativeWebSocket {
    /// Channel to send commands to the WebSocket thread.
    cmd_tx: Option<Sender<WsCommand>>,
    /// Channel to receive events from the WebSocket thread.
    event_rx: Option<Receiver<TransportEvent>>,
    _thread: Option<JoinHandle<()>>,
}

impl NativeWebSocket {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Transport for NativeWebSocket {
    fn connect(&mut self, url: &str) -> SyncResult<()> {
        if self.cmd_tx.is_some() {
            self.disconnect();
        }

        let parsed_url = Url::parse(url).map_err(|e| SyncError::InvalidUrl(e.to_string()))?;
        if parsed_url.scheme() != "ws" && parsed_url.scheme() != "wss" {
            return Err(SyncError::InvalidUrl(format!(
                "Invalid WebSocket URL scheme: {}",
                parsed_url.scheme()
            )));
        }

        let (cmd_tx, cmd_rx) = channel::<WsCommand>();
        let (event_tx, event_rx) = channel::<TransportEvent>();
        let url = url.to_string();

        let handle = thread::spawn(move || run_socket(&url, cmd_rx, event_tx));

        self.cmd_tx = Some(cmd_tx);
        self.event_rx = Some(event_rx);
        self._thread = Some(handle);
        Ok(())
    }

    fn send(&mut self, msg: &str) -> SyncResult<()> {
        match self.cmd_tx {
            Some(ref tx) => tx
                .send(WsCommand::Send(msg.to_string()))
                .map_err(|e| SyncError::TransportLost(e.to_string())),
            None => Err(SyncError::TransportLost("Not connected".to_string())),
        }
    }

    fn poll_events(&mut self) -> Vec<TransportEvent> {
        let mut events = Vec::new();
        let mut finished = false;
        if let Some(ref rx) = self.event_rx {
            loop {
                match rx.try_recv() {
                    Ok(event) => events.push(event),
                    Err(TryRecvError::Empty) => break,
                    Err(TryRecvError::Disconnected) => {
                        finished = true;
                        break;
                    }
                }
            }
        }
        // The thread has exited after reporting its final event.
        if finished {
            self.cmd_tx = None;
            self.event_rx = None;
            self._thread = None;
        }
        events
    }

    fn disconnect(&mut self) {
        if let Some(tx) = self.cmd_tx.take() {
            let _ = tx.send(WsCommand::Close);
        }
        self.event_rx = None;
        self._thread = None;
    }
}

impl Drop for NativeWebSocket {
    fn drop(&mut self) {
        self.disconnect();
    }
}

/// Poll interval of the socket thread while idle.
const READ_TIMEOUT: Duration = Duration::from_millis(50);
const WRITE_TIMEOUT: Duration = Duration::from_secs(5);

type Socket = tungstenite::WebSocket<MaybeTlsStream<TcpStream>>;

/// Why the socket thread stopped.
enum Exit {
    /// The owner asked to close or went away; nothing is reported.
    Requested,
    /// The peer closed the connection.
    Closed,
    /// Reading or writing failed.
    Failed(String),
}

/// Body of the WebSocket thread.
fn run_socket(url: &str, cmd_rx: Receiver<WsCommand>, event_tx: Sender<TransportEvent>) {
    let mut socket = match connect(url) {
        Ok((socket, response)) => {
            log::info!("Connected to {} ({})", url, response.status());
            socket
        }
        Err(e) => {
            log::error!("Could not connect to {}: {}", url, e);
            let _ = event_tx.send(TransportEvent::Failed(e.to_string()));
            return;
        }
    };
    if let MaybeTlsStream::Plain(tcp) = socket.get_mut() {
        let _ = tcp.set_read_timeout(Some(READ_TIMEOUT));
        let _ = tcp.set_write_timeout(Some(WRITE_TIMEOUT));
    }
    let _ = event_tx.send(TransportEvent::Opened);

    let exit = loop {
        if let Some(exit) = drain_commands(&mut socket, &cmd_rx) {
            break exit;
        }
        if let Some(exit) = read_frame(&mut socket, &event_tx) {
            break exit;
        }
    };

    match exit {
        Exit::Requested => log::debug!("Socket to {} closed by owner", url),
        Exit::Closed => {
            log::info!("Server closed the connection");
            let _ = event_tx.send(TransportEvent::Closed);
        }
        Exit::Failed(reason) => {
            log::warn!("Connection to {} lost: {}", url, reason);
            let _ = event_tx.send(TransportEvent::Failed(reason));
        }
    }
}

/// Write every queued outgoing frame.
fn drain_commands(socket: &mut Socket, cmd_rx: &Receiver<WsCommand>) -> Option<Exit> {
    loop {
        match cmd_rx.try_recv() {
            Ok(WsCommand::Send(text)) => {
                log::trace!("-> {} bytes", text.len());
                if let Err(e) = socket.send(Message::Text(text)) {
                    return Some(Exit::Failed(format!("send failed: {}", e)));
                }
            }
            Ok(WsCommand::Close) => {
                let _ = socket.close(None);
                let _ = socket.flush();
                return Some(Exit::Requested);
            }
            Err(TryRecvError::Disconnected) => return Some(Exit::Requested),
            Err(TryRecvError::Empty) => return None,
        }
    }
}

/// Wait up to the read timeout for one inbound frame.
fn read_frame(socket: &mut Socket, event_tx: &Sender<TransportEvent>) -> Option<Exit> {
    match socket.read() {
        Ok(Message::Text(text)) => {
            log::trace!("<- {} bytes", text.len());
            if event_tx.send(TransportEvent::Text(text)).is_err() {
                return Some(Exit::Requested);
            }
            None
        }
        Ok(Message::Close(_)) | Err(tungstenite::Error::ConnectionClosed) => Some(Exit::Closed),
        // Pings are answered by tungstenite on the next read or flush.
        Ok(_) => None,
        Err(tungstenite::Error::Io(e)) if matches!(e.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut) => None,
        Err(e) => Some(Exit::Failed(e.to_string())),
    }
}
