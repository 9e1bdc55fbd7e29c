//! Terminal view for a PixelDuo room.
//!
//! Reads edit commands from stdin, mirrors the room's grid and keeps the
//! connection alive across server restarts.

mod commands;

use std::io::BufRead;
use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Receiver, TryRecvError};
use std::thread;
use std::time::{Duration, Instant};

use clap::Parser;
use pixelduo_core::export::{encode_png, EXPORT_CELL_SIZE};
use pixelduo_core::{
    ConnectionSupervisor, Grid, GridError, NativeWebSocket, SupervisorState, SyncEvent, ViewSession,
};

use commands::{Command, HELP};

/// Interval between supervisor ticks.
const TICK: Duration = Duration::from_millis(50);

/// Join a shared PixelDuo grid
#[derive(Debug, Parser)]
#[command(name = "pixelduo-view", version, about)]
struct Args {
    /// Relay server WebSocket URL
    #[arg(long, env = "PIXELDUO_URL", default_value = "ws://127.0.0.1:3000/ws")]
    url: String,

    /// Room to join
    #[arg(long)]
    room: String,

    /// Name shown to the other member
    #[arg(long)]
    user: String,
}

fn main() {
    env_logger::init();
    let args = Args::parse();
    if args.room.trim().is_empty() || args.user.trim().is_empty() {
        eprintln!("Invalid room or username");
        std::process::exit(2);
    }

    log::info!("Starting PixelDuo view for {} in room {}", args.user, args.room);
    println!("Room: {}  (type `help` for commands)", args.room);

    let mut session = ViewSession::new(args.room, args.user);
    let mut supervisor = ConnectionSupervisor::new(args.url, NativeWebSocket::new());
    let input = spawn_stdin_reader();
    let mut pending_export: Option<PathBuf> = None;
    let mut last_state = supervisor.state();

    supervisor.start(&mut session, Instant::now());

    loop {
        loop {
            match input.try_recv() {
                Ok(line) if line.trim().is_empty() => {}
                Ok(line) => match commands::parse(&line) {
                    Ok(Command::Quit) => {
                        supervisor.shutdown();
                        return;
                    }
                    Ok(cmd) => run_command(&mut session, cmd, &mut pending_export),
                    Err(e) => println!("{}", e),
                },
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    supervisor.shutdown();
                    return;
                }
            }
        }

        for event in supervisor.tick(&mut session, Instant::now()) {
            match event {
                SyncEvent::Joined { user_count } => println!("Canvas loaded ({}/2)", user_count),
                SyncEvent::PeerJoined { user_id, user_count } => {
                    println!("{} joined ({}/2)", user_id, user_count)
                }
                SyncEvent::PeerLeft { user_id, user_count } => {
                    println!("{} left ({}/2)", user_id, user_count)
                }
                SyncEvent::Cleared => println!("Canvas cleared"),
                SyncEvent::Rejected { message } => {
                    println!("{}", message);
                    supervisor.shutdown();
                    std::process::exit(1);
                }
                SyncEvent::ExportReady { canvas } => {
                    if let Some(path) = pending_export.take() {
                        write_png(&canvas, &path);
                    }
                }
                SyncEvent::RemoteDraw { .. } | SyncEvent::RemoteFill => {}
            }
        }

        let state = supervisor.state();
        if !same_phase(state, last_state) {
            println!("{}", describe(state));
            last_state = state;
        }

        thread::sleep(TICK);
    }
}

/// Forward stdin lines to the view loop.
fn spawn_stdin_reader() -> Receiver<String> {
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        let stdin = std::io::stdin();
        for line in stdin.lock().lines() {
            let Ok(line) = line else { break };
            if tx.send(line).is_err() {
                break;
            }
        }
    });
    rx
}

fn run_command(session: &mut ViewSession, cmd: Command, pending_export: &mut Option<PathBuf>) {
    let result: Result<(), GridError> = match cmd {
        Command::Draw { row, col, color } => session.draw(row, col, Some(color)),
        Command::Erase { row, col } => session.draw(row, col, None),
        Command::Fill { row, col, color } => session.fill(row, col, Some(color)).map(drop),
        Command::Click { row, col } => session.apply_tool(row, col).map(drop),
        Command::SetTool(tool) => {
            session.set_tool(tool);
            Ok(())
        }
        Command::SetColor(color) => {
            session.set_color(color);
            Ok(())
        }
        Command::Undo => {
            session.undo();
            Ok(())
        }
        Command::Redo => {
            session.redo();
            Ok(())
        }
        Command::Clear => {
            session.clear();
            Ok(())
        }
        Command::Export(path) => {
            *pending_export = Some(path);
            session.request_export();
            Ok(())
        }
        Command::Show => {
            print_grid(session.grid());
            Ok(())
        }
        Command::Log => {
            for entry in session.activity() {
                println!("  {}", entry);
            }
            Ok(())
        }
        Command::Help => {
            println!("{}", HELP);
            Ok(())
        }
        Command::Quit => Ok(()),
    };

    if let Err(e) = result {
        println!("{}", e);
    }
}

fn print_grid(grid: &Grid) {
    for row in grid.rows() {
        let line: String = row.iter().map(|cell| if cell.is_some() { '#' } else { '.' }).collect();
        println!("{}", line);
    }
}

fn write_png(grid: &Grid, path: &Path) {
    match encode_png(grid, EXPORT_CELL_SIZE) {
        Ok(bytes) => match std::fs::write(path, bytes) {
            Ok(()) => println!("Canvas exported to {}", path.display()),
            Err(e) => log::error!("Failed to write {}: {}", path.display(), e),
        },
        Err(e) => log::error!("Failed to encode PNG: {}", e),
    }
}

fn same_phase(a: SupervisorState, b: SupervisorState) -> bool {
    std::mem::discriminant(&a) == std::mem::discriminant(&b)
}

fn describe(state: SupervisorState) -> &'static str {
    match state {
        SupervisorState::Idle => "Idle",
        SupervisorState::Connecting => "Connecting...",
        SupervisorState::Joining => "Joining...",
        SupervisorState::Synced => "Connected",
        SupervisorState::Disconnected { .. } => "Disconnected, reconnecting in 3s",
        SupervisorState::Rejected => "Rejected",
    }
}
