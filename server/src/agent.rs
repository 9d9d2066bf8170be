//! Per-connection protocol handling
//!
//! A `ConnectionAgent` is spawned for every registered connection. It
//! moves through three stages:
//! - Connecting: joins the broadcaster and sends `playerID <id>`
//! - Active: decodes one line at a time and applies it to the session
//! - Closed: on end of stream, read failure or a disconnect request it
//!   releases the player's tiles and leaves the session
//!
//! Outgoing lines go through an unbounded queue drained by a dedicated
//! writer task, so a blocked or failed write never stalls command handling.

use crate::broadcast::{AgentHandle, Liveness};
use crate::network::ServerState;
use crate::registry::SessionPhase;
use log::{debug, info, warn};
use shared::{Command, PlayerId, ProtocolError, ServerMessage};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tokio::sync::mpsc;

/// Server side of one player's connection
pub struct ConnectionAgent {
    id: PlayerId,
    addr: SocketAddr,
    state: Arc<ServerState>,
}

impl ConnectionAgent {
    pub fn new(id: PlayerId, addr: SocketAddr, state: Arc<ServerState>) -> Self {
        Self { id, addr, state }
    }

    /// Serves the connection until it closes or the session tears it down
    pub async fn run(self, stream: TcpStream) {
        let (reader, writer) = stream.into_split();
        let (tx, rx) = mpsc::unbounded_channel();
        let handle = AgentHandle::new(self.id, tx);
        let writer_task = tokio::spawn(write_loop(self.id, writer, rx, handle.liveness()));

        if self.join(&handle).await {
            handle.send(&ServerMessage::PlayerId(self.id));
            info!("Player {} connected from {}", self.id, self.addr);
            self.serve(&handle, reader).await;
        } else {
            info!("Match ended before player {} could join", self.id);
        }

        if let Some(departure) = self.state.evict(self.id).await {
            debug!(
                "Player {} cleanup released {} tiles",
                self.id, departure.released
            );
        }

        // The writer flushes whatever is still queued once every sender is gone
        drop(handle);
        if let Err(e) = writer_task.await {
            warn!("Writer for player {} panicked: {}", self.id, e);
        }
    }

    /// Adds the handle to the broadcaster unless the match already ended
    ///
    /// Checked under the session guard so a teardown can never miss the
    /// handle.
    async fn join(&self, handle: &AgentHandle) -> bool {
        let session = self.state.session.lock().await;
        if session.phase() == SessionPhase::Ended {
            return false;
        }
        self.state.broadcaster.add(handle.clone()).await;
        true
    }

    async fn serve(&self, handle: &AgentHandle, reader: OwnedReadHalf) {
        let mut lines = BufReader::new(reader).lines();
        loop {
            tokio::select! {
                _ = handle.disconnected() => {
                    debug!("Player {} asked to disconnect", self.id);
                    break;
                }
                line = lines.next_line() => match line {
                    Ok(Some(line)) => self.handle_line(handle, &line).await,
                    Ok(None) => {
                        info!("Player {} closed the connection", self.id);
                        break;
                    }
                    Err(e) => {
                        warn!("Read from player {} failed: {}", self.id, e);
                        handle.mark_dead();
                        break;
                    }
                },
            }
        }
    }

    async fn handle_line(&self, handle: &AgentHandle, line: &str) {
        let command = match line.parse::<Command>() {
            Ok(command) => command,
            Err(ProtocolError::Empty) => return,
            Err(e) => {
                warn!("Ignoring line from player {} {:?}: {}", self.id, line, e);
                return;
            }
        };

        debug!("Player {} sent: {}", self.id, command);
        if let Err(e) = self.dispatch(handle, command).await {
            warn!("Ignoring command from player {}: {}", self.id, e);
        }
    }

    /// Applies one command to the session and notifies peers
    ///
    /// The session guard is held while broadcasting, so every agent
    /// observes relays in the same order the board applied them.
    async fn dispatch(&self, handle: &AgentHandle, command: Command) -> Result<(), ProtocolError> {
        let mut session = self.state.session.lock().await;
        let broadcaster = &self.state.broadcaster;

        if let Some(claimed) = command.player() {
            if claimed != self.id {
                return Err(ProtocolError::WrongPlayer {
                    claimed,
                    actual: self.id,
                });
            }
        }
        if let Some((x, y)) = command.tile() {
            if !session.board().in_bounds(x, y) {
                return Err(ProtocolError::OutOfBounds { x, y });
            }
            if session.phase() == SessionPhase::Ended {
                debug!("Match is over, dropping {} from player {}", command, self.id);
                return Ok(());
            }
        }

        let relay = ServerMessage::Relay(command);
        match command {
            Command::Draw { x, y, player } => {
                if session.board_mut().attempt_draw_tile(x, y, player) {
                    broadcaster.send_to_others(self.id, &relay).await;
                } else {
                    debug!("Player {} lost the race for tile ({}, {})", player, x, y);
                    handle.send(&ServerMessage::DrawError);
                }
            }
            Command::Capture { x, y, player } => {
                if !session.board_mut().attempt_capture_tile(x, y, player) {
                    debug!("Player {} cannot capture tile ({}, {})", player, x, y);
                    handle.send(&ServerMessage::CaptureError);
                    return Ok(());
                }
                broadcaster.send_to_others(self.id, &relay).await;

                if let Some(scores) = session.finish_if_complete() {
                    info!("Board fully captured, final scores {:?}", scores);
                    broadcaster
                        .send_to_all(&ServerMessage::End { scores })
                        .await;
                    broadcaster.disconnect_all().await;
                }
            }
            Command::EndDraw { x, y, player } => {
                session.board_mut().release_tile(x, y, player);
                broadcaster.send_to_others(self.id, &relay).await;
            }
            Command::Cursor { .. } => {
                broadcaster.send_to_others(self.id, &relay).await;
            }
            Command::Start => match session.start_game() {
                Ok(player_count) => {
                    info!(
                        "Player {} started the match with {} players",
                        self.id, player_count
                    );
                    broadcaster
                        .send_to_others(self.id, &ServerMessage::Start { player_count })
                        .await;
                }
                Err(e) => warn!("Player {} cannot start: {}", self.id, e),
            },
        }

        Ok(())
    }
}

/// Drains the agent's queue onto the socket
async fn write_loop(
    id: PlayerId,
    mut writer: OwnedWriteHalf,
    mut rx: mpsc::UnboundedReceiver<String>,
    liveness: Liveness,
) {
    while let Some(line) = rx.recv().await {
        let result = async {
            writer.write_all(line.as_bytes()).await?;
            writer.write_all(b"\n").await?;
            writer.flush().await
        }
        .await;

        if let Err(e) = result {
            warn!("Write to player {} failed: {}", id, e);
            liveness.mark_dead();
            return;
        }
    }
    if let Err(e) = writer.shutdown().await {
        debug!("Shutdown of connection to player {} failed: {}", id, e);
    }
}
