//! The single match hosted by a server process
//!
//! `Session` bundles the tile board and the player registry behind one
//! value so that a single guard covers both. Every phase change is also
//! published on a `watch` channel, which the listener uses to stop
//! accepting once the match starts and to notice when it is over.

use crate::board::TileBoard;
use crate::config::ServerConfig;
use crate::error::SessionError;
use crate::registry::{SessionPhase, SessionRegistry};
use log::info;
use shared::PlayerId;
use std::net::SocketAddr;
use tokio::sync::watch;

/// Outcome of removing a player from the session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Departure {
    /// Drawing claims returned to free
    pub released: usize,
    /// The last player left a running match, which ended it
    pub abandoned: bool,
}

/// Board, seats and phase of the match, guarded together
pub struct Session {
    board: TileBoard,
    registry: SessionRegistry,
    /// Seats covered by the final scores, fixed when the match starts
    match_size: usize,
    phase_tx: watch::Sender<SessionPhase>,
}

impl Session {
    /// Creates an empty session in the lobby with an all-free board
    pub fn new(rows: usize, cols: usize, max_players: usize) -> Self {
        let (phase_tx, _) = watch::channel(SessionPhase::Lobby);
        Self {
            board: TileBoard::new(rows, cols, max_players),
            registry: SessionRegistry::new(max_players),
            match_size: 0,
            phase_tx,
        }
    }

    /// Creates a session sized by the server configuration
    pub fn from_config(config: &ServerConfig) -> Self {
        Self::new(config.rows, config.cols, config.max_players)
    }

    /// Returns a receiver that observes every phase change
    pub fn subscribe(&self) -> watch::Receiver<SessionPhase> {
        self.phase_tx.subscribe()
    }

    pub fn phase(&self) -> SessionPhase {
        self.registry.phase()
    }

    pub fn board(&self) -> &TileBoard {
        &self.board
    }

    pub fn board_mut(&mut self) -> &mut TileBoard {
        &mut self.board
    }

    pub fn registry(&self) -> &SessionRegistry {
        &self.registry
    }

    pub fn player_count(&self) -> usize {
        self.registry.len()
    }

    /// Seats a new player; fails once the lobby is closed or full
    pub fn register(&mut self, addr: SocketAddr) -> Result<PlayerId, SessionError> {
        self.registry.register(addr)
    }

    /// Removes a player and releases every tile they were drawing
    ///
    /// Returns None if the player was not registered, which makes repeated
    /// cleanup of the same connection harmless.
    pub fn unregister(&mut self, id: PlayerId) -> Option<Departure> {
        self.registry.unregister(id)?;
        let released = self.board.release_player(id);

        let abandoned = self.phase() == SessionPhase::Active && self.registry.is_empty();
        if abandoned {
            info!("Last player left a running match, ending it without scores");
            self.close_match();
        }

        Some(Departure {
            released,
            abandoned,
        })
    }

    /// Closes the lobby; returns the number of players in the match
    ///
    /// Seats are handed out lowest-free first, so the highest seated id
    /// bounds the players whose scores the `end` message carries.
    pub fn start_game(&mut self) -> Result<usize, SessionError> {
        self.registry.start_game()?;
        self.match_size = self.registry.player_ids().last().map_or(0, |id| id + 1);
        self.publish();
        Ok(self.registry.len())
    }

    /// Ends the running match and returns the final scores
    ///
    /// Scores are indexed by player id, one per seat in the match. Seats are
    /// freed and the board is cleared, leaving the session ready to be
    /// reopened.
    pub fn end_game(&mut self) -> Result<Vec<u32>, SessionError> {
        if self.phase() != SessionPhase::Active {
            return Err(SessionError::InvalidPhase {
                action: "end the game",
                phase: self.phase(),
            });
        }
        let mut scores = self.board.player_scores();
        scores.truncate(self.match_size);
        self.close_match();
        info!("Match ended with scores {:?}", scores);
        Ok(scores)
    }

    fn close_match(&mut self) {
        if self.registry.end_game().is_ok() {
            self.board.reset();
            self.publish();
        }
    }

    /// Ends the match if the board has no free or drawing tiles left
    ///
    /// A board completed before anyone issued `start` starts the match
    /// first, so the phase still moves through `Active`. Returns the final
    /// scores exactly once per match.
    pub fn finish_if_complete(&mut self) -> Option<Vec<u32>> {
        if !self.board.all_tiles_captured() {
            return None;
        }
        if self.phase() == SessionPhase::Lobby {
            self.start_game().ok()?;
        }
        self.end_game().ok()
    }

    /// Returns an ended session to a fresh lobby
    pub fn reopen(&mut self) -> Result<(), SessionError> {
        self.registry.reopen()?;
        self.board.reset();
        self.match_size = 0;
        self.publish();
        Ok(())
    }

    fn publish(&self) {
        self.phase_tx.send_replace(self.registry.phase());
    }
}
