//! Player registration and session phase tracking
//!
//! This module handles the seats of the single match hosted by the server:
//! - Identifier assignment (lowest free seat in `0..max_players`)
//! - Capacity enforcement and refusal outside the lobby
//! - The strict `Lobby -> Active -> Ended` phase progression
//!
//! The registry knows nothing about tiles; releasing a leaving player's
//! claims is done by the session, which owns both the registry and the board.

use crate::error::{Refusal, SessionError};
use log::info;
use shared::{player_color, PlayerId};
use std::collections::BTreeMap;
use std::fmt;
use std::net::SocketAddr;
use std::time::Instant;

/// Lifecycle phase of the match
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    /// Accepting players; nobody has issued `start` yet.
    Lobby,
    /// Match running; no new players.
    Active,
    /// Match over; waiting for teardown.
    Ended,
}

impl fmt::Display for SessionPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SessionPhase::Lobby => "in lobby",
            SessionPhase::Active => "active",
            SessionPhase::Ended => "ended",
        };
        f.write_str(name)
    }
}

/// A seated player
#[derive(Debug, Clone)]
pub struct Player {
    pub id: PlayerId,
    pub addr: SocketAddr,
    pub color: &'static str,
    pub joined_at: Instant,
}

impl Player {
    pub fn new(id: PlayerId, addr: SocketAddr) -> Self {
        Self {
            id,
            addr,
            color: player_color(id),
            joined_at: Instant::now(),
        }
    }
}

/// Seats and phase of the match
pub struct SessionRegistry {
    players: BTreeMap<PlayerId, Player>,
    max_players: usize,
    phase: SessionPhase,
}

impl SessionRegistry {
    /// Creates an empty registry in the lobby phase
    pub fn new(max_players: usize) -> Self {
        Self {
            players: BTreeMap::new(),
            max_players,
            phase: SessionPhase::Lobby,
        }
    }

    /// Seats a new player and returns their identifier
    ///
    /// The identifier is the lowest seat not currently taken, so a seat freed
    /// by a disconnect in the lobby is handed to the next arrival. Fails with
    /// `SessionFull` when every seat is taken or the lobby has closed.
    pub fn register(&mut self, addr: SocketAddr) -> Result<PlayerId, SessionError> {
        if self.phase != SessionPhase::Lobby {
            return Err(SessionError::SessionFull(Refusal::NotInLobby(self.phase)));
        }

        let id = (0..self.max_players)
            .find(|id| !self.players.contains_key(id))
            .ok_or(SessionError::SessionFull(Refusal::AtCapacity {
                max_players: self.max_players,
            }))?;

        let player = Player::new(id, addr);
        info!("Player {} ({}) joined from {}", id, player.color, addr);
        self.players.insert(id, player);

        Ok(id)
    }

    /// Frees a player's seat
    ///
    /// Returns the removed player, or None if the seat was already empty.
    pub fn unregister(&mut self, id: PlayerId) -> Option<Player> {
        let player = self.players.remove(&id)?;
        info!(
            "Player {} left after {:.1}s",
            id,
            player.joined_at.elapsed().as_secs_f32()
        );
        Some(player)
    }

    /// Closes the lobby and starts the match
    pub fn start_game(&mut self) -> Result<(), SessionError> {
        self.transition("start the game", SessionPhase::Lobby, SessionPhase::Active)
    }

    /// Ends the running match and frees every seat
    pub fn end_game(&mut self) -> Result<(), SessionError> {
        self.transition("end the game", SessionPhase::Active, SessionPhase::Ended)?;
        self.players.clear();
        Ok(())
    }

    /// Returns an ended session to a fresh lobby
    pub fn reopen(&mut self) -> Result<(), SessionError> {
        self.transition("reopen the lobby", SessionPhase::Ended, SessionPhase::Lobby)?;
        self.players.clear();
        Ok(())
    }

    fn transition(
        &mut self,
        action: &'static str,
        from: SessionPhase,
        to: SessionPhase,
    ) -> Result<(), SessionError> {
        if self.phase != from {
            return Err(SessionError::InvalidPhase {
                action,
                phase: self.phase,
            });
        }
        info!("Session phase {:?} -> {:?}", from, to);
        self.phase = to;
        Ok(())
    }

    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    pub fn player(&self, id: PlayerId) -> Option<&Player> {
        self.players.get(&id)
    }

    pub fn player_ids(&self) -> Vec<PlayerId> {
        self.players.keys().copied().collect()
    }

    pub fn max_players(&self) -> usize {
        self.max_players
    }

    /// Returns the number of seated players
    pub fn len(&self) -> usize {
        self.players.len()
    }

    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }
}
