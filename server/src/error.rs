//! Error types for the session server

use crate::registry::SessionPhase;
use std::fmt;
use thiserror::Error;

/// Why a registration was refused
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Refusal {
    AtCapacity { max_players: usize },
    NotInLobby(SessionPhase),
}

impl fmt::Display for Refusal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Refusal::AtCapacity { max_players } => {
                write!(f, "all {} seats are taken", max_players)
            }
            Refusal::NotInLobby(phase) => write!(f, "session is {}", phase),
        }
    }
}

/// Failures of session lifecycle operations
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    #[error("session full: {0}")]
    SessionFull(Refusal),
    #[error("cannot {action} while session is {phase}")]
    InvalidPhase {
        action: &'static str,
        phase: SessionPhase,
    },
}

/// Fatal server errors
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid configuration: {0}")]
    Config(String),
    #[error(transparent)]
    Session(#[from] SessionError),
}
