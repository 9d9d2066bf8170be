//! Server configuration

use crate::error::ServerError;
use shared::{
    DEFAULT_BOARD_COLS, DEFAULT_BOARD_ROWS, DEFAULT_HEARTBEAT_MS, DEFAULT_MAX_PLAYERS,
    DEFAULT_PORT,
};
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub max_players: usize,
    pub rows: usize,
    pub cols: usize,
    /// How often the health monitor sweeps for dead connections
    pub heartbeat_interval: Duration,
    /// Reopen the lobby after a match instead of exiting
    pub rematch: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: DEFAULT_PORT,
            max_players: DEFAULT_MAX_PLAYERS,
            rows: DEFAULT_BOARD_ROWS,
            cols: DEFAULT_BOARD_COLS,
            heartbeat_interval: Duration::from_millis(DEFAULT_HEARTBEAT_MS),
            rematch: false,
        }
    }
}

impl ServerConfig {
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Rejects configurations the server cannot run with
    pub fn validate(&self) -> Result<(), ServerError> {
        if self.max_players == 0 {
            return Err(ServerError::Config("max players must be at least 1".into()));
        }
        if self.rows == 0 || self.cols == 0 {
            return Err(ServerError::Config(format!(
                "board must have at least one tile, got {}x{}",
                self.rows, self.cols
            )));
        }
        if self.heartbeat_interval.is_zero() {
            return Err(ServerError::Config(
                "heartbeat interval must be positive".into(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ServerConfig::default();
        assert_eq!(config.port, 3000);
        assert_eq!(config.max_players, 4);
        assert_eq!((config.rows, config.cols), (8, 8));
        assert_eq!(config.heartbeat_interval, Duration::from_secs(5));
        assert_eq!(config.address(), "127.0.0.1:3000");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validation_rejects_degenerate_values() {
        let no_players = ServerConfig {
            max_players: 0,
            ..ServerConfig::default()
        };
        assert!(matches!(no_players.validate(), Err(ServerError::Config(_))));

        let empty_board = ServerConfig {
            cols: 0,
            ..ServerConfig::default()
        };
        assert!(matches!(empty_board.validate(), Err(ServerError::Config(_))));

        let no_heartbeat = ServerConfig {
            heartbeat_interval: Duration::ZERO,
            ..ServerConfig::default()
        };
        assert!(matches!(no_heartbeat.validate(), Err(ServerError::Config(_))));
    }
}
