//! Wire protocol shared by the tile-capture server and its clients.
//!
//! Every message is one line of UTF-8 text, fields separated by spaces.
//! Clients send [`Command`]s; the server answers with [`ServerMessage`]s,
//! which include verbatim relays of other players' commands.

use std::fmt;
use std::str::FromStr;
use thiserror::Error;

pub const DEFAULT_PORT: u16 = 3000;
pub const DEFAULT_MAX_PLAYERS: usize = 4;
pub const DEFAULT_BOARD_ROWS: usize = 8;
pub const DEFAULT_BOARD_COLS: usize = 8;
pub const DEFAULT_HEARTBEAT_MS: u64 = 5000;

pub const PLAYER_COLORS: [&str; 4] = ["blue", "red", "green", "yellow"];

pub const DRAW: &str = "draw";
pub const END_DRAW: &str = "endDraw";
pub const CAPTURE: &str = "capture";
pub const CURSOR: &str = "cursor";
pub const START: &str = "start";
pub const END: &str = "end";
pub const PLAYER_ID: &str = "playerID";
pub const DRAW_ERROR: &str = "drawError";
pub const CAPTURE_ERROR: &str = "captureError";

/// Session-scoped player identifier, 0-based and dense.
pub type PlayerId = usize;

/// Returns the palette color for a player, wrapping past the palette length.
pub fn player_color(id: PlayerId) -> &'static str {
    PLAYER_COLORS[id % PLAYER_COLORS.len()]
}

/// Errors produced while decoding a protocol line
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProtocolError {
    #[error("empty line")]
    Empty,
    #[error("unknown command `{0}`")]
    UnknownCommand(String),
    #[error("`{command}` expects {expected} fields, got {found}")]
    FieldCount {
        command: &'static str,
        expected: usize,
        found: usize,
    },
    #[error("`{command}` field `{field}` is not a valid number: `{value}`")]
    InvalidNumber {
        command: &'static str,
        field: &'static str,
        value: String,
    },
    #[error("tile ({x}, {y}) is outside the board")]
    OutOfBounds { x: usize, y: usize },
    #[error("player {claimed} does not match the sender's id {actual}")]
    WrongPlayer { claimed: PlayerId, actual: PlayerId },
}

/// A command sent by a client
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Draw {
        x: usize,
        y: usize,
        player: PlayerId,
    },
    EndDraw {
        x: usize,
        y: usize,
        player: PlayerId,
    },
    Capture {
        x: usize,
        y: usize,
        player: PlayerId,
    },
    /// Pointer position; relayed to peers without touching the board.
    Cursor { x: i32, y: i32 },
    Start,
}

impl Command {
    /// Player field of a tile command, if the command carries one.
    pub fn player(&self) -> Option<PlayerId> {
        match *self {
            Command::Draw { player, .. }
            | Command::EndDraw { player, .. }
            | Command::Capture { player, .. } => Some(player),
            Command::Cursor { .. } | Command::Start => None,
        }
    }

    /// Tile coordinates of a tile command.
    pub fn tile(&self) -> Option<(usize, usize)> {
        match *self {
            Command::Draw { x, y, .. }
            | Command::EndDraw { x, y, .. }
            | Command::Capture { x, y, .. } => Some((x, y)),
            Command::Cursor { .. } | Command::Start => None,
        }
    }
}

fn expect_fields(
    command: &'static str,
    fields: &[&str],
    expected: usize,
) -> Result<(), ProtocolError> {
    if fields.len() != expected {
        return Err(ProtocolError::FieldCount {
            command,
            expected,
            found: fields.len(),
        });
    }
    Ok(())
}

fn number<T: FromStr>(
    command: &'static str,
    field: &'static str,
    value: &str,
) -> Result<T, ProtocolError> {
    value.parse().map_err(|_| ProtocolError::InvalidNumber {
        command,
        field,
        value: value.to_string(),
    })
}

fn tile_fields(
    command: &'static str,
    fields: &[&str],
) -> Result<(usize, usize, PlayerId), ProtocolError> {
    expect_fields(command, fields, 3)?;
    Ok((
        number(command, "x", fields[0])?,
        number(command, "y", fields[1])?,
        number(command, "playerId", fields[2])?,
    ))
}

impl FromStr for Command {
    type Err = ProtocolError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let mut tokens = line.split_whitespace();
        let keyword = tokens.next().ok_or(ProtocolError::Empty)?;
        let fields: Vec<&str> = tokens.collect();

        match keyword {
            DRAW => {
                let (x, y, player) = tile_fields(DRAW, &fields)?;
                Ok(Command::Draw { x, y, player })
            }
            END_DRAW => {
                let (x, y, player) = tile_fields(END_DRAW, &fields)?;
                Ok(Command::EndDraw { x, y, player })
            }
            CAPTURE => {
                let (x, y, player) = tile_fields(CAPTURE, &fields)?;
                Ok(Command::Capture { x, y, player })
            }
            CURSOR => {
                expect_fields(CURSOR, &fields, 2)?;
                Ok(Command::Cursor {
                    x: number(CURSOR, "x", fields[0])?,
                    y: number(CURSOR, "y", fields[1])?,
                })
            }
            START => {
                expect_fields(START, &fields, 0)?;
                Ok(Command::Start)
            }
            other => Err(ProtocolError::UnknownCommand(other.to_string())),
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Command::Draw { x, y, player } => write!(f, "{} {} {} {}", DRAW, x, y, player),
            Command::EndDraw { x, y, player } => {
                write!(f, "{} {} {} {}", END_DRAW, x, y, player)
            }
            Command::Capture { x, y, player } => {
                write!(f, "{} {} {} {}", CAPTURE, x, y, player)
            }
            Command::Cursor { x, y } => write!(f, "{} {} {}", CURSOR, x, y),
            Command::Start => f.write_str(START),
        }
    }
}

/// A line sent by the server
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServerMessage {
    /// First line on every accepted connection.
    PlayerId(PlayerId),
    DrawError,
    CaptureError,
    Start { player_count: usize },
    /// Final scores, indexed by player identifier.
    End { scores: Vec<u32> },
    /// Another player's command, re-encoded.
    Relay(Command),
}

impl FromStr for ServerMessage {
    type Err = ProtocolError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let mut tokens = line.split_whitespace();
        let keyword = tokens.next().ok_or(ProtocolError::Empty)?;
        let fields: Vec<&str> = tokens.collect();

        match keyword {
            PLAYER_ID => {
                expect_fields(PLAYER_ID, &fields, 1)?;
                Ok(ServerMessage::PlayerId(number(PLAYER_ID, "id", fields[0])?))
            }
            DRAW_ERROR => Ok(ServerMessage::DrawError),
            CAPTURE_ERROR => Ok(ServerMessage::CaptureError),
            START => {
                expect_fields(START, &fields, 1)?;
                Ok(ServerMessage::Start {
                    player_count: number(START, "playerCount", fields[0])?,
                })
            }
            END => {
                let scores = fields
                    .iter()
                    .map(|score| number(END, "score", score))
                    .collect::<Result<Vec<u32>, _>>()?;
                Ok(ServerMessage::End { scores })
            }
            _ => line.parse().map(ServerMessage::Relay),
        }
    }
}

impl fmt::Display for ServerMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ServerMessage::PlayerId(id) => write!(f, "{} {}", PLAYER_ID, id),
            ServerMessage::DrawError => f.write_str(DRAW_ERROR),
            ServerMessage::CaptureError => f.write_str(CAPTURE_ERROR),
            ServerMessage::Start { player_count } => write!(f, "{} {}", START, player_count),
            ServerMessage::End { scores } => {
                f.write_str(END)?;
                for score in scores {
                    write!(f, " {}", score)?;
                }
                Ok(())
            }
            ServerMessage::Relay(command) => command.fmt(f),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_tile_commands() {
        assert_eq!(
            "draw 1 2 3".parse::<Command>(),
            Ok(Command::Draw {
                x: 1,
                y: 2,
                player: 3
            })
        );
        assert_eq!(
            "endDraw 0 7 1".parse::<Command>(),
            Ok(Command::EndDraw {
                x: 0,
                y: 7,
                player: 1
            })
        );
        assert_eq!(
            "capture 4 4 0".parse::<Command>(),
            Ok(Command::Capture {
                x: 4,
                y: 4,
                player: 0
            })
        );
    }

    #[test]
    fn test_parse_cursor_allows_negative_coordinates() {
        assert_eq!(
            "cursor -5 120".parse::<Command>(),
            Ok(Command::Cursor { x: -5, y: 120 })
        );
    }

    #[test]
    fn test_parse_tolerates_extra_whitespace() {
        assert_eq!("  start \r".parse::<Command>(), Ok(Command::Start));
        assert_eq!(
            "draw  1   2 0".parse::<Command>(),
            Ok(Command::Draw {
                x: 1,
                y: 2,
                player: 0
            })
        );
    }

    #[test]
    fn test_parse_rejects_malformed_lines() {
        assert_eq!("".parse::<Command>(), Err(ProtocolError::Empty));
        assert_eq!("   ".parse::<Command>(), Err(ProtocolError::Empty));
        assert_eq!(
            "paint 1 1 1".parse::<Command>(),
            Err(ProtocolError::UnknownCommand("paint".to_string()))
        );
        assert_eq!(
            "draw 1 2".parse::<Command>(),
            Err(ProtocolError::FieldCount {
                command: DRAW,
                expected: 3,
                found: 2
            })
        );
        assert_eq!(
            "start now".parse::<Command>(),
            Err(ProtocolError::FieldCount {
                command: START,
                expected: 0,
                found: 1
            })
        );
        assert!(matches!(
            "capture a 2 0".parse::<Command>(),
            Err(ProtocolError::InvalidNumber { field: "x", .. })
        ));
        assert!(matches!(
            "draw -1 2 0".parse::<Command>(),
            Err(ProtocolError::InvalidNumber { field: "x", .. })
        ));
    }

    #[test]
    fn test_command_tokens_are_case_sensitive() {
        assert!(matches!(
            "enddraw 1 1 0".parse::<Command>(),
            Err(ProtocolError::UnknownCommand(_))
        ));
    }

    #[test]
    fn test_command_accessors() {
        let draw = Command::Draw {
            x: 2,
            y: 5,
            player: 1,
        };
        assert_eq!(draw.player(), Some(1));
        assert_eq!(draw.tile(), Some((2, 5)));
        assert_eq!(Command::Cursor { x: 1, y: 1 }.player(), None);
        assert_eq!(Command::Start.tile(), None);
    }

    #[test]
    fn test_server_message_encoding() {
        assert_eq!(ServerMessage::PlayerId(2).to_string(), "playerID 2");
        assert_eq!(ServerMessage::DrawError.to_string(), "drawError");
        assert_eq!(ServerMessage::CaptureError.to_string(), "captureError");
        assert_eq!(
            ServerMessage::Start { player_count: 3 }.to_string(),
            "start 3"
        );
        assert_eq!(
            ServerMessage::End {
                scores: vec![10, 6]
            }
            .to_string(),
            "end 10 6"
        );
        assert_eq!(
            ServerMessage::Relay(Command::Cursor { x: 3, y: -4 }).to_string(),
            "cursor 3 -4"
        );
    }

    #[test]
    fn test_server_message_decoding() {
        assert_eq!(
            "end 9 7 0".parse::<ServerMessage>(),
            Ok(ServerMessage::End {
                scores: vec![9, 7, 0]
            })
        );
        assert_eq!(
            "start 4".parse::<ServerMessage>(),
            Ok(ServerMessage::Start { player_count: 4 })
        );
        assert_eq!(
            "capture 1 1 2".parse::<ServerMessage>(),
            Ok(ServerMessage::Relay(Command::Capture {
                x: 1,
                y: 1,
                player: 2
            }))
        );
        assert!("playerID".parse::<ServerMessage>().is_err());
    }

    #[test]
    fn test_player_color_wraps() {
        assert_eq!(player_color(0), "blue");
        assert_eq!(player_color(3), "yellow");
        assert_eq!(player_color(4), "blue");
    }
}
