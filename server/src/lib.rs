//! # Tile Capture Session Server
//!
//! This library hosts a single match of the tile-capture drawing game. Up to
//! a fixed number of players connect over TCP, claim squares on a shared
//! grid, and the match ends with per-player scores once every square has
//! been captured.
//!
//! ## Core Responsibilities
//!
//! ### Authoritative Board
//! The server owns the only copy of the tile board. Clients ask to draw and
//! capture tiles; the server decides who wins each race and tells the
//! others.
//!
//! ### Session Lifecycle
//! A session moves strictly through `Lobby -> Active -> Ended`:
//! - Lobby: connections are accepted and seated
//! - Active: a player issued `start`; the listener is closed
//! - Ended: the board is full; scores are sent and connections torn down
//!
//! ### Fault Handling
//! Every connection marks itself dead on I/O failure. Its own cleanup and a
//! periodic health sweep both release the player's drawing claims, so a tile
//! never stays locked by a player who is gone.
//!
//! ## Module Organization
//!
//! - `board`: tile states, two-phase claim/capture rules, scores
//! - `registry`: seats, identifiers and session phase
//! - `session`: board and registry behind one guard, phase publication
//! - `broadcast`: per-agent send queues and fan-out
//! - `agent`: per-connection read loop and command dispatch
//! - `health`: periodic eviction of dead connections
//! - `network`: listener and match teardown
//!
//! ## Concurrency Model
//!
//! One tokio task per connection reads commands, plus one writer task per
//! connection, one health monitor task and the listener. The session (board
//! and registry) sits behind a single async mutex held for the whole of each
//! command, which makes every check-and-set on a tile atomic.
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use server::config::ServerConfig;
//! use server::network::Server;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let server = Server::bind(ServerConfig::default()).await?;
//!     server.run().await?;
//!     Ok(())
//! }
//! ```

pub mod agent;
pub mod board;
pub mod broadcast;
pub mod config;
pub mod error;
pub mod health;
pub mod network;
pub mod registry;
pub mod session;
