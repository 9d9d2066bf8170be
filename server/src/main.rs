use clap::Parser;
use log::info;
use server::config::ServerConfig;
use server::network::Server;
use shared::{
    DEFAULT_BOARD_COLS, DEFAULT_BOARD_ROWS, DEFAULT_HEARTBEAT_MS, DEFAULT_MAX_PLAYERS,
    DEFAULT_PORT,
};
use std::time::Duration;

#[derive(Parser, Debug)]
#[command(author, version, about = "Tile capture session server", long_about = None)]
struct Args {
    /// Address to bind to
    #[arg(short = 'H', long, env = "TILE_HOST", default_value = "127.0.0.1")]
    host: String,

    /// Port to listen on
    #[arg(short, long, env = "TILE_PORT", default_value_t = DEFAULT_PORT)]
    port: u16,

    /// Maximum number of players in a match
    #[arg(short = 'm', long, env = "TILE_MAX_PLAYERS", default_value_t = DEFAULT_MAX_PLAYERS)]
    max_players: usize,

    /// Board rows
    #[arg(long, env = "TILE_ROWS", default_value_t = DEFAULT_BOARD_ROWS)]
    rows: usize,

    /// Board columns
    #[arg(long, env = "TILE_COLS", default_value_t = DEFAULT_BOARD_COLS)]
    cols: usize,

    /// Interval between dead-connection sweeps, in milliseconds
    #[arg(long, env = "TILE_HEARTBEAT_MS", default_value_t = DEFAULT_HEARTBEAT_MS)]
    heartbeat_ms: u64,

    /// Reopen the lobby after a match instead of exiting
    #[arg(long, env = "TILE_REMATCH")]
    rematch: bool,
}

impl From<Args> for ServerConfig {
    fn from(args: Args) -> Self {
        ServerConfig {
            host: args.host,
            port: args.port,
            max_players: args.max_players,
            rows: args.rows,
            cols: args.cols,
            heartbeat_interval: Duration::from_millis(args.heartbeat_ms),
            rematch: args.rematch,
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let server = Server::bind(args.into()).await?;

    tokio::select! {
        result = server.run() => result?,
        _ = tokio::signal::ctrl_c() => {
            info!("Received Ctrl+C, shutting down");
        }
    }

    Ok(())
}
