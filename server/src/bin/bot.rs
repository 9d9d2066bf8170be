//! Headless scripted player
//!
//! Connects to a server, optionally starts the match, then draws and
//! captures tiles in random order until the match ends. Useful for
//! exercising the server without the graphical client.

use clap::Parser;
use log::{debug, info, warn};
use rand::seq::SliceRandom;
use shared::{player_color, Command, ServerMessage, DEFAULT_BOARD_COLS, DEFAULT_BOARD_ROWS};
use std::collections::HashSet;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::tcp::OwnedWriteHalf;
use tokio::net::TcpStream;
use tokio::time::{interval, Duration};

#[derive(Parser, Debug)]
#[command(author, version, about = "Scripted tile capture player", long_about = None)]
struct Args {
    /// Server address to connect to
    #[arg(short = 's', long, default_value = "127.0.0.1:3000")]
    server: String,

    /// Board rows, must match the server
    #[arg(long, default_value_t = DEFAULT_BOARD_ROWS)]
    rows: usize,

    /// Board columns, must match the server
    #[arg(long, default_value_t = DEFAULT_BOARD_COLS)]
    cols: usize,

    /// Delay between moves in milliseconds
    #[arg(short = 'd', long, default_value = "200")]
    delay_ms: u64,

    /// Send `start` right after joining
    #[arg(long)]
    start: bool,
}

async fn send(writer: &mut OwnedWriteHalf, command: &Command) -> std::io::Result<()> {
    writer.write_all(format!("{}\n", command).as_bytes()).await
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let stream = TcpStream::connect(&args.server).await?;
    let (reader, mut writer) = stream.into_split();
    let mut lines = BufReader::new(reader).lines();

    let id = match lines.next_line().await? {
        Some(line) => match line.parse::<ServerMessage>()? {
            ServerMessage::PlayerId(id) => id,
            other => return Err(format!("expected a player id, got `{}`", other).into()),
        },
        None => return Err("server refused the connection".into()),
    };
    info!("Joined {} as player {} ({})", args.server, id, player_color(id));

    if args.start {
        send(&mut writer, &Command::Start).await?;
    }

    let mut tiles: Vec<(usize, usize)> = (0..args.rows)
        .flat_map(|y| (0..args.cols).map(move |x| (x, y)))
        .collect();
    tiles.shuffle(&mut rand::thread_rng());

    // Tiles someone is known to be drawing or to have captured
    let mut claimed: HashSet<(usize, usize)> = HashSet::new();
    let mut ticker = interval(Duration::from_millis(args.delay_ms));

    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else {
                    info!("Server closed the connection");
                    break;
                };
                match line.parse::<ServerMessage>() {
                    Ok(ServerMessage::Relay(Command::EndDraw { x, y, .. })) => {
                        claimed.remove(&(x, y));
                    }
                    Ok(ServerMessage::Relay(command)) => {
                        if let Some(tile) = command.tile() {
                            claimed.insert(tile);
                        }
                    }
                    Ok(ServerMessage::Start { player_count }) => {
                        info!("Match started with {} players", player_count);
                    }
                    Ok(ServerMessage::End { scores }) => {
                        info!("Match over, scores {:?}", scores);
                        let captured = scores.get(id).copied().unwrap_or(0);
                        info!("Player {} captured {} tiles", id, captured);
                        break;
                    }
                    Ok(ServerMessage::DrawError) | Ok(ServerMessage::CaptureError) => {
                        debug!("Lost a race for a tile");
                    }
                    Ok(ServerMessage::PlayerId(other)) => {
                        warn!("Unexpected player id {}", other);
                    }
                    Err(e) => warn!("Unreadable line {:?}: {}", line, e),
                }
            }
            _ = ticker.tick() => {
                if let Some(&(x, y)) = tiles.iter().find(|tile| !claimed.contains(*tile)) {
                    claimed.insert((x, y));
                    send(&mut writer, &Command::Draw { x, y, player: id }).await?;
                    send(&mut writer, &Command::Capture { x, y, player: id }).await?;
                }
            }
        }
    }

    Ok(())
}
