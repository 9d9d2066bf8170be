//! Listener and match lifecycle coordination

use crate::agent::ConnectionAgent;
use crate::broadcast::Broadcaster;
use crate::config::ServerConfig;
use crate::error::ServerError;
use crate::health::HealthMonitor;
use crate::registry::SessionPhase;
use crate::session::{Departure, Session};
use log::{error, info, warn};
use shared::PlayerId;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{watch, Mutex};
use tokio::task::JoinSet;

/// State shared by the listener, every agent and the health monitor
///
/// Lock order is always `session` before `broadcaster`.
pub struct ServerState {
    /// Validated configuration the server was bound with
    pub config: ServerConfig,
    /// Board and registry behind the single session guard
    pub session: Mutex<Session>,
    /// Send queues of every connected agent
    pub broadcaster: Broadcaster,
}

impl ServerState {
    /// Creates a fresh lobby session sized by `config`
    pub fn new(config: ServerConfig) -> Self {
        let session = Session::from_config(&config);
        Self {
            config,
            session: Mutex::new(session),
            broadcaster: Broadcaster::new(),
        }
    }

    /// Removes a player from the session and the broadcaster
    ///
    /// Releases the player's drawing claims and tells their agent to stop.
    /// Safe to call more than once for the same player.
    pub async fn evict(&self, id: PlayerId) -> Option<Departure> {
        let mut session = self.session.lock().await;
        let departure = session.unregister(id);

        if let Some(handle) = self.broadcaster.remove(id).await {
            handle.disconnect();
        }
        if matches!(departure, Some(Departure { abandoned: true, .. })) {
            self.broadcaster.disconnect_all().await;
        }
        departure
    }
}

/// TCP front end of the session server
pub struct Server {
    listener: Option<TcpListener>,
    local_addr: SocketAddr,
    state: Arc<ServerState>,
}

impl Server {
    /// Validates the configuration and binds the listening socket
    pub async fn bind(config: ServerConfig) -> Result<Self, ServerError> {
        config.validate()?;
        let listener = TcpListener::bind(config.address()).await?;
        let local_addr = listener.local_addr()?;
        info!("Server listening on {}", local_addr);
        info!(
            "Board {}x{}, up to {} players",
            config.rows, config.cols, config.max_players
        );

        Ok(Server {
            listener: Some(listener),
            local_addr,
            state: Arc::new(ServerState::new(config)),
        })
    }

    /// Address the listener is bound to, with the actual port when bound to 0
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Shared state, for inspection while the server runs
    pub fn state(&self) -> Arc<ServerState> {
        Arc::clone(&self.state)
    }

    /// Hosts matches until one ends, or forever with rematch enabled
    ///
    /// Connections are accepted only while the session is in the lobby. Once
    /// a match ends every agent is disconnected and awaited before the
    /// session is reopened or the call returns.
    pub async fn run(mut self) -> Result<(), ServerError> {
        let monitor = HealthMonitor::new(
            Arc::clone(&self.state),
            self.state.config.heartbeat_interval,
        )
        .spawn();
        let mut phase_rx = self.state.session.lock().await.subscribe();

        let result = loop {
            let listener = match self.listener.take() {
                Some(listener) => listener,
                None => match TcpListener::bind(self.local_addr).await {
                    Ok(listener) => listener,
                    Err(e) => break Err(e.into()),
                },
            };

            let mut agents = JoinSet::new();
            self.accept_while_lobby(&listener, &mut phase_rx, &mut agents)
                .await;
            drop(listener);
            info!("Lobby closed, no longer accepting connections");

            while *phase_rx.borrow_and_update() != SessionPhase::Ended {
                if phase_rx.changed().await.is_err() {
                    break;
                }
            }

            self.state.broadcaster.disconnect_all().await;
            while let Some(joined) = agents.join_next().await {
                if let Err(e) = joined {
                    error!("Agent task failed: {}", e);
                }
            }
            info!("All connections closed");

            if !self.state.config.rematch {
                break Ok(());
            }
            if let Err(e) = self.state.session.lock().await.reopen() {
                break Err(e.into());
            }
            info!("Lobby reopened for a new match");
        };

        monitor.abort();
        result
    }

    async fn accept_while_lobby(
        &self,
        listener: &TcpListener,
        phase_rx: &mut watch::Receiver<SessionPhase>,
        agents: &mut JoinSet<()>,
    ) {
        while *phase_rx.borrow_and_update() == SessionPhase::Lobby {
            tokio::select! {
                accepted = listener.accept() => match accepted {
                    Ok((stream, addr)) => self.admit(stream, addr, agents).await,
                    Err(e) => warn!("Failed to accept connection: {}", e),
                },
                changed = phase_rx.changed() => {
                    if changed.is_err() {
                        return;
                    }
                }
            }
        }
    }

    /// Registers a new connection and spawns its agent, or refuses it
    async fn admit(&self, stream: TcpStream, addr: SocketAddr, agents: &mut JoinSet<()>) {
        let registered = self.state.session.lock().await.register(addr);
        match registered {
            Ok(id) => {
                let agent = ConnectionAgent::new(id, addr, Arc::clone(&self.state));
                agents.spawn(agent.run(stream));
            }
            Err(e) => {
                info!("Refused connection from {}: {}", addr, e);
                drop(stream);
            }
        }
    }
}
