//! Fan-out of server messages to connected agents
//!
//! Each agent owns a writer task fed by an unbounded queue; the broadcaster
//! only ever enqueues, so a slow or dead peer never blocks the sender.
//! Delivery is best effort: a peer whose queue is closed is marked dead and
//! left for the health monitor to evict.

use log::{debug, warn};
use shared::{PlayerId, ServerMessage};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::{mpsc, Notify, RwLock};

/// Connection liveness flag shared by an agent's reader, writer and handle
///
/// Only local I/O failures clear it; nothing is sent to the peer to probe it.
#[derive(Debug, Clone)]
pub struct Liveness(Arc<AtomicBool>);

impl Liveness {
    pub fn new() -> Self {
        Self(Arc::new(AtomicBool::new(true)))
    }

    pub fn is_alive(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }

    /// Returns true if this call flipped the flag
    pub fn mark_dead(&self) -> bool {
        self.0.swap(false, Ordering::AcqRel)
    }
}

impl Default for Liveness {
    fn default() -> Self {
        Self::new()
    }
}

/// Sending side of one agent's connection
#[derive(Debug, Clone)]
pub struct AgentHandle {
    pub id: PlayerId,
    sender: mpsc::UnboundedSender<String>,
    liveness: Liveness,
    kick: Arc<Notify>,
}

impl AgentHandle {
    pub fn new(id: PlayerId, sender: mpsc::UnboundedSender<String>) -> Self {
        Self {
            id,
            sender,
            liveness: Liveness::new(),
            kick: Arc::new(Notify::new()),
        }
    }

    pub fn liveness(&self) -> Liveness {
        self.liveness.clone()
    }

    /// Queues a line for this agent; marks it dead if the queue is closed
    pub fn send_line(&self, line: &str) -> bool {
        if self.sender.send(line.to_string()).is_err() {
            self.mark_dead();
            return false;
        }
        true
    }

    pub fn send(&self, message: &ServerMessage) -> bool {
        self.send_line(&message.to_string())
    }

    pub fn is_alive(&self) -> bool {
        self.liveness.is_alive()
    }

    /// Records a connection failure observed by the agent's own I/O
    pub fn mark_dead(&self) {
        if self.liveness.mark_dead() {
            debug!("Agent {} marked dead", self.id);
        }
    }

    /// Asks the agent's read loop to stop
    pub fn disconnect(&self) {
        self.kick.notify_one();
    }

    /// Completes once `disconnect` has been called
    pub async fn disconnected(&self) {
        self.kick.notified().await;
    }
}

/// Membership of agents that receive broadcasts
#[derive(Default)]
pub struct Broadcaster {
    agents: RwLock<HashMap<PlayerId, AgentHandle>>,
}

impl Broadcaster {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn add(&self, handle: AgentHandle) {
        let mut agents = self.agents.write().await;
        if let Some(old) = agents.insert(handle.id, handle) {
            warn!("Replaced stale agent handle for player {}", old.id);
            old.disconnect();
        }
    }

    pub async fn remove(&self, id: PlayerId) -> Option<AgentHandle> {
        self.agents.write().await.remove(&id)
    }

    /// Sends to every live agent except `origin`; returns the delivery count
    pub async fn send_to_others(&self, origin: PlayerId, message: &ServerMessage) -> usize {
        self.deliver(Some(origin), message).await
    }

    /// Sends to every live agent; returns the delivery count
    pub async fn send_to_all(&self, message: &ServerMessage) -> usize {
        self.deliver(None, message).await
    }

    async fn deliver(&self, exclude: Option<PlayerId>, message: &ServerMessage) -> usize {
        let line = message.to_string();
        let agents = self.agents.read().await;

        let mut delivered = 0;
        for (id, handle) in agents.iter() {
            if Some(*id) == exclude || !handle.is_alive() {
                continue;
            }
            if handle.send_line(&line) {
                delivered += 1;
            } else {
                warn!("Failed to deliver to player {}, marked for eviction", id);
            }
        }
        delivered
    }

    /// Identifiers of agents whose connection has failed
    pub async fn dead_agents(&self) -> Vec<PlayerId> {
        self.agents
            .read()
            .await
            .values()
            .filter(|handle| !handle.is_alive())
            .map(|handle| handle.id)
            .collect()
    }

    /// Removes every agent and tells each one to close its connection
    ///
    /// Lines already queued are still written before the socket closes.
    pub async fn disconnect_all(&self) -> usize {
        let drained: Vec<AgentHandle> = self
            .agents
            .write()
            .await
            .drain()
            .map(|(_, handle)| handle)
            .collect();
        for handle in &drained {
            handle.disconnect();
        }
        drained.len()
    }

    pub async fn len(&self) -> usize {
        self.agents.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.agents.read().await.is_empty()
    }
}
