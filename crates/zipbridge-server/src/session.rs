//! The bridge's single execution context.
//!
//! One [`Session`] owns the listener, the peer registry, the heartbeat timer,
//! caption state and status reporting. Connection tasks, the heartbeat timer
//! and the [`Bridge`](crate::Bridge) handle only talk to it through the
//! ordered [`Event`] channel, so none of that state needs a lock.

use crate::config::{BridgeConfig, ServerConfig};
use crate::heartbeat::HeartbeatMonitor;
use crate::host::{FeedbackId, Host, VariableId};
use crate::registry::{Occupancy, Peer, PeerId, PeerRegistry};
use crate::server::ConnectionServer;
use std::collections::BTreeSet;
use std::net::SocketAddr;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use zipbridge_core::{
    CaptionState, ChangedField, ConnectivityStatus, Inbound, OutboundCommand, PROBE, StateStore,
    StatusEvent, StatusReporter,
};

pub(crate) enum Event {
    Connected {
        epoch: u64,
        peer: Peer,
    },
    Frame {
        peer: PeerId,
        payload: Vec<u8>,
    },
    /// The connection ended. `error` is set for transport failures.
    Closed {
        peer: PeerId,
        error: Option<String>,
    },
    Probe {
        generation: u64,
    },
    Configure {
        config: BridgeConfig,
        reply: oneshot::Sender<ConnectivityStatus>,
    },
    Command {
        command: OutboundCommand,
        reply: oneshot::Sender<SendOutcome>,
    },
    Snapshot {
        reply: oneshot::Sender<Snapshot>,
    },
    Shutdown {
        reply: oneshot::Sender<()>,
    },
}

/// Result of issuing a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendOutcome {
    /// Queued to this many open peers.
    Sent(usize),
    /// No extension was connected; nothing was sent.
    NotConnected,
}

/// Point-in-time view of the session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot {
    pub caption_state: CaptionState,
    pub last_word: String,
    pub status: ConnectivityStatus,
    pub peers: usize,
    pub local_addr: Option<SocketAddr>,
}

pub(crate) struct Session<H> {
    host: H,
    events: mpsc::UnboundedSender<Event>,
    server: ConnectionServer,
    registry: PeerRegistry,
    heartbeat: HeartbeatMonitor,
    heartbeat_period: Duration,
    store: StateStore,
    status: StatusReporter,
}

impl<H: Host> Session<H> {
    pub(crate) fn new(host: H, events: mpsc::UnboundedSender<Event>) -> Self {
        let mut session = Self {
            host,
            events,
            server: ConnectionServer::new(),
            registry: PeerRegistry::new(),
            heartbeat: HeartbeatMonitor::new(),
            heartbeat_period: Duration::from_secs(crate::config::DEFAULT_HEARTBEAT_SECS),
            store: StateStore::new(),
            status: StatusReporter::new(),
        };
        session.report(StatusEvent::Starting);
        session.publish(&BTreeSet::from([
            ChangedField::CaptionState,
            ChangedField::LastWord,
        ]));
        session
    }

    pub(crate) async fn run(mut self, mut events: mpsc::UnboundedReceiver<Event>) {
        while let Some(event) = events.recv().await {
            if !self.handle(event).await {
                return;
            }
        }
        self.shutdown().await;
    }

    /// Process one event. Returns `false` once the session has shut down.
    pub(crate) async fn handle(&mut self, event: Event) -> bool {
        match event {
            Event::Connected { epoch, peer } => self.on_connected(epoch, peer),
            Event::Frame { peer, payload } => self.on_frame(peer, &payload),
            Event::Closed { peer, error } => self.on_closed(peer, error),
            Event::Probe { generation } => self.on_probe(generation),
            Event::Configure { config, reply } => {
                self.configure(&config).await;
                let _ = reply.send(self.current_status());
            }
            Event::Command { command, reply } => {
                let _ = reply.send(self.send_command(command));
            }
            Event::Snapshot { reply } => {
                let _ = reply.send(self.snapshot());
            }
            Event::Shutdown { reply } => {
                self.shutdown().await;
                let _ = reply.send(());
                return false;
            }
        }
        true
    }

    /// Tear down whatever is running and start again from `config`.
    async fn configure(&mut self, config: &BridgeConfig) {
        self.close_all().await;
        self.report(StatusEvent::Starting);

        match ServerConfig::try_from(config) {
            Ok(server_config) => self.listen(server_config).await,
            Err(e) => {
                tracing::error!(error = %e, "invalid configuration");
                self.report(StatusEvent::ConfigRejected(e.to_string()));
            }
        }
    }

    pub(crate) async fn listen(&mut self, config: ServerConfig) {
        self.heartbeat_period = config.heartbeat();
        match self.server.restart(&config, self.events.clone()).await {
            Ok(addr) => {
                tracing::info!(%addr, "websocket server listening");
                self.report(StatusEvent::Listening);
            }
            Err(e) => {
                tracing::error!(error = %e, "websocket server setup failed");
                self.report(e.status_event());
            }
        }
    }

    fn on_connected(&mut self, epoch: u64, peer: Peer) {
        if !self.server.accepts(epoch) {
            tracing::debug!(peer = %peer.id(), "dropping connection from a stopped listener");
            return;
        }
        tracing::info!(peer = %peer.id(), addr = %peer.addr(), "extension connected");
        if self.registry.add(peer) == Occupancy::BecameOccupied {
            self.start_heartbeat();
        }
        self.report(StatusEvent::PeerConnected);
    }

    fn on_frame(&mut self, peer: PeerId, payload: &[u8]) {
        if !self.registry.contains(peer) {
            return;
        }
        match zipbridge_core::decode(payload) {
            Ok(Inbound::HeartbeatAck) => tracing::debug!(%peer, "probe acknowledged"),
            Ok(Inbound::Update(update)) => {
                tracing::debug!(%peer, ?update, "received status update");
                let changed = self.store.apply_update(update);
                self.publish(&changed);
            }
            Err(e) => tracing::warn!(%peer, error = %e, "received invalid message from extension"),
        }
    }

    fn on_closed(&mut self, peer: PeerId, error: Option<String>) {
        if !self.registry.contains(peer) {
            return;
        }
        match error {
            Some(e) => tracing::error!(%peer, error = %e, "websocket client error"),
            None => tracing::info!(%peer, "extension disconnected"),
        }
        if self.registry.remove(peer) == Occupancy::BecameEmpty {
            self.heartbeat.stop();
            self.report(StatusEvent::LastPeerLeft);
        }
    }

    fn on_probe(&mut self, generation: u64) {
        if !self.heartbeat.is_current(generation) {
            return;
        }
        let sent = self.registry.broadcast(PROBE);
        tracing::debug!(sent, "sent probe to extension");
    }

    fn send_command(&mut self, command: OutboundCommand) -> SendOutcome {
        if self.registry.size() == 0 {
            tracing::warn!(%command, "command not sent: no extension connected");
            self.report(StatusEvent::CommandDropped);
            return SendOutcome::NotConnected;
        }
        let sent = self.registry.broadcast(zipbridge_core::encode(command));
        tracing::debug!(%command, sent, "sent command");
        SendOutcome::Sent(sent)
    }

    fn start_heartbeat(&mut self) {
        let events = self.events.clone();
        self.heartbeat.start(self.heartbeat_period, move |generation| {
            events.send(Event::Probe { generation }).is_ok()
        });
    }

    /// Close the listener, then every peer. Caption state is kept.
    async fn close_all(&mut self) {
        self.server.stop().await;
        self.registry.clear();
        self.heartbeat.stop();
    }

    async fn shutdown(&mut self) {
        tracing::debug!("shutting down bridge session");
        self.close_all().await;
    }

    /// Push changed variables to the host in one batch, then refresh feedbacks.
    fn publish(&mut self, changed: &BTreeSet<ChangedField>) {
        if changed.is_empty() {
            return;
        }
        let values: Vec<(VariableId, String)> = changed
            .iter()
            .map(|field| match field {
                ChangedField::CaptionState => (
                    VariableId::CaptionState,
                    self.store.caption_state().to_string(),
                ),
                ChangedField::LastWord => (VariableId::LastWord, self.store.last_word().to_string()),
            })
            .collect();
        self.host.set_variable_values(&values);
        if changed.contains(&ChangedField::CaptionState) {
            self.host.check_feedbacks(&[FeedbackId::CaptionState]);
        }
    }

    fn report(&mut self, event: StatusEvent) {
        if let Some(status) = self.status.observe(&event) {
            tracing::debug!(%status, "status changed");
            self.host.update_status(&status);
        }
    }

    fn current_status(&self) -> ConnectivityStatus {
        self.status
            .current()
            .cloned()
            .unwrap_or(ConnectivityStatus::Connecting)
    }

    fn snapshot(&self) -> Snapshot {
        Snapshot {
            caption_state: self.store.caption_state().clone(),
            last_word: self.store.last_word().to_string(),
            status: self.current_status(),
            peers: self.registry.size(),
            local_addr: self.server.local_addr(),
        }
    }
}
