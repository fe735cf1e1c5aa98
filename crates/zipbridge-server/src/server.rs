//! Listening endpoint and per-connection tasks.

use crate::config::ServerConfig;
use crate::error::BindError;
use crate::registry::{Peer, PeerId, PeerIds};
use crate::session::Event;
use futures_util::{Sink, SinkExt, StreamExt};
use std::fmt::Display;
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{mpsc, oneshot};
use tokio::task::{JoinHandle, JoinSet};
use tokio_tungstenite::tungstenite::Message;

/// How long a writer waits for its close handshake before giving up on the peer.
const CLOSE_TIMEOUT: Duration = Duration::from_secs(5);

/// Owns the listener for one configuration at a time.
///
/// Each successful start gets a new epoch; connections report it when they
/// register so that late arrivals from a stopped listener can be refused.
/// Peer ids come from one sequence shared by every listener this server
/// starts.
#[derive(Default)]
pub(crate) struct ConnectionServer {
    epoch: u64,
    peer_ids: PeerIds,
    running: Option<Running>,
}

struct Running {
    local_addr: SocketAddr,
    accept: JoinHandle<()>,
}

impl ConnectionServer {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Bind and begin accepting. A running listener is stopped first.
    pub(crate) async fn start(
        &mut self,
        config: &ServerConfig,
        events: mpsc::UnboundedSender<Event>,
    ) -> Result<SocketAddr, BindError> {
        self.stop().await;

        let listener = TcpListener::bind(config.addr())
            .await
            .map_err(|e| BindError::from_io(config.port(), e))?;
        let local_addr = listener
            .local_addr()
            .map_err(|e| BindError::from_io(config.port(), e))?;

        self.epoch += 1;
        let accept = tokio::spawn(accept_loop(
            listener,
            self.epoch,
            self.peer_ids.clone(),
            events,
        ));
        self.running = Some(Running { local_addr, accept });
        Ok(local_addr)
    }

    /// Close the listener and every connection it accepted that has not yet
    /// registered. Returns once the port is released. Idempotent.
    pub(crate) async fn stop(&mut self) {
        if let Some(running) = self.running.take() {
            running.accept.abort();
            let _ = running.accept.await;
            tracing::debug!(addr = %running.local_addr, "listener closed");
        }
    }

    pub(crate) async fn restart(
        &mut self,
        config: &ServerConfig,
        events: mpsc::UnboundedSender<Event>,
    ) -> Result<SocketAddr, BindError> {
        self.stop().await;
        self.start(config, events).await
    }

    pub(crate) fn epoch(&self) -> u64 {
        self.epoch
    }

    pub(crate) fn local_addr(&self) -> Option<SocketAddr> {
        self.running.as_ref().map(|r| r.local_addr)
    }

    /// Whether a connection tagged `epoch` belongs to the live listener.
    pub(crate) fn accepts(&self, epoch: u64) -> bool {
        self.running.is_some() && epoch == self.epoch
    }
}

impl Drop for ConnectionServer {
    fn drop(&mut self) {
        if let Some(running) = &self.running {
            running.accept.abort();
        }
    }
}

async fn accept_loop(
    listener: TcpListener,
    epoch: u64,
    peer_ids: PeerIds,
    events: mpsc::UnboundedSender<Event>,
) {
    // Dropped with this task, which aborts every connection reader.
    let mut connections = JoinSet::new();
    loop {
        tokio::select! {
            accepted = listener.accept() => match accepted {
                Ok((stream, addr)) => {
                    let id = peer_ids.next();
                    connections.spawn(serve_peer(stream, addr, id, epoch, events.clone()));
                }
                Err(e) => tracing::warn!(error = %e, "accept failed"),
            },
            Some(_) = connections.join_next(), if !connections.is_empty() => {}
        }
    }
}

async fn serve_peer(
    stream: TcpStream,
    addr: SocketAddr,
    id: PeerId,
    epoch: u64,
    events: mpsc::UnboundedSender<Event>,
) {
    let ws = match tokio_tungstenite::accept_async(stream).await {
        Ok(ws) => ws,
        Err(e) => {
            tracing::warn!(%addr, error = %e, "websocket handshake failed");
            return;
        }
    };
    let (sink, mut source) = ws.split();

    let (outbound_tx, outbound_rx) = mpsc::unbounded_channel::<Message>();
    tokio::spawn(write_frames(id, sink, outbound_rx));

    // Register before reading so no frame can overtake the registration.
    let (shutdown_tx, mut shutdown_rx) = oneshot::channel();
    let peer = Peer::new(id, addr, outbound_tx, shutdown_tx);
    if events.send(Event::Connected { epoch, peer }).is_err() {
        return;
    }

    let error = loop {
        let payload = tokio::select! {
            msg = source.next() => match msg {
                Some(Ok(Message::Text(text))) => text.as_bytes().to_vec(),
                Some(Ok(Message::Binary(data))) => data.to_vec(),
                Some(Ok(Message::Close(_))) | None => break None,
                Some(Ok(_)) => continue,
                Some(Err(e)) => break Some(e.to_string()),
            },
            // The registry dropped this peer.
            _ = &mut shutdown_rx => return,
        };
        if events.send(Event::Frame { peer: id, payload }).is_err() {
            return;
        }
    };
    let _ = events.send(Event::Closed { peer: id, error });
}

/// Drain queued frames into `sink`, then close it once the queue is dropped.
async fn write_frames<S>(id: PeerId, mut sink: S, mut outbound: mpsc::UnboundedReceiver<Message>)
where
    S: Sink<Message> + Unpin,
    S::Error: Display,
{
    while let Some(msg) = outbound.recv().await {
        if let Err(e) = sink.send(msg).await {
            tracing::debug!(peer = %id, error = %e, "write failed");
            return;
        }
    }
    if tokio::time::timeout(CLOSE_TIMEOUT, sink.close()).await.is_err() {
        tracing::debug!(peer = %id, "close handshake timed out");
    }
}
