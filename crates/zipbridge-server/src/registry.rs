//! The set of connected extension peers.

use std::collections::BTreeMap;
use std::fmt;
use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::{mpsc, oneshot};
use tokio_tungstenite::tungstenite::Message;

/// Peer identifier, unique for the lifetime of the [`PeerIds`] that issued it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PeerId(u64);

/// Issues peer ids. Clones share one sequence, so ids stay unique across
/// every listener a server starts.
#[derive(Debug, Clone, Default)]
pub(crate) struct PeerIds(Arc<AtomicU64>);

impl PeerIds {
    pub(crate) fn next(&self) -> PeerId {
        PeerId(self.0.fetch_add(1, Ordering::Relaxed) + 1)
    }
}

impl fmt::Display for PeerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "peer-{}", self.0)
    }
}

/// A registered connection.
///
/// Frames are queued to the connection's writer task. Dropping the peer
/// closes its outbound queue (the writer then sends a close frame) and
/// releases `shutdown`, which stops the reader.
pub(crate) struct Peer {
    id: PeerId,
    addr: SocketAddr,
    outbound: mpsc::UnboundedSender<Message>,
    _shutdown: oneshot::Sender<()>,
}

impl Peer {
    pub(crate) fn new(
        id: PeerId,
        addr: SocketAddr,
        outbound: mpsc::UnboundedSender<Message>,
        shutdown: oneshot::Sender<()>,
    ) -> Self {
        Self {
            id,
            addr,
            outbound,
            _shutdown: shutdown,
        }
    }

    pub(crate) fn id(&self) -> PeerId {
        self.id
    }

    pub(crate) fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Whether the writer is still accepting frames.
    pub(crate) fn is_open(&self) -> bool {
        !self.outbound.is_closed()
    }

    fn send_text(&self, payload: &str) -> bool {
        self.outbound
            .send(Message::Text(payload.to_string().into()))
            .is_ok()
    }
}

/// How a membership change moved the registry between empty and non-empty.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Occupancy {
    BecameOccupied,
    BecameEmpty,
    Unchanged,
}

#[derive(Default)]
pub(crate) struct PeerRegistry {
    peers: BTreeMap<PeerId, Peer>,
}

impl PeerRegistry {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn add(&mut self, peer: Peer) -> Occupancy {
        let was_empty = self.peers.is_empty();
        self.peers.insert(peer.id, peer);
        if was_empty {
            Occupancy::BecameOccupied
        } else {
            Occupancy::Unchanged
        }
    }

    /// Remove a peer. Removing an absent peer is a no-op.
    pub(crate) fn remove(&mut self, id: PeerId) -> Occupancy {
        if self.peers.remove(&id).is_some() && self.peers.is_empty() {
            Occupancy::BecameEmpty
        } else {
            Occupancy::Unchanged
        }
    }

    /// Drop every peer, closing their connections.
    pub(crate) fn clear(&mut self) -> Occupancy {
        if self.peers.is_empty() {
            return Occupancy::Unchanged;
        }
        self.peers.clear();
        Occupancy::BecameEmpty
    }

    pub(crate) fn contains(&self, id: PeerId) -> bool {
        self.peers.contains_key(&id)
    }

    pub(crate) fn size(&self) -> usize {
        self.peers.len()
    }

    pub(crate) fn for_each_open(&self, mut f: impl FnMut(&Peer)) {
        self.peers.values().filter(|p| p.is_open()).for_each(|p| f(p));
    }

    /// Queue a text frame to every open peer. Returns how many accepted it.
    pub(crate) fn broadcast(&self, payload: &str) -> usize {
        let mut sent = 0;
        self.for_each_open(|peer| {
            if peer.send_text(payload) {
                sent += 1;
            }
        });
        sent
    }
}
