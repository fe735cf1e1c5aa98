//! Handle the host uses to drive the bridge.

use crate::config::BridgeConfig;
use crate::error::BridgeError;
use crate::host::Host;
use crate::session::{Event, SendOutcome, Session, Snapshot};
use std::net::SocketAddr;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use zipbridge_core::{CaptionState, ConnectivityStatus, OutboundCommand};

/// A running bridge.
///
/// Every call is forwarded to the session task and answered in order with
/// the peer traffic it runs alongside.
pub struct Bridge {
    events: mpsc::UnboundedSender<Event>,
    task: Option<JoinHandle<()>>,
}

impl Bridge {
    /// Start the session and the server for `config`.
    ///
    /// A bad config or a failed bind does not fail this call; it is reported
    /// to `host` as a status and the bridge waits for [`config_updated`].
    ///
    /// [`config_updated`]: Self::config_updated
    pub async fn init<H: Host>(config: BridgeConfig, host: H) -> Result<Self, BridgeError> {
        tracing::debug!("initializing bridge");
        let (events, rx) = mpsc::unbounded_channel();
        let session = Session::new(host, events.clone());
        let task = tokio::spawn(session.run(rx));
        let bridge = Self {
            events,
            task: Some(task),
        };
        bridge.config_updated(config).await?;
        Ok(bridge)
    }

    /// Tear the server down and rebuild it from `config`.
    pub async fn config_updated(
        &self,
        config: BridgeConfig,
    ) -> Result<ConnectivityStatus, BridgeError> {
        self.request(|reply| Event::Configure { config, reply }).await
    }

    pub async fn send_command(&self, command: OutboundCommand) -> Result<SendOutcome, BridgeError> {
        self.request(|reply| Event::Command { command, reply }).await
    }

    /// Send a command by its identifier, as chosen in the host's action options.
    pub async fn invoke(&self, command_id: &str) -> Result<SendOutcome, BridgeError> {
        let command = command_id.parse::<OutboundCommand>()?;
        self.send_command(command).await
    }

    pub async fn snapshot(&self) -> Result<Snapshot, BridgeError> {
        self.request(|reply| Event::Snapshot { reply }).await
    }

    pub async fn caption_state(&self) -> Result<CaptionState, BridgeError> {
        Ok(self.snapshot().await?.caption_state)
    }

    pub async fn last_word(&self) -> Result<String, BridgeError> {
        Ok(self.snapshot().await?.last_word)
    }

    /// The caption-state feedback predicate.
    pub async fn caption_state_is(&self, expected: &str) -> Result<bool, BridgeError> {
        Ok(self.caption_state().await?.is(expected))
    }

    pub async fn status(&self) -> Result<ConnectivityStatus, BridgeError> {
        Ok(self.snapshot().await?.status)
    }

    pub async fn local_addr(&self) -> Result<Option<SocketAddr>, BridgeError> {
        Ok(self.snapshot().await?.local_addr)
    }

    pub async fn peer_count(&self) -> Result<usize, BridgeError> {
        Ok(self.snapshot().await?.peers)
    }

    /// Close the server and all peers, then stop the session.
    pub async fn destroy(mut self) -> Result<(), BridgeError> {
        tracing::debug!("destroying bridge");
        self.request(|reply| Event::Shutdown { reply }).await?;
        if let Some(task) = self.task.take() {
            let _ = task.await;
        }
        Ok(())
    }

    async fn request<T>(
        &self,
        event: impl FnOnce(oneshot::Sender<T>) -> Event,
    ) -> Result<T, BridgeError> {
        let (reply, rx) = oneshot::channel();
        self.events
            .send(event(reply))
            .map_err(|_| BridgeError::Closed)?;
        rx.await.map_err(|_| BridgeError::Closed)
    }
}

impl Drop for Bridge {
    fn drop(&mut self) {
        if let Some(task) = &self.task {
            task.abort();
        }
    }
}
