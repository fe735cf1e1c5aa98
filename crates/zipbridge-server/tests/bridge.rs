//! End-to-end tests: a real bridge on loopback and a WebSocket client
//! standing in for the extension.

use futures_util::{SinkExt, StreamExt};
use std::net::{Ipv4Addr, TcpListener};
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use zipbridge_core::{CaptionState, ConnectivityStatus, OutboundCommand};
use zipbridge_server::{Bridge, BridgeConfig, FeedbackId, Host, SendOutcome, VariableId};

type Client = WebSocketStream<MaybeTlsStream<TcpStream>>;

const WAIT: Duration = Duration::from_secs(5);

#[derive(Debug)]
enum HostCall {
    Status(ConnectivityStatus),
    Variables(Vec<(VariableId, String)>),
    Feedbacks(Vec<FeedbackId>),
}

struct ChannelHost(mpsc::UnboundedSender<HostCall>);

impl Host for ChannelHost {
    fn update_status(&mut self, status: &ConnectivityStatus) {
        let _ = self.0.send(HostCall::Status(status.clone()));
    }

    fn set_variable_values(&mut self, values: &[(VariableId, String)]) {
        let _ = self.0.send(HostCall::Variables(values.to_vec()));
    }

    fn check_feedbacks(&mut self, feedbacks: &[FeedbackId]) {
        let _ = self.0.send(HostCall::Feedbacks(feedbacks.to_vec()));
    }
}

struct Calls(mpsc::UnboundedReceiver<HostCall>);

impl Calls {
    async fn next(&mut self) -> HostCall {
        timeout(WAIT, self.0.recv())
            .await
            .expect("timed out waiting for host call")
            .expect("host channel closed")
    }

    async fn status(&mut self) -> ConnectivityStatus {
        loop {
            if let HostCall::Status(status) = self.next().await {
                return status;
            }
        }
    }

    /// Skip host calls until `expected` is reported.
    async fn until_status(&mut self, expected: ConnectivityStatus) {
        while self.status().await != expected {}
    }

    async fn variables(&mut self) -> Vec<(VariableId, String)> {
        loop {
            if let HostCall::Variables(values) = self.next().await {
                return values;
            }
        }
    }
}

fn free_port() -> u16 {
    let listener = TcpListener::bind((Ipv4Addr::LOCALHOST, 0)).unwrap();
    listener.local_addr().unwrap().port()
}

fn config(port: u16) -> BridgeConfig {
    BridgeConfig {
        port: Some(port),
        ..Default::default()
    }
}

async fn start(config: BridgeConfig) -> (Bridge, Calls) {
    let (tx, rx) = mpsc::unbounded_channel();
    let bridge = Bridge::init(config, ChannelHost(tx)).await.unwrap();
    (bridge, Calls(rx))
}

async fn connect(port: u16, calls: &mut Calls) -> Client {
    let (client, _) = tokio_tungstenite::connect_async(format!("ws://127.0.0.1:{port}"))
        .await
        .unwrap();
    calls
        .until_status(ConnectivityStatus::Ok("Connected to extension".into()))
        .await;
    client
}

async fn send(client: &mut Client, text: &str) {
    client.send(Message::Text(text.to_string().into())).await.unwrap();
}

async fn next_text(client: &mut Client) -> String {
    loop {
        let msg = timeout(WAIT, client.next())
            .await
            .expect("timed out waiting for frame")
            .expect("connection closed")
            .unwrap();
        if msg.is_text() {
            return msg.to_text().unwrap().to_string();
        }
    }
}

#[tokio::test]
async fn listening_before_any_peer() {
    let port = free_port();
    let (bridge, mut calls) = start(config(port)).await;

    assert_eq!(calls.status().await, ConnectivityStatus::Connecting);
    let status = calls.status().await;
    assert!(matches!(&status, ConnectivityStatus::Ok(d) if d.starts_with("Listening")));
    assert_eq!(bridge.status().await.unwrap(), status);
    assert_eq!(bridge.local_addr().await.unwrap().unwrap().port(), port);

    bridge.destroy().await.unwrap();
}

#[tokio::test]
async fn missing_port_is_bad_config() {
    let (bridge, _calls) = start(BridgeConfig {
        port: None,
        ..Default::default()
    })
    .await;

    assert!(matches!(
        bridge.status().await.unwrap(),
        ConnectivityStatus::BadConfig(_)
    ));
    assert_eq!(bridge.local_addr().await.unwrap(), None);
}

#[tokio::test]
async fn second_instance_reports_port_in_use() {
    let port = free_port();
    let (first, _calls) = start(config(port)).await;
    let (second, _calls2) = start(config(port)).await;

    assert_eq!(
        second.status().await.unwrap(),
        ConnectivityStatus::ConnectionFailure(format!("Port {port} is already in use"))
    );
    assert!(matches!(
        first.status().await.unwrap(),
        ConnectivityStatus::Ok(_)
    ));
}

#[tokio::test]
async fn restart_on_same_port() {
    let port = free_port();
    let (bridge, _calls) = start(config(port)).await;

    let status = bridge.config_updated(config(port)).await.unwrap();
    assert!(matches!(status, ConnectivityStatus::Ok(d) if d.starts_with("Listening")));
}

#[tokio::test]
async fn status_updates_flow_to_variables() {
    let port = free_port();
    let (bridge, mut calls) = start(config(port)).await;
    let mut client = connect(port, &mut calls).await;

    send(&mut client, r#"{"status":"running"}"#).await;
    assert_eq!(
        calls.variables().await,
        [(VariableId::CaptionState, "running".to_string())]
    );
    assert!(matches!(
        calls.next().await,
        HostCall::Feedbacks(f) if f == [FeedbackId::CaptionState]
    ));
    assert!(bridge.caption_state_is("running").await.unwrap());
    assert_eq!(bridge.last_word().await.unwrap(), "");

    send(&mut client, r#"{"lastWord":"hello"}"#).await;
    assert_eq!(
        calls.variables().await,
        [(VariableId::LastWord, "hello".to_string())]
    );
    assert_eq!(bridge.caption_state().await.unwrap(), CaptionState::Running);

    send(&mut client, r#"{"status":"stopped","lastWord":"world"}"#).await;
    assert_eq!(
        calls.variables().await,
        [
            (VariableId::CaptionState, "stopped".to_string()),
            (VariableId::LastWord, "world".to_string()),
        ]
    );
}

#[tokio::test]
async fn garbage_keeps_connection_and_state() {
    let port = free_port();
    let (bridge, mut calls) = start(config(port)).await;
    let mut client = connect(port, &mut calls).await;

    send(&mut client, "this is not json").await;
    send(&mut client, "PONG").await;
    send(&mut client, r#"{"lastWord":"still here"}"#).await;

    // Only the valid update produced host calls.
    assert!(matches!(calls.next().await, HostCall::Variables(v) if v[0].1 == "still here"));
    let snapshot = bridge.snapshot().await.unwrap();
    assert_eq!(snapshot.caption_state, CaptionState::Unknown);
    assert_eq!(snapshot.peers, 1);
}

#[tokio::test]
async fn commands_reach_the_extension() {
    let port = free_port();
    let (bridge, mut calls) = start(config(port)).await;
    let mut client = connect(port, &mut calls).await;

    assert_eq!(
        bridge
            .send_command(OutboundCommand::ToggleListen)
            .await
            .unwrap(),
        SendOutcome::Sent(1)
    );
    assert_eq!(next_text(&mut client).await, "TOGGLE_LISTEN");

    assert_eq!(bridge.invoke("PLAY_PAUSE").await.unwrap(), SendOutcome::Sent(1));
    assert_eq!(next_text(&mut client).await, "PLAY_PAUSE");

    assert!(bridge.invoke("REWIND").await.is_err());
}

#[tokio::test]
async fn command_without_extension_is_reported() {
    let port = free_port();
    let (bridge, _calls) = start(config(port)).await;

    assert_eq!(
        bridge.send_command(OutboundCommand::PlayPause).await.unwrap(),
        SendOutcome::NotConnected
    );
    assert_eq!(
        bridge.status().await.unwrap(),
        ConnectivityStatus::Warning("Extension not connected".into())
    );
}

#[tokio::test]
async fn state_survives_reconnect() {
    let port = free_port();
    let (bridge, mut calls) = start(config(port)).await;
    let mut client = connect(port, &mut calls).await;

    send(&mut client, r#"{"status":"running","lastWord":"hello"}"#).await;
    calls.variables().await;
    client.close(None).await.unwrap();
    calls
        .until_status(ConnectivityStatus::Warning("Disconnected from extension".into()))
        .await;
    assert_eq!(bridge.peer_count().await.unwrap(), 0);

    let _client = connect(port, &mut calls).await;
    let snapshot = bridge.snapshot().await.unwrap();
    assert_eq!(snapshot.caption_state, CaptionState::Running);
    assert_eq!(snapshot.last_word, "hello");
}

#[tokio::test]
async fn heartbeat_probes_connected_extension() {
    let port = free_port();
    let (_bridge, mut calls) = start(BridgeConfig {
        heartbeat_interval_secs: 1,
        ..config(port)
    })
    .await;
    let mut client = connect(port, &mut calls).await;

    assert_eq!(next_text(&mut client).await, "PING");
    send(&mut client, "PONG").await;
    assert_eq!(next_text(&mut client).await, "PING");
}

#[tokio::test]
async fn destroy_closes_peers() {
    let port = free_port();
    let (bridge, mut calls) = start(config(port)).await;
    let mut client = connect(port, &mut calls).await;

    bridge.destroy().await.unwrap();
    let closed = timeout(WAIT, async {
        loop {
            match client.next().await {
                Some(Ok(Message::Close(_))) | None | Some(Err(_)) => return,
                Some(Ok(_)) => {}
            }
        }
    })
    .await;
    assert!(closed.is_ok());
}
