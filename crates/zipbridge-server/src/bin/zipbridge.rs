//! Standalone bridge.
//!
//! Runs the bridge with a logging host. Useful for trying the extension
//! without a control surface:
//!   cargo run -p zipbridge-server -- --port 8082
//!
//! On Unix, SIGHUP re-reads `--config` and restarts the server.

use clap::Parser;
use std::net::IpAddr;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;
use zipbridge_server::{Bridge, BridgeConfig, TracingHost};

#[derive(Debug, Parser)]
#[command(name = "zipbridge", version, about = "Zip Captions WebSocket bridge")]
struct Args {
    /// TOML config file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Port the extension connects to.
    #[arg(short, long, env = "ZIPBRIDGE_PORT")]
    port: Option<u16>,

    /// Address to listen on.
    #[arg(long)]
    host: Option<IpAddr>,

    /// Seconds between liveness probes.
    #[arg(long)]
    heartbeat_secs: Option<u64>,
}

impl Args {
    fn load(&self) -> anyhow::Result<BridgeConfig> {
        let mut config = match &self.config {
            Some(path) => BridgeConfig::load(path)?,
            None => BridgeConfig::default(),
        };
        if let Some(port) = self.port {
            config.port = Some(port);
        }
        if let Some(host) = self.host {
            config.host = host;
        }
        if let Some(secs) = self.heartbeat_secs {
            config.heartbeat_interval_secs = secs;
        }
        Ok(config)
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("zipbridge=info".parse()?))
        .init();

    let args = Args::parse();
    let config = args.load()?;
    tracing::info!(port = ?config.port, host = %config.host, "starting bridge");

    let bridge = Bridge::init(config, TracingHost).await?;
    let mut reload = reload::Reload::new()?;

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            Some(()) = reload.recv() => match args.load() {
                Ok(config) => {
                    tracing::info!("configuration updated, restarting server");
                    bridge.config_updated(config).await?;
                }
                Err(e) => tracing::error!(error = %e, "failed to reload configuration"),
            },
        }
    }

    tracing::info!("shutting down");
    bridge.destroy().await?;
    Ok(())
}

#[cfg(unix)]
mod reload {
    use tokio::signal::unix::{Signal, SignalKind, signal};

    pub struct Reload(Signal);

    impl Reload {
        pub fn new() -> std::io::Result<Self> {
            Ok(Self(signal(SignalKind::hangup())?))
        }

        pub async fn recv(&mut self) -> Option<()> {
            self.0.recv().await
        }
    }
}

#[cfg(not(unix))]
mod reload {
    pub struct Reload;

    impl Reload {
        pub fn new() -> std::io::Result<Self> {
            Ok(Self)
        }

        pub async fn recv(&mut self) -> Option<()> {
            std::future::pending().await
        }
    }
}
