//! Periodic liveness probes.
//!
//! The monitor only schedules; the probe callback does the sending. Dead
//! peers are detected by the transport closing, not by missing replies.

use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};

/// At most one probe timer, restarted fresh on every `start`.
///
/// Each start bumps a generation number that is passed to the probe. A probe
/// queued by an earlier timer can be recognized with [`is_current`] and
/// discarded.
///
/// [`is_current`]: HeartbeatMonitor::is_current
#[derive(Debug, Default)]
pub struct HeartbeatMonitor {
    generation: u64,
    task: Option<JoinHandle<()>>,
}

impl HeartbeatMonitor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start probing every `period`, replacing any running timer.
    ///
    /// The first probe fires one full period after the call. The timer ends
    /// on [`stop`](Self::stop) or when `probe` returns `false`.
    pub fn start<F>(&mut self, period: Duration, probe: F)
    where
        F: Fn(u64) -> bool + Send + 'static,
    {
        self.stop();
        self.generation += 1;
        let generation = self.generation;
        self.task = Some(tokio::spawn(async move {
            let mut ticker = time::interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                if !probe(generation) {
                    break;
                }
            }
        }));
    }

    /// Stop the timer. Safe to call when not running.
    pub fn stop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }

    pub fn is_running(&self) -> bool {
        self.task.as_ref().is_some_and(|t| !t.is_finished())
    }

    /// Whether a probe tagged `generation` came from the running timer.
    pub fn is_current(&self, generation: u64) -> bool {
        self.task.is_some() && generation == self.generation
    }
}

impl Drop for HeartbeatMonitor {
    fn drop(&mut self) {
        self.stop();
    }
}
