//! Heartbeat Health Checker
//!
//! Periodically probes every registered backend with a bare TCP connect
//! and feeds the result back into the registry.

use crate::domain::ports::HealthProbe;
use crate::domain::services::BackendRegistry;
use crate::domain::value_objects::BackendAddress;
use crate::infrastructure::shutdown::ShutdownController;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;
use tokio::task::JoinHandle;

/// Heartbeat configuration.
#[derive(Debug, Clone)]
pub struct HeartbeatConfig {
    /// Interval between heartbeat rounds
    pub interval: Duration,
    /// Timeout for each probe
    pub probe_timeout: Duration,
}

impl Default for HeartbeatConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(5),
            probe_timeout: Duration::from_secs(1),
        }
    }
}

/// Reachability probe: connect, then close. No data is exchanged.
#[derive(Debug, Clone)]
pub struct TcpHealthProbe {
    timeout: Duration,
}

impl TcpHealthProbe {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    async fn tcp_check(addr: &str, timeout: Duration) -> Result<(), String> {
        match tokio::time::timeout(timeout, TcpStream::connect(addr)).await {
            Ok(Ok(mut stream)) => {
                let _ = stream.shutdown().await;
                Ok(())
            }
            Ok(Err(e)) => Err(format!("connection failed: {}", e)),
            Err(_) => Err("connection timeout".to_string()),
        }
    }
}

impl Default for TcpHealthProbe {
    fn default() -> Self {
        Self::new(Duration::from_secs(1))
    }
}

#[async_trait]
impl HealthProbe for TcpHealthProbe {
    async fn probe(&self, address: &BackendAddress) -> bool {
        let start = Instant::now();
        match Self::tcp_check(&address.socket_addr_string(), self.timeout).await {
            Ok(()) => {
                tracing::debug!(
                    "probe {} ok in {}ms",
                    address,
                    start.elapsed().as_millis()
                );
                true
            }
            Err(e) => {
                tracing::debug!("probe {} failed: {}", address, e);
                false
            }
        }
    }
}

/// Outcome of one heartbeat round.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HeartbeatRound {
    pub alive: usize,
    pub dead: usize,
}

/// Runs the probe against every backend on a fixed period.
///
/// Never removes a backend: failures mark it dead and demote it, and a
/// later successful probe marks it alive again without moving it.
pub struct HeartbeatScheduler {
    registry: Arc<BackendRegistry>,
    probe: Arc<dyn HealthProbe>,
    config: HeartbeatConfig,
}

impl HeartbeatScheduler {
    pub fn new(
        registry: Arc<BackendRegistry>,
        probe: Arc<dyn HealthProbe>,
        config: HeartbeatConfig,
    ) -> Self {
        Self {
            registry,
            probe,
            config,
        }
    }

    /// Start the heartbeat loop until `shutdown` fires.
    ///
    /// The first round runs one full interval after start.
    pub fn start(self, shutdown: ShutdownController) -> JoinHandle<()> {
        tokio::spawn(async move {
            let stopped = shutdown.wait();
            tokio::pin!(stopped);
            let start = tokio::time::Instant::now() + self.config.interval;
            let mut interval = tokio::time::interval_at(start, self.config.interval);
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    _ = interval.tick() => {
                        self.run_once().await;
                    }
                    _ = &mut stopped => {
                        tracing::info!("heartbeat stopped");
                        break;
                    }
                }
            }
        })
    }

    /// Probe every backend in a snapshot taken now.
    ///
    /// Backends registered while the round runs are picked up next round.
    pub async fn run_once(&self) -> HeartbeatRound {
        let snapshot = self.registry.snapshot();
        let mut round = HeartbeatRound::default();

        for address in &snapshot {
            if self.probe.probe(address).await {
                self.registry.mark_alive(address);
                round.alive += 1;
            } else {
                tracing::warn!("backend {} not responding to heartbeat", address);
                self.registry.mark_dead(address);
                self.registry.demote(address);
                round.dead += 1;
            }
        }

        if round.dead > 0 {
            tracing::debug!(
                "heartbeat round: {} alive, {} dead",
                round.alive,
                round.dead
            );
        }
        round
    }
}
