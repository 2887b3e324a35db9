//! Failover Proxy - backend registry with heartbeat and failover
//!
//! This is the composition root that wires together all the components.

use failover_proxy::adapters::inbound::TcpServer;
use failover_proxy::adapters::outbound::TcpBackendSender;
use failover_proxy::application::RegistryService;
use failover_proxy::config::load_config;
use failover_proxy::domain::ports::{BackendSender, HealthProbe};
use failover_proxy::domain::services::BackendRegistry;
use failover_proxy::infrastructure::{
    shutdown_signal, HeartbeatScheduler, ShutdownController, TcpHealthProbe,
};
use std::sync::Arc;
use std::time::Duration;

/// How long in-flight connections get to finish after a shutdown signal.
const DRAIN_TIMEOUT: Duration = Duration::from_secs(5);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration; any failure aborts startup
    let cfg = load_config()?;

    let log_level = if cfg.debug {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };

    tracing_subscriber::fmt().with_max_level(log_level).init();

    tracing::info!(
        "starting failover proxy listen={} heartbeat={}s",
        cfg.listen_addr(),
        cfg.heartbeat_secs
    );

    // ===== COMPOSITION ROOT =====

    // 1. Shared state and outbound adapters
    let registry = Arc::new(BackendRegistry::new());
    let sender: Arc<dyn BackendSender> = Arc::new(TcpBackendSender::new(cfg.sender()));
    let heartbeat_cfg = cfg.heartbeat();
    let probe: Arc<dyn HealthProbe> = Arc::new(TcpHealthProbe::new(heartbeat_cfg.probe_timeout));

    // 2. Application service
    let service = Arc::new(RegistryService::new(
        registry.clone(),
        sender,
        cfg.broadcast_delay(),
    ));

    // 3. Lifecycle
    let shutdown = ShutdownController::new();
    tokio::spawn(shutdown_signal(shutdown.clone()));

    // 4. Background heartbeat
    let heartbeat =
        HeartbeatScheduler::new(registry, probe, heartbeat_cfg).start(shutdown.clone());

    // 5. Inbound adapter
    let server = TcpServer::bind(service, &cfg.listen_addr(), shutdown.clone()).await?;
    server.run().await?;

    if let Err(e) = heartbeat.await {
        tracing::error!("heartbeat task failed: {}", e);
    }
    shutdown.wait_for_drain(DRAIN_TIMEOUT).await;
    tracing::info!("failover proxy stopped");
    Ok(())
}
