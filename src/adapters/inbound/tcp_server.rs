//! TCP Server Adapter
//!
//! Accepts connections from backends and clients alike and serves the
//! registry protocol on each of them.

use crate::adapters::codec::{read_envelope, write_envelope};
use crate::application::RegistryService;
use crate::domain::error::CodecError;
use crate::infrastructure::ShutdownController;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::{TcpListener, TcpStream};

/// TCP Server - inbound adapter for the registry protocol.
///
/// This adapter:
/// 1. Accepts incoming TCP connections
/// 2. Spawns one handler task per connection
/// 3. Decodes envelopes and dispatches them to RegistryService
/// 4. Writes replies back, recovering through failover if the peer is gone
pub struct TcpServer {
    service: Arc<RegistryService>,
    listener: TcpListener,
    shutdown: ShutdownController,
}

impl TcpServer {
    /// Bind the listening socket. Failure here is startup-fatal.
    pub async fn bind(
        service: Arc<RegistryService>,
        listen_addr: &str,
        shutdown: ShutdownController,
    ) -> anyhow::Result<Self> {
        let listener = TcpListener::bind(listen_addr)
            .await
            .map_err(|e| anyhow::anyhow!("failed to bind {}: {}", listen_addr, e))?;
        Ok(Self {
            service,
            listener,
            shutdown,
        })
    }

    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Run the accept loop until shutdown.
    ///
    /// Returns straight away if shutdown began before the loop started.
    /// Accept errors are logged and the loop keeps going.
    #[cfg_attr(coverage_nightly, coverage(off))]
    pub async fn run(self) -> anyhow::Result<()> {
        let stopped = self.shutdown.wait();
        tokio::pin!(stopped);
        tracing::info!("failover proxy listening on {}", self.local_addr()?);

        loop {
            tokio::select! {
                accepted = self.listener.accept() => match accepted {
                    Ok((stream, peer)) => self.spawn_handler(stream, peer),
                    Err(e) => {
                        tracing::error!("accept failed: {}", e);
                        // Avoid spinning on persistent errors such as EMFILE
                        tokio::time::sleep(Duration::from_millis(50)).await;
                    }
                },
                _ = &mut stopped => {
                    tracing::info!("listener stopped accepting");
                    break;
                }
            }
        }

        Ok(())
    }

    fn spawn_handler(&self, stream: TcpStream, peer: SocketAddr) {
        let service = self.service.clone();
        let guard = self.shutdown.handler_guard();

        tokio::spawn(async move {
            let _guard = guard;
            Self::handle_connection(service, stream, peer).await;
        });
    }

    /// Serve one connection until the peer goes away or sends garbage.
    async fn handle_connection(
        service: Arc<RegistryService>,
        mut stream: TcpStream,
        peer: SocketAddr,
    ) {
        tracing::debug!("connection from {}", peer);

        loop {
            let request = match read_envelope(&mut stream).await {
                Ok(envelope) => envelope,
                Err(CodecError::Closed) => {
                    tracing::debug!("connection from {} closed", peer);
                    break;
                }
                Err(e) => {
                    tracing::debug!("dropping connection from {}: {}", peer, e);
                    break;
                }
            };

            tracing::debug!("{} from {}", request.operation, peer);

            let Some(reply) = service.dispatch(request) else {
                continue;
            };

            if let Err(e) = write_envelope(&mut stream, &reply).await {
                tracing::warn!("failed to reply {} to {}: {}", reply.operation, peer, e);
                let _ = service.recover_undelivered(&reply).await;
                break;
            }
        }
    }
}
