//! Failover Router
//!
//! Walks the registry in preference order until one backend acknowledges
//! an envelope. Retry policy lives in the [`BackendSender`]; this module
//! only decides who to try next and who to demote.

use crate::domain::entities::Envelope;
use crate::domain::error::RouteError;
use crate::domain::ports::BackendSender;
use crate::domain::services::BackendRegistry;
use std::sync::Arc;

/// Demote-and-continue failover over a shared registry.
///
/// A single call may take up to one full send budget per registered
/// backend; callers that need a deadline should wrap it in a timeout.
#[derive(Clone)]
pub struct FailoverRouter {
    registry: Arc<BackendRegistry>,
    sender: Arc<dyn BackendSender>,
}

impl FailoverRouter {
    pub fn new(registry: Arc<BackendRegistry>, sender: Arc<dyn BackendSender>) -> Self {
        Self { registry, sender }
    }

    /// Deliver `envelope` to the first backend that acknowledges it.
    ///
    /// Each address in the snapshot is tried at most once. Dead or failing
    /// backends are demoted; the first success returns immediately and
    /// leaves ordering as it is.
    pub async fn route_and_send(&self, envelope: &Envelope) -> Result<Envelope, RouteError> {
        let snapshot = self.registry.snapshot();

        for address in &snapshot {
            if self.registry.is_alive(address) == Some(false) {
                tracing::warn!("backend {} is marked dead, demoting", address);
                self.registry.demote(address);
                continue;
            }

            match self.sender.send(address, envelope).await {
                Ok(ack) => {
                    tracing::debug!("{} delivered to {}", envelope.operation, address);
                    return Ok(ack);
                }
                Err(e) => {
                    tracing::warn!("backend {} failed ({}), demoting", address, e);
                    self.registry.demote(address);
                }
            }
        }

        Err(RouteError::NoBackendsAvailable)
    }
}
