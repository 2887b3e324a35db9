//! Registry Service - Main application use case
//!
//! Turns decoded envelopes into registry reads and writes, schedules the
//! peer-list broadcast after a registration, and recovers replies that
//! could not be written back to their requester.

use crate::domain::entities::Envelope;
use crate::domain::error::RouteError;
use crate::domain::ports::BackendSender;
use crate::domain::services::{BackendRegistry, FailoverRouter};
use crate::domain::value_objects::{op, BackendAddress, BackendList};
use std::sync::Arc;
use std::time::Duration;

/// Registry service - dispatch for the proxy's operation tags.
///
/// Shared by every connection handler; all state lives in the registry.
pub struct RegistryService {
    registry: Arc<BackendRegistry>,
    sender: Arc<dyn BackendSender>,
    router: FailoverRouter,
    broadcast_delay: Duration,
}

impl RegistryService {
    /// Create a new registry service.
    ///
    /// `broadcast_delay` is how long a registration waits before pushing
    /// the new peer list, giving the new backend time to finish starting.
    pub fn new(
        registry: Arc<BackendRegistry>,
        sender: Arc<dyn BackendSender>,
        broadcast_delay: Duration,
    ) -> Self {
        let router = FailoverRouter::new(registry.clone(), sender.clone());
        Self {
            registry,
            sender,
            router,
            broadcast_delay,
        }
    }

    pub fn registry(&self) -> &Arc<BackendRegistry> {
        &self.registry
    }

    /// Dispatch one request envelope.
    ///
    /// Returns the reply to write back, or `None` when the operation has no
    /// reply (unknown tags, malformed registrations).
    pub fn dispatch(&self, request: Envelope) -> Option<Envelope> {
        match request.operation.as_str() {
            op::GET_ACTIVE => Some(Envelope::active_reply(self.active_backend())),
            op::REGISTER => match request.address() {
                Some(address) => Some(Envelope::list_reply(
                    self.register_backend(address.clone()),
                )),
                None => {
                    tracing::warn!(
                        "{} without a backend address payload, ignoring",
                        op::REGISTER
                    );
                    None
                }
            },
            op::GET_LIST => Some(Envelope::list_reply(self.backend_list())),
            other => {
                tracing::warn!("unknown operation {:?}, ignoring", other);
                None
            }
        }
    }

    /// The preferred backend, if any is registered.
    pub fn active_backend(&self) -> Option<BackendAddress> {
        let preferred = self.registry.preferred();
        if preferred.is_none() {
            tracing::warn!("no backends registered");
        }
        preferred
    }

    pub fn backend_list(&self) -> BackendList {
        self.registry.snapshot()
    }

    /// Register a backend and schedule the peer-list broadcast.
    pub fn register_backend(&self, address: BackendAddress) -> BackendList {
        let list = self.registry.register(address);
        self.schedule_broadcast();
        list
    }

    /// Push the then-current list to every backend after the delay.
    ///
    /// The delay is a heuristic: nothing confirms the new backend is ready.
    fn schedule_broadcast(&self) {
        let registry = self.registry.clone();
        let sender = self.sender.clone();
        let delay = self.broadcast_delay;

        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let list = registry.snapshot();
            registry.broadcast_update(&list, sender.as_ref()).await;
        });
    }

    /// Try to hand an undeliverable reply to some backend instead.
    pub async fn recover_undelivered(&self, reply: &Envelope) -> Result<Envelope, RouteError> {
        let result = self.router.route_and_send(reply).await;
        if let Err(e) = &result {
            tracing::error!("could not recover {} reply: {}", reply.operation, e);
        }
        result
    }

    /// Deliver `envelope` through registry failover.
    pub async fn route_and_send(&self, envelope: &Envelope) -> Result<Envelope, RouteError> {
        self.router.route_and_send(envelope).await
    }
}
