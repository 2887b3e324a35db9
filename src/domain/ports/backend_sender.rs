//! Backend Sender Port
//!
//! Defines how envelopes reach a single backend. The failover router and
//! the registry's broadcast treat implementations as a black box.

use crate::domain::entities::Envelope;
use crate::domain::error::{AttemptError, SendError};
use crate::domain::value_objects::BackendAddress;
use async_trait::async_trait;

/// Outbound port for delivering envelopes to one backend.
#[async_trait]
pub trait BackendSender: Send + Sync {
    /// Deliver `envelope` and wait for an acknowledgement, retrying within
    /// the implementation's bounded budget.
    ///
    /// Returns the acknowledgement envelope on success.
    async fn send(
        &self,
        address: &BackendAddress,
        envelope: &Envelope,
    ) -> Result<Envelope, SendError>;

    /// Write `envelope` once without waiting for any reply.
    async fn push(&self, address: &BackendAddress, envelope: &Envelope)
        -> Result<(), AttemptError>;
}
