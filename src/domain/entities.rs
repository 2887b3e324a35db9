//! Domain Entities - Core business objects
//!
//! The registry entry and the envelope exchanged over every connection.

use crate::domain::value_objects::{op, BackendAddress, BackendList};
use serde::{Deserialize, Serialize};

/// One registered backend and its best-effort liveness.
///
/// Entries are owned by the registry; callers only ever see copies.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendEntry {
    pub address: BackendAddress,
    /// Result of the last probe or registration. A backend may die
    /// between the probe and its next use.
    pub alive: bool,
}

impl BackendEntry {
    /// A freshly registered backend starts alive.
    pub fn new(address: BackendAddress) -> Self {
        Self {
            address,
            alive: true,
        }
    }
}

/// Typed payload of an [`Envelope`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Payload {
    /// No content; also the "no backend available" signal.
    #[default]
    Empty,
    Address(BackendAddress),
    List(BackendList),
}

/// Tagged message unit exchanged on every connection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Envelope {
    pub operation: String,
    pub payload: Payload,
}

impl Envelope {
    pub fn new(operation: impl Into<String>, payload: Payload) -> Self {
        Self {
            operation: operation.into(),
            payload,
        }
    }

    /// Envelope with an empty payload.
    pub fn bare(operation: impl Into<String>) -> Self {
        Self::new(operation, Payload::Empty)
    }

    pub fn ack() -> Self {
        Self::bare(op::ACK)
    }

    /// Reply to `obtenerSA`; `None` becomes the empty-pool signal.
    pub fn active_reply(address: Option<BackendAddress>) -> Self {
        let payload = match address {
            Some(addr) => Payload::Address(addr),
            None => Payload::Empty,
        };
        Self::new(op::GET_ACTIVE_REPLY, payload)
    }

    pub fn list_reply(list: BackendList) -> Self {
        Self::new(op::LIST_REPLY, Payload::List(list))
    }

    pub fn update(list: BackendList) -> Self {
        Self::new(op::UPDATE, Payload::List(list))
    }

    pub fn is_ack(&self) -> bool {
        op::is_ack(&self.operation)
    }

    pub fn address(&self) -> Option<&BackendAddress> {
        match &self.payload {
            Payload::Address(addr) => Some(addr),
            _ => None,
        }
    }

    pub fn list(&self) -> Option<&BackendList> {
        match &self.payload {
            Payload::List(list) => Some(list),
            _ => None,
        }
    }
}
