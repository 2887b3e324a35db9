//! Value Objects - Immutable domain primitives
//!
//! Backend addresses and registry snapshots are identified by value and
//! are freely copied between the registry, the router and the wire.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Operation tags carried by envelopes.
///
/// Tags form an open set: anything not listed here is logged and ignored
/// by the connection handler.
pub mod op {
    /// Request: give me the preferred backend.
    pub const GET_ACTIVE: &str = "obtenerSA";
    /// Reply to [`GET_ACTIVE`].
    pub const GET_ACTIVE_REPLY: &str = "obtenerSAR";
    /// Request: register the backend in the payload.
    pub const REGISTER: &str = "registrarS";
    /// Request: give me the full backend list.
    pub const GET_LIST: &str = "obtenerS";
    /// Reply carrying a backend list (to [`GET_LIST`] and [`REGISTER`]).
    pub const LIST_REPLY: &str = "obtenerSR";
    /// Push of the current backend list to every backend.
    pub const UPDATE: &str = "actualizarS";
    /// Acknowledgement a backend sends for a forwarded request.
    pub const ACK: &str = "ACK";

    /// Whether `tag` is an acknowledgement. Backends are not consistent
    /// about case, so the comparison ignores it.
    pub fn is_ack(tag: &str) -> bool {
        tag.eq_ignore_ascii_case(ACK)
    }
}

/// Network address of a backend.
///
/// Equality is the `(host, port)` pair; the host is kept verbatim and
/// never resolved here.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BackendAddress {
    pub host: String,
    pub port: u16,
}

impl BackendAddress {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }

    /// Address string suitable for `TcpStream::connect`.
    ///
    /// IPv6 literals are bracketed.
    pub fn socket_addr_string(&self) -> String {
        if self.host.contains(':') {
            format!("[{}]:{}", self.host, self.port)
        } else {
            format!("{}:{}", self.host, self.port)
        }
    }
}

impl fmt::Display for BackendAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

/// Ordered snapshot of the registry's addresses.
///
/// Position reflects routing preference at the moment the snapshot was
/// taken; index 0 is the preferred backend.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackendList(pub Vec<BackendAddress>);

impl BackendList {
    pub fn new(addresses: Vec<BackendAddress>) -> Self {
        Self(addresses)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn first(&self) -> Option<&BackendAddress> {
        self.0.first()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, BackendAddress> {
        self.0.iter()
    }

    pub fn contains(&self, address: &BackendAddress) -> bool {
        self.0.contains(address)
    }

    pub fn into_inner(self) -> Vec<BackendAddress> {
        self.0
    }
}

impl From<Vec<BackendAddress>> for BackendList {
    fn from(addresses: Vec<BackendAddress>) -> Self {
        Self(addresses)
    }
}

impl IntoIterator for BackendList {
    type Item = BackendAddress;
    type IntoIter = std::vec::IntoIter<BackendAddress>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<'a> IntoIterator for &'a BackendList {
    type Item = &'a BackendAddress;
    type IntoIter = std::slice::Iter<'a, BackendAddress>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}
