//! Adapters Layer
//!
//! Sockets and bytes: the inbound listener, the outbound sender and the
//! envelope codec they share.

pub mod codec;
pub mod inbound;
pub mod outbound;
