//! Domain Errors
//!
//! Per-attempt, per-send and per-route failures. None of these are fatal
//! to the process; they stop at the connection handler.

use std::io;
use std::time::Duration;

/// Failure to encode, decode or frame an envelope.
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    #[error("peer closed the connection")]
    Closed,
    #[error("frame of {len} bytes exceeds limit of {max} bytes")]
    FrameTooLarge { len: usize, max: usize },
    #[error("malformed envelope: {0}")]
    Malformed(#[from] bincode::Error),
    #[error("i/o error: {0}")]
    Io(#[from] io::Error),
}

/// One failed attempt to reach a backend.
#[derive(Debug, thiserror::Error)]
pub enum AttemptError {
    #[error("connection failed: {0}")]
    Connect(#[source] io::Error),
    #[error("connection timed out after {0:?}")]
    ConnectTimeout(Duration),
    #[error("write stalled for {0:?}")]
    WriteTimeout(Duration),
    #[error("no reply within {0:?}")]
    ReadTimeout(Duration),
    #[error("expected ACK, got {0:?}")]
    UnexpectedReply(String),
    #[error(transparent)]
    Codec(#[from] CodecError),
}

/// A bounded-retry send that never got an acknowledgement.
#[derive(Debug, thiserror::Error)]
pub enum SendError {
    #[error("no acknowledgement after {attempts} attempts")]
    NoAcknowledgement {
        attempts: u32,
        #[source]
        last: AttemptError,
    },
}

/// Failover across the registry found nobody to deliver to.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RouteError {
    #[error("no backends available")]
    NoBackendsAvailable,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error;

    #[test]
    fn test_no_acknowledgement_carries_last_cause() {
        let err = SendError::NoAcknowledgement {
            attempts: 3,
            last: AttemptError::UnexpectedReply("obtenerSR".to_string()),
        };
        assert_eq!(err.to_string(), "no acknowledgement after 3 attempts");

        let source = err.source().unwrap();
        assert!(source.to_string().contains("obtenerSR"));
    }

    #[test]
    fn test_route_error_display() {
        assert_eq!(
            RouteError::NoBackendsAvailable.to_string(),
            "no backends available"
        );
    }

    #[test]
    fn test_frame_too_large_display() {
        let err = CodecError::FrameTooLarge { len: 10, max: 5 };
        assert_eq!(err.to_string(), "frame of 10 bytes exceeds limit of 5 bytes");
    }
}
